use std::time::Duration;

use quarry::*;

fn seeded(seed: u64) -> Option<Settings> {
    Some(Settings::default().with_seed(seed))
}

fn sum(values: &[i64]) -> i128 {
    values.iter().map(|&x| i128::from(x)).sum()
}

#[test]
fn test_smallest_integer_above_ten() {
    for seed in 0..5 {
        let value = find(&integers(), |x| *x > 10, seeded(seed)).unwrap().value();
        assert_eq!(value, Some(11));
    }
}

#[test]
fn test_list_with_large_sum_is_a_local_minimum() {
    let strategy = lists(integers(), SizeBounds::new()).unwrap();
    let minimal = find(&strategy, |list| sum(list) > 100, seeded(7))
        .unwrap()
        .found()
        .expect("a list with a large sum is easy to find");
    assert!(sum(&minimal.value) > 100);
    assert!(minimal.is_local_minimum(), "Stopped early: {}", minimal.termination);

    for index in 0..minimal.value.len() {
        let mut without = minimal.value.clone();
        without.remove(index);
        assert!(
            sum(&without) <= 100,
            "Deleting {index} from {:?} still passes",
            minimal.value
        );
    }
    assert!(minimal.value.iter().all(|&x| x >= 0));
    assert_eq!(sum(&minimal.value), 101);
}

#[test]
fn test_panicking_test_is_shrunk() {
    let payload = std::panic::catch_unwind(|| {
        falsify(
            &integers(),
            |x| {
                assert!(*x <= 10, "too big: {x}");
                Ok::<(), ()>(())
            },
            seeded(1),
        )
    })
    .expect_err("the minimal example should panic again");
    let message = payload
        .downcast_ref::<String>()
        .expect("assert! with arguments panics with a String");
    assert_eq!(message, "too big: 11");
}

#[test]
fn test_search_cut_short_is_reported() {
    let strategy = lists(integers(), SizeBounds::new()).unwrap();
    let settings = Settings::default()
        .with_seed(1)
        .with_timeout(Some(Duration::ZERO));
    let outcome = find(&strategy, |list| sum(list) > 100, Some(settings)).unwrap();
    assert!(!outcome.is_found());
    assert_eq!(outcome.stats().examples, 0);
    assert_eq!(outcome.stats().stopped, Some(SearchStop::Timeout));
    assert!(!outcome.stats().is_complete());
}

#[test]
fn test_bounded_floats_shrink_toward_the_boundary() {
    let strategy = floats_in(Some(0.0), Some(1.0)).unwrap();
    let minimal = find(&strategy, |x| *x > 0.5, seeded(2)).unwrap().found().unwrap();
    assert!(minimal.value > 0.5);
    assert!(minimal.value < 0.501, "{} is far from 0.5", minimal.value);
}

#[test]
fn test_huge_max_size_is_accepted() {
    let strategy = lists(just(1), SizeBounds::new().max(usize::MAX)).unwrap();
    assert_eq!(strategy.reify(&Template::Integer(3)).unwrap(), vec![1, 1, 1]);
    let strategy = lists(just(1), SizeBounds::new().min(2).max(usize::MAX)).unwrap();
    assert!(strategy.reify(&Template::Integer(1)).is_err());
}

#[test]
fn test_same_seed_same_result() {
    let strategy = lists(integers(), SizeBounds::new()).unwrap();
    let condition = |list: &Vec<i64>| list.len() >= 3 && sum(list) % 7 == 3;
    let first = find(&strategy, condition, seeded(11))
        .unwrap()
        .found()
        .unwrap();
    let second = find(&strategy, condition, seeded(11))
        .unwrap()
        .found()
        .unwrap();
    assert_eq!(first.value, second.value);
    assert_eq!(first.template, second.template);
    assert_eq!(first.stats.shrinks, second.stats.shrinks);
}

#[test]
fn test_minimal_template_has_no_passing_simplification() {
    let strategy = tuples((integers(), booleans()));
    let condition = |(n, flag): &(i64, bool)| *flag && *n > 40;
    let minimal = find(&strategy, condition, seeded(3)).unwrap().found().unwrap();
    assert_eq!(minimal.value, (41, true));

    let mut random = Random::for_key(&minimal.template);
    for candidate in strategy.simplify(&mut random, &minimal.template) {
        let value = strategy.reify(&candidate).unwrap();
        assert!(!condition(&value), "{value:?} still satisfies the condition");
    }
}

#[test]
fn test_replay_reproduces_the_minimal_value() {
    let strategy = text(Some("abc"), SizeBounds::new()).unwrap();
    let minimal = find(&strategy, |s| s.contains('c'), seeded(5)).unwrap().found().unwrap();
    assert_eq!(minimal.value, "c");
    assert_eq!(replay(&strategy, &minimal.template).unwrap(), minimal.value);
}

#[test]
fn test_falsify_reports_the_test_error() {
    let strategy = lists(integers_in(Some(0), Some(1000)).unwrap(), SizeBounds::new()).unwrap();
    let minimal = falsify(
        &strategy,
        |list| match list.iter().find(|&&x| x >= 500) {
            Some(x) => Err(format!("{x} is too big")),
            None => Ok(()),
        },
        seeded(9),
    )
    .unwrap()
    .found()
    .unwrap();
    assert_eq!(minimal.value, vec![500]);
    assert_eq!(minimal.error, "500 is too big");
}

#[test]
fn test_invalid_arguments_are_reported() {
    assert!(matches!(floats_in(Some(5.0), Some(1.0)), Err(Error::InvalidArgument { .. })));
    assert!(matches!(integers_in(Some(5), Some(1)), Err(Error::InvalidArgument { .. })));
    assert!(matches!(
        sets(booleans(), SizeBounds::new().min(3)),
        Err(Error::InvalidArgument { .. })
    ));
    assert!(matches!(
        lists(integers(), SizeBounds::new().min(4).max(2)),
        Err(Error::InvalidArgument { .. })
    ));
    assert!(matches!(one_of(Vec::<Strategy<i64>>::new()), Err(Error::InvalidArgument { .. })));
}

#[test]
fn test_unsatisfiable_search() {
    let strategy = integers().filter(|_| false);
    let result = find(&strategy, |_| true, seeded(1));
    assert!(matches!(result, Err(Error::Unsatisfiable { .. })));
}
