//! Derive macros for Quarry property-based testing.
//!
//! This crate provides a procedural macro deriving `quarry::Arbitrary`
//! for custom types from the `Arbitrary` implementations of their fields.

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{parse_macro_input, parse_quote, Data, DeriveInput, Fields, GenericParam, Ident};

/// Derive macro for implementing `quarry::Arbitrary`.
///
/// Structs draw every field from its type's canonical strategy and build
/// the value from them. Enums choose between their variants in declaration
/// order, so values shrink toward the first variant.
///
/// # Example
///
/// ```rust,ignore
/// use quarry::{any, Arbitrary};
///
/// #[derive(Arbitrary, Debug, Clone, PartialEq)]
/// struct User {
///     name: String,
///     age: u8,
/// }
///
/// let users = any::<User>();
/// ```
#[proc_macro_derive(Arbitrary)]
pub fn derive_arbitrary(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match arbitrary_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Generate the implementation of the Arbitrary trait.
fn arbitrary_impl(input: &DeriveInput) -> Result<TokenStream2, syn::Error> {
    let name = &input.ident;

    let mut generics = input.generics.clone();
    for param in &mut generics.params {
        match param {
            GenericParam::Type(param) => param.bounds.push(parse_quote!(::quarry::Arbitrary)),
            GenericParam::Lifetime(param) => {
                return Err(syn::Error::new_spanned(
                    param,
                    "Arbitrary cannot be derived for types with lifetime parameters",
                ));
            }
            GenericParam::Const(_) => {}
        }
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let strategy = match &input.data {
        Data::Struct(data) => fields_strategy(&data.fields, quote!(Self)),
        Data::Enum(data) => {
            let mut variants = data.variants.iter().map(|variant| {
                let variant_name = &variant.ident;
                fields_strategy(&variant.fields, quote!(Self::#variant_name))
            });
            let Some(first) = variants.next() else {
                return Err(syn::Error::new_spanned(
                    input,
                    "Arbitrary cannot be derived for enums without variants",
                ));
            };
            quote! {
                #first #(.or(#variants))*
            }
        }
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "Arbitrary derive macro does not support unions",
            ));
        }
    };

    Ok(quote! {
        impl #impl_generics ::quarry::Arbitrary for #name #ty_generics #where_clause {
            fn arbitrary() -> ::quarry::Strategy<Self> {
                #strategy
            }
        }
    })
}

/// Strategy building one constructor from the canonical strategies of its
/// fields.
///
/// Field strategies are zipped right to left into nested pairs ending in
/// `none()`, so the drawn value destructures as `(f0, (f1, ()))`.
fn fields_strategy(fields: &Fields, constructor: TokenStream2) -> TokenStream2 {
    let vars: Vec<Ident> = (0..fields.len())
        .map(|i| Ident::new(&format!("field_{i}"), Span::call_site()))
        .collect();

    let mut strategy = quote!(::quarry::none());
    let mut pattern = quote!(());
    for (field, var) in fields.iter().zip(&vars).rev() {
        let ty = &field.ty;
        strategy = quote! {
            <#ty as ::quarry::Arbitrary>::arbitrary().zip(#strategy)
        };
        pattern = quote!((#var, #pattern));
    }

    let value = match fields {
        Fields::Named(named) => {
            let names = named.named.iter().map(|field| &field.ident);
            quote!(#constructor { #(#names: #vars),* })
        }
        Fields::Unnamed(_) => quote!(#constructor(#(#vars),*)),
        Fields::Unit => constructor,
    };

    quote! {
        #strategy.map(|#pattern| #value)
    }
}
