//! Attribute macros turning plain structs and enums into volley metrics and aggregates.
//!
//! Both macros add the derives the volley trait bounds ask for. Generated code only refers
//! to items through the `volley` crate root, so neither `serde` nor the traits have to be
//! imported (or even depended on) at the call site.
//!
//! The crate root can be overridden with `crate = path`, for code that renames `volley`
//! in its manifest:
//!
//! ```rust,ignore
//! #[metric(crate = loadgen)]
//! struct Latency(std::time::Duration);
//! ```
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Path, parse_macro_input, parse_quote};

extern crate proc_macro;

/// Derives everything the `Metric` bounds ask for and implements the marker trait.
#[proc_macro_attribute]
pub fn metric(attr: TokenStream, item: TokenStream) -> TokenStream {
    let krate = parse_macro_input!(attr with crate_root);
    let ast = parse_macro_input!(item as DeriveInput);

    let expanded = with_bounds(&krate, &ast).map(|tokens| {
        let ident = &ast.ident;
        let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();
        quote! {
            #tokens

            impl #impl_generics #krate::Metric for #ident #ty_generics #where_clause {}
        }
    });

    expanded
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Derives everything the `Aggregate` bounds ask for. The trait itself is implemented by hand,
/// since only the caller knows how metrics fold.
#[proc_macro_attribute]
pub fn aggregate(attr: TokenStream, item: TokenStream) -> TokenStream {
    let krate = parse_macro_input!(attr with crate_root);
    let ast = parse_macro_input!(item as DeriveInput);

    with_bounds(&krate, &ast)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Parses the optional `crate = path` argument, `::volley` when absent.
fn crate_root(input: syn::parse::ParseStream) -> syn::Result<Path> {
    let mut root: Path = parse_quote!(::volley);
    let parser = syn::meta::parser(|meta| {
        if meta.path.is_ident("crate") {
            root = meta.value()?.parse()?;
            Ok(())
        } else {
            Err(meta.error("unsupported argument, expected `crate = path`"))
        }
    });
    syn::parse::Parser::parse2(parser, input.parse::<TokenStream2>()?)?;
    Ok(root)
}

/// Re-emits `ast` with serde and comparison derives, serde resolved through `krate`.
fn with_bounds(krate: &Path, ast: &DeriveInput) -> syn::Result<TokenStream2> {
    if let Data::Union(data) = &ast.data {
        return Err(syn::Error::new(
            data.union_token.span,
            "unions cannot be metrics or aggregates",
        ));
    }

    let serde_path = quote!(#krate::__serde).to_string();
    Ok(quote! {
        #[derive(
            #krate::__serde::Serialize,
            #krate::__serde::Deserialize,
            ::std::cmp::PartialOrd,
            ::std::cmp::PartialEq,
            ::std::fmt::Debug,
            ::std::clone::Clone
        )]
        #[serde(crate = #serde_path)]
        #ast
    })
}
