//! Proc-macro crate for `#[derive(FromBytes)]` and `#[derive(AsBytes)]`.
//!
//! Both derives emit an `unsafe impl` of the matching `hadron_binparse` marker
//! trait, guarded by compile-time assertions that every field type implements
//! the same trait. The layout requirements differ:
//!
//! - `FromBytes` needs `#[repr(C)]` (packed or not).
//! - `AsBytes` needs `#[repr(C, packed)]` so the struct has no padding bytes.

use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Fields, Ident, parse_macro_input};

/// Derives `hadron_binparse::FromBytes` for a `#[repr(C)]` struct.
///
/// # Example
///
/// ```ignore
/// #[derive(Clone, Copy, FromBytes)]
/// #[repr(C, packed)]
/// pub struct SdtHeader {
///     pub signature: [u8; 4],
///     pub length: u32,
///     // ...
/// }
/// ```
#[proc_macro_derive(FromBytes)]
pub fn derive_from_bytes(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input, Marker::FromBytes)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Derives `hadron_binparse::AsBytes` for a `#[repr(C, packed)]` struct.
#[proc_macro_derive(AsBytes)]
pub fn derive_as_bytes(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input, Marker::AsBytes)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

#[derive(Clone, Copy)]
enum Marker {
    FromBytes,
    AsBytes,
}

impl Marker {
    fn ident(self) -> Ident {
        match self {
            Self::FromBytes => format_ident!("FromBytes"),
            Self::AsBytes => format_ident!("AsBytes"),
        }
    }
}

/// `repr` flags relevant to the marker traits.
#[derive(Default)]
struct Repr {
    c: bool,
    packed: bool,
}

fn parse_repr(input: &DeriveInput) -> Repr {
    let mut repr = Repr::default();
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("repr")) {
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("C") {
                repr.c = true;
            } else if meta.path.is_ident("packed") {
                repr.packed = true;
                // `packed(N)` carries a value; consume it so parsing continues.
                if meta.input.peek(syn::token::Paren) {
                    let _content;
                    syn::parenthesized!(_content in meta.input);
                }
            }
            Ok(())
        });
    }
    repr
}

fn expand(input: &DeriveInput, marker: Marker) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let trait_ident = marker.ident();
    let repr = parse_repr(input);

    match marker {
        Marker::FromBytes if !repr.c => {
            return Err(syn::Error::new_spanned(
                name,
                "FromBytes requires #[repr(C)] or #[repr(C, packed)]",
            ));
        }
        Marker::AsBytes if !(repr.c && repr.packed) => {
            return Err(syn::Error::new_spanned(
                name,
                "AsBytes requires #[repr(C, packed)]",
            ));
        }
        _ => {}
    }

    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            name,
            format!("{trait_ident} can only be derived for structs"),
        ));
    };

    let field_types: Vec<&syn::Type> = match &data.fields {
        Fields::Named(named) => named.named.iter().map(|f| &f.ty).collect(),
        Fields::Unnamed(unnamed) => unnamed.unnamed.iter().map(|f| &f.ty).collect(),
        Fields::Unit => Vec::new(),
    };

    let assertions = field_types.iter().enumerate().map(|(i, ty)| {
        let assert_name = format_ident!("_Assert{}_{}_{}", trait_ident, name, i);
        quote! {
            #[doc(hidden)]
            #[allow(non_camel_case_types, dead_code)]
            struct #assert_name where #ty: hadron_binparse::#trait_ident;
        }
    });

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        #(#assertions)*

        // SAFETY: the derive verified the required `repr` and that every
        // field type implements the same marker trait.
        unsafe impl #impl_generics hadron_binparse::#trait_ident for #name #ty_generics #where_clause {}
    })
}
