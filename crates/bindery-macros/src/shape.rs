//! `#[derive(RequestShape)]` implementation.
//!
//! Each field either carries a `#[bind("location=key;modifiers")]`
//! annotation or is itself a request shape:
//!
//! ```ignore
//! #[derive(RequestShape)]
//! struct CreateReq {
//!     #[bind("path=id")]
//!     id: u64,
//!     #[bind("header=Authorization;isauth")]
//!     token: String,
//!     #[bind("req=body")]
//!     body: CreateBody,
//!     paging: Paging, // another RequestShape, bound in place
//! }
//! ```
//!
//! The annotation text is passed through untouched; it is parsed and
//! validated when the route is registered, so a bad location surfaces as a
//! registration error rather than a compile error.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, LitStr, parse_macro_input};

/// How one field is bound.
enum FieldKind {
    /// `#[bind("req=body")]`: decoded from the request body.
    Body(LitStr),
    /// Any other annotation: a single path, query, header or cookie value.
    Param(LitStr),
    /// No annotation: a nested request shape.
    Nested,
}

fn bind_attr(attrs: &[Attribute]) -> syn::Result<Option<LitStr>> {
    let mut found = None;
    for attr in attrs {
        if !attr.path().is_ident("bind") {
            continue;
        }
        if found.is_some() {
            return Err(syn::Error::new_spanned(attr, "duplicate #[bind] attribute"));
        }
        found = Some(attr.parse_args::<LitStr>()?);
    }
    Ok(found)
}

fn field_kind(attrs: &[Attribute]) -> syn::Result<FieldKind> {
    Ok(match bind_attr(attrs)? {
        None => FieldKind::Nested,
        Some(tag) => {
            let value = tag.value();
            let location = value.split(['=', ';']).next().unwrap_or_default().trim();
            if location == "req" {
                FieldKind::Body(tag)
            } else {
                FieldKind::Param(tag)
            }
        }
    })
}

pub fn derive_request_shape_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            input,
            "RequestShape can only be derived for structs",
        ));
    };

    let named = match &data.fields {
        Fields::Named(fields) => fields.named.iter().collect::<Vec<_>>(),
        Fields::Unit => Vec::new(),
        Fields::Unnamed(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "RequestShape cannot be derived for tuple structs",
            ));
        }
    };

    let mut descriptors = Vec::with_capacity(named.len());
    let mut bindings = Vec::with_capacity(named.len());
    let mut idents = Vec::with_capacity(named.len());

    for field in named {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let ty = &field.ty;
        let ident_str = ident.to_string();
        let ident_str = ident_str.strip_prefix("r#").unwrap_or(&ident_str).to_string();

        match field_kind(&field.attrs)? {
            FieldKind::Body(tag) => {
                descriptors.push(tagged(&ident_str, &tag, ty));
                bindings.push(quote! { let #ident = binder.body::<#ty>()?; });
            }
            FieldKind::Param(tag) => {
                descriptors.push(tagged(&ident_str, &tag, ty));
                bindings.push(quote! { let #ident = binder.param::<#ty>()?; });
            }
            FieldKind::Nested => {
                descriptors.push(quote! {
                    ::bindery_core::ShapeField::nested(
                        #ident_str,
                        <#ty as ::bindery_core::RequestShape>::fields(),
                    )
                });
                bindings.push(quote! {
                    let #ident = <#ty as ::bindery_core::RequestShape>::bind(binder)?;
                });
            }
        }
        idents.push(ident.clone());
    }

    let construct = match &data.fields {
        Fields::Unit => quote! { #name },
        _ => quote! { #name { #(#idents),* } },
    };

    Ok(quote! {
        impl #impl_generics ::bindery_core::RequestShape for #name #ty_generics #where_clause {
            fn fields() -> ::std::vec::Vec<::bindery_core::ShapeField> {
                ::std::vec![#(#descriptors),*]
            }

            #[allow(unused_variables)]
            fn bind(
                binder: &mut ::bindery_core::Binder<'_>,
            ) -> ::std::result::Result<Self, ::bindery_core::BindError> {
                #(#bindings)*
                ::std::result::Result::Ok(#construct)
            }
        }
    })
}

fn tagged(ident: &str, tag: &LitStr, ty: &syn::Type) -> TokenStream2 {
    quote! {
        ::bindery_core::ShapeField::tagged(
            #ident,
            #tag,
            <#ty as ::bindery_types::Describe>::describe,
            <#ty as ::bindery_openapi::JsonSchema>::schema,
        )
    }
}
