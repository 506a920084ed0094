//! `#[derive(JsonSchema)]` implementation.
//!
//! Generates two impls: `bindery_types::Describe`, which records the type's
//! shape and each field's JSON, XML and form names, and
//! `bindery_openapi::JsonSchema`, which builds the structural schema.
//!
//! # Supported Types
//!
//! - Structs with named fields (nested structs are inlined through their own
//!   `JsonSchema` impl)
//! - Unit structs
//! - Enums whose variants carry no data (string enums)
//!
//! # Attributes
//!
//! - `#[schema(title = "...")]` - Set schema title
//! - `#[schema(description = "...")]` - Set schema description
//! - `#[schema(xml = "...")]` - Element name under `application/xml`
//! - `#[schema(form = "...")]` - Field name in url-encoded and multipart forms
//! - `#[schema(format = "...")]` - Override format (e.g., "email", "date-time")
//! - `#[schema(nullable)]` - Mark field as nullable
//! - `#[schema(skip)]` - Skip field in schema generation

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    Attribute, Data, DataEnum, DeriveInput, Expr, ExprLit, Fields, FieldsNamed, Generics, Lit,
    Meta, MetaNameValue, parse_macro_input, parse_quote,
};

use crate::rename::{SerdeAttrs, rename_field, rename_variant};

/// Schema attributes parsed from `#[schema(...)]`.
#[derive(Default)]
struct SchemaAttrs {
    title: Option<String>,
    description: Option<String>,
    xml: Option<String>,
    form: Option<String>,
    format: Option<String>,
    nullable: bool,
    skip: bool,
}

impl SchemaAttrs {
    fn from_attributes(attrs: &[Attribute]) -> Self {
        let mut result = Self::default();

        for attr in attrs {
            if !attr.path().is_ident("schema") {
                continue;
            }

            let _ = attr.parse_nested_meta(|meta| {
                let string_value = || -> Option<String> {
                    match meta.value().ok()?.parse::<Lit>().ok()? {
                        Lit::Str(s) => Some(s.value()),
                        _ => None,
                    }
                };
                if meta.path.is_ident("title") {
                    result.title = string_value();
                } else if meta.path.is_ident("description") {
                    result.description = string_value();
                } else if meta.path.is_ident("xml") {
                    result.xml = string_value();
                } else if meta.path.is_ident("form") {
                    result.form = string_value();
                } else if meta.path.is_ident("format") {
                    result.format = string_value();
                } else if meta.path.is_ident("nullable") {
                    result.nullable = true;
                } else if meta.path.is_ident("skip") {
                    result.skip = true;
                }
                Ok(())
            });
        }

        // Also check doc comments for description
        if result.description.is_none() {
            result.description = extract_doc_comment(attrs);
        }

        result
    }
}

/// Extract doc comments from attributes.
fn extract_doc_comment(attrs: &[Attribute]) -> Option<String> {
    let docs: Vec<String> = attrs
        .iter()
        .filter_map(|attr| {
            if !attr.path().is_ident("doc") {
                return None;
            }
            match &attr.meta {
                Meta::NameValue(MetaNameValue {
                    value:
                        Expr::Lit(ExprLit {
                            lit: Lit::Str(s), ..
                        }),
                    ..
                }) => Some(s.value().trim().to_string()),
                _ => None,
            }
        })
        .collect();

    if docs.is_empty() {
        None
    } else {
        Some(docs.join("\n"))
    }
}

/// Names and schema of one struct field.
struct FieldInfo {
    ident: String,
    json_name: String,
    xml_name: String,
    form_name: String,
    ty: syn::Type,
    attrs: SchemaAttrs,
}

fn collect_fields(fields: &FieldsNamed, rename_all: Option<&str>) -> Vec<FieldInfo> {
    fields
        .named
        .iter()
        .filter_map(|f| {
            let attrs = SchemaAttrs::from_attributes(&f.attrs);
            let serde = SerdeAttrs::from_attributes(&f.attrs);
            if attrs.skip || serde.skip {
                return None;
            }
            let ident = f.ident.as_ref()?.to_string();
            let ident = ident.strip_prefix("r#").unwrap_or(&ident).to_string();
            let json_name = serde.rename.unwrap_or_else(|| match rename_all {
                Some(rule) => rename_field(&ident, rule),
                None => ident.clone(),
            });
            let xml_name = attrs.xml.clone().unwrap_or_else(|| json_name.clone());
            let form_name = attrs.form.clone().unwrap_or_else(|| json_name.clone());
            Some(FieldInfo {
                ident,
                json_name,
                xml_name,
                form_name,
                ty: f.ty.clone(),
                attrs,
            })
        })
        .collect()
}

/// Generate the schema expression for one field.
fn field_schema(field: &FieldInfo) -> TokenStream2 {
    let ty = &field.ty;
    let base = match &field.attrs.format {
        Some(format) => quote! { ::bindery_openapi::Schema::string_with_format(#format) },
        None => quote! { <#ty as ::bindery_openapi::JsonSchema>::schema() },
    };
    if field.attrs.nullable {
        quote! { #base.nullable() }
    } else {
        base
    }
}

/// Clone `generics` with `bound` added to every type parameter.
fn bounded(generics: &Generics, bound: &TokenStream2) -> Generics {
    let mut generics = generics.clone();
    let params: Vec<_> = generics.type_params().map(|p| p.ident.clone()).collect();
    let where_clause = generics.make_where_clause();
    for param in params {
        where_clause.predicates.push(parse_quote!(#param: #bound));
    }
    generics
}

/// Expression naming the type. Generic types append their arguments' names
/// so that `Page<User>` and `Page<Order>` get separate components.
fn type_name(input: &DeriveInput) -> TokenStream2 {
    let name_str = input.ident.to_string();
    let params: Vec<_> = input.generics.type_params().map(|p| &p.ident).collect();
    if params.is_empty() {
        return quote! { #name_str };
    }
    quote! {
        ::bindery_types::generic_name(
            #name_str,
            &[#(<#params as ::bindery_types::Describe>::describe()),*],
        )
    }
}

pub fn derive_json_schema_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let serde = SerdeAttrs::from_attributes(&input.attrs);

    let expanded = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => {
                let fields = collect_fields(fields, serde.rename_all.as_deref());
                struct_impls(&input, &fields)
            }
            Fields::Unit => struct_impls(&input, &[]),
            Fields::Unnamed(_) => {
                return syn::Error::new_spanned(
                    &input,
                    "JsonSchema derive does not support tuple structs",
                )
                .to_compile_error()
                .into();
            }
        },
        Data::Enum(data) => match enum_impls(&input, data, serde.rename_all.as_deref()) {
            Ok(tokens) => tokens,
            Err(err) => return err.to_compile_error().into(),
        },
        Data::Union(_) => {
            return syn::Error::new_spanned(&input, "JsonSchema derive does not support unions")
                .to_compile_error()
                .into();
        }
    };

    TokenStream::from(expanded)
}

fn struct_impls(input: &DeriveInput, fields: &[FieldInfo]) -> TokenStream2 {
    let name = &input.ident;
    let name_str = type_name(input);

    let struct_attrs = SchemaAttrs::from_attributes(&input.attrs);
    let title = struct_attrs
        .title
        .as_ref()
        .map(|t| quote! { let schema = schema.with_title(#t); });
    let description = struct_attrs
        .description
        .as_ref()
        .map(|d| quote! { let schema = schema.with_description(#d); });

    let descriptors = fields.iter().map(|field| {
        let ident = &field.ident;
        let json_name = &field.json_name;
        let xml_name = &field.xml_name;
        let form_name = &field.form_name;
        let ty = &field.ty;
        quote! {
            ::bindery_types::FieldDescriptor {
                ident: #ident,
                json_name: #json_name,
                xml_name: #xml_name,
                form_name: #form_name,
                describe: <#ty as ::bindery_types::Describe>::describe,
            }
        }
    });

    let property_insertions = fields.iter().map(|field| {
        let json_name = &field.json_name;
        let schema_code = field_schema(field);
        quote! {
            properties.insert(::std::string::String::from(#json_name), #schema_code);
        }
    });

    let describe_generics = bounded(&input.generics, &quote!(::bindery_types::Describe));
    let (describe_impl, ty_generics, describe_where) = describe_generics.split_for_impl();
    let schema_generics = bounded(&input.generics, &quote!(::bindery_openapi::JsonSchema));
    let (schema_impl, _, schema_where) = schema_generics.split_for_impl();

    quote! {
        impl #describe_impl ::bindery_types::Describe for #name #ty_generics #describe_where {
            fn describe() -> ::bindery_types::TypeDescriptor {
                ::bindery_types::TypeDescriptor::Struct(::bindery_types::StructDescriptor {
                    name: #name_str,
                    fields: ::std::vec![#(#descriptors),*],
                })
            }
        }

        impl #schema_impl ::bindery_openapi::JsonSchema for #name #ty_generics #schema_where {
            fn schema() -> ::bindery_openapi::Schema {
                #[allow(unused_mut)]
                let mut properties = ::std::collections::BTreeMap::new();
                #(#property_insertions)*

                let schema = ::bindery_openapi::Schema::object(properties, ::std::vec::Vec::new());
                #title
                #description
                schema
            }

            fn schema_name() -> ::std::option::Option<&'static str> {
                ::std::option::Option::Some(#name_str)
            }
        }
    }
}

fn enum_impls(
    input: &DeriveInput,
    data: &DataEnum,
    rename_all: Option<&str>,
) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let name_str = name.to_string();

    let mut variants = Vec::new();
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "JsonSchema derive only supports enums whose variants carry no data",
            ));
        }
        let serde = SerdeAttrs::from_attributes(&variant.attrs);
        if serde.skip {
            continue;
        }
        let ident = variant.ident.to_string();
        variants.push(serde.rename.unwrap_or_else(|| match rename_all {
            Some(rule) => rename_variant(&ident, rule),
            None => ident,
        }));
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::bindery_types::Describe for #name #ty_generics #where_clause {
            fn describe() -> ::bindery_types::TypeDescriptor {
                ::bindery_types::TypeDescriptor::Enum(::bindery_types::EnumDescriptor {
                    name: #name_str,
                    variants: ::std::vec![#(#variants),*],
                })
            }
        }

        impl #impl_generics ::bindery_openapi::JsonSchema for #name #ty_generics #where_clause {
            fn schema() -> ::bindery_openapi::Schema {
                ::bindery_openapi::Schema::string_enum([#(#variants),*])
            }

            fn schema_name() -> ::std::option::Option<&'static str> {
                ::std::option::Option::Some(#name_str)
            }
        }
    })
}
