//! serde attribute reading.
//!
//! The derives name fields the way serde serializes them, so they read
//! `#[serde(rename = "...")]`, `#[serde(skip)]` and `#[serde(rename_all =
//! "...")]` alongside their own attributes.

use syn::{Attribute, LitStr};

/// serde attributes relevant to naming.
#[derive(Default)]
pub struct SerdeAttrs {
    pub rename: Option<String>,
    pub rename_all: Option<String>,
    pub skip: bool,
}

impl SerdeAttrs {
    pub fn from_attributes(attrs: &[Attribute]) -> Self {
        let mut result = Self::default();

        for attr in attrs {
            if !attr.path().is_ident("serde") {
                continue;
            }

            let _ = attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    if let Ok(value) = meta.value() {
                        if let Ok(s) = value.parse::<LitStr>() {
                            result.rename = Some(s.value());
                        }
                    }
                } else if meta.path.is_ident("rename_all") {
                    if let Ok(value) = meta.value() {
                        if let Ok(s) = value.parse::<LitStr>() {
                            result.rename_all = Some(s.value());
                        }
                    }
                } else if meta.path.is_ident("skip") {
                    result.skip = true;
                } else if meta.input.peek(syn::token::Paren) {
                    let content;
                    syn::parenthesized!(content in meta.input);
                    let _ = content.parse::<proc_macro2::TokenStream>();
                } else if let Ok(value) = meta.value() {
                    // Consume `key = value` pairs we do not care about.
                    let _ = value.parse::<syn::Expr>();
                }
                Ok(())
            });
        }

        result
    }
}

/// Apply a `rename_all` rule to a snake_case field identifier.
pub fn rename_field(ident: &str, rule: &str) -> String {
    let words: Vec<&str> = ident.split('_').filter(|w| !w.is_empty()).collect();
    match rule {
        "lowercase" => ident.to_ascii_lowercase(),
        "UPPERCASE" | "SCREAMING_SNAKE_CASE" => ident.to_ascii_uppercase(),
        "PascalCase" => words.iter().map(|w| capitalize(w)).collect(),
        "camelCase" => {
            let pascal: String = words.iter().map(|w| capitalize(w)).collect();
            lower_first(&pascal)
        }
        "kebab-case" => ident.replace('_', "-"),
        "SCREAMING-KEBAB-CASE" => ident.replace('_', "-").to_ascii_uppercase(),
        _ => ident.to_string(),
    }
}

/// Apply a `rename_all` rule to a PascalCase variant identifier.
pub fn rename_variant(ident: &str, rule: &str) -> String {
    let snake = to_snake(ident);
    match rule {
        "lowercase" => ident.to_ascii_lowercase(),
        "UPPERCASE" => ident.to_ascii_uppercase(),
        "camelCase" => lower_first(ident),
        "snake_case" => snake,
        "SCREAMING_SNAKE_CASE" => snake.to_ascii_uppercase(),
        "kebab-case" => snake.replace('_', "-"),
        "SCREAMING-KEBAB-CASE" => snake.replace('_', "-").to_ascii_uppercase(),
        _ => ident.to_string(),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

fn lower_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

fn to_snake(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len() + 4);
    for (i, ch) in ident.char_indices() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
