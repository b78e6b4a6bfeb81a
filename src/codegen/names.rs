// protoroute/src/codegen/names.rs

use heck::{ToShoutySnakeCase, ToSnakeCase, ToUpperCamelCase};
use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::parse::Parser;

use super::schema::MessageRegistry;

const RUST_KEYWORDS: &[&str] = &[
    "as", "break", "const", "continue", "crate", "else", "enum", "extern", "false", "fn", "for",
    "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return",
    "self", "Self", "static", "struct", "super", "trait", "true", "type", "unsafe", "use", "where",
    "while", "async", "await", "dyn", "abstract", "become", "box", "do", "final", "macro",
    "override", "priv", "typeof", "unsized", "virtual", "yield", "try", "gen",
];

// Keywords that cannot be raw identifiers.
const NON_RAW_KEYWORDS: &[&str] = &["self", "Self", "super", "crate"];

/// Identifier for `name`, using r# syntax for keywords.
pub fn ident(name: &str) -> Ident {
    if NON_RAW_KEYWORDS.contains(&name) {
        format_ident!("{}_", name)
    } else if RUST_KEYWORDS.contains(&name) {
        format_ident!("r#{}", name)
    } else {
        format_ident!("{}", name)
    }
}

/// Whether `name` can be emitted as an identifier at all (keywords are fine, see [`ident`]).
pub fn is_identifier(name: &str) -> bool {
    if name == "_" || name.starts_with("r#") {
        return false;
    }
    // the lexer skips surrounding whitespace, so the ident must spell `name` exactly
    syn::Ident::parse_any
        .parse_str(name)
        .is_ok_and(|ident| ident == name)
}

/// `PATH_ORDER_GET` for service `Order`, method `Get`.
pub fn path_const(service: &str, method: &str) -> Ident {
    format_ident!(
        "PATH_{}_{}",
        service.to_shouty_snake_case(),
        method.to_shouty_snake_case()
    )
}

/// `order_get`: the handler shim of one method.
pub fn handler_fn(service: &str, method: &str) -> Ident {
    format_ident!("{}_{}", service.to_snake_case(), method.to_snake_case())
}

/// `OrderHttpServer`
pub fn trait_name(service: &str, suffix: &str) -> Ident {
    format_ident!("{}{}", service.to_upper_camel_case(), suffix)
}

/// `register_order_http_server`
pub fn register_fn(service: &str, suffix: &str) -> Ident {
    format_ident!(
        "register_{}_{}",
        service.to_snake_case(),
        suffix.to_snake_case()
    )
}

/// Trait method name: `GetOrder` -> `get_order`.
pub fn method_fn(method: &str) -> Ident {
    ident(&method.to_snake_case())
}

/// Rust path of a message type, relative to the module generated for `current_package`,
/// following prost's layout: packages and parent messages become snake_case modules.
/// Returns None when the type is not in the registry.
pub fn rust_type_tokens(
    current_package: &str,
    type_name: &str,
    registry: &MessageRegistry,
) -> Option<TokenStream> {
    let message = registry.get(type_name)?;

    if message.package == "google.protobuf" && message.path.len() == 1 {
        let name = &message.path[0];
        if name == "Empty" {
            return Some(quote! { () });
        }
        let name = ident(&name.to_upper_camel_case());
        return Some(quote! { ::prost_types::#name });
    }

    let current: Vec<&str> = split_package(current_package);
    let target: Vec<&str> = split_package(&message.package);
    let common = current
        .iter()
        .zip(&target)
        .take_while(|(a, b)| a == b)
        .count();

    let supers = (common..current.len()).map(|_| format_ident!("super"));
    let modules = target[common..]
        .iter()
        .map(|segment| ident(&segment.to_snake_case()))
        .chain(
            message.path[..message.path.len() - 1]
                .iter()
                .map(|parent| ident(&parent.to_snake_case())),
        );
    let name = ident(&message.path[message.path.len() - 1].to_upper_camel_case());

    Some(quote! { #(#supers::)* #(#modules::)* #name })
}

fn split_package(package: &str) -> Vec<&str> {
    package.split('.').filter(|s| !s.is_empty()).collect()
}
