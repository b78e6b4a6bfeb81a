// Per-file orchestration: plan every service, check the generated names, emit, format.

use std::collections::HashMap;

use proc_macro2::TokenStream;
use quote::quote;
use tracing::debug;

use super::names;
use super::options::Options;
use super::routes::{ConflictSet, ServiceRoutes, handler_shims, path_constants, plan_service};
use super::schema::{FileSchema, MessageRegistry};
use super::service::{REGISTER_PARAMS, register_fn, service_trait};
use crate::{GenerateError, VERSION};

/// One output file of the plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub name: String,
    pub content: String,
}

/// `shop/order.proto` -> `shop/order.route.rs`
pub fn output_name(schema_name: &str, suffix: &str) -> String {
    let stem = schema_name.strip_suffix(".proto").unwrap_or(schema_name);
    format!("{stem}{suffix}")
}

pub fn generate_file(
    file: &FileSchema,
    registry: &MessageRegistry,
    options: &Options,
) -> Result<GeneratedFile, GenerateError> {
    let rt = options.runtime_tokens();

    let mut conflicts = ConflictSet::default();
    let planned = file
        .services
        .iter()
        .map(|service| plan_service(file, service, registry, &mut conflicts))
        .collect::<Result<Vec<_>, _>>()?;
    check_identifiers(&planned, options)?;

    let constants = planned.iter().map(path_constants);
    let services = planned.iter().map(|routes| {
        let trait_ident = names::trait_name(&routes.service.name, &options.server_suffix);
        let register_ident = names::register_fn(&routes.service.name, &options.server_suffix);
        let service_trait = service_trait(routes, &trait_ident, &rt);
        let shims = handler_shims(routes, &trait_ident, &rt);
        let register = register_fn(routes, &trait_ident, &register_ident, &rt);
        quote! {
            #service_trait
            #shims
            #register
        }
    });
    let tokens: TokenStream = quote! {
        #(#constants)*
        #(#services)*
    };

    let syntax_tree: syn::File = syn::parse2(tokens).map_err(|source| GenerateError::Syntax {
        file: file.name.clone(),
        source,
    })?;
    let content = format!("{}{}", header(file), prettyplease::unparse(&syntax_tree));

    let name = output_name(&file.name, &options.suffix);
    debug!(
        file = %name,
        services = planned.len(),
        routes = planned.iter().map(|p| p.routes.len()).sum::<usize>(),
        "generated"
    );
    Ok(GeneratedFile { name, content })
}

// prettyplease drops plain comments, so the header is prepended to the formatted text.
fn header(file: &FileSchema) -> String {
    let mut header = format!(
        "// Code generated by protoc-gen-protoroute {VERSION}. DO NOT EDIT.\n// source: {}\n",
        file.name
    );
    if !file.comment.is_empty() {
        header.push_str("//\n");
        for line in file.comment.lines() {
            if line.is_empty() {
                header.push_str("//\n");
            } else {
                header.push_str(&format!("// {line}\n"));
            }
        }
    }
    header.push('\n');
    header
}

/// Every item name of a file must be unique, and middleware parameters must not shadow the
/// register function's own parameters or the file's items.
fn check_identifiers(planned: &[ServiceRoutes], options: &Options) -> Result<(), GenerateError> {
    let mut items: HashMap<String, String> = HashMap::new();

    for routes in planned {
        let service = &routes.service.full_name;
        let trait_ident = names::trait_name(&routes.service.name, &options.server_suffix);
        let register_ident = names::register_fn(&routes.service.name, &options.server_suffix);
        claim(&mut items, trait_ident.to_string(), service.clone())?;
        claim(&mut items, register_ident.to_string(), service.clone())?;
        for route in &routes.routes {
            let method = &route.method.full_name;
            claim(&mut items, route.path_const.to_string(), method.clone())?;
            claim(&mut items, route.handler.to_string(), method.clone())?;
        }
    }

    for routes in planned {
        let mut trait_methods = HashMap::new();
        for route in &routes.routes {
            claim(
                &mut trait_methods,
                route.method_fn.to_string(),
                route.method.full_name.clone(),
            )?;
        }

        let mut params: HashMap<String, String> = REGISTER_PARAMS
            .iter()
            .map(|param| (param.to_string(), format!("{} registration", routes.service.full_name)))
            .collect();
        for name in routes.middleware.iter() {
            let ident = names::ident(name).to_string();
            let owner = format!("middleware {name} of {}", routes.service.full_name);
            if let Some(item) = items.get(&ident) {
                return Err(GenerateError::IdentifierCollision {
                    ident,
                    first: item.clone(),
                    second: owner,
                });
            }
            claim(&mut params, ident, owner)?;
        }
    }

    Ok(())
}

fn claim(scope: &mut HashMap<String, String>, ident: String, owner: String) -> Result<(), GenerateError> {
    if let Some(first) = scope.get(&ident) {
        return Err(GenerateError::IdentifierCollision {
            ident,
            first: first.clone(),
            second: owner,
        });
    }
    scope.insert(ident, owner);
    Ok(())
}
