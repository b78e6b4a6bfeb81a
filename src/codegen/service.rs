// Service trait and registration function of one service.

use proc_macro2::{Ident, TokenStream};
use quote::quote;

use super::names;
use super::routes::{ServiceRoutes, route_table};
use super::tags::strip_tag_lines;

// Parameters every registration function takes before its middleware.
pub(crate) const REGISTER_PARAMS: &[&str] = &["registry", "router", "server"];

/// `#[doc = ...]` attributes for a comment, one per line, tag lines removed.
pub fn doc_attrs(comment: &str) -> TokenStream {
    let text = strip_tag_lines(comment);
    let lines = text.lines().map(|line| {
        let line = if line.is_empty() {
            String::new()
        } else {
            format!(" {line}")
        };
        quote! { #[doc = #line] }
    });
    quote! { #(#lines)* }
}

/// The trait an implementation provides: one async method per routed RPC.
pub fn service_trait(routes: &ServiceRoutes, trait_ident: &Ident, rt: &TokenStream) -> TokenStream {
    let service = routes.service;
    let summary = format!(" {trait_ident} is the server API for the {} service.", service.name);
    let service_doc = doc_attrs(&service.comment);
    let separator = (!service_doc.is_empty()).then(|| quote! { #[doc = ""] });

    let methods = routes.routes.iter().map(|route| {
        let doc = doc_attrs(&route.method.comment);
        let method_fn = &route.method_fn;
        let input = &route.input;
        let output = match &route.output {
            Some(output) => output.clone(),
            None => quote! { #rt::DynamicResponse },
        };
        quote! {
            #doc
            fn #method_fn(
                &self,
                ctx: #rt::Context,
                req: #input,
            ) -> impl ::core::future::Future<
                Output = ::core::result::Result<#output, #rt::Error>,
            > + ::core::marker::Send;
        }
    });

    quote! {
        #[doc = #summary]
        #separator
        #service_doc
        pub trait #trait_ident: ::core::marker::Send + ::core::marker::Sync + 'static {
            #(#methods)*
        }
    }
}

/// `register_<service>_<suffix>`: records the implementation in the registry and adds the
/// service's routes to the router. Takes one middleware argument per distinct middleware
/// name, in lexicographic order.
pub fn register_fn(
    routes: &ServiceRoutes,
    trait_ident: &Ident,
    register_ident: &Ident,
    rt: &TokenStream,
) -> TokenStream {
    let service = routes.service;
    let full_name = &service.full_name;
    let doc = format!(
        " Registers `server` as the {full_name} service and adds its routes to `router`.\n\n \
         The routes call whatever implementation is registered under the name when a request\n \
         arrives, so registering again (on any router, or through `registry.register`) replaces\n \
         the implementation everywhere. A router takes the routes of a service only once.\n \
         Concurrent registrations under the same name must be synchronized by the caller."
    );
    let doc = doc.lines().map(|line| quote! { #[doc = #line] });

    let middleware: Vec<Ident> = routes.middleware.iter().map(names::ident).collect();
    let allow = (REGISTER_PARAMS.len() + middleware.len() > 7)
        .then(|| quote! { #[allow(clippy::too_many_arguments)] });

    let table = route_table(routes, rt);

    quote! {
        #(#doc)*
        #allow
        pub fn #register_ident<S: #trait_ident>(
            registry: &#rt::ServiceRegistry,
            router: #rt::Router,
            server: S,
            #(#middleware: #rt::Middleware,)*
        ) -> #rt::Router {
            registry.register(#full_name, server);
            #(#table)*
            router
        }
    }
}
