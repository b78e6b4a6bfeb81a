// Route synthesis: resolves every routed method of a service into a RouteSpec, then emits
// path constants, handler shims and the route table from those specs.

use std::collections::{BTreeSet, HashMap};

use proc_macro2::{Ident, TokenStream};
use quote::quote;
use tracing::{debug, warn};

use super::annotation::RouteAnnotation;
use super::http::{HttpInfo, HttpVerb, resolve_http_info, route_shape};
use super::names;
use super::schema::{FieldTags, FileSchema, MessageRegistry, MethodSchema, ServiceSchema};
use super::tags::Tags;
use crate::GenerateError;

/// How the generated handler decodes the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBinding {
    /// Query string or JSON body, plus path parameters.
    Default,
    /// As `Default`, and also fills the listed fields from headers or request attributes.
    Request(Vec<FieldTags>),
}

/// Everything needed to emit one routed method.
#[derive(Debug)]
pub struct RouteSpec<'a> {
    pub method: &'a MethodSchema,
    pub annotation: RouteAnnotation,
    pub http: HttpInfo,
    pub binding: RequestBinding,
    pub input: TokenStream,
    /// None when the method answers with an untyped value (`dynamic_resp`).
    pub output: Option<TokenStream>,
    pub path_const: Ident,
    pub handler: Ident,
    pub method_fn: Ident,
}

/// The routed methods of one service, in declaration order.
#[derive(Debug)]
pub struct ServiceRoutes<'a> {
    pub service: &'a ServiceSchema,
    pub routes: Vec<RouteSpec<'a>>,
    pub middleware: MiddlewareSet,
}

/// Distinct middleware names of a service, always iterated in lexicographic order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MiddlewareSet(BTreeSet<String>);

impl MiddlewareSet {
    pub fn extend<'s>(&mut self, names: impl IntoIterator<Item = &'s String>) {
        self.0.extend(names.into_iter().cloned());
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Routes claimed so far in a file. Follows the router's insertion rules: one handler per
/// verb and route, and every route with a parameter at some position must agree on that
/// parameter (same name, and all `:param` or all `*rest`).
#[derive(Debug, Default)]
pub struct ConflictSet {
    routes: HashMap<(HttpVerb, String), String>,
    // shape of the segments before a parameter -> (parameter, path, method) first seen there
    params: HashMap<String, (String, String, String)>,
}

impl ConflictSet {
    /// Claim `verb path` for `method`. Fails if another method already holds the route, or
    /// holds a route that disagrees with `path` on a parameter.
    pub fn claim(&mut self, verb: HttpVerb, path: &str, method: &str) -> Result<(), GenerateError> {
        let shape = route_shape(path);
        if let Some(first) = self.routes.get(&(verb, shape.clone())) {
            return Err(GenerateError::AnnotationConflict {
                verb: verb.to_string(),
                path: path.to_string(),
                first: first.clone(),
                second: method.to_string(),
            });
        }

        let params = param_positions(path);
        for (prefix, param) in &params {
            if let Some((first_param, first_path, first)) = self.params.get(prefix) {
                if first_param != param {
                    return Err(GenerateError::AnnotationConflict {
                        verb: verb.to_string(),
                        path: format!("{path} (conflicts with {first_path})"),
                        first: first.clone(),
                        second: method.to_string(),
                    });
                }
            }
        }

        self.routes.insert((verb, shape), method.to_string());
        for (prefix, param) in params {
            self.params
                .entry(prefix)
                .or_insert_with(|| (param, path.to_string(), method.to_string()));
        }
        Ok(())
    }
}

// (shape of the preceding segments, parameter segment) for each parameter of `path`
fn param_positions(path: &str) -> Vec<(String, String)> {
    let segments: Vec<&str> = path.split('/').collect();
    segments
        .iter()
        .enumerate()
        .filter(|(_, segment)| segment.starts_with([':', '*']))
        .map(|(i, segment)| (route_shape(&segments[..i].join("/")), segment.to_string()))
        .collect()
}

/// Resolve the routed methods of `service`. Dynamic methods are skipped entirely.
pub fn plan_service<'a>(
    file: &FileSchema,
    service: &'a ServiceSchema,
    registry: &MessageRegistry,
    conflicts: &mut ConflictSet,
) -> Result<ServiceRoutes<'a>, GenerateError> {
    let mut routes = Vec::new();
    let mut middleware = MiddlewareSet::default();

    for method in &service.methods {
        let tags = Tags::from_comment(&method.comment);
        let annotation = RouteAnnotation::from_tags(&tags);
        if annotation.dynamic {
            debug!(method = %method.full_name, "dynamic method, no route");
            continue;
        }
        if method.client_streaming || method.server_streaming {
            warn!(method = %method.full_name, "streaming method is routed as a unary call");
        }

        for name in &annotation.midware {
            if !names::is_identifier(name) {
                return Err(GenerateError::InvalidMiddleware {
                    name: name.clone(),
                    method: method.full_name.clone(),
                });
            }
        }

        let http = resolve_http_info(file, service, method, &tags)?;
        conflicts.claim(http.verb, &http.path, &method.full_name)?;

        let unresolvable = |type_name: &str| GenerateError::UnresolvableType {
            type_name: type_name.to_string(),
            method: method.full_name.clone(),
        };
        let input = names::rust_type_tokens(&file.package, &method.input_type, registry)
            .ok_or_else(|| unresolvable(&method.input_type))?;
        let output = if annotation.dynamic_resp {
            None
        } else {
            Some(
                names::rust_type_tokens(&file.package, &method.output_type, registry)
                    .ok_or_else(|| unresolvable(&method.output_type))?,
            )
        };

        let binding = if registry.has_header_tag(&method.input_type) {
            let fields = registry
                .get(&method.input_type)
                .map(|message| {
                    message
                        .fields
                        .iter()
                        .filter(|f| f.is_request_bound())
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            RequestBinding::Request(fields)
        } else {
            RequestBinding::Default
        };

        debug!(
            method = %method.full_name,
            verb = %http.verb,
            path = %http.path,
            "route resolved"
        );
        middleware.extend(&annotation.midware);
        routes.push(RouteSpec {
            method,
            path_const: names::path_const(&service.name, &method.name),
            handler: names::handler_fn(&service.name, &method.name),
            method_fn: names::method_fn(&method.name),
            annotation,
            http,
            binding,
            input,
            output,
        });
    }

    Ok(ServiceRoutes {
        service,
        routes,
        middleware,
    })
}

/// `pub const PATH_ORDER_GET: &str = "/orders/:id";` for each route.
pub fn path_constants(routes: &ServiceRoutes) -> TokenStream {
    let constants = routes.routes.iter().map(|route| {
        let name = &route.path_const;
        let path = &route.http.path;
        quote! { pub const #name: &str = #path; }
    });
    quote! { #(#constants)* }
}

/// One handler per route: look up the current implementation, bind the request, call it,
/// answer.
pub fn handler_shims(routes: &ServiceRoutes, trait_ident: &Ident, rt: &TokenStream) -> TokenStream {
    let full_name = &routes.service.full_name;
    let shims = routes.routes.iter().map(|route| {
        let handler = &route.handler;
        let method_fn = &route.method_fn;
        let input = &route.input;
        let binding = binding_tokens(&route.binding, rt);
        quote! {
            async fn #handler<S: #trait_ident>(
                registry: #rt::ServiceRegistry,
                request: #rt::Request,
            ) -> #rt::Response {
                let server = match registry.resolve::<S>(#full_name) {
                    ::core::result::Result::Ok(server) => server,
                    ::core::result::Result::Err(err) => return #rt::server_error(err),
                };
                let (ctx, req) = match #rt::bind::<#input>(request, #binding).await {
                    ::core::result::Result::Ok(bound) => bound,
                    ::core::result::Result::Err(err) => return #rt::client_error(err),
                };
                match server.#method_fn(ctx, req).await {
                    ::core::result::Result::Ok(resp) => #rt::success(resp),
                    ::core::result::Result::Err(err) => #rt::server_error(err),
                }
            }
        }
    });
    quote! { #(#shims)* }
}

fn binding_tokens(binding: &RequestBinding, rt: &TokenStream) -> TokenStream {
    match binding {
        RequestBinding::Default => quote! { #rt::Binding::Default },
        RequestBinding::Request(fields) => {
            let sources = fields.iter().flat_map(|field| {
                let name = &field.name;
                let header = field
                    .header
                    .as_ref()
                    .map(|header| quote! { #rt::FieldSource::header(#name, #header) });
                let request = field
                    .request
                    .as_ref()
                    .map(|attr| quote! { #rt::FieldSource::request(#name, #attr) });
                header.into_iter().chain(request)
            });
            quote! { #rt::Binding::Request(&[#(#sources),*]) }
        }
    }
}

/// Route table statements, in declaration order. Expects `router` and `registry` (a
/// `&rt::ServiceRegistry`) in scope, and one `rt::Middleware` binding per middleware name.
pub fn route_table(routes: &ServiceRoutes, rt: &TokenStream) -> Vec<TokenStream> {
    routes
        .routes
        .iter()
        .map(|route| {
            let path_const = &route.path_const;
            let handler = &route.handler;
            let filter = names::ident(route.http.verb.as_str());
            let mut method_router = quote! {
                #rt::on(#rt::MethodFilter::#filter, {
                    let registry = ::core::clone::Clone::clone(registry);
                    move |request: #rt::Request| #handler::<S>(registry, request)
                })
            };
            // first listed middleware runs first, so it is applied last
            for name in route.annotation.midware.iter().rev() {
                let middleware = names::ident(name);
                method_router = quote! { #middleware.apply(#method_router) };
            }
            quote! {
                let router = router.route(#path_const, #method_router);
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::descriptor::FileDescriptorProto;
    use crate::test_utils::{
        FileBuilder, field, get, message, method, order_file, post, service, tagged_field, with_http,
    };

    fn plan(file: &FileDescriptorProto) -> Result<Vec<(String, Vec<String>, Vec<String>)>, GenerateError> {
        let schema = FileSchema::from_descriptor(file);
        let registry = MessageRegistry::from_files(std::slice::from_ref(file));
        let mut conflicts = ConflictSet::default();
        let mut out = Vec::new();
        for service in &schema.services {
            let routes = plan_service(&schema, service, &registry, &mut conflicts)?;
            out.push((
                service.name.clone(),
                routes.routes.iter().map(|r| r.method.name.clone()).collect(),
                routes.middleware.iter().map(str::to_string).collect(),
            ));
        }
        Ok(out)
    }

    #[test]
    fn test_order_service_plan() {
        let planned = plan(&order_file()).unwrap();
        assert_eq!(planned.len(), 1);
        let (name, methods, middleware) = &planned[0];
        assert_eq!(name, "Order");
        assert_eq!(methods, &["Get", "Create"]);
        assert_eq!(middleware, &["a", "b"]);
    }

    #[test]
    fn test_route_table_keeps_declaration_order() {
        let file = FileBuilder::new("z.proto", "z")
            .message(message("Req", &[]))
            .service(service(
                "Z",
                vec![
                    with_http(method("Zeta", ".z.Req", ".z.Req"), get("/z/zeta")),
                    with_http(method("Alpha", ".z.Req", ".z.Req"), get("/z/{alpha}")),
                    with_http(method("Mid", ".z.Req", ".z.Req"), get("/m")),
                ],
            ))
            .build();
        let planned = plan(&file).unwrap();
        assert_eq!(planned[0].1, ["Zeta", "Alpha", "Mid"]);
    }

    #[test]
    fn test_middleware_union_is_sorted_and_deduplicated() {
        let file = FileBuilder::new("m.proto", "m")
            .message(message("Req", &[]))
            .service(service(
                "M",
                vec![
                    method("One", ".m.Req", ".m.Req"),
                    method("Two", ".m.Req", ".m.Req"),
                    method("Three", ".m.Req", ".m.Req"),
                ],
            ))
            .method_comment(0, 0, "`midware:\"zeta,auth\"`")
            .method_comment(0, 1, "`midware:\"auth,cors,zeta\"`")
            .method_comment(0, 2, "`dynamic:\"true\" midware:\"skipped\"`")
            .build();
        let planned = plan(&file).unwrap();
        assert_eq!(planned[0].2, ["auth", "cors", "zeta"]);
    }

    #[test]
    fn test_duplicate_route_is_a_conflict() {
        let file = FileBuilder::new("d.proto", "d")
            .message(message("Req", &[]))
            .service(service(
                "D",
                vec![
                    with_http(method("First", ".d.Req", ".d.Req"), get("/items/{id}")),
                    with_http(method("Second", ".d.Req", ".d.Req"), get("/items/{id}")),
                ],
            ))
            .build();
        match plan(&file) {
            Err(GenerateError::AnnotationConflict { verb, first, second, .. }) => {
                assert_eq!(verb, "GET");
                assert_eq!(first, "d.D.First");
                assert_eq!(second, "d.D.Second");
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn test_same_path_different_verbs_is_fine() {
        let file = FileBuilder::new("d.proto", "d")
            .message(message("Req", &[]))
            .service(service(
                "D",
                vec![
                    with_http(method("Get", ".d.Req", ".d.Req"), get("/items/{id}")),
                    with_http(method("Post", ".d.Req", ".d.Req"), post("/items/{id}")),
                ],
            ))
            .build();
        assert!(plan(&file).is_ok());
    }

    #[test]
    fn test_conflicts_span_services_of_a_file() {
        let file = FileBuilder::new("d.proto", "d")
            .message(message("Req", &[]))
            .service(service("A", vec![with_http(method("Get", ".d.Req", ".d.Req"), get("/items/{id}"))]))
            .service(service("B", vec![with_http(method("Get", ".d.Req", ".d.Req"), get("/items/{name}"))]))
            .build();
        assert!(matches!(plan(&file), Err(GenerateError::AnnotationConflict { .. })));
    }

    #[test]
    fn test_renamed_parameter_with_other_verb_is_a_conflict() {
        let mut conflicts = ConflictSet::default();
        conflicts.claim(HttpVerb::Get, "/items/:id", "a").unwrap();
        let err = conflicts.claim(HttpVerb::Post, "/items/:name", "b").unwrap_err();
        assert!(matches!(err, GenerateError::AnnotationConflict { .. }));
        conflicts.claim(HttpVerb::Post, "/items/:id", "c").unwrap();
    }

    #[test]
    fn test_parameter_disagreements_are_conflicts() {
        let mut conflicts = ConflictSet::default();
        conflicts.claim(HttpVerb::Get, "/files/:id", "a").unwrap();
        let err = conflicts.claim(HttpVerb::Get, "/files/*rest", "b").unwrap_err();
        assert!(matches!(err, GenerateError::AnnotationConflict { .. }));

        // same position, different tails
        conflicts.claim(HttpVerb::Get, "/orders/:id/items", "c").unwrap();
        let err = conflicts.claim(HttpVerb::Put, "/orders/:name/notes", "d").unwrap_err();
        match err {
            GenerateError::AnnotationConflict { path, first, second, .. } => {
                assert_eq!(path, "/orders/:name/notes (conflicts with /orders/:id/items)");
                assert_eq!(first, "c");
                assert_eq!(second, "d");
            }
            other => panic!("expected conflict, got {other:?}"),
        }
        conflicts.claim(HttpVerb::Put, "/orders/:id/notes", "e").unwrap();
        conflicts.claim(HttpVerb::Get, "/orders/latest", "f").unwrap();
    }

    #[test]
    fn test_dynamic_duplicate_is_not_a_conflict() {
        let file = FileBuilder::new("d.proto", "d")
            .message(message("Req", &[]))
            .service(service(
                "D",
                vec![
                    with_http(method("Live", ".d.Req", ".d.Req"), get("/items")),
                    with_http(method("Old", ".d.Req", ".d.Req"), get("/items")),
                ],
            ))
            .method_comment(0, 1, "`dynamic:\"true\"`")
            .build();
        assert_eq!(plan(&file).unwrap()[0].1, ["Live"]);
    }

    #[test]
    fn test_unresolvable_types() {
        let file = FileBuilder::new("u.proto", "u")
            .message(message("Req", &[]))
            .service(service("U", vec![method("Get", ".u.Req", ".u.Missing")]))
            .build();
        match plan(&file) {
            Err(GenerateError::UnresolvableType { type_name, method }) => {
                assert_eq!(type_name, ".u.Missing");
                assert_eq!(method, "u.U.Get");
            }
            other => panic!("expected unresolvable type, got {other:?}"),
        }

        // an opaque response never looks at the declared output type
        let file = FileBuilder::new("u.proto", "u")
            .message(message("Req", &[]))
            .service(service("U", vec![method("Get", ".u.Req", ".u.Missing")]))
            .method_comment(0, 0, "`dynamic_resp:\"true\"`")
            .build();
        assert!(plan(&file).is_ok());
    }

    #[test]
    fn test_invalid_middleware_names() {
        for list in ["auth,", "auth, cors", "rate-limit", "a²"] {
            let file = FileBuilder::new("i.proto", "i")
                .message(message("Req", &[]))
                .service(service("I", vec![method("Get", ".i.Req", ".i.Req")]))
                .method_comment(0, 0, &format!("`midware:\"{list}\"`"))
                .build();
            assert!(
                matches!(plan(&file), Err(GenerateError::InvalidMiddleware { .. })),
                "{list:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_binding_mode_follows_field_tags() {
        let file = FileBuilder::new("h.proto", "h")
            .message(message("Plain", &[field("id")]))
            .message(message(
                "Traced",
                &[field("id"), tagged_field("trace", r#"header:"x-trace-id""#)],
            ))
            .service(service(
                "H",
                vec![
                    with_http(method("A", ".h.Plain", ".h.Plain"), get("/a")),
                    with_http(method("B", ".h.Traced", ".h.Plain"), get("/b")),
                ],
            ))
            .build();
        let schema = FileSchema::from_descriptor(&file);
        let registry = MessageRegistry::from_files(std::slice::from_ref(&file));
        let routes = plan_service(&schema, &schema.services[0], &registry, &mut ConflictSet::default()).unwrap();

        assert_eq!(routes.routes[0].binding, RequestBinding::Default);
        match &routes.routes[1].binding {
            RequestBinding::Request(fields) => {
                assert_eq!(fields.len(), 1);
                assert_eq!(fields[0].name, "trace");
                assert_eq!(fields[0].header.as_deref(), Some("x-trace-id"));
            }
            other => panic!("expected request binding, got {other:?}"),
        }

        let rt = quote! { rt };
        let shims = handler_shims(&routes, &names::trait_name("H", "HttpServer"), &rt).to_string();
        assert!(shims.contains("rt :: Binding :: Default"));
        assert!(shims.contains("rt :: FieldSource :: header (\"trace\" , \"x-trace-id\")"));
    }

    #[test]
    fn test_route_table_wraps_middleware_in_listed_order() {
        let schema = FileSchema::from_descriptor(&order_file());
        let registry = MessageRegistry::from_files(&[order_file()]);
        let routes = plan_service(&schema, &schema.services[0], &registry, &mut ConflictSet::default()).unwrap();
        let table = route_table(&routes, &quote! { rt });
        assert_eq!(table.len(), 2);

        let get = table[0].to_string();
        assert!(get.starts_with("let router = router . route (PATH_ORDER_GET , rt :: on (rt :: MethodFilter :: GET"));
        assert!(!get.contains("apply"));

        // `midware:"b,a"`: b is outermost
        let create = table[1].to_string();
        assert!(create.contains("PATH_ORDER_CREATE , b . apply (a . apply (rt :: on (rt :: MethodFilter :: POST"));
    }
}
