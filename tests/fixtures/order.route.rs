// Code generated by protoc-gen-protoroute 0.1.0. DO NOT EDIT.
// source: shop/order.proto

pub const PATH_ORDER_GET: &str = "/orders/:id";
pub const PATH_ORDER_CREATE: &str = "/orders";
/// OrderHttpServer is the server API for the Order service.
///
/// Order manages orders.
pub trait OrderHttpServer: ::core::marker::Send + ::core::marker::Sync + 'static {
    /// Get fetches an order.
    fn get(
        &self,
        ctx: ::protoroute::rt::Context,
        req: GetOrderRequest,
    ) -> impl ::core::future::Future<
        Output = ::core::result::Result<OrderReply, ::protoroute::rt::Error>,
    > + ::core::marker::Send;
    /// Create places an order.
    fn create(
        &self,
        ctx: ::protoroute::rt::Context,
        req: CreateOrderRequest,
    ) -> impl ::core::future::Future<
        Output = ::core::result::Result<OrderReply, ::protoroute::rt::Error>,
    > + ::core::marker::Send;
}
async fn order_get<S: OrderHttpServer>(
    registry: ::protoroute::rt::ServiceRegistry,
    request: ::protoroute::rt::Request,
) -> ::protoroute::rt::Response {
    let server = match registry.resolve::<S>("shop.v1.Order") {
        ::core::result::Result::Ok(server) => server,
        ::core::result::Result::Err(err) => return ::protoroute::rt::server_error(err),
    };
    let (ctx, req) = match ::protoroute::rt::bind::<
        GetOrderRequest,
    >(request, ::protoroute::rt::Binding::Default)
        .await
    {
        ::core::result::Result::Ok(bound) => bound,
        ::core::result::Result::Err(err) => return ::protoroute::rt::client_error(err),
    };
    match server.get(ctx, req).await {
        ::core::result::Result::Ok(resp) => ::protoroute::rt::success(resp),
        ::core::result::Result::Err(err) => ::protoroute::rt::server_error(err),
    }
}
async fn order_create<S: OrderHttpServer>(
    registry: ::protoroute::rt::ServiceRegistry,
    request: ::protoroute::rt::Request,
) -> ::protoroute::rt::Response {
    let server = match registry.resolve::<S>("shop.v1.Order") {
        ::core::result::Result::Ok(server) => server,
        ::core::result::Result::Err(err) => return ::protoroute::rt::server_error(err),
    };
    let (ctx, req) = match ::protoroute::rt::bind::<
        CreateOrderRequest,
    >(request, ::protoroute::rt::Binding::Default)
        .await
    {
        ::core::result::Result::Ok(bound) => bound,
        ::core::result::Result::Err(err) => return ::protoroute::rt::client_error(err),
    };
    match server.create(ctx, req).await {
        ::core::result::Result::Ok(resp) => ::protoroute::rt::success(resp),
        ::core::result::Result::Err(err) => ::protoroute::rt::server_error(err),
    }
}
/// Registers `server` as the shop.v1.Order service and adds its routes to `router`.
///
/// The routes call whatever implementation is registered under the name when a request
/// arrives, so registering again (on any router, or through `registry.register`) replaces
/// the implementation everywhere. A router takes the routes of a service only once.
/// Concurrent registrations under the same name must be synchronized by the caller.
pub fn register_order_http_server<S: OrderHttpServer>(
    registry: &::protoroute::rt::ServiceRegistry,
    router: ::protoroute::rt::Router,
    server: S,
    a: ::protoroute::rt::Middleware,
    b: ::protoroute::rt::Middleware,
) -> ::protoroute::rt::Router {
    registry.register("shop.v1.Order", server);
    let router = router
        .route(
            PATH_ORDER_GET,
            ::protoroute::rt::on(
                ::protoroute::rt::MethodFilter::GET,
                {
                    let registry = ::core::clone::Clone::clone(registry);
                    move |request: ::protoroute::rt::Request| order_get::<S>(registry, request)
                },
            ),
        );
    let router = router
        .route(
            PATH_ORDER_CREATE,
            b
                .apply(
                    a
                        .apply(
                            ::protoroute::rt::on(
                                ::protoroute::rt::MethodFilter::POST,
                                {
                                    let registry = ::core::clone::Clone::clone(registry);
                                    move |request: ::protoroute::rt::Request| order_create::<
                                        S,
                                    >(registry, request)
                                },
                            ),
                        ),
                ),
        );
    router
}
