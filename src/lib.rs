//! protoroute binds annotated RPC methods to axum routes.
//!
//! The `codegen` feature provides the `protoc` plugin logic: every RPC method of a service
//! becomes an HTTP route, a handler shim and a method on a service trait. Routing behavior
//! is steered by struct-tag lines in the method's leading comment:
//!
//! ```proto
//! service Order {
//!   // Create places an order.
//!   // `midware:"auth,audit"`
//!   rpc Create(CreateOrderRequest) returns (OrderReply) {
//!     option (google.api.http) = { post: "/orders" body: "*" };
//!   }
//!
//!   // `dynamic:"true"`
//!   rpc Cancel(CancelOrderRequest) returns (OrderReply);
//! }
//! ```
//!
//! The `runtime` feature provides [`rt`], the support code that generated files call into.

#[cfg(feature = "codegen")]
pub mod codegen;
#[cfg(feature = "codegen")]
pub mod error;
#[cfg(feature = "runtime")]
pub mod rt;
#[cfg(feature = "codegen")]
pub mod test_utils;

#[cfg(feature = "codegen")]
pub use error::GenerateError;

/// Version reported by `--version` and stamped into generated file headers.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
