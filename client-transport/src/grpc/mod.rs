//! gRPC client support.
//!
//! [`GrpcInterceptor`] wraps unary calls of generated clients;
//! [`GrpcClient`] pairs it with a lazily connected channel.

mod channel;
mod interceptor;

pub use channel::GrpcClient;
pub use interceptor::{GRPC_METHOD_LABEL, GrpcInterceptor, code_label};
