//! HTTP surface of the exporter: `/metrics` in the Prometheus text format and
//! a `/healthz` liveness check.

#[macro_use]
extern crate tracing;

pub mod error;
pub mod exposition;
pub mod router;
pub mod server;

pub use router::create_router;
pub use server::{
    serve,
    shutdown_signal,
};
