//! Multi-strategy image creator attribution, exposed as a library and an
//! HTTP API.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(non_camel_case_types)]
#![deny(non_snake_case)]
#![deny(non_upper_case_globals)]
#![forbid(unsafe_op_in_unsafe_fn)]

/// Attribution strategies, pipeline and supporting types.
pub mod attribution;
/// HTTP server and API routes.
pub mod server;
/// Entry helpers to start the attribution server.
pub mod startup;
