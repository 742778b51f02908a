//! Net module - the wire protocol and the TCP front end.

pub mod protocol;
pub mod server;

pub use server::{run_server, ServerConfig};
