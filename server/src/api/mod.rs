//! Tool server API: the request/response envelope (§6), the tool dispatcher
//! that routes onto the facade, and the two transports (stdio, http) that
//! feed it.

pub mod dispatch;
pub mod http;
pub mod routes;
pub mod stdio;

pub use dispatch::{Dispatcher, ToolRequest, wrap_response};
