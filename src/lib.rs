//! HTTP gateway for Deployment resources.
//!
//! Exposes namespaced CRUD, scale and pod listing over JSON, plus a
//! Server-Sent Events stream that forwards live Deployment changes. The
//! backing store sits behind [`ResourceGateway`]; [`MemoryGateway`] is the
//! bundled implementation.

mod api;
mod config;
pub(crate) mod constants;
mod errors;
mod gateway;
mod metrics;
mod models;
mod server;
pub mod utils;
mod validation;
mod watch;

pub use api::*;
pub use config::*;
pub use errors::*;
pub use gateway::*;
pub use metrics::*;
pub use models::*;
pub use server::*;
pub use validation::*;
pub use watch::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
