//! Resource types exchanged with the resource store, and the field-limited
//! projections returned to HTTP clients.
//!
//! The internal types mirror the cluster API wire shape (camelCase JSON) so
//! manifests can be posted verbatim. Clients never see them directly: every
//! response, including watch events, goes through [`DeploymentResponse`] or
//! [`PodResponse`].

mod deployment;
mod manifest;
mod pod;
mod response;
mod status;


pub use deployment::*;
pub use manifest::*;
pub use pod::*;
pub use response::*;
pub use status::*;
