//! Logging labeler - Crossplane composition function for per-project logging
//!
//! For every composite resource it is invoked for, the function looks up the
//! namespace of the claim behind the composite, reads a project identifier
//! from one of that namespace's labels, and adds a logging operator `Logging`
//! to the desired state. The Logging's control namespace is the claim's
//! namespace and it only watches namespaces labelled with the same project.
//!
//! # Modules
//!
//! - [`function`] - The function itself and its gRPC service
//! - [`input`] - Function input (`namespaceLabel`)
//! - [`namespace`] - Namespace resolution strategies and label lookup
//! - [`logging`] - The `Logging` resource and its synthesis
//! - [`scheme`] - One-time registration of emitted kinds
//! - [`request`] / [`response`] - Reading requests and building responses
//! - [`structpb`] - `google.protobuf.Struct` <-> JSON conversion
//! - [`proto`] - Generated protocol definitions
//! - [`telemetry`] - Logging setup
//! - [`error`] - Error types

#![deny(missing_docs)]

pub mod error;
pub mod function;
pub mod input;
pub mod logging;
pub mod namespace;
pub mod proto;
pub mod request;
pub mod response;
pub mod scheme;
pub mod structpb;
pub mod telemetry;

pub use error::Error;
pub use function::LoggingLabeler;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Default address for the gRPC server
pub const DEFAULT_ADDRESS: &str = "0.0.0.0:9443";
