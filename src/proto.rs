//! gRPC protocol definitions for Crossplane composition functions
//!
//! This module contains the generated Protobuf and gRPC code for the
//! `apiextensions.fn.proto.v1beta1` protocol spoken between Crossplane and a
//! composition function.
//!
//! # Protocol Overview
//!
//! Crossplane calls `RunFunction` once per composite resource reconcile:
//!
//! - Crossplane sends: `RunFunctionRequest` (observed state, desired state
//!   accumulated by earlier pipeline steps, optional function input)
//! - The function returns: `RunFunctionResponse` (updated desired state and
//!   a list of results, any of which may be fatal)
//!
//! # Example
//!
//! ```ignore
//! use logging_labeler::proto::function_runner_service_client::FunctionRunnerServiceClient;
//!
//! let mut client = FunctionRunnerServiceClient::connect("http://127.0.0.1:9443").await?;
//! let rsp = client.run_function(RunFunctionRequest { ... }).await?.into_inner();
//! ```

#![allow(missing_docs)] // Generated code doesn't have docs

/// Generated protobuf and gRPC code for the composition function protocol
pub mod fn_proto {
    /// Version v1beta1 of the function protocol
    pub mod v1beta1 {
        tonic::include_proto!("apiextensions.r#fn.proto.v1beta1");
    }
}

// Re-export commonly used types at the module level for convenience
pub use fn_proto::v1beta1::*;
