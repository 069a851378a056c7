//! Namespace resolution and label lookup
//!
//! The namespace a Logging is built for comes from the observed composite.
//! Which field it comes from depends on how the function is deployed, see
//! [`NamespaceResolution`]. Its labels are read fresh from the Kubernetes API
//! on every run.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use kube::{Api, Client};
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use crate::request::ObservedComposite;
use crate::{Error, Result};

/// Where the target namespace is read from on the composite
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum NamespaceResolution {
    /// `spec.claimRef.namespace`: the namespace of the claim behind the XR
    #[default]
    ClaimRef,
    /// `metadata.namespace`: the composite's own namespace
    Composite,
}

impl NamespaceResolution {
    /// Resolve the target namespace from the observed composite
    pub fn resolve(&self, xr: &ObservedComposite) -> Result<String> {
        let (namespace, field) = match self {
            Self::ClaimRef => (xr.claim_namespace(), "spec.claimRef.namespace"),
            Self::Composite => (xr.namespace(), "metadata.namespace"),
        };

        match namespace {
            Some(ns) if !ns.is_empty() => Ok(ns.to_string()),
            _ => Err(Error::observed_state(format!(
                "composite resource {} has no {field}",
                xr.name().unwrap_or("<unnamed>")
            ))),
        }
    }
}

impl fmt::Display for NamespaceResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClaimRef => write!(f, "claim-ref"),
            Self::Composite => write!(f, "composite"),
        }
    }
}

/// Read access to namespace labels
///
/// This trait allows swapping the Kubernetes API for a fake in tests.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait NamespaceClient: Send + Sync {
    /// Get the labels of a namespace
    ///
    /// Any failure, including the namespace not existing, is reported as
    /// [`Error::NamespaceNotFound`].
    async fn namespace_labels(&self, name: &str) -> Result<BTreeMap<String, String>>;
}

/// Namespace lookups against the Kubernetes API
pub struct KubeNamespaceClient {
    client: Client,
}

impl KubeNamespaceClient {
    /// Create a new KubeNamespaceClient wrapping the given kube Client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NamespaceClient for KubeNamespaceClient {
    async fn namespace_labels(&self, name: &str) -> Result<BTreeMap<String, String>> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let ns = api
            .get(name)
            .await
            .map_err(|e| Error::namespace_not_found(name, e.to_string()))?;

        let labels = ns.metadata.labels.unwrap_or_default();
        debug!(namespace = %name, labels = labels.len(), "fetched namespace labels");
        Ok(labels)
    }
}

/// Pick the project identifier out of a namespace's labels
pub fn project_identifier(
    labels: &BTreeMap<String, String>,
    label_key: &str,
    namespace: &str,
) -> Result<String> {
    labels
        .get(label_key)
        .cloned()
        .ok_or_else(|| Error::project_identifier_missing(label_key, namespace))
}
