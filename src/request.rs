//! Extraction of function input and state from a `RunFunctionRequest`
//!
//! All functions here are pure reads of the request envelope. Each failure is
//! reported with the error category the caller turns into a fatal result.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;

use crate::proto::{Ready, RunFunctionRequest};
use crate::structpb::{from_struct, struct_to_json};
use crate::{Error, Result};

/// The observed composite resource (XR)
#[derive(Clone, Debug, PartialEq)]
pub struct ObservedComposite {
    /// JSON form of the composite resource
    pub resource: serde_json::Value,
}

impl ObservedComposite {
    /// Name of the composite, if set
    pub fn name(&self) -> Option<&str> {
        self.resource.pointer("/metadata/name")?.as_str()
    }

    /// Namespace of the claim that requested this composite, if any
    pub fn claim_namespace(&self) -> Option<&str> {
        self.resource.pointer("/spec/claimRef/namespace")?.as_str()
    }

    /// Namespace of the composite itself, if any
    pub fn namespace(&self) -> Option<&str> {
        self.resource.pointer("/metadata/namespace")?.as_str()
    }
}

/// A composed resource in the desired state
#[derive(Clone, Debug, PartialEq)]
pub struct DesiredComposed {
    /// JSON form of the composed resource
    pub resource: serde_json::Value,
    /// Whether Crossplane should consider the resource ready
    pub ready: Ready,
    /// Connection details carried over from earlier pipeline steps
    pub connection_details: BTreeMap<String, Vec<u8>>,
}

impl DesiredComposed {
    /// Wrap a resource with the given readiness and no connection details
    pub fn new(resource: serde_json::Value, ready: Ready) -> Self {
        Self {
            resource,
            ready,
            connection_details: BTreeMap::new(),
        }
    }
}

/// Decode the function input into `T`
pub fn get_input<T: DeserializeOwned>(req: &RunFunctionRequest) -> Result<T> {
    let input = req
        .input
        .as_ref()
        .ok_or_else(|| Error::config("request has no function input"))?;

    from_struct(input).map_err(|e| Error::config(format!("cannot decode function input: {e}")))
}

/// Get the observed composite resource
pub fn get_observed_composite_resource(
    req: &RunFunctionRequest,
) -> Result<ObservedComposite> {
    let composite = req
        .observed
        .as_ref()
        .and_then(|o| o.composite.as_ref())
        .ok_or_else(|| Error::observed_state("request has no observed composite resource"))?;

    let resource = composite
        .resource
        .as_ref()
        .ok_or_else(|| Error::observed_state("observed composite resource is empty"))?;

    Ok(ObservedComposite {
        resource: struct_to_json(resource),
    })
}

/// Get the desired composed resources accumulated by earlier pipeline steps
///
/// Returns an empty map when no step has produced any yet. An entry without
/// a resource body decodes as an empty object.
pub fn get_desired_composed_resources(
    req: &RunFunctionRequest,
) -> Result<BTreeMap<String, DesiredComposed>> {
    let Some(desired) = req.desired.as_ref() else {
        return Ok(BTreeMap::new());
    };

    desired
        .resources
        .iter()
        .map(|(name, r)| -> Result<(String, DesiredComposed)> {
            let resource = r
                .resource
                .as_ref()
                .map(struct_to_json)
                .unwrap_or_else(|| serde_json::Value::Object(Default::default()));
            let ready = Ready::try_from(r.ready).map_err(|_| {
                Error::desired_state(format!(
                    "desired composed resource {name} has unknown readiness {}",
                    r.ready
                ))
            })?;

            Ok((
                name.clone(),
                DesiredComposed {
                    resource,
                    ready,
                    connection_details: r.connection_details.clone(),
                },
            ))
        })
        .collect()
}
