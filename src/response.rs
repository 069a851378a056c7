//! Construction of `RunFunctionResponse`s

use std::collections::BTreeMap;
use std::time::Duration;

use crate::proto::{
    Resource, ResponseMeta, Result as FnResult, RunFunctionRequest, RunFunctionResponse, Severity,
    State,
};
use crate::request::DesiredComposed;
use crate::structpb::json_to_struct;
use crate::{Error, Result};

/// How long Crossplane may cache a response
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Start a response to the given request
///
/// The tag is echoed back and the desired state and context are carried over
/// unchanged, so a response that is only marked fatal leaves the pipeline's
/// desired state exactly as it arrived.
pub fn to(req: &RunFunctionRequest, ttl: Duration) -> RunFunctionResponse {
    RunFunctionResponse {
        meta: Some(ResponseMeta {
            tag: req.meta.as_ref().map(|m| m.tag.clone()).unwrap_or_default(),
            ttl: Some(duration_to_proto(ttl)),
        }),
        desired: req.desired.clone(),
        results: Vec::new(),
        context: req.context.clone(),
    }
}

/// Append a fatal result carrying the error's message
pub fn fatal(rsp: &mut RunFunctionResponse, err: &Error) {
    rsp.results.push(FnResult {
        severity: Severity::Fatal as i32,
        message: err.to_string(),
    });
}

/// Whether any result on the response is fatal
pub fn is_fatal(rsp: &RunFunctionResponse) -> bool {
    rsp.results
        .iter()
        .any(|r| r.severity == Severity::Fatal as i32)
}

/// Replace the desired composed resources on the response
///
/// The desired composite is left untouched.
pub fn set_desired_composed_resources(
    rsp: &mut RunFunctionResponse,
    desired: &BTreeMap<String, DesiredComposed>,
) -> Result<()> {
    let resources = desired
        .iter()
        .map(|(name, dc)| -> Result<(String, Resource)> {
            let resource = json_to_struct(&dc.resource).map_err(|e| {
                Error::serialization(format!("cannot encode desired composed resource {name}: {e}"))
            })?;
            Ok((
                name.clone(),
                Resource {
                    resource: Some(resource),
                    connection_details: dc.connection_details.clone(),
                    ready: dc.ready as i32,
                },
            ))
        })
        .collect::<Result<BTreeMap<_, _>>>()?;

    rsp.desired.get_or_insert_with(State::default).resources = resources;
    Ok(())
}

fn duration_to_proto(d: Duration) -> prost_types::Duration {
    prost_types::Duration {
        seconds: d.as_secs() as i64,
        nanos: d.subsec_nanos() as i32,
    }
}
