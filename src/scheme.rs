//! Registry of composed resource kinds this function knows how to emit
//!
//! Registration happens once per process, before the first function run.
//! It is best-effort: a failure is recorded and logged instead of aborting
//! start-up. A kind that never got registered fails to convert with a
//! serialization error, which a function run reports as a fatal result.

use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use kube::core::{ApiResource, GroupVersionKind};
use kube::Resource;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::logging::Logging;
use crate::Error;

/// Errors raised while registering kinds
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemeError {
    /// The kind is already registered with a different resource definition
    #[error("{gvk} is already registered with plural {existing}, refusing {requested}")]
    Conflict {
        /// Group/version/kind being registered, as `group/version, Kind=kind`
        gvk: String,
        /// Plural of the existing registration
        existing: String,
        /// Plural of the rejected registration
        requested: String,
    },
}

/// Kinds that may be converted into composed resources
#[derive(Debug, Default)]
pub struct Scheme {
    kinds: DashMap<GroupVersionKind, ApiResource>,
}

impl Scheme {
    /// Create an empty scheme
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a statically typed kind
    pub fn register<K: Resource<DynamicType = ()>>(&self) -> Result<(), SchemeError> {
        self.register_api_resource(ApiResource::erase::<K>(&()))
    }

    /// Register a kind by its API resource
    ///
    /// Registering the same definition twice is a no-op.
    pub fn register_api_resource(&self, ar: ApiResource) -> Result<(), SchemeError> {
        let gvk = GroupVersionKind::gvk(&ar.group, &ar.version, &ar.kind);

        if let Some(existing) = self.kinds.get(&gvk) {
            if existing.plural != ar.plural {
                return Err(SchemeError::Conflict {
                    gvk: format!("{}, Kind={}", ar.api_version, ar.kind),
                    existing: existing.plural.clone(),
                    requested: ar.plural,
                });
            }
            return Ok(());
        }

        self.kinds.insert(gvk, ar);
        Ok(())
    }

    /// Whether the kind of `K` is registered
    pub fn is_registered<K: Resource<DynamicType = ()>>(&self) -> bool {
        self.kinds.contains_key(&gvk_of::<K>())
    }

    /// Convert a typed object into the JSON form of a composed resource
    ///
    /// The result always carries `apiVersion` and `kind`.
    pub fn to_composed<K>(&self, obj: &K) -> Result<serde_json::Value, Error>
    where
        K: Resource<DynamicType = ()> + Serialize,
    {
        let kind = K::kind(&()).to_string();
        let ar = self
            .kinds
            .get(&gvk_of::<K>())
            .map(|entry| entry.value().clone())
            .ok_or_else(|| {
                Error::serialization_for(
                    &kind,
                    format!("{}, Kind={kind} is not registered", K::api_version(&())),
                )
            })?;

        let mut value = serde_json::to_value(obj)
            .map_err(|e| Error::serialization_for(&kind, format!("cannot encode {kind}: {e}")))?;

        let map = value.as_object_mut().ok_or_else(|| {
            Error::serialization_for(&kind, format!("{kind} did not encode to a JSON object"))
        })?;
        map.insert("apiVersion".to_string(), ar.api_version.into());
        map.insert("kind".to_string(), ar.kind.into());

        Ok(value)
    }
}

fn gvk_of<K: Resource<DynamicType = ()>>() -> GroupVersionKind {
    GroupVersionKind::gvk(&K::group(&()), &K::version(&()), &K::kind(&()))
}

/// Register every kind this function emits
pub fn add_to_scheme(scheme: &Scheme) -> Result<(), SchemeError> {
    scheme.register::<Logging>()
}

/// Recorded outcome of the one-time registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// `Err` when registration failed; the process keeps serving regardless
    pub outcome: Result<(), SchemeError>,
}

impl Registration {
    /// Whether every kind was registered
    pub fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }
}

static SCHEME: OnceLock<Arc<Scheme>> = OnceLock::new();
static REGISTRATION: OnceLock<Registration> = OnceLock::new();

/// The process-wide scheme
pub fn global() -> Arc<Scheme> {
    SCHEME.get_or_init(|| Arc::new(Scheme::new())).clone()
}

/// Register all kinds into the process-wide scheme, once
///
/// Later calls return the outcome of the first one.
pub fn init() -> &'static Registration {
    REGISTRATION.get_or_init(|| {
        let outcome = add_to_scheme(&global());
        match &outcome {
            Ok(()) => debug!("composed resource kinds registered"),
            Err(e) => warn!(
                error = %e,
                "cannot register composed resource kinds; affected kinds will fail to serialize"
            ),
        }
        Registration { outcome }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LoggingSpec;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn sample_logging() -> Logging {
        Logging {
            metadata: ObjectMeta::default(),
            spec: LoggingSpec {
                control_namespace: "team-a".to_string(),
                watch_namespace_selector: None,
            },
        }
    }

    #[test]
    fn registration_is_idempotent() {
        let scheme = Scheme::new();
        assert!(add_to_scheme(&scheme).is_ok());
        assert!(add_to_scheme(&scheme).is_ok());
        assert!(scheme.is_registered::<Logging>());
    }

    #[test]
    fn global_init_runs_once_and_registers_logging() {
        let first = init();
        let second = init();

        assert!(std::ptr::eq(first, second));
        assert!(first.succeeded());
        assert!(global().is_registered::<Logging>());
    }

    #[test]
    fn registered_kind_converts_with_type_meta() {
        let scheme = Scheme::new();
        add_to_scheme(&scheme).unwrap();

        let value = scheme.to_composed(&sample_logging()).unwrap();
        assert_eq!(value["apiVersion"], "logging.banzaicloud.io/v1beta1");
        assert_eq!(value["kind"], "Logging");
        assert_eq!(value["spec"]["controlNamespace"], "team-a");
    }

    #[test]
    fn unregistered_kind_is_a_serialization_error() {
        let err = Scheme::new().to_composed(&sample_logging()).unwrap_err();

        match err {
            Error::Serialization { kind, message } => {
                assert_eq!(kind.as_deref(), Some("Logging"));
                assert!(message.contains("not registered"));
            }
            other => panic!("expected serialization error, got {other:?}"),
        }
    }

    #[test]
    fn conflicting_registration_is_reported_not_replaced() {
        let scheme = Scheme::new();
        let mut conflicting = ApiResource::erase::<Logging>(&());
        conflicting.plural = "loggers".to_string();
        scheme.register_api_resource(conflicting).unwrap();

        let err = add_to_scheme(&scheme).unwrap_err();
        assert!(matches!(err, SchemeError::Conflict { .. }));
        assert!(err.to_string().contains("loggings"));
        assert_eq!(
            scheme.kinds.get(&gvk_of::<Logging>()).unwrap().plural,
            "loggers"
        );
    }
}
