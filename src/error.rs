//! Error types for the logging labeler
//!
//! Every variant maps to one failure category of a function run. Errors are
//! never returned to Crossplane as gRPC status codes; the function turns each
//! one into a single fatal result on the response.

use thiserror::Error;

/// Main error type for function runs
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Function input is missing, malformed, or incomplete
    #[error("config error: {message}")]
    Config {
        /// Description of what's wrong with the input
        message: String,
    },

    /// Observed composite resource is absent or malformed
    #[error("observed state error: {message}")]
    ObservedState {
        /// Description of what's wrong with the observed state
        message: String,
    },

    /// Desired composed resources from earlier pipeline steps are malformed
    #[error("desired state error: {message}")]
    DesiredState {
        /// Description of what's wrong with the desired state
        message: String,
    },

    /// Namespace lookup failed (not found or any transport fault)
    #[error("cannot get namespace {namespace}: {message}")]
    NamespaceNotFound {
        /// Namespace that was requested
        namespace: String,
        /// Underlying cause reported by the provider
        message: String,
    },

    /// The namespace does not carry the configured project label
    #[error("cannot get project id {label} for namespace {namespace}")]
    ProjectIdentifierMissing {
        /// Label key that was expected on the namespace
        label: String,
        /// Namespace that was inspected
        namespace: String,
    },

    /// A resource could not be converted for the response
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// The resource kind being serialized (if known)
        kind: Option<String>,
    },
}

impl Error {
    /// Create a config error with the given message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create an observed state error with the given message
    pub fn observed_state(msg: impl Into<String>) -> Self {
        Self::ObservedState {
            message: msg.into(),
        }
    }

    /// Create a desired state error with the given message
    pub fn desired_state(msg: impl Into<String>) -> Self {
        Self::DesiredState {
            message: msg.into(),
        }
    }

    /// Create a namespace lookup error
    pub fn namespace_not_found(namespace: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::NamespaceNotFound {
            namespace: namespace.into(),
            message: msg.into(),
        }
    }

    /// Create an error for a namespace lacking the project label
    pub fn project_identifier_missing(
        label: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self::ProjectIdentifierMissing {
            label: label.into(),
            namespace: namespace.into(),
        }
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: None,
        }
    }

    /// Create a serialization error for a specific resource kind
    pub fn serialization_for(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==========================================================================
    // Story Tests: What Crossplane sees when a function run fails
    // ==========================================================================
    //
    // The message of each error becomes the message of a fatal result, so it
    // has to name the thing that went wrong.

    /// Story: A composition that forgets the function input gets a config error
    #[test]
    fn story_config_errors_name_the_input_problem() {
        let err = Error::config("namespaceLabel must not be empty");
        assert!(err.to_string().contains("config error"));
        assert!(err.to_string().contains("namespaceLabel"));

        match Error::config("any message") {
            Error::Config { message } => assert_eq!(message, "any message"),
            _ => panic!("Expected Config variant"),
        }
    }

    /// Story: A lookup against a namespace that doesn't exist names the namespace
    #[test]
    fn story_namespace_lookup_failure_names_namespace() {
        let err = Error::namespace_not_found("team-a", "namespaces \"team-a\" not found");
        assert!(err.to_string().starts_with("cannot get namespace team-a"));
        assert!(err.to_string().contains("not found"));
    }

    /// Story: A namespace without the project label is a cluster setup problem
    /// and the message names both the label and the namespace
    #[test]
    fn story_missing_project_label_names_label_and_namespace() {
        let err = Error::project_identifier_missing("example.com/project", "team-a");
        let msg = err.to_string();
        assert!(msg.contains("example.com/project"));
        assert!(msg.contains("team-a"));
    }

    /// Story: Serialization errors keep track of the resource kind when known
    #[test]
    fn story_serialization_errors_carry_kind() {
        match Error::serialization_for("Logging", "kind is not registered") {
            Error::Serialization { kind, message } => {
                assert_eq!(kind.as_deref(), Some("Logging"));
                assert_eq!(message, "kind is not registered");
            }
            _ => panic!("Expected Serialization variant"),
        }

        match Error::serialization("bad value") {
            Error::Serialization { kind, .. } => assert!(kind.is_none()),
            _ => panic!("Expected Serialization variant"),
        }
    }

    /// Story: Envelope errors are distinguishable by category
    #[test]
    fn story_envelope_errors_are_categorized() {
        fn category(err: &Error) -> &'static str {
            match err {
                Error::Config { .. } => "input",
                Error::ObservedState { .. } | Error::DesiredState { .. } => "envelope",
                Error::NamespaceNotFound { .. } => "lookup",
                Error::ProjectIdentifierMissing { .. } => "cluster_config",
                Error::Serialization { .. } => "encoding",
            }
        }

        assert_eq!(category(&Error::observed_state("no composite")), "envelope");
        assert_eq!(category(&Error::desired_state("not an object")), "envelope");
        assert_eq!(
            category(&Error::project_identifier_missing("l", "ns")),
            "cluster_config"
        );
    }
}
