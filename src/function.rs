//! The logging labeler composition function
//!
//! A run moves through a fixed sequence of stages:
//!
//! ```text
//! Start -> InputResolved -> NamespaceFetched -> LabelExtracted -> Synthesized -> Done
//! ```
//!
//! Any failure jumps straight to a fatal result. The response then carries
//! the desired state exactly as it arrived, plus that one result.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tonic::{Request, Response, Status};
use tracing::{debug, info, instrument, warn};

use crate::input::Input;
use crate::logging;
use crate::namespace::{project_identifier, NamespaceClient, NamespaceResolution};
use crate::proto::function_runner_service_server::{
    FunctionRunnerService, FunctionRunnerServiceServer,
};
use crate::proto::{Ready, RunFunctionRequest, RunFunctionResponse};
use crate::request::{self, DesiredComposed};
use crate::response::{self, DEFAULT_TTL};
use crate::scheme::{self, Scheme};
use crate::Error;

/// Key of the synthesized resource in the desired state
pub const LOGGING_RESOURCE_NAME: &str = "logging";

/// Progress of a single function run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Nothing read yet
    Start,
    /// Input, observed composite and desired resources extracted
    InputResolved,
    /// Namespace labels fetched
    NamespaceFetched,
    /// Project identifier found on the namespace
    LabelExtracted,
    /// Logging built and converted
    Synthesized,
    /// Desired state written to the response
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Start => "Start",
            Self::InputResolved => "InputResolved",
            Self::NamespaceFetched => "NamespaceFetched",
            Self::LabelExtracted => "LabelExtracted",
            Self::Synthesized => "Synthesized",
            Self::Done => "Done",
        };
        write!(f, "{s}")
    }
}

/// A failure together with the last stage reached before it
#[derive(Debug)]
struct StageError {
    stage: Stage,
    error: Error,
}

trait AtStage<T> {
    fn at(self, stage: Stage) -> Result<T, StageError>;
}

impl<T> AtStage<T> for Result<T, Error> {
    fn at(self, stage: Stage) -> Result<T, StageError> {
        self.map_err(|error| StageError { stage, error })
    }
}

/// Composition function deriving a Logging from namespace labels
pub struct LoggingLabeler {
    namespaces: Arc<dyn NamespaceClient>,
    resolution: NamespaceResolution,
    scheme: Arc<Scheme>,
}

impl LoggingLabeler {
    /// Create a function backed by the process-wide scheme
    ///
    /// Registers the scheme if nothing has done so yet.
    pub fn new(namespaces: Arc<dyn NamespaceClient>, resolution: NamespaceResolution) -> Self {
        scheme::init();
        Self::with_scheme(namespaces, resolution, scheme::global())
    }

    /// Create a function backed by the given scheme
    pub fn with_scheme(
        namespaces: Arc<dyn NamespaceClient>,
        resolution: NamespaceResolution,
        scheme: Arc<Scheme>,
    ) -> Self {
        Self {
            namespaces,
            resolution,
            scheme,
        }
    }

    /// Convert to a tonic service
    pub fn into_service(self) -> FunctionRunnerServiceServer<Self> {
        FunctionRunnerServiceServer::new(self)
    }

    /// Run the function
    ///
    /// Never fails: errors become a fatal result on the returned response.
    #[instrument(skip(self, req), fields(tag = req.meta.as_ref().map(|m| m.tag.as_str()).unwrap_or("")))]
    pub async fn run(&self, req: RunFunctionRequest) -> RunFunctionResponse {
        let mut rsp = response::to(&req, DEFAULT_TTL);

        match self.desired_state(&req).await {
            Ok(desired) => {
                info!(desired = ?desired.keys().collect::<Vec<_>>(), "Desired composed resources");
                if let Err(e) = response::set_desired_composed_resources(&mut rsp, &desired) {
                    warn!(stage = %Stage::Synthesized, error = %e, "function run failed");
                    response::fatal(&mut rsp, &e);
                    return rsp;
                }
                debug!(stage = %Stage::Done, "function run complete");
            }
            Err(StageError { stage, error }) => {
                warn!(%stage, error = %error, "function run failed");
                response::fatal(&mut rsp, &error);
            }
        }

        rsp
    }

    /// Compute the desired composed resources, the request's own plus the Logging
    async fn desired_state(
        &self,
        req: &RunFunctionRequest,
    ) -> Result<BTreeMap<String, DesiredComposed>, StageError> {
        let input: Input = request::get_input(req).at(Stage::Start)?;
        input.validate().at(Stage::Start)?;
        let xr = request::get_observed_composite_resource(req).at(Stage::Start)?;
        let mut desired = request::get_desired_composed_resources(req).at(Stage::Start)?;
        debug!(stage = %Stage::InputResolved, label = %input.namespace_label, "input resolved");

        let namespace = self.resolution.resolve(&xr).at(Stage::InputResolved)?;
        let labels = self
            .namespaces
            .namespace_labels(&namespace)
            .await
            .at(Stage::InputResolved)?;
        debug!(stage = %Stage::NamespaceFetched, %namespace, "namespace fetched");

        let project_id = project_identifier(&labels, &input.namespace_label, &namespace)
            .at(Stage::NamespaceFetched)?;
        debug!(stage = %Stage::LabelExtracted, %namespace, %project_id, "project identifier found");

        let logging = logging::synthesize(&namespace, &input.namespace_label, &project_id);
        let resource = self.scheme.to_composed(&logging).at(Stage::LabelExtracted)?;
        debug!(stage = %Stage::Synthesized, "logging synthesized");

        desired.insert(
            LOGGING_RESOURCE_NAME.to_string(),
            DesiredComposed::new(resource, Ready::True),
        );
        Ok(desired)
    }
}

#[tonic::async_trait]
impl FunctionRunnerService for LoggingLabeler {
    async fn run_function(
        &self,
        request: Request<RunFunctionRequest>,
    ) -> Result<Response<RunFunctionResponse>, Status> {
        Ok(Response::new(self.run(request.into_inner()).await))
    }
}
