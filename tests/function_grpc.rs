//! End-to-end tests driving the function over gRPC
//!
//! A real tonic server is started on a loopback port and called through the
//! generated client, the same way Crossplane calls the function. Namespaces
//! come from an in-memory fake instead of a cluster.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tonic::transport::Channel;

use logging_labeler::input::Input;
use logging_labeler::namespace::{NamespaceClient, NamespaceResolution};
use logging_labeler::proto::function_runner_service_client::FunctionRunnerServiceClient;
use logging_labeler::proto::{
    Ready, RequestMeta, Resource, RunFunctionRequest, RunFunctionResponse, Severity, State,
};
use logging_labeler::structpb::{json_to_struct, struct_to_json, to_struct};
use logging_labeler::{Error, LoggingLabeler};

/// Namespaces held in memory, like a fake clientset
struct FakeNamespaces {
    namespaces: BTreeMap<String, BTreeMap<String, String>>,
}

impl FakeNamespaces {
    fn with(name: &str, labels: &[(&str, &str)]) -> Self {
        let labels = labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            namespaces: BTreeMap::from([(name.to_string(), labels)]),
        }
    }
}

#[async_trait]
impl NamespaceClient for FakeNamespaces {
    async fn namespace_labels(&self, name: &str) -> Result<BTreeMap<String, String>, Error> {
        self.namespaces
            .get(name)
            .cloned()
            .ok_or_else(|| {
                Error::namespace_not_found(name, format!("namespaces \"{name}\" not found"))
            })
    }
}

async fn start_server(
    namespaces: FakeNamespaces,
) -> (
    FunctionRunnerServiceClient<Channel>,
    tokio::task::JoinHandle<()>,
) {
    let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    let actual_addr = listener.local_addr().unwrap();

    let function = LoggingLabeler::new(Arc::new(namespaces), NamespaceResolution::ClaimRef);
    let handle = tokio::spawn(async move {
        tonic::transport::Server::builder()
            .add_service(function.into_service())
            .serve_with_incoming(tokio_stream::wrappers::TcpListenerStream::new(listener))
            .await
            .unwrap();
    });

    // Give server time to start
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let channel = Channel::from_shared(format!("http://{actual_addr}"))
        .unwrap()
        .connect()
        .await
        .unwrap();

    (FunctionRunnerServiceClient::new(channel), handle)
}

fn request(label: &str) -> RunFunctionRequest {
    RunFunctionRequest {
        meta: Some(RequestMeta {
            tag: "hello".to_string(),
        }),
        observed: Some(State {
            composite: Some(Resource {
                resource: Some(
                    json_to_struct(&json!({
                        "apiVersion": "caas.telekom.de/v1alpha1",
                        "kind": "XLogging",
                        "metadata": {"name": "test-logging", "generation": 1},
                        "spec": {
                            "claimRef": {
                                "apiVersion": "caas.telekom.de/v1alpha1",
                                "kind": "Logging",
                                "name": "test-logging",
                                "namespace": "unit-test"
                            }
                        }
                    }))
                    .unwrap(),
                ),
                ..Default::default()
            }),
            ..Default::default()
        }),
        input: Some(to_struct(&Input::new(label)).unwrap()),
        ..Default::default()
    }
}

async fn run(label: &str) -> RunFunctionResponse {
    let (mut client, handle) =
        start_server(FakeNamespaces::with("unit-test", &[("testLabel", "test-project")])).await;

    let rsp = client.run_function(request(label)).await.unwrap().into_inner();
    handle.abort();
    rsp
}

#[tokio::test]
async fn labelled_namespace_produces_logging_over_grpc() {
    let rsp = run("testLabel").await;

    assert!(rsp.results.is_empty(), "unexpected results: {:?}", rsp.results);
    let meta = rsp.meta.unwrap();
    assert_eq!(meta.tag, "hello");
    assert_eq!(meta.ttl.unwrap().seconds, 60);

    let desired = rsp.desired.unwrap();
    assert_eq!(desired.resources.len(), 1);
    let logging = &desired.resources["logging"];
    assert_eq!(logging.ready, Ready::True as i32);
    assert_eq!(
        struct_to_json(logging.resource.as_ref().unwrap()),
        json!({
            "apiVersion": "logging.banzaicloud.io/v1beta1",
            "kind": "Logging",
            "metadata": {},
            "spec": {
                "controlNamespace": "unit-test",
                "watchNamespaceSelector": {
                    "matchLabels": {"testLabel": "test-project"}
                }
            }
        })
    );
}

#[tokio::test]
async fn missing_label_is_fatal_over_grpc() {
    let rsp = run("missingLabel").await;

    assert_eq!(rsp.results.len(), 1);
    assert_eq!(rsp.results[0].severity, Severity::Fatal as i32);
    assert!(rsp
        .desired
        .map(|d| !d.resources.contains_key("logging"))
        .unwrap_or(true));
}

#[tokio::test]
async fn unknown_namespace_is_fatal_over_grpc() {
    let (mut client, handle) =
        start_server(FakeNamespaces::with("other", &[("testLabel", "x")])).await;

    let rsp = client
        .run_function(request("testLabel"))
        .await
        .unwrap()
        .into_inner();
    handle.abort();

    assert_eq!(rsp.results.len(), 1);
    assert_eq!(rsp.results[0].severity, Severity::Fatal as i32);
    assert!(rsp.results[0]
        .message
        .contains("cannot get namespace unit-test"));
    assert!(rsp.desired.is_none());
}
