use crate::{
    core::{ClusterLookup, Engine},
    k8s::{Pod, ResourceExt},
    metrics::{AdmissionMetrics, Outcome},
};
use futures::future;
use http_body_util::BodyExt;
use hyper::{http, Request, Response};
use kube::{
    core::{admission::Operation, dynamic::ParseDynamicObjectError, DynamicObject},
    Resource,
};
use std::fmt;
use thiserror::Error;
use tokio::time::{self, Duration, Instant};
use tracing::{debug, info, info_span, trace, warn, Instrument};

/// Serves the mutating webhook for pod creations.
pub struct Admission<L: ?Sized> {
    engine: Engine<L>,
    timeout: Duration,
    metrics: AdmissionMetrics,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read request body: {0}")]
    Request(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("failed to encode json response: {0}")]
    Json(#[from] serde_json::Error),
}

type Review = kube::core::admission::AdmissionReview<DynamicObject>;
type AdmissionRequest = kube::core::admission::AdmissionRequest<DynamicObject>;
type AdmissionResponse = kube::core::admission::AdmissionResponse;
type AdmissionReview = kube::core::admission::AdmissionReview<DynamicObject>;

type Body = http_body_util::Full<bytes::Bytes>;

// === impl Admission ===

impl<L: ?Sized> Clone for Admission<L> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            timeout: self.timeout,
            metrics: self.metrics.clone(),
        }
    }
}

impl<L, B> tower::Service<Request<B>> for Admission<L>
where
    L: ClusterLookup + ?Sized + 'static,
    B: hyper::body::Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    type Response = Response<Body>;
    type Error = Error;
    type Future = future::BoxFuture<'static, Result<Response<Body>, Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        trace!(method = %req.method(), uri = %req.uri());
        if req.method() != http::Method::POST || req.uri().path() != "/" {
            return Box::pin(future::ok(
                Response::builder()
                    .status(http::StatusCode::NOT_FOUND)
                    .body(Body::default())
                    .expect("not found response must be valid"),
            ));
        }

        let admission = self.clone();
        Box::pin(async move {
            use bytes::Buf;
            let bytes = req
                .into_body()
                .collect()
                .await
                .map_err(|e| Error::Request(e.into()))?
                .to_bytes();
            let review: Review = match serde_json::from_reader(bytes.reader()) {
                Ok(review) => review,
                Err(error) => {
                    warn!(%error, "Failed to parse request body");
                    admission.metrics.observe(Outcome::Invalid);
                    return json_response(AdmissionResponse::invalid(error).into_review());
                }
            };

            let rsp = match review.try_into() {
                Ok(req) => admission.admit(req).await,
                Err(error) => {
                    warn!(%error, "Invalid admission request");
                    admission.metrics.observe(Outcome::Invalid);
                    AdmissionResponse::invalid(error)
                }
            };
            debug!(allowed = rsp.allowed);
            json_response(rsp.into_review())
        })
    }
}

impl<L: ClusterLookup + ?Sized> Admission<L> {
    pub fn new(engine: Engine<L>, timeout: Duration, metrics: AdmissionMetrics) -> Self {
        Self {
            engine,
            timeout,
            metrics,
        }
    }

    async fn admit(self, req: AdmissionRequest) -> AdmissionResponse {
        let rsp = AdmissionResponse::from(&req);

        if req.operation != Operation::Create || !is_kind::<Pod>(&req) {
            trace!(operation = ?req.operation, kind = %req.kind.kind, "Skipped");
            self.metrics.observe(Outcome::Skipped);
            return rsp;
        }

        let pod = match parse_pod(&req) {
            Ok(pod) => pod,
            Err(error) => {
                info!(%error, "Failed to parse Pod");
                self.metrics.observe(Outcome::Error);
                return rsp.deny(error);
            }
        };

        let ns = pod.namespace().unwrap_or_default();
        let name = pod_name(&req, &pod);
        let span = info_span!("admit", %ns, %name);
        self.mutate(rsp, pod).instrument(span).await
    }

    async fn mutate(&self, rsp: AdmissionResponse, pod: Pod) -> AdmissionResponse {
        let start = Instant::now();
        let decision = time::timeout(self.timeout, self.engine.decide(&pod)).await;
        self.metrics.observe_decision(start);

        let patch = match decision {
            Ok(Ok(patch)) => patch,
            Ok(Err(error)) => {
                warn!(%error, "Failed to decide on init containers");
                self.metrics.observe(Outcome::Error);
                return rsp.deny(error);
            }
            Err(_) => {
                warn!(timeout = ?self.timeout, "Decision timed out");
                self.metrics.observe(Outcome::Error);
                return rsp.deny(format_args!(
                    "decision did not complete within {:?}",
                    self.timeout
                ));
            }
        };

        let Some(patch) = patch else {
            debug!("No init containers injected");
            self.metrics.observe(Outcome::Unchanged);
            return rsp;
        };

        let deny = rsp.clone();
        match rsp.with_patch(patch) {
            Ok(rsp) => {
                info!("Injected init containers");
                self.metrics.observe(Outcome::Patched);
                rsp
            }
            Err(error) => {
                warn!(%error, "Failed to encode patch");
                self.metrics.observe(Outcome::Error);
                deny.deny(error)
            }
        }
    }
}

fn is_kind<T>(req: &AdmissionRequest) -> bool
where
    T: Resource,
    T::DynamicType: Default,
{
    let dt = Default::default();
    req.kind.group.eq_ignore_ascii_case(&T::group(&dt))
        && req.kind.kind.eq_ignore_ascii_case(&T::kind(&dt))
}

/// Decodes the pod and stamps it with the request's namespace, which the
/// API server may omit from the object on creation.
fn parse_pod(req: &AdmissionRequest) -> Result<Pod, ParseError> {
    let obj = req.object.clone().ok_or(ParseError::MissingObject)?;
    let mut pod = obj.try_parse::<Pod>()?;
    pod.metadata.namespace = req.namespace.clone();
    Ok(pod)
}

/// Pods created through a controller often carry only `generateName`.
fn pod_name(req: &AdmissionRequest, pod: &Pod) -> String {
    if req.name.is_empty() {
        return pod.name_any();
    }
    req.name.clone()
}

#[derive(Debug, Error)]
enum ParseError {
    #[error("admission request missing 'object'")]
    MissingObject,

    #[error("invalid Pod: {0}")]
    Pod(#[from] ParseDynamicObjectError),
}

fn json_response(rsp: AdmissionReview) -> Result<Response<Body>, Error> {
    let bytes = serde_json::to_vec(&rsp)?;
    Ok(Response::builder()
        .status(http::StatusCode::OK)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Body::from(bytes))
        .expect("admission review response must be valid"))
}

impl<L: ?Sized> fmt::Debug for Admission<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Admission")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
