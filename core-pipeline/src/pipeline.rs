//! # Response Pipeline
//!
//! An explicitly declared, ordered list of [`ResponseStage`]s.
//!
//! ## Overview
//!
//! Registration order is the execution order; there is no priority or
//! implicit sorting. [`ResponsePipelineBuilder::build`] checks the declared
//! order against each stage's [`StageContract`](crate::stage::StageContract):
//!
//! - transport stages come before every application stage
//! - no stage reads the body without replaying it, since delivery to the
//!   caller always reads the body after the last stage
//!
//! Transport stages run on a body the pipeline has already buffered.
//!
//! ## Usage
//!
//! ```ignore
//! use core_pipeline::{BodyLoggingStage, DeserializeStage, HeaderLoggingStage, ResponsePipeline};
//!
//! let pipeline = ResponsePipeline::builder()
//!     .stage(HeaderLoggingStage::new())
//!     .stage(BodyLoggingStage::new(BodyLogLevel::Body))
//!     .stage(DeserializeStage::<Items>::strict())
//!     .build()?;
//!
//! let response = pipeline.run(streaming.into()).await?;
//! ```

use bridge_traits::HttpClientConfig;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};
use crate::response::{PipelineResponse, StageObservation};
use crate::stage::{ResponseStage, StageLayer};
use crate::stages::{BodyLoggingStage, DeserializeStage, HeaderLoggingStage};

pub(crate) const TARGET: &str = "http_pipeline";

/// Reader name reported when the caller is the one left with an empty body.
pub const DELIVERY: &str = "delivery";

/// Validated, immutable stage list. Cheap to share across requests.
#[derive(Clone)]
pub struct ResponsePipeline {
    stages: Vec<Arc<dyn ResponseStage>>,
}

impl std::fmt::Debug for ResponsePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponsePipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

impl ResponsePipeline {
    pub fn builder() -> ResponsePipelineBuilder {
        ResponsePipelineBuilder::default()
    }

    /// Header log, body log and strict JSON decoding into `T`, with body
    /// logging verbosity taken from the transport config.
    pub fn json<T>(config: &HttpClientConfig) -> Result<Self>
    where
        T: DeserializeOwned + Clone + Send + Sync + 'static,
    {
        Self::builder()
            .stage(HeaderLoggingStage::new())
            .stage(
                BodyLoggingStage::new(config.body_log_level)
                    .with_max_body_bytes(config.max_logged_body_bytes),
            )
            .stage(DeserializeStage::<T>::strict())
            .build()
    }

    /// Stage names in execution order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage in declared order.
    ///
    /// The first stage error aborts the run and is returned wrapped in
    /// [`PipelineError::Stage`].
    pub async fn run(&self, mut response: PipelineResponse) -> Result<PipelineResponse> {
        debug!(
            target: TARGET,
            url = %response.url,
            status = response.status,
            stages = self.stages.len(),
            "running response pipeline"
        );

        for stage in &self.stages {
            let name = stage.name();
            let contract = stage.contract();

            if contract.layer == StageLayer::Transport && !response.body.is_replayable() {
                let buffered = response.body.buffer().await?;
                debug!(
                    target: TARGET,
                    stage = name,
                    bytes = buffered.len(),
                    "buffered body for transport stage"
                );
            }

            let bytes_before = response.body.size_hint();
            let consumed_before = response.body.is_consumed();
            let headers_before = (!contract.mutates_headers).then(|| response.headers.clone());

            stage
                .process(&mut response)
                .await
                .map_err(|source| PipelineError::Stage {
                    stage: name.to_string(),
                    source: Box::new(source),
                })?;

            let observation = StageObservation {
                stage: name.to_string(),
                access: contract.body,
                bytes_before,
                bytes_after: response.body.size_hint(),
                consumed: !consumed_before && response.body.is_consumed(),
            };

            debug!(
                target: TARGET,
                stage = name,
                access = %contract.body,
                bytes_before = ?observation.bytes_before,
                bytes_after = ?observation.bytes_after,
                "stage complete"
            );

            if observation.emptied_body() {
                warn!(
                    target: TARGET,
                    stage = name,
                    access = %contract.body,
                    url = %response.url,
                    content_length = ?response.content_length(),
                    bytes_before = ?observation.bytes_before,
                    "stage left the response body empty; later stages see Content-Length: 0"
                );
            }

            if let Some(before) = headers_before {
                if before != response.headers {
                    warn!(
                        target: TARGET,
                        stage = name,
                        "stage changed headers without declaring header mutation"
                    );
                }
            }

            response.record(observation)?;
        }

        Ok(response)
    }
}

#[derive(Default)]
pub struct ResponsePipelineBuilder {
    stages: Vec<Arc<dyn ResponseStage>>,
}

impl ResponsePipelineBuilder {
    /// Append a stage; it runs after every stage added before it.
    pub fn stage<S: ResponseStage + 'static>(mut self, stage: S) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    pub fn shared_stage(mut self, stage: Arc<dyn ResponseStage>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Validate the declared order and freeze the pipeline.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::DuplicateStage`] when two stages share a name
    /// - [`PipelineError::LayerOrdering`] when a transport stage follows an
    ///   application stage
    /// - [`PipelineError::UnsafeOrdering`] for any `ReadDiscard` stage; the
    ///   consumer is the next stage that reads the body, or [`DELIVERY`]
    pub fn build(self) -> Result<ResponsePipeline> {
        validate_order(&self.stages)?;
        Ok(ResponsePipeline {
            stages: self.stages,
        })
    }

    /// Freeze the pipeline without validation.
    ///
    /// Only for reproducing the empty-body failure in diagnostics and tests.
    pub fn build_unchecked(self) -> ResponsePipeline {
        ResponsePipeline {
            stages: self.stages,
        }
    }
}

fn validate_order(stages: &[Arc<dyn ResponseStage>]) -> Result<()> {
    let mut seen = HashSet::new();
    for stage in stages {
        if !seen.insert(stage.name()) {
            return Err(PipelineError::DuplicateStage(stage.name().to_string()));
        }
    }

    let mut application = None;
    for stage in stages {
        match (stage.contract().layer, application) {
            (StageLayer::Application, None) => application = Some(stage.name()),
            (StageLayer::Transport, Some(earlier)) => {
                return Err(PipelineError::LayerOrdering {
                    transport: stage.name().to_string(),
                    application: earlier.to_string(),
                });
            }
            _ => {}
        }
    }

    let discarding = stages
        .iter()
        .position(|stage| stage.contract().body.is_destructive());
    if let Some(index) = discarding {
        let consumer = stages[index + 1..]
            .iter()
            .find(|later| later.contract().body.reads_body())
            .map_or(DELIVERY, |later| later.name());
        return Err(PipelineError::UnsafeOrdering {
            reader: stages[index].name().to_string(),
            consumer: consumer.to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::{BodyAccess, StageContract, StageLayer};
    use async_trait::async_trait;
    use bridge_traits::Body;
    use http::HeaderMap;

    struct Fixed {
        name: &'static str,
        contract: StageContract,
    }

    impl Fixed {
        fn new(name: &'static str, layer: StageLayer, body: BodyAccess) -> Self {
            Self {
                name,
                contract: StageContract::new(layer, body),
            }
        }
    }

    #[async_trait]
    impl ResponseStage for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn contract(&self) -> StageContract {
            self.contract
        }

        async fn process(&self, response: &mut PipelineResponse) -> Result<()> {
            match self.contract.body {
                BodyAccess::ReadDiscard => {
                    response.body.take().collect().await?;
                }
                BodyAccess::ReadReplay | BodyAccess::Consume => {
                    response.body.buffer().await?;
                }
                BodyAccess::None => {}
            }
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl ResponseStage for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn contract(&self) -> StageContract {
            StageContract::new(StageLayer::Application, BodyAccess::None)
        }

        async fn process(&self, _response: &mut PipelineResponse) -> Result<()> {
            Err(PipelineError::MissingDecodedValue { type_name: "u8" })
        }
    }

    fn response(body: &'static str) -> PipelineResponse {
        PipelineResponse::new("https://example.com", 200, HeaderMap::new(), Body::chunked(body, 4))
    }

    #[test]
    fn test_stage_names_follow_registration_order() {
        let pipeline = ResponsePipeline::builder()
            .stage(Fixed::new("b", StageLayer::Application, BodyAccess::None))
            .stage(Fixed::new("a", StageLayer::Application, BodyAccess::ReadReplay))
            .build()
            .unwrap();

        assert_eq!(pipeline.stage_names(), vec!["b", "a"]);
        assert_eq!(pipeline.len(), 2);
    }

    #[test]
    fn test_discarding_reader_before_consumer_rejected() {
        let result = ResponsePipeline::builder()
            .stage(Fixed::new("peek", StageLayer::Application, BodyAccess::ReadDiscard))
            .stage(Fixed::new("headers", StageLayer::Application, BodyAccess::None))
            .stage(Fixed::new("decode", StageLayer::Application, BodyAccess::Consume))
            .build();

        match result {
            Err(PipelineError::UnsafeOrdering { reader, consumer }) => {
                assert_eq!(reader, "peek");
                assert_eq!(consumer, "decode");
            }
            other => panic!("expected UnsafeOrdering, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_transport_layer_discard_still_rejected() {
        let result = ResponsePipeline::builder()
            .stage(Fixed::new("wire", StageLayer::Transport, BodyAccess::ReadDiscard))
            .stage(Fixed::new("log", StageLayer::Application, BodyAccess::ReadReplay))
            .build();

        assert!(matches!(result, Err(PipelineError::UnsafeOrdering { .. })));
    }

    #[test]
    fn test_discarding_reader_last_starves_delivery() {
        let result = ResponsePipeline::builder()
            .stage(Fixed::new("decode", StageLayer::Application, BodyAccess::Consume))
            .stage(Fixed::new("headers", StageLayer::Application, BodyAccess::None))
            .stage(Fixed::new("drain", StageLayer::Application, BodyAccess::ReadDiscard))
            .build();

        match result {
            Err(PipelineError::UnsafeOrdering { reader, consumer }) => {
                assert_eq!(reader, "drain");
                assert_eq!(consumer, DELIVERY);
            }
            other => panic!("expected UnsafeOrdering, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_transport_after_application_rejected() {
        let result = ResponsePipeline::builder()
            .stage(Fixed::new("decode", StageLayer::Application, BodyAccess::Consume))
            .stage(Fixed::new("log", StageLayer::Application, BodyAccess::ReadReplay))
            .stage(Fixed::new("wire-log", StageLayer::Transport, BodyAccess::ReadReplay))
            .build();

        match result {
            Err(PipelineError::LayerOrdering {
                transport,
                application,
            }) => {
                assert_eq!(transport, "wire-log");
                assert_eq!(application, "decode");
            }
            other => panic!("expected LayerOrdering, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_transport_before_application_accepted() {
        let pipeline = ResponsePipeline::builder()
            .stage(Fixed::new("wire-log", StageLayer::Transport, BodyAccess::ReadReplay))
            .stage(Fixed::new("headers", StageLayer::Transport, BodyAccess::None))
            .stage(Fixed::new("decode", StageLayer::Application, BodyAccess::Consume))
            .build()
            .unwrap();

        assert_eq!(pipeline.stage_names(), vec!["wire-log", "headers", "decode"]);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = ResponsePipeline::builder()
            .stage(Fixed::new("log", StageLayer::Application, BodyAccess::None))
            .stage(Fixed::new("log", StageLayer::Application, BodyAccess::ReadReplay))
            .build();

        assert!(matches!(result, Err(PipelineError::DuplicateStage(name)) if name == "log"));
    }

    #[tokio::test]
    async fn test_run_records_observations() {
        let pipeline = ResponsePipeline::builder()
            .stage(Fixed::new("headers", StageLayer::Application, BodyAccess::None))
            .stage(Fixed::new("replay", StageLayer::Application, BodyAccess::ReadReplay))
            .build()
            .unwrap();

        let response = pipeline.run(response("hello world")).await.unwrap();

        let trace = response.trace();
        assert_eq!(trace.len(), 2);
        assert_eq!(trace[0].bytes_before, None);
        assert_eq!(trace[1].bytes_after, Some(11));
        assert!(trace.iter().all(|obs| !obs.emptied_body()));
    }

    #[tokio::test]
    async fn test_unchecked_run_traces_emptied_body() {
        let pipeline = ResponsePipeline::builder()
            .stage(Fixed::new("drain", StageLayer::Application, BodyAccess::ReadDiscard))
            .stage(Fixed::new("replay", StageLayer::Application, BodyAccess::ReadReplay))
            .build_unchecked();

        let mut response = pipeline.run(response("hello world")).await.unwrap();

        assert!(response.trace()[0].emptied_body());
        assert_eq!(response.trace()[1].bytes_after, Some(0));
        assert!(matches!(
            response.deliver().await,
            Err(PipelineError::BodyConsumed { stage, .. }) if stage == "drain"
        ));
    }

    #[tokio::test]
    async fn test_transport_stage_sees_buffered_body() {
        struct AssertBuffered;

        #[async_trait]
        impl ResponseStage for AssertBuffered {
            fn name(&self) -> &str {
                "wire"
            }

            fn contract(&self) -> StageContract {
                StageContract::new(StageLayer::Transport, BodyAccess::None)
            }

            async fn process(&self, response: &mut PipelineResponse) -> Result<()> {
                assert!(response.body.is_replayable());
                Ok(())
            }
        }

        let pipeline = ResponsePipeline::builder()
            .stage(AssertBuffered)
            .build()
            .unwrap();

        let response = pipeline.run(response("hello world")).await.unwrap();
        assert_eq!(response.trace()[0].bytes_before, Some(11));
        assert_eq!(response.trace()[0].bytes_after, Some(11));
    }

    #[tokio::test]
    async fn test_stage_error_aborts_and_names_stage() {
        let pipeline = ResponsePipeline::builder()
            .stage(Failing)
            .stage(Fixed::new("never", StageLayer::Application, BodyAccess::ReadReplay))
            .build()
            .unwrap();

        let err = pipeline.run(response("x")).await.unwrap_err();
        assert_eq!(err.stage(), Some("failing"));
        assert!(matches!(
            err.root(),
            PipelineError::MissingDecodedValue { .. }
        ));
    }
}
