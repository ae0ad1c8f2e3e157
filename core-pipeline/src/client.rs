//! Pipeline client
//!
//! Ties a host [`HttpClient`] to a [`ResponsePipeline`]: the engine executes
//! the request (single attempt, transport deadlines applied), then the
//! pipeline runs over the unread body.

use bridge_traits::{HttpClient, HttpRequest, HttpResponse};
use core_runtime::config::CoreConfig;
use std::any::type_name;
use std::sync::Arc;

use crate::error::{PipelineError, Result};
use crate::pipeline::ResponsePipeline;
use crate::response::PipelineResponse;

#[derive(Clone)]
pub struct PipelineClient {
    http: Arc<dyn HttpClient>,
    pipeline: ResponsePipeline,
}

impl std::fmt::Debug for PipelineClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineClient")
            .field("http", &"HttpClient { ... }")
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

impl PipelineClient {
    pub fn new(http: Arc<dyn HttpClient>, pipeline: ResponsePipeline) -> Self {
        Self { http, pipeline }
    }

    /// Use the HTTP adapter configured on `config`.
    pub fn from_config(config: &CoreConfig, pipeline: ResponsePipeline) -> Self {
        Self::new(Arc::clone(&config.http_client), pipeline)
    }

    pub fn pipeline(&self) -> &ResponsePipeline {
        &self.pipeline
    }

    /// Execute `request` and run the pipeline over the response.
    ///
    /// Transport failures, timeouts included, are returned as
    /// [`PipelineError::Bridge`] without running any stage.
    pub async fn send(&self, request: HttpRequest) -> Result<PipelineResponse> {
        let response = self.http.execute_streaming(request).await?;
        self.pipeline.run(response.into()).await
    }

    /// Run the pipeline and deliver the buffered response.
    ///
    /// Fails with [`PipelineError::BodyConsumed`] rather than returning an
    /// empty body when a stage consumed it.
    pub async fn fetch(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut response = self.send(request).await?;
        response.deliver().await
    }

    /// Run the pipeline and return the value its deserialization stage
    /// decoded.
    pub async fn fetch_json<T>(&self, request: HttpRequest) -> Result<T>
    where
        T: Send + Sync + 'static,
    {
        let mut response = self.send(request).await?;
        response.deliver().await?;
        response
            .take_decoded::<T>()
            .ok_or(PipelineError::MissingDecodedValue {
                type_name: type_name::<T>(),
            })
    }
}
