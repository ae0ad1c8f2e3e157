use async_trait::async_trait;
use bridge_traits::{body_preview, redacted_headers, BodyLogLevel};
use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::pipeline::TARGET;
use crate::response::PipelineResponse;
use crate::stage::{BodyAccess, ResponseStage, StageContract, StageLayer};

const DEFAULT_MAX_BODY_BYTES: usize = 4096;

/// How the stage reads a body that is still streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplayStrategy {
    /// Drain into memory and leave the buffered copy for later stages
    #[default]
    Buffer,
    /// Split the stream; later stages keep streaming while a background
    /// task collects and logs the copy
    Tee,
}

/// Diagnostic body logger that never changes what later stages read.
#[derive(Debug, Clone)]
pub struct BodyLoggingStage {
    name: String,
    level: BodyLogLevel,
    max_body_bytes: usize,
    strategy: ReplayStrategy,
}

impl BodyLoggingStage {
    pub fn new(level: BodyLogLevel) -> Self {
        Self {
            name: "body-logger".to_string(),
            level,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            strategy: ReplayStrategy::default(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    pub fn with_strategy(mut self, strategy: ReplayStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn level(&self) -> BodyLogLevel {
        self.level
    }

    fn log_body(&self, url: &str, content_length: Option<u64>, body: &Bytes) {
        log_body_preview(&self.name, url, content_length, body, self.max_body_bytes);
    }
}

fn log_body_preview(
    stage: &str,
    url: &str,
    content_length: Option<u64>,
    body: &Bytes,
    limit: usize,
) {
    let (preview, truncated) = body_preview(body, limit);
    info!(
        target: TARGET,
        stage,
        url,
        received_bytes = body.len(),
        content_length = ?content_length,
        truncated,
        body = %preview,
        "response body"
    );
}

#[async_trait]
impl ResponseStage for BodyLoggingStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn contract(&self) -> StageContract {
        StageContract::new(StageLayer::Application, BodyAccess::ReadReplay)
    }

    async fn process(&self, response: &mut PipelineResponse) -> Result<()> {
        if !self.level.logs_headers() {
            return Ok(());
        }

        debug!(
            target: TARGET,
            stage = %self.name,
            status = response.status,
            headers = %redacted_headers(&response.headers),
            "response head"
        );

        if !self.level.logs_body() {
            return Ok(());
        }

        let content_length = response.content_length();

        if let Some(bytes) = response.body.as_bytes() {
            self.log_body(&response.url, content_length, bytes);
            return Ok(());
        }

        match self.strategy {
            ReplayStrategy::Buffer => {
                let bytes = response.body.buffer().await?;
                self.log_body(&response.url, content_length, &bytes);
            }
            ReplayStrategy::Tee => {
                let (observer, forward) = response.body.take().tee();
                response.body = forward;

                let stage = self.name.clone();
                let url = response.url.clone();
                let limit = self.max_body_bytes;
                core_async::spawn(async move {
                    match observer.collect().await {
                        Ok(bytes) => log_body_preview(&stage, &url, content_length, &bytes, limit),
                        Err(err) => warn!(
                            target: TARGET,
                            stage = %stage,
                            error = %err,
                            "could not read teed body for logging"
                        ),
                    }
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::Body;
    use http::HeaderMap;

    fn streaming(body: &'static str) -> PipelineResponse {
        PipelineResponse::new("u", 200, HeaderMap::new(), Body::chunked(body, 3))
    }

    #[tokio::test]
    async fn test_buffer_strategy_leaves_replayable_body() {
        let stage = BodyLoggingStage::new(BodyLogLevel::Body);
        let mut response = streaming(r#"{"items":[1,2,3]}"#);

        stage.process(&mut response).await.unwrap();

        assert!(response.body.is_replayable());
        assert_eq!(response.body.size_hint(), Some(17));
    }

    #[tokio::test]
    async fn test_tee_strategy_keeps_stream_intact() {
        let stage = BodyLoggingStage::new(BodyLogLevel::Body).with_strategy(ReplayStrategy::Tee);
        let mut response = streaming(r#"{"items":[1,2,3]}"#);

        stage.process(&mut response).await.unwrap();

        assert!(response.body.is_streaming());
        let bytes = response.body.take().collect().await.unwrap();
        assert_eq!(bytes, Bytes::from_static(br#"{"items":[1,2,3]}"#));
    }

    #[tokio::test]
    async fn test_headers_level_does_not_read_body() {
        for level in [BodyLogLevel::Off, BodyLogLevel::Headers] {
            let stage = BodyLoggingStage::new(level);
            let mut response = streaming("abcdef");

            stage.process(&mut response).await.unwrap();

            assert!(response.body.is_streaming(), "{:?} read the body", level);
        }
    }

    #[test]
    fn test_builder() {
        let stage = BodyLoggingStage::new(BodyLogLevel::Headers)
            .named("wire-body")
            .with_max_body_bytes(16);
        assert_eq!(stage.name(), "wire-body");
        assert_eq!(stage.level(), BodyLogLevel::Headers);
        assert_eq!(stage.contract().body, BodyAccess::ReadReplay);
    }
}
