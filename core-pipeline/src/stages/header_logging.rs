use async_trait::async_trait;
use bridge_traits::redacted_headers;
use tracing::info;

use crate::error::Result;
use crate::pipeline::TARGET;
use crate::response::PipelineResponse;
use crate::stage::{BodyAccess, ResponseStage, StageContract, StageLayer};

/// Logs status and redacted headers. Never touches the body.
#[derive(Debug, Clone)]
pub struct HeaderLoggingStage {
    name: String,
}

impl HeaderLoggingStage {
    pub fn new() -> Self {
        Self::named("header-logger")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for HeaderLoggingStage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResponseStage for HeaderLoggingStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn contract(&self) -> StageContract {
        StageContract::new(StageLayer::Application, BodyAccess::None)
    }

    async fn process(&self, response: &mut PipelineResponse) -> Result<()> {
        info!(
            target: TARGET,
            stage = %self.name,
            url = %response.url,
            status = response.status,
            content_length = ?response.content_length(),
            headers = %redacted_headers(&response.headers),
            "response headers"
        );
        Ok(())
    }
}
