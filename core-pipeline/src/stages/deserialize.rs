use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::any::type_name;
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};
use crate::pipeline::TARGET;
use crate::response::PipelineResponse;
use crate::stage::{BodyAccess, ResponseStage, StageContract, StageLayer};

/// What to do when the body is empty at decode time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyBodyPolicy {
    /// Fail with [`PipelineError::EmptyBody`]
    Strict,
    /// Store the type's default value and log a warning
    Lenient,
}

/// Decodes the JSON body into `T` and attaches it to the response
/// extensions. The buffered body stays on the response.
pub struct DeserializeStage<T> {
    name: String,
    policy: EmptyBodyPolicy,
    fallback: Option<fn() -> T>,
}

impl<T> DeserializeStage<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub fn strict() -> Self {
        Self {
            name: "deserialize".to_string(),
            policy: EmptyBodyPolicy::Strict,
            fallback: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn policy(&self) -> EmptyBodyPolicy {
        self.policy
    }
}

impl<T> DeserializeStage<T>
where
    T: DeserializeOwned + Clone + Default + Send + Sync + 'static,
{
    /// An empty body decodes to `T::default()`.
    ///
    /// This hides data loss from callers; prefer [`strict`](Self::strict)
    /// outside diagnostics.
    pub fn lenient() -> Self {
        Self {
            name: "deserialize".to_string(),
            policy: EmptyBodyPolicy::Lenient,
            fallback: Some(T::default),
        }
    }
}

impl<T> std::fmt::Debug for DeserializeStage<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeserializeStage")
            .field("name", &self.name)
            .field("target", &type_name::<T>())
            .field("policy", &self.policy)
            .finish()
    }
}

#[async_trait]
impl<T> ResponseStage for DeserializeStage<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn contract(&self) -> StageContract {
        StageContract::new(StageLayer::Application, BodyAccess::Consume)
    }

    async fn process(&self, response: &mut PipelineResponse) -> Result<()> {
        let bytes = response.body.buffer().await?;
        let content_length = response.content_length();

        debug!(
            target: TARGET,
            stage = %self.name,
            received_bytes = bytes.len(),
            content_length = ?content_length,
            "decoding response body"
        );

        if let Some(declared) = content_length {
            if declared != bytes.len() as u64 {
                warn!(
                    target: TARGET,
                    stage = %self.name,
                    received_bytes = bytes.len(),
                    content_length = declared,
                    "decoder saw a different body length than the transport declared"
                );
            }
        }

        if bytes.is_empty() {
            let Some(fallback) = self.fallback else {
                return Err(PipelineError::EmptyBody {
                    stage: self.name.clone(),
                    content_length,
                });
            };
            warn!(
                target: TARGET,
                stage = %self.name,
                content_length = ?content_length,
                decoded = type_name::<T>(),
                "empty body; substituting default value"
            );
            response.extensions.insert(fallback());
            return Ok(());
        }

        let value: T = serde_json::from_slice(&bytes).map_err(|source| PipelineError::Decode {
            stage: self.name.clone(),
            source,
        })?;
        response.extensions.insert(value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::Body;
    use http::header::{HeaderValue, CONTENT_LENGTH};
    use http::HeaderMap;
    use serde::Deserialize;

    #[derive(Debug, Clone, Default, Deserialize, PartialEq)]
    struct Items {
        items: Vec<u32>,
    }

    fn response(body: Body) -> PipelineResponse {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("17"));
        PipelineResponse::new("u", 200, headers, body)
    }

    #[tokio::test]
    async fn test_decodes_and_keeps_body() {
        let stage = DeserializeStage::<Items>::strict();
        let mut response = response(Body::chunked(r#"{"items":[1,2,3]}"#, 5));

        stage.process(&mut response).await.unwrap();

        assert_eq!(
            response.decoded::<Items>(),
            Some(&Items {
                items: vec![1, 2, 3]
            })
        );
        assert_eq!(response.body.size_hint(), Some(17));
    }

    #[tokio::test]
    async fn test_strict_rejects_empty_body() {
        let stage = DeserializeStage::<Items>::strict();
        let mut response = response(Body::empty());

        let err = stage.process(&mut response).await.unwrap_err();

        assert!(matches!(
            err,
            PipelineError::EmptyBody {
                content_length: Some(17),
                ..
            }
        ));
        assert!(response.decoded::<Items>().is_none());
    }

    #[tokio::test]
    async fn test_lenient_substitutes_default() {
        let stage = DeserializeStage::<Items>::lenient();
        let mut response = response(Body::empty());

        stage.process(&mut response).await.unwrap();

        assert_eq!(stage.policy(), EmptyBodyPolicy::Lenient);
        assert_eq!(response.decoded::<Items>(), Some(&Items::default()));
    }

    #[tokio::test]
    async fn test_malformed_json_is_decode_error() {
        let stage = DeserializeStage::<Items>::strict().named("items");
        let mut response = response(Body::from(r#"{"items":"#));

        let err = stage.process(&mut response).await.unwrap_err();

        assert!(matches!(err, PipelineError::Decode { ref stage, .. } if stage == "items"));
    }
}
