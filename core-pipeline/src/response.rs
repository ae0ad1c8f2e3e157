//! # Response State Machine
//!
//! An in-flight response as it moves through the pipeline.
//!
//! ```text
//! Received → Observed { stages: 1 } → ... → Observed { stages: N } → Delivered
//!     └──────────────────────────────────────────────────────────────↑
//! ```
//!
//! Transitions only move forward. Every stage that runs appends a
//! [`StageObservation`], so a body that shrank to nothing can be traced back
//! to the stage that emptied it.

use bridge_traits::{Body, HttpResponse, StreamingResponse};
use http::{Extensions, HeaderMap};
use std::fmt;

use crate::error::{PipelineError, Result};
use crate::stage::BodyAccess;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponsePhase {
    /// Status and headers received, no stage has run
    Received,
    /// Seen by `stages` stages so far
    Observed { stages: usize },
    /// Handed to the caller
    Delivered,
}

impl fmt::Display for ResponsePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponsePhase::Received => f.write_str("received"),
            ResponsePhase::Observed { stages } => write!(f, "observed({})", stages),
            ResponsePhase::Delivered => f.write_str("delivered"),
        }
    }
}

/// What one stage did to the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageObservation {
    pub stage: String,
    pub access: BodyAccess,
    /// Known body length before the stage ran; `None` while still streaming
    pub bytes_before: Option<usize>,
    pub bytes_after: Option<usize>,
    /// The stage left the body consumed
    pub consumed: bool,
}

impl StageObservation {
    /// The stage turned a readable body into an empty one.
    pub fn emptied_body(&self) -> bool {
        if self.consumed {
            return true;
        }
        matches!(
            (self.bytes_before, self.bytes_after),
            (Some(before), Some(0)) if before > 0
        )
    }
}

#[derive(Debug)]
pub struct PipelineResponse {
    pub url: String,
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Body,
    /// Typed values attached by stages, such as a decoded body
    pub extensions: Extensions,
    phase: ResponsePhase,
    trace: Vec<StageObservation>,
}

impl PipelineResponse {
    pub fn new(url: impl Into<String>, status: u16, headers: HeaderMap, body: Body) -> Self {
        Self {
            url: url.into(),
            status,
            headers,
            body,
            extensions: Extensions::new(),
            phase: ResponsePhase::Received,
            trace: Vec::new(),
        }
    }

    pub fn phase(&self) -> ResponsePhase {
        self.phase
    }

    pub fn trace(&self) -> &[StageObservation] {
        &self.trace
    }

    /// Length the transport declared in `Content-Length`.
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get(http::header::CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Value stored by a deserialization stage.
    pub fn decoded<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }

    pub fn take_decoded<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions.remove::<T>()
    }

    /// Append a stage observation and advance `Received`/`Observed`.
    pub(crate) fn record(&mut self, observation: StageObservation) -> Result<()> {
        let next = match self.phase {
            ResponsePhase::Received => ResponsePhase::Observed { stages: 1 },
            ResponsePhase::Observed { stages } => ResponsePhase::Observed { stages: stages + 1 },
            ResponsePhase::Delivered => {
                return Err(PipelineError::InvalidTransition {
                    from: self.phase.to_string(),
                    to: format!("observed by '{}'", observation.stage),
                })
            }
        };
        self.phase = next;
        self.trace.push(observation);
        Ok(())
    }

    /// Hand the response to the caller.
    ///
    /// The body is buffered rather than moved, so it stays inspectable on
    /// this response after delivery. A body some stage already consumed is
    /// an error, never an empty delivery.
    pub async fn deliver(&mut self) -> Result<HttpResponse> {
        if self.phase == ResponsePhase::Delivered {
            return Err(PipelineError::InvalidTransition {
                from: self.phase.to_string(),
                to: ResponsePhase::Delivered.to_string(),
            });
        }

        if self.body.is_consumed() {
            let stage = self
                .trace
                .iter()
                .rev()
                .find(|observation| observation.consumed)
                .map_or_else(|| "unknown".to_string(), |observation| observation.stage.clone());
            return Err(PipelineError::BodyConsumed {
                stage,
                content_length: self.content_length(),
            });
        }

        let body = self.body.buffer().await?;
        self.phase = ResponsePhase::Delivered;
        Ok(HttpResponse::new(self.status, self.headers.clone(), body))
    }
}

impl From<StreamingResponse> for PipelineResponse {
    fn from(response: StreamingResponse) -> Self {
        Self::new(response.url, response.status, response.headers, response.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::header::{HeaderValue, CONTENT_LENGTH};

    fn observation(stage: &str) -> StageObservation {
        StageObservation {
            stage: stage.to_string(),
            access: BodyAccess::None,
            bytes_before: Some(3),
            bytes_after: Some(3),
            consumed: false,
        }
    }

    #[test]
    fn test_phase_advances_forward() {
        let mut response = PipelineResponse::new("u", 200, HeaderMap::new(), Body::from("abc"));
        assert_eq!(response.phase(), ResponsePhase::Received);

        response.record(observation("a")).unwrap();
        response.record(observation("b")).unwrap();
        assert_eq!(response.phase(), ResponsePhase::Observed { stages: 2 });
        assert_eq!(response.trace().len(), 2);
    }

    #[tokio::test]
    async fn test_deliver_once() {
        let mut response =
            PipelineResponse::new("u", 200, HeaderMap::new(), Body::chunked("abcdef", 2));

        let delivered = response.deliver().await.unwrap();
        assert_eq!(delivered.body, Bytes::from_static(b"abcdef"));
        assert_eq!(response.phase(), ResponsePhase::Delivered);
        assert_eq!(response.body.as_bytes(), Some(&Bytes::from_static(b"abcdef")));

        assert!(matches!(
            response.deliver().await,
            Err(PipelineError::InvalidTransition { .. })
        ));
        assert!(response.record(observation("late")).is_err());
    }

    #[tokio::test]
    async fn test_deliver_refuses_consumed_body() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("17"));
        let mut response = PipelineResponse::new("u", 200, headers, Body::chunked("abc", 1));

        response.body.take();
        response
            .record(StageObservation {
                bytes_before: None,
                bytes_after: Some(0),
                consumed: true,
                ..observation("drain")
            })
            .unwrap();

        match response.deliver().await {
            Err(PipelineError::BodyConsumed {
                stage,
                content_length,
            }) => {
                assert_eq!(stage, "drain");
                assert_eq!(content_length, Some(17));
            }
            other => panic!("expected BodyConsumed, got {:?}", other.map(|_| ())),
        }
        assert_eq!(response.phase(), ResponsePhase::Observed { stages: 1 });
    }

    #[tokio::test]
    async fn test_deliver_empty_body_is_not_consumed() {
        let mut response = PipelineResponse::new("u", 204, HeaderMap::new(), Body::empty());
        assert!(response.deliver().await.unwrap().body.is_empty());
    }

    #[test]
    fn test_emptied_body_detection() {
        let mut obs = observation("logger");
        assert!(!obs.emptied_body());

        obs.bytes_after = Some(0);
        assert!(obs.emptied_body());

        let streamed = StageObservation {
            bytes_before: None,
            bytes_after: Some(0),
            consumed: true,
            ..observation("reader")
        };
        assert!(streamed.emptied_body());

        let empty_from_start = StageObservation {
            bytes_before: Some(0),
            bytes_after: Some(0),
            ..observation("noop")
        };
        assert!(!empty_from_start.emptied_body());
    }

    #[test]
    fn test_from_streaming_response() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("17"));
        let streaming = StreamingResponse::new("https://example.com", 200, headers, Body::empty());

        let response = PipelineResponse::from(streaming);
        assert_eq!(response.content_length(), Some(17));
        assert!(response.is_success());
        assert!(response.decoded::<u32>().is_none());
    }
}
