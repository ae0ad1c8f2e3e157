use bridge_traits::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(
        "Stage '{reader}' reads the body without replaying it, \
         so '{consumer}' would see an empty body"
    )]
    UnsafeOrdering { reader: String, consumer: String },

    #[error("Transport stage '{transport}' is declared after application stage '{application}'")]
    LayerOrdering {
        transport: String,
        application: String,
    },

    #[error("Stage '{0}' is declared more than once")]
    DuplicateStage(String),

    #[error(
        "Response body was empty when '{stage}' tried to decode it \
         (Content-Length: {content_length:?})"
    )]
    EmptyBody {
        stage: String,
        content_length: Option<u64>,
    },

    #[error("Failed to decode response body in '{stage}': {source}")]
    Decode {
        stage: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("No decoded {type_name} on the response; add a deserialization stage to the pipeline")]
    MissingDecodedValue { type_name: &'static str },

    #[error(
        "Response body was consumed by '{stage}' before delivery \
         (Content-Length: {content_length:?})"
    )]
    BodyConsumed {
        stage: String,
        content_length: Option<u64>,
    },

    #[error("Invalid response transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Stage '{stage}' failed: {source}")]
    Stage {
        stage: String,
        #[source]
        source: Box<PipelineError>,
    },

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

impl PipelineError {
    /// The underlying error with any stage wrappers removed.
    pub fn root(&self) -> &PipelineError {
        match self {
            PipelineError::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    /// Name of the stage that failed, if the error came out of a stage.
    pub fn stage(&self) -> Option<&str> {
        match self {
            PipelineError::Stage { stage, .. } => Some(stage),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.root(), PipelineError::Bridge(err) if err.is_timeout())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::TimeoutPhase;
    use std::time::Duration;

    #[test]
    fn test_root_unwraps_stage_errors() {
        let err = PipelineError::Stage {
            stage: "deserialize".to_string(),
            source: Box::new(PipelineError::EmptyBody {
                stage: "deserialize".to_string(),
                content_length: Some(17),
            }),
        };

        assert_eq!(err.stage(), Some("deserialize"));
        assert!(matches!(err.root(), PipelineError::EmptyBody { .. }));
        assert!(err.to_string().contains("Content-Length: Some(17)"));
    }

    #[test]
    fn test_timeout_is_distinguishable() {
        let err: PipelineError = BridgeError::Timeout {
            phase: TimeoutPhase::Read,
            after: Duration::from_secs(1),
        }
        .into();
        assert!(err.is_timeout());

        let err: PipelineError = BridgeError::OperationFailed("reset".to_string()).into();
        assert!(!err.is_timeout());
    }
}
