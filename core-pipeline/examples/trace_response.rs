//! Fetch a URL through the response pipeline and print what each stage saw.
//!
//! ```text
//! PIPELINE_BODY_LOG=body PIPELINE_READ_TIMEOUT_SECS=5 \
//!     cargo run -p core-pipeline --example trace_response -- https://httpbin.org/json
//! ```

use anyhow::Context;
use bridge_traits::{ConsoleLogger, HttpRequest, LogLevel};
use core_pipeline::{PipelineClient, ResponsePipeline};
use core_runtime::config::CoreConfig;
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let url = std::env::args()
        .nth(1)
        .context("usage: trace_response <url>")?;

    // Pipeline warnings (emptied bodies, undeclared header edits) are
    // mirrored to stdout next to the trace.
    let console = ConsoleLogger {
        min_level: LogLevel::Warn,
    };
    let config = CoreConfig::from_env()?
        .logging(
            LoggingConfig::default()
                .with_format(LogFormat::Compact)
                .with_logger_sink(Arc::new(console)),
        )
        .build()?;
    init_logging(config.logging.clone())?;

    let pipeline = ResponsePipeline::json::<serde_json::Value>(&config.http)?;
    let client = PipelineClient::from_config(&config, pipeline);

    let mut response = client.send(HttpRequest::get(url)).await?;

    println!("status: {}", response.status);
    println!("content-length: {:?}", response.content_length());
    for observation in response.trace() {
        println!(
            "{:<16} {:<12} before={:?} after={:?}{}",
            observation.stage,
            observation.access,
            observation.bytes_before,
            observation.bytes_after,
            if observation.emptied_body() { "  EMPTIED" } else { "" }
        );
    }

    let delivered = response.deliver().await?;
    println!("delivered {} bytes", delivered.body.len());
    if let Some(value) = response.decoded::<serde_json::Value>() {
        println!("{}", serde_json::to_string_pretty(value)?);
    }

    Ok(())
}
