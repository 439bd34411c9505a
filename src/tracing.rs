//! Tracing (logging)

use crate::cli::CommandLineArgs;
use crate::error::PipelineError;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initlialise tracing (logging)
///
/// Applies a filter based on the `RUST_LOG` environment variable, falling back to enable info
/// logging for this crate if not set. Spans are also exported to a Jaeger agent when enabled.
///
/// # Arguments
///
/// * `args`: Command line arguments
pub fn init_tracing(args: &CommandLineArgs) -> Result<(), PipelineError> {
    let jaeger_layer = if args.enable_jaeger {
        let tracer = opentelemetry_jaeger::new_agent_pipeline()
            .with_service_name("fitbucket")
            .install_simple()?;
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fitbucket=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(jaeger_layer)
        .init();
    Ok(())
}

/// Flush any remaining spans to Jaeger.
pub fn shutdown_tracing() {
    opentelemetry::global::shutdown_tracer_provider();
}
