use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn env_filter() -> tracing_subscriber::filter::EnvFilter {
    let directive = std::env::var("VANTORA_LOG").or_else(|_| std::env::var("RUST_LOG")).ok();
    match directive {
        Some(directive) => tracing_subscriber::filter::EnvFilter::try_new(directive)
            .unwrap_or_else(|_| tracing_subscriber::filter::EnvFilter::new("info")),
        None => tracing_subscriber::filter::EnvFilter::new("info"),
    }
}

/// Initialise plain-text logging, honoring `VANTORA_LOG` then falling back to `RUST_LOG`,
/// default level `info`.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer())
        .init()
}

/// Initialise JSON-formatted logging for container deployments.
pub fn init_json_logging() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
        .init()
}
