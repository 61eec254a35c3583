use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "decentral_store=info,server=info";

/// Install the global log subscriber. Logs go to stderr so command output on
/// stdout stays machine-readable. Calling it twice is harmless.
pub fn init(json_logs: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let _ = if json_logs {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
