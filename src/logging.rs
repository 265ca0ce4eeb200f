use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn";

/// Logs go to stderr so they never mix with tables or prompts on stdout.
/// `RUST_LOG` overrides the default level. Safe to call more than once.
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
