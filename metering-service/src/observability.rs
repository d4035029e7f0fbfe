use tracing_subscriber::EnvFilter;

/// Installs the global fmt subscriber. `RUST_LOG` directives are applied on
/// top of the crate defaults.
pub fn init_tracing() {
    let mut filter = EnvFilter::from_default_env();
    for directive in ["metering_service=info", "metering_client=info"] {
        if let Ok(d) = directive.parse() {
            filter = filter.add_directive(d);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
