use ferrous_resolver_domain::{CliOverrides, Config};
use tracing::info;

pub fn load_config(
    config_path: Option<&str>,
    cli_overrides: CliOverrides,
) -> anyhow::Result<Config> {
    let config = Config::load(config_path, cli_overrides)?;
    config.validate()?;
    Ok(config)
}

/// Called once logging is up.
pub fn log_config_summary(config_path: Option<&str>, config: &Config) {
    info!(
        config_file = config_path.unwrap_or("default"),
        servers = config.dns.servers.len(),
        static_hosts = config.dns.hosts.len() + config.dns.static_hosts.len(),
        query_timeout_ms = config.dns.query_timeout_ms,
        "Configuration loaded"
    );
}
