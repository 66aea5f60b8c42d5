//! # Ferrous Resolver
//!
//! Command-line front end for the resolution engine: loads configuration,
//! builds the name servers and resolves each domain given on the command line.

mod bootstrap;

use bootstrap::{init_logging, load_config, log_config_summary};
use clap::Parser;
use ferrous_resolver_application::ResolveContext;
use ferrous_resolver_domain::{CliOverrides, IpOption};
use ferrous_resolver_infrastructure::dns::{DirectDispatcher, DnsClient};
use std::net::IpAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

#[derive(Parser)]
#[command(name = "ferrous-resolver")]
#[command(version)]
#[command(about = "Resolve domain names through UDP, DoH or the system resolver")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short = 'c', long)]
    config: Option<String>,

    /// Name server to use; repeat to set several (replaces the configured list)
    #[arg(short = 's', long = "server")]
    servers: Vec<String>,

    /// Client address sent upstream as an EDNS client subnet
    #[arg(long)]
    client_ip: Option<IpAddr>,

    /// Per-server query timeout in milliseconds
    #[arg(short = 't', long)]
    timeout: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long)]
    log_level: Option<String>,

    /// Only ask for IPv4 addresses
    #[arg(short = '4', long, conflicts_with = "ipv6_only")]
    ipv4_only: bool,

    /// Only ask for IPv6 addresses
    #[arg(short = '6', long)]
    ipv6_only: bool,

    /// Domains to resolve
    #[arg(required = true)]
    domains: Vec<String>,
}

impl Cli {
    fn ip_option(&self) -> IpOption {
        IpOption::new(!self.ipv6_only, !self.ipv4_only)
    }

    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            servers: (!self.servers.is_empty()).then(|| self.servers.clone()),
            client_ip: self.client_ip,
            log_level: self.log_level.clone(),
            query_timeout_ms: self.timeout,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref(), cli.overrides())?;
    init_logging(&config.logging);
    log_config_summary(cli.config.as_deref(), &config);

    let client = DnsClient::from_config(&config.dns, Arc::new(DirectDispatcher)).await?;
    debug!(servers = ?client.server_names(), "Name servers ready");

    let option = cli.ip_option();
    let overall = Duration::from_millis(config.dns.query_timeout_ms)
        .saturating_mul(config.dns.servers.len().max(1) as u32);

    let mut failures = 0usize;
    for domain in &cli.domains {
        let ctx = ResolveContext::with_timeout(overall);
        match client.resolve_ip(&ctx, domain, option).await {
            Ok(ips) => {
                for ip in ips {
                    println!("{}\t{}", domain, ip);
                }
            }
            Err(e) => {
                failures += 1;
                error!(domain = %domain, error = %e, "Resolution failed");
                eprintln!("{}\t{}", domain, e);
            }
        }
    }

    Ok(if failures == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
