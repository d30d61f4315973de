//! Serve command.

use clap::Args;
use kernelgate_core::config::{BindMode, Config};
use kernelgate_core::SecretString;
use kernelgate_gateway::Gateway;
use std::path::Path;
use tracing::info;

/// Serve command arguments. Flags override the config file.
#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Bind mode (loopback, lan)
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Port number
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Token API clients must present
    #[arg(long)]
    pub auth_token: Option<String>,

    /// Maximum concurrently running kernels
    #[arg(long)]
    pub max_kernels: Option<usize>,
}

impl ServeArgs {
    /// Apply command-line overrides to a loaded config.
    pub fn apply(&self, config: &mut Config) -> anyhow::Result<()> {
        if let Some(bind) = &self.bind {
            config.gateway.bind = match bind.as_str() {
                "loopback" => BindMode::Loopback,
                "lan" => BindMode::Lan,
                _ => anyhow::bail!("Invalid bind mode: {}", bind),
            };
        }
        if let Some(port) = self.port {
            config.gateway.port = port;
        }
        if let Some(token) = &self.auth_token {
            config.gateway.auth.token = Some(SecretString::new(token.as_str()));
        }
        if let Some(max) = self.max_kernels {
            config.kernels.max_kernels = Some(max);
        }
        Ok(())
    }
}

/// Run the serve command.
pub async fn run(args: ServeArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let mut config = Config::load_or_default(config_path)?;
    args.apply(&mut config)?;
    config.validate()?;

    info!(
        max_kernels = ?config.kernels.max_kernels,
        "Using in-process kernel manager"
    );

    let gateway = Gateway::with_local_manager(config);
    gateway.run().await?;
    Ok(())
}
