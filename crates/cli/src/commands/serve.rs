//! Run the dashboard in-process

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use tracing::info;

use dockhand_common::config::default_config_path;
use dockhand_common::DashboardConfig;

#[derive(Args)]
pub struct ServeArgs {
    /// Config file (default: $DOCKHAND_CONFIG or ~/.dockhand/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Listen address, overriding the config file
    #[arg(long)]
    pub addr: Option<String>,
}

pub async fn execute(args: ServeArgs) -> Result<()> {
    let path = args.config.unwrap_or_else(default_config_path);
    let mut cfg = DashboardConfig::load(&path)?.apply_env()?;
    if let Some(addr) = args.addr {
        cfg.listen_addr = addr;
    }

    info!("Using config {}", path.display());
    dockhand_web::server::run(&cfg).await
}
