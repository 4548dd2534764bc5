use tracing::info;

use dockhand_common::config::default_config_path;
use dockhand_common::DashboardConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path = default_config_path();
    let cfg = DashboardConfig::load(&config_path)?.apply_env()?;

    info!(
        "Starting Dockhand on http://{} (config: {})",
        cfg.listen_addr,
        config_path.display()
    );

    dockhand_web::server::run(&cfg).await
}
