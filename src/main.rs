use anyhow::Result;
use tracing::{info, warn};

use flare_gateway::{GatewayConfig, GatewayServer, logging};

/// 配置文件：第一个命令行参数，其次 `GATEWAY_CONFIG`，都没有则使用默认配置
fn config_path() -> Option<String> {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var("GATEWAY_CONFIG").ok())
}

#[tokio::main]
async fn main() -> Result<()> {
    let path = config_path();
    let config = match &path {
        Some(path) => GatewayConfig::load_from_file(path)?,
        None => GatewayConfig::default(),
    };

    logging::init_tracing(&config.logging)?;

    match &path {
        Some(path) => info!(path = %path, "Configuration loaded"),
        None => warn!("No configuration file given, using defaults"),
    }
    if config.registry.is_none() {
        info!(
            fallback_host = %config.discovery.fallback_host,
            "No registry configured, services are discovered by port scan"
        );
    }

    GatewayServer::from_config(config)?.run().await
}
