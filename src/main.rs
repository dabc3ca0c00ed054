use push_deploy::deploy::CommandDeployer;
use push_deploy::error::{DeployError, Result};
use push_deploy::{AppState, DeployConfig, router};
use std::fs;
use std::sync::Arc;
use tracing::{info, warn};

const DEFAULT_PORT: &str = "3000";
const DEFAULT_CONFIG_PATH: &str = "deploy_config.toml";

/// Load, parse and validate the configuration file
fn load_config(path: &str) -> Result<DeployConfig> {
    let config_str = fs::read_to_string(path).map_err(|e| {
        DeployError::Config(format!("Failed to read config file '{}': {}", path, e))
    })?;

    let config: DeployConfig = toml::from_str(&config_str).map_err(|e| {
        DeployError::Config(format!("Failed to parse config file '{}': {}", path, e))
    })?;

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let port = std::env::var("PORT").unwrap_or_else(|_| DEFAULT_PORT.to_string());
    let config_path =
        std::env::var("DEPLOY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let webhook_secret = std::env::var("WEBHOOK_SECRET").unwrap_or_default();

    let config: DeployConfig = match load_config(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt::init();

    if webhook_secret.is_empty() {
        warn!("WEBHOOK_SECRET is empty; webhook authentication is effectively disabled");
    }

    let deployer = Arc::new(CommandDeployer::new(
        config.supervisor_bin.clone(),
        config.step_timeout(),
    ));
    let state = Arc::new(AppState::new(config, webhook_secret, deployer));
    let app = router(state);

    let bind_address = format!("0.0.0.0:{}", port);
    info!("Listening on {}", bind_address);
    info!("Using config at {:?}", config_path);
    let listener = tokio::net::TcpListener::bind(bind_address).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
