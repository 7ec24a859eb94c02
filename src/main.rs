use std::net::SocketAddr;

use anyhow::Result;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use talktraverse_speech::{build_app, AppState, Config};

fn load_config() -> Result<Config> {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| std::path::PathBuf::from("."));

    let config_paths: Vec<String> = vec![
        std::env::var("CONFIG_PATH").ok(),
        Some("conf.yaml".to_string()),
        Some("conf.jsonld".to_string()),
        exe_dir.join("conf.yaml").to_str().map(|s| s.to_string()),
        exe_dir.join("conf.jsonld").to_str().map(|s| s.to_string()),
    ]
    .into_iter()
    .flatten()
    .collect();

    let mut config = None;
    for path in &config_paths {
        match Config::load(path) {
            Ok(cfg) => {
                info!("Loaded configuration from: {}", path);
                config = Some(cfg);
                break;
            }
            Err(e) => debug!("Failed to load config from {}: {}", path, e),
        }
    }

    let mut config = config.unwrap_or_else(|| {
        info!("No configuration file found (tried {:?}), using defaults", config_paths);
        Config::default()
    });
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("talktraverse_speech=debug,tower_http=debug")),
        )
        .init();

    let config = load_config()?;

    std::fs::create_dir_all(&config.system_config.cache_dir)?;
    info!("Audio cache directory: {}", config.system_config.cache_dir);

    let app_state = AppState::new(config.clone())?;
    let app = build_app(app_state);

    let addr: SocketAddr = format!("{}:{}", config.system_config.host, config.system_config.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid listen address: {}", e))?;
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
