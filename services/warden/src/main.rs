//! Warden access-control service entry point.
//!
//! # Purpose
//! Loads configuration, initialises logging and metrics, and runs the API
//! server until Ctrl-C.
use anyhow::Context;
use warden::config::WardenConfig;
use warden::observability;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let metrics_handle = observability::init_observability("warden");
    let config = WardenConfig::from_env_or_yaml().context("load warden config")?;
    warden::run_with_shutdown(config, metrics_handle, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}
