mod app;
mod client;
mod command;
mod config;
mod constant;
mod contracts;
mod deployment;
mod error;
mod loader;
mod purchase;
mod render;
mod state;
mod token;
mod wallet;

#[cfg(test)]
mod testing;

use anyhow::Result;

use std::sync::Arc;

use crate::app::AppBuilder;
use crate::client::RpcClient;
use crate::config::Config;
use crate::deployment::Deployments;
use crate::wallet::JsonRpcWallet;

#[tokio::main]
async fn main() -> Result<()> {
    setup_env_and_tracing();

    let config = Config::from_env()?;
    tracing::info!("Expecting network {}", config.chain_id);

    let deployments = Deployments::load(config.deployment_config.as_deref())?;
    let deployment = deployments.for_chain(config.chain_id)?.clone();
    tracing::info!(
        "Token at {}, crowdsale at {}",
        deployment.token.address,
        deployment.crowdsale.address
    );

    let client = RpcClient::from_config(&config)?;
    tracing::debug!("JSON-RPC endpoint: {}", client.url());
    let wallet = Arc::new(JsonRpcWallet::new(client));

    let mut app = AppBuilder::new(wallet, deployment)
        .with_config(&config)
        .build();
    app.run_loop().await?;

    Ok(())
}

pub fn setup_env_and_tracing() {
    dotenv::dotenv().ok();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}
