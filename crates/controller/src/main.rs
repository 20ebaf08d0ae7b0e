use anyhow::Context;
use azurefile_controller::{
  account::AccountResolver,
  cloud::{ArmClient, Cloud, SasFileClient, TokenProvider},
  config::{CloudConfig, DriverOptions, LogFormat},
  copy::CopyOrchestrator,
  lock::OperationLocks,
  shares::ShareManager,
  Driver,
};
use azurefile_csi_proto::Endpoint;
use azurefile_exec::OsRunner;
use clap::Parser;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(format: LogFormat) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let registry = tracing_subscriber::registry().with(filter);

  match format {
    LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    LogFormat::Json => registry
      .with(tracing_subscriber::fmt::layer().json())
      .init(),
  }
}

async fn shutdown_signal() {
  let mut terminate = match signal(SignalKind::terminate()) {
    Ok(terminate) => terminate,
    Err(err) => {
      tracing::error!(%err, "failed to install SIGTERM handler");
      let _ = tokio::signal::ctrl_c().await;
      return;
    }
  };

  tokio::select! {
    _ = tokio::signal::ctrl_c() => info!("received SIGINT"),
    _ = terminate.recv() => info!("received SIGTERM"),
  }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let options = DriverOptions::parse();
  init_tracing(options.log_format);

  let endpoint: Endpoint = options.endpoint.parse()?;
  let config = CloudConfig::load(&options.cloud_config)?;
  info!(
    driver = %options.driver_name,
    %endpoint,
    subscription = %config.subscription_id,
    resource_group = %config.resource_group,
    enable_vhd = options.enable_vhd,
    "starting controller"
  );

  let http = reqwest::Client::builder()
    .user_agent(concat!("azurefile-controller/", env!("CARGO_PKG_VERSION")))
    .build()
    .context("failed to build http client")?;

  let token = TokenProvider::new(
    config.credential()?,
    config.resource_manager_endpoint.clone(),
    http.clone(),
  );
  let arm = ArmClient::new(config.resource_manager_endpoint.clone(), token, http.clone());
  let cloud = Cloud::from_arm(arm, SasFileClient::new(http));

  let resolver = AccountResolver::new(
    cloud.clone(),
    options.account_cache_ttl(),
    options.account_name_prefix.clone(),
  );
  let copier = CopyOrchestrator::new(
    Arc::new(OsRunner::new()),
    options.copy_options(),
    Some(config.identity()),
  );
  let shares = ShareManager::new(
    cloud,
    resolver,
    OperationLocks::new(),
    copier,
    options.settings(&config),
  );

  let driver = Driver::new(options.driver_name.clone(), shares);
  azurefile_csi_proto::serve(driver, &endpoint, shutdown_signal()).await?;

  Ok(())
}
