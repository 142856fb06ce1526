//! rrdnsd: the daemon binary. A thin integration layer that loads configuration, builds the
//! Cloudflare provider, the Kubernetes cluster observer, and the reconciliation engine, and
//! runs them to completion under a shared shutdown signal.
//!
//! All reconciliation logic lives in `rrdns-core`; this binary's job is wiring and process
//! lifecycle (config loading, logging setup, signal handling, exit codes) — it must never
//! grow DNS or scheduling logic of its own.

mod health_http;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

use rrdns_core::config::LogFormat;
use rrdns_core::engine::EngineConfig;
use rrdns_core::status::{shared_status, SharedStatus};
use rrdns_core::{Config, ReconciliationEngine};
use rrdns_observer_kube::KubeClusterObserver;
use rrdns_provider_cloudflare::{CloudflareProvider, RetryPolicy};

/// Process exit codes, following systemd conventions.
#[derive(Debug, Clone, Copy)]
enum RrdnsExitCode {
    CleanShutdown = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<RrdnsExitCode> for ExitCode {
    fn from(code: RrdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return RrdnsExitCode::ConfigError.into();
        }
    };

    if let Err(e) = init_tracing(&config) {
        eprintln!("failed to initialize logging: {e}");
        return RrdnsExitCode::ConfigError.into();
    }

    info!(
        dns_sync_interval_secs = config.dns_sync_interval.as_secs(),
        health_port = config.health_port,
        "starting rrdnsd"
    );

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to create tokio runtime");
            return RrdnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        match run_daemon(config).await {
            Ok(()) => RrdnsExitCode::CleanShutdown,
            Err(e) => {
                error!(error = %e, "daemon exited with error");
                RrdnsExitCode::RuntimeError
            }
        }
    });

    result.into()
}

fn init_tracing(config: &Config) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_new(&config.log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    match config.log_format {
        LogFormat::Json => subscriber.json().try_init(),
        LogFormat::Pretty => subscriber.try_init(),
    }
    .map_err(|e| anyhow::anyhow!("{e}"))
}

async fn run_daemon(config: Config) -> Result<()> {
    let provider = Arc::new(
        CloudflareProvider::new(
            config.cloudflare_api_token.clone(),
            RetryPolicy {
                max_retries: config.max_retries,
                base_delay: config.retry_delay,
            },
        )
        .context("failed to construct Cloudflare provider")?,
    );

    use rrdns_core::error::Error as RrdnsError;
    let resolver_for_refresh: Arc<dyn rrdns_core::traits::ZoneResolver> = provider.clone();
    rrdns_core::traits::ZoneResolver::refresh(&*resolver_for_refresh)
        .await
        .map_err(|e: RrdnsError| anyhow::anyhow!("initial zone list failed: {e}"))?;

    let kube_client = build_kube_client(config.k8s_config_path.as_deref()).await?;
    let observer = Arc::new(KubeClusterObserver::new(kube_client));

    let status = shared_status();
    let engine_config = EngineConfig {
        sync_interval: config.dns_sync_interval,
        min_pass_interval: std::time::Duration::ZERO,
        zone_concurrency: 4,
    };

    let (engine, mut events) = ReconciliationEngine::new(
        provider.clone(),
        provider,
        observer,
        engine_config,
        status.clone(),
    );

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            info!(?event, "reconciliation engine event");
        }
    });

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let engine_handle = tokio::spawn(engine.run_with_shutdown(Some(shutdown_rx)));

    let health_handle = if config.enable_health_server {
        Some(spawn_health_server(status.clone(), config.health_port).await?)
    } else {
        info!("health server disabled via ENABLE_HEALTH_SERVER=false");
        None
    };

    let sampler_handle = spawn_health_sampler(status, config.health_check_interval);

    let signal_name = wait_for_shutdown_signal().await;
    info!(signal = signal_name, "shutdown signal received, stopping engine");
    let _ = shutdown_tx.send(());

    if let Err(e) = engine_handle.await.context("engine task panicked")? {
        warn!(error = %e, "engine returned an error during shutdown");
    }
    sampler_handle.abort();
    if let Some(handle) = health_handle {
        handle.abort();
    }

    info!("rrdnsd shut down cleanly");
    Ok(())
}

/// Periodically sample the shared status and log it, independent of the reconciliation
/// engine's own per-pass publication (§4.7's "cadence for internal self-health sampling").
/// Read-only: this task never writes to `status`.
fn spawn_health_sampler(
    status: SharedStatus,
    interval: std::time::Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let snapshot = status.read().await;
            info!(
                ready = snapshot.ready(),
                observer_synced = snapshot.observer_synced,
                active_spec_count = snapshot.active_spec_count,
                last_outcome = ?snapshot.last_outcome,
                "self-health sample"
            );
        }
    })
}

async fn build_kube_client(config_path: Option<&str>) -> Result<kube::Client> {
    match config_path {
        Some(path) => {
            let kubeconfig = kube::config::Kubeconfig::read_from(path)
                .with_context(|| format!("failed to read kubeconfig at {path}"))?;
            let options = kube::config::KubeConfigOptions::default();
            let config = kube::Config::from_custom_kubeconfig(kubeconfig, &options)
                .await
                .context("failed to build client config from kubeconfig")?;
            kube::Client::try_from(config).context("failed to build kube client")
        }
        None => kube::Client::try_default()
            .await
            .context("failed to build in-cluster kube client"),
    }
}

async fn spawn_health_server(
    status: rrdns_core::status::SharedStatus,
    port: u16,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = health_http::router(status);
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind health server on {addr}"))?;
    info!(%addr, "health server listening");
    Ok(tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "health server exited with error");
        }
    }))
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() -> &'static str {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "failed to install SIGTERM handler; falling back to SIGINT only");
            let _ = tokio::signal::ctrl_c().await;
            return "SIGINT";
        }
    };
    tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = tokio::signal::ctrl_c() => "SIGINT",
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> &'static str {
    let _ = tokio::signal::ctrl_c().await;
    "SIGINT"
}
