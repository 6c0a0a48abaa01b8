//! # Wallet Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Open local persistence (and the remote mirror, when configured)
//! - Create the ledger and rate services
//! - Start the HTTP server

mod config;

use opentelemetry::global;
use opentelemetry_sdk::{propagation::TraceContextPropagator, trace as sdktrace};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wallet_hex::outbound::{NavasanConfig, NavasanProvider};
use wallet_hex::{LedgerService, RateCache, RateService, inbound::HttpServer};
use wallet_repo::build_persistence;

use config::{Config, LogFormat};

fn init_tracer() -> anyhow::Result<(sdktrace::Tracer, sdktrace::SdkTracerProvider)> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    // gRPC exporter with batch processing; endpoint comes from OTEL_EXPORTER_OTLP_ENDPOINT
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .build()?;

    let provider = sdktrace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .build();

    global::set_tracer_provider(provider.clone());

    use opentelemetry::trace::TracerProvider as _;
    Ok((provider.tracer("wallet-service"), provider))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    // OpenTelemetry is only wired up when a collector is configured
    let (telemetry, otel_provider) = if std::env::var_os("OTEL_EXPORTER_OTLP_ENDPOINT").is_some() {
        let (tracer, provider) = init_tracer()?;
        (
            Some(tracing_opentelemetry::layer().with_tracer(tracer)),
            Some(provider),
        )
    } else {
        (None, None)
    };

    let (json, pretty) = match config.log_format {
        LogFormat::Json => (Some(tracing_subscriber::fmt::layer().json()), None),
        LogFormat::Pretty => (None, Some(tracing_subscriber::fmt::layer())),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,wallet_app=debug,wallet_hex=debug".into()),
        )
        .with(json)
        .with(pretty)
        .with(telemetry)
        .init();

    tracing::info!("Starting wallet server on port {}", config.port);
    tracing::info!("Using database: {}", config.database_url);
    if config.navasan_api_key.is_none() {
        tracing::warn!("NAVASAN_API_KEY is not set; rate requests will fail until it is");
    }

    // Local store, plus the mirror worker when remote persistence is configured
    let persistence = build_persistence(&config.database_url, config.remote.clone()).await?;
    let ledger = LedgerService::load(persistence).await;

    let provider = NavasanProvider::new(NavasanConfig {
        base_url: config.navasan_base_url.clone(),
        api_key: config.navasan_api_key.clone(),
        timeout: config.upstream_timeout,
    })?;
    let rates = RateService::new(provider, RateCache::new(), config.rates_ttl);

    // Create and run the HTTP server
    let server = HttpServer::new(rates, ledger);
    let addr = format!("0.0.0.0:{}", config.port);

    server.run(&addr).await?;

    // Ensure traces are flushed before exit
    if let Some(provider) = otel_provider {
        let _ = provider.shutdown();
    }
    Ok(())
}
