use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use tracing::info;

use claim_verifier::config::AppConfig;
use claim_verifier::error::AppError;
use claim_verifier::telemetry;
use claim_verifier::verification::{
    claims_router, AdvisoryScorer, ClaimVerificationService, DocumentSource, FileDocumentSource,
    GatewayDocumentSource, HttpAdvisoryScorer, MemoryReferenceData, PatientId, ReferenceStores,
    RuleEngine, RuleKnowledge,
};

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "Claim Verifier",
    about = "Score insurance claim documents for fraud and inconsistency risk",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Assess a local claim document and print the report
    Assess(AssessArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Args, Debug)]
struct AssessArgs {
    /// Path to the claim document
    #[arg(long)]
    file: PathBuf,
    /// Patient identifier to assess the claim against
    #[arg(long)]
    patient: String,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Assess(args) => run_assess(args).await,
    }
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let documents = Arc::new(GatewayDocumentSource::from_config(&config.documents)?);
    let scorer = Arc::new(HttpAdvisoryScorer::from_config(&config.advisory)?);
    let stores = ReferenceStores::from_memory(Arc::new(MemoryReferenceData::with_demo_data()));
    let engine = RuleEngine::standard(RuleKnowledge::default())?;
    let service = Arc::new(ClaimVerificationService::new(
        documents, scorer, stores, engine,
    )?);

    let (app, readiness_flag) = application_router(service);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "claim verification service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn application_router<D, S>(
    service: Arc<ClaimVerificationService<D, S>>,
) -> (Router, Arc<AtomicBool>)
where
    D: DocumentSource + 'static,
    S: AdvisoryScorer + 'static,
{
    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .merge(claims_router(service))
        .layer(prometheus_layer);

    (app, readiness_flag)
}

async fn run_assess(args: AssessArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let root = args
        .file
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let reference = args
        .file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            AppError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "document path has no file name",
            ))
        })?;

    let documents = Arc::new(FileDocumentSource::new(root));
    let scorer = Arc::new(HttpAdvisoryScorer::from_config(&config.advisory)?);
    let stores = ReferenceStores::from_memory(Arc::new(MemoryReferenceData::with_demo_data()));
    let engine = RuleEngine::standard(RuleKnowledge::default())?;
    let service = ClaimVerificationService::new(documents, scorer, stores, engine)?;

    let report = service
        .assess(&reference, &PatientId(args.patient))
        .await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
