use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stonk_core::domain::analysis::AnalysisResult;
use stonk_core::llm::anthropic::AnthropicClient;
use stonk_core::llm::error::{AnalysisError, ErrorKind};
use stonk_core::requestor::{AnalysisRequestor, StateSnapshot};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = stonk_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let requestor = match AnthropicClient::from_settings(&settings) {
        Ok(client) => Some(Arc::new(AnalysisRequestor::new(Arc::new(client)))),
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "LLM client unavailable; starting API in degraded mode");
            None
        }
    };

    let app = router(AppState { requestor });

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(
            "/analysis",
            get(get_analysis_state)
                .post(post_analysis)
                .delete(reset_analysis),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    requestor: Option<Arc<AnalysisRequestor>>,
}

impl AppState {
    fn requestor(&self) -> Result<&Arc<AnalysisRequestor>, ApiError> {
        self.requestor.as_ref().ok_or(ApiError::Unavailable)
    }
}

#[derive(Debug, Deserialize)]
struct AnalyzeBody {
    ticker: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: &'static str,
    message: String,
}

enum ApiError {
    Unavailable,
    Analysis(AnalysisError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorBody {
                    kind: "unavailable",
                    message: "analysis is not configured".to_string(),
                }),
            )
                .into_response(),
            ApiError::Analysis(err) => (
                status_for(err.kind),
                Json(ErrorBody {
                    kind: err.kind.as_str(),
                    message: err.message(),
                }),
            )
                .into_response(),
        }
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::EmptyInput => StatusCode::BAD_REQUEST,
        ErrorKind::NetworkError | ErrorKind::NoJsonFound | ErrorKind::ParseError => {
            StatusCode::BAD_GATEWAY
        }
    }
}

async fn post_analysis(
    State(state): State<AppState>,
    Json(body): Json<AnalyzeBody>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let requestor = state.requestor()?;
    match requestor.analyze(&body.ticker).await {
        Ok(result) => Ok(Json(result)),
        Err(err) => {
            if err.kind != ErrorKind::EmptyInput {
                sentry_anyhow::capture_anyhow(&anyhow::Error::new(err.clone()));
            }
            Err(ApiError::Analysis(err))
        }
    }
}

async fn get_analysis_state(
    State(state): State<AppState>,
) -> Result<Json<StateSnapshot>, ApiError> {
    Ok(Json(state.requestor()?.snapshot()))
}

async fn reset_analysis(State(state): State<AppState>) -> Result<Json<StateSnapshot>, ApiError> {
    Ok(Json(state.requestor()?.reset()))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &stonk_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
