mod charts;
mod metrics;
mod models;
mod page;
mod queries;
#[cfg(test)]
mod test_support;

use anyhow::{Context, Result};
use askama::Template;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use common::config::Config;
use common::{CachedExecutor, NoCache, ResultCache, SqliteExecutor, TtlCache};
use metrics_exporter_prometheus::PrometheusHandle;
use page::{DashboardView, Filters, Page};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

const SIDEBAR_NOTE: &str =
    "Scores are based on Adjusted Score (meme penalty + rewards exemptions).";

pub struct AppState {
    pub queries: CachedExecutor,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn from_config(config: &Config, metrics: Option<PrometheusHandle>) -> Self {
        let executor = Arc::new(SqliteExecutor::new(&config.database.path));
        let cache: Arc<dyn ResultCache> = if config.cache.enabled {
            Arc::new(TtlCache::new(config.cache.ttl(), config.cache.max_entries))
        } else {
            Arc::new(NoCache)
        };
        Self {
            queries: CachedExecutor::new(executor, cache),
            metrics,
        }
    }
}

// --- Errors ---

/// A failed render. Logged in full, reported to the browser as a bare 500.
struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = format!("{:#}", self.0), "dashboard render failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Dashboard query failed; see server logs.",
        )
            .into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

// --- Templates ---

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate<'a> {
    view: &'a DashboardView,
    sidebar_note: &'a str,
}

/// Full-page notice for states that stop the render early.
#[derive(Template)]
#[template(path = "halt.html")]
struct HaltTemplate<'a> {
    level: &'a str,
    message: String,
    db_label: &'a str,
}

// --- Handlers ---

/// Run the blocking page build off the async workers.
async fn build(state: &Arc<AppState>, filters: Filters) -> Result<Page, AppError> {
    let queries = state.queries.clone();
    let page = tokio::task::spawn_blocking(move || page::build_page(&queries, &filters))
        .await
        .context("page build task panicked")??;
    Ok(page)
}

async fn index(
    State(state): State<Arc<AppState>>,
    Query(filters): Query<Filters>,
) -> Result<Response, AppError> {
    let page = build(&state, filters).await?;
    let (status, html) = match &page {
        Page::StoreMissing { path } => (
            StatusCode::SERVICE_UNAVAILABLE,
            HaltTemplate {
                level: "error",
                message: format!("Database file {path} not found in current directory."),
                db_label: path,
            }
            .render()?,
        ),
        Page::NoWeeks { db_label } => (
            StatusCode::OK,
            HaltTemplate {
                level: "warning",
                message: page::NO_WEEKS.to_string(),
                db_label,
            }
            .render()?,
        ),
        Page::Dashboard(view) => (
            StatusCode::OK,
            DashboardTemplate {
                view,
                sidebar_note: SIDEBAR_NOTE,
            }
            .render()?,
        ),
    };
    Ok((status, Html(html)).into_response())
}

async fn api_page(
    State(state): State<Arc<AppState>>,
    Query(filters): Query<Filters>,
) -> Result<Response, AppError> {
    let page = build(&state, filters).await?;
    let status = if matches!(page, Page::StoreMissing { .. }) {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    Ok((status, Json(page)).into_response())
}

async fn health() -> &'static str {
    "ok"
}

async fn metrics_endpoint(State(state): State<Arc<AppState>>) -> Response {
    match &state.metrics {
        Some(handle) => metrics::render(handle).into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}

// --- Router ---

pub fn create_router_with_state(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/page", get(api_page))
        .route("/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(Config::default_config_path);
    let config = Config::load(&config_path)?;

    let (dispatch, _otel_guard) = common::observability::build_dispatch(
        "moon-dashboard",
        &config.general.log_level,
        config.general.log_format,
    );
    tracing::dispatcher::set_global_default(dispatch).map_err(anyhow::Error::msg)?;
    tracing::info!(path = %config_path, "loaded dashboard config");

    let prom = metrics::init_global()?;
    let state = Arc::new(AppState::from_config(&config, Some(prom)));
    if !state.queries.store_exists() {
        tracing::warn!(
            path = %state.queries.location().display(),
            "database file not found; pages will show an error until it exists"
        );
    }
    tracing::info!(
        enabled = config.cache.enabled,
        ttl_secs = config.cache.ttl_secs,
        "result cache configured"
    );

    let web_port = config.web.as_ref().map_or(8501, |w| w.port);
    let web_host = config
        .web
        .as_ref()
        .map_or("0.0.0.0".to_string(), |w| w.host.clone());

    let app = create_router_with_state(state);
    let addr: SocketAddr = format!("{web_host}:{web_port}").parse()?;
    tracing::info!("dashboard listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await?;
    Ok(())
}
