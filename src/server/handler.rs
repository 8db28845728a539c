// Axum handlers: turn page and download requests into metadata and orchestrator calls.

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    Form, Router,
    body::{Body, Bytes},
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio_util::io::ReaderStream;

use crate::error::AppError;
use crate::metadata::{MetadataFetcher, Resolution};
use crate::orchestrator::{Artifact, ArtifactBody, BatchAction, Orchestrator};
use crate::render::{render_home, render_page};
use crate::source::SourceRef;
use crate::utils::content_disposition;

#[derive(Clone)]
pub struct AppState {
    pub metadata: Arc<MetadataFetcher>,
    pub orchestrator: Arc<Orchestrator>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home_get).post(home_post))
        .route("/download/video/{video_id}/", get(video_handler))
        .route("/download/video/{video_id}", get(video_handler))
        .route("/download/thumbnail/{video_id}/", get(thumbnail_handler))
        .route("/download/thumbnail/{video_id}", get(thumbnail_handler))
        .route("/download/playlist/", get(playlist_get).post(playlist_post))
        .route("/download/playlist", get(playlist_get).post(playlist_post))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(state)
}

/// Serve until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    log::info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    log::info!("Server stopped");
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
struct UrlParams {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResolutionParams {
    #[serde(default)]
    resolution: Option<String>,
}

/// GET / with an optional `?url=` behaves like a submission.
async fn home_get(State(state): State<AppState>, Query(params): Query<UrlParams>) -> Response {
    match params.url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
        Some(url) => lookup(&state, url).await,
        None => Html(render_home(None, None)).into_response(),
    }
}

async fn home_post(State(state): State<AppState>, Form(params): Form<UrlParams>) -> Response {
    let url = params.url.unwrap_or_default();
    let url = url.trim();
    if url.is_empty() {
        return Html(render_home(Some("Please enter a URL"), None)).into_response();
    }
    lookup(&state, url).await
}

/// Classify and fetch; any failure goes back onto the form as a message.
async fn lookup(state: &AppState, url: &str) -> Response {
    let result = match SourceRef::classify(url) {
        Ok(source) => {
            log::info!("Lookup {:?}", source);
            state.metadata.fetch(&source, url).await
        }
        Err(e) => Err(e),
    };

    match result {
        Ok(model) => Html(render_page(&model)).into_response(),
        Err(e) => {
            if e.status().is_server_error() {
                log::error!("Lookup of {} failed: {}", url, e);
            } else {
                log::info!("Lookup of {} rejected: {}", url, e);
            }
            Html(render_home(Some(&e.to_string()), Some(url))).into_response()
        }
    }
}

async fn video_handler(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    Query(params): Query<ResolutionParams>,
) -> Result<Artifact, AppError> {
    let resolution = Resolution::parse(params.resolution.as_deref());
    state.orchestrator.download_video(&video_id, &resolution).await
}

async fn thumbnail_handler(State(state): State<AppState>, Path(video_id): Path<String>) -> Result<Artifact, AppError> {
    state.orchestrator.download_thumbnail(&video_id).await
}

async fn playlist_get() -> Redirect {
    Redirect::to("/")
}

/// The form repeats `selected_videos`, so the body is parsed by hand.
async fn playlist_post(State(state): State<AppState>, body: Bytes) -> Response {
    let mut selected = Vec::new();
    let mut action = None;
    for (key, value) in url::form_urlencoded::parse(&body) {
        match key.as_ref() {
            "selected_videos" if !value.trim().is_empty() => selected.push(value.into_owned()),
            "action" => action = Some(value.into_owned()),
            _ => {}
        }
    }

    if selected.is_empty() {
        log::info!("Playlist download with nothing selected");
        return Redirect::to("/").into_response();
    }

    let action = match BatchAction::parse(action.as_deref()) {
        Ok(action) => action,
        Err(e) => return e.into_response(),
    };
    log::info!("Playlist download: {} items, {:?}", selected.len(), action);

    match state.orchestrator.download_playlist_batch(&selected, action).await {
        Ok(artifact) => artifact.into_response(),
        Err(e) => e.into_response(),
    }
}

impl IntoResponse for Artifact {
    fn into_response(self) -> Response {
        let disposition = match HeaderValue::from_str(&content_disposition(&self.filename)) {
            Ok(value) => value,
            Err(e) => {
                return AppError::Internal(anyhow::anyhow!("bad Content-Disposition for {:?}: {}", self.filename, e))
                    .into_response();
            }
        };
        let len = self.len();

        let body = match self.body {
            ArtifactBody::Bytes(bytes) => Body::from(bytes),
            ArtifactBody::File { reader, .. } => Body::from_stream(ReaderStream::new(reader)),
        };

        (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, HeaderValue::from_static(self.content_type)),
                (header::CONTENT_DISPOSITION, disposition),
                (header::CONTENT_LENGTH, HeaderValue::from(len)),
            ],
            body,
        )
            .into_response()
    }
}
