//! HTTP query endpoint over the compatibility store.

use crate::error::Result;
use crate::store::{CompatibilityStore, newest_first};
use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use marco_core::Gav;
use marco_core::api::{COMPATIBILITIES_ROUTE, CompatibilityResponse, ErrorResponse};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

pub fn router(store: Arc<CompatibilityStore>) -> Router {
    Router::new()
        .route(
            &format!("{COMPATIBILITIES_ROUTE}/{{gav}}"),
            get(get_compatibilities),
        )
        .with_state(store)
}

/// Serves the query endpoint until the process is stopped.
pub async fn serve(store: Arc<CompatibilityStore>, addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(
        "serving {} on {}",
        store.path().display(),
        listener.local_addr()?
    );
    axum::serve(listener, router(store)).await?;
    Ok(())
}

async fn get_compatibilities(
    State(store): State<Arc<CompatibilityStore>>,
    Path(coordinates): Path<String>,
) -> Response {
    let gav: Gav = match coordinates.parse() {
        Ok(gav) => gav,
        Err(e) => return error(StatusCode::BAD_REQUEST, e.to_string()),
    };
    let key = gav.to_string();

    let map = match store.load().await {
        Ok(map) => map,
        Err(e) => {
            tracing::error!("cannot read compatibility store: {}", e);
            return error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    };

    match map.get(&key) {
        Some(versions) => {
            tracing::debug!("{} has {} compatible versions", key, versions.len());
            let compatible_versions = newest_first(versions)
                .into_iter()
                .map(str::to_string)
                .collect();
            Json(CompatibilityResponse {
                gav: key,
                compatible_versions,
            })
            .into_response()
        }
        None => error(
            StatusCode::NOT_FOUND,
            format!("compatibilities of {key} have not been computed"),
        ),
    }
}

fn error(status: StatusCode, message: String) -> Response {
    (status, Json(ErrorResponse { error: message })).into_response()
}
