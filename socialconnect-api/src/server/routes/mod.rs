use crate::server::{Result, ServerError, ServerRouter, SharedNetwork, read_network};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use tracing::info;

mod moderation;
mod posts;
mod session;
mod users;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .merge(session::routes())
        .merge(users::routes())
        .merge(posts::routes())
        .merge(moderation::routes())
        .typed_post(save)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/save", rejection(ServerError))]
struct SavePath();

async fn save(SavePath(): SavePath, State(network): State<SharedNetwork>) -> Result<StatusCode> {
    tokio::task::spawn_blocking(move || read_network(&network).force_save()).await??;
    info!("Saved network on request");

    Ok(StatusCode::NO_CONTENT)
}
