use axum::{
    Router,
    extract::{
        FromRef, Request,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use extract::Json;
use serde::{Deserialize, Serialize};
use socialconnect_common::model::{Id, post::PostMarker, user::UserMarker};
use socialconnect_domain::{
    Error as DomainError, SocialNetwork, content::ContentError, graph::GraphError,
    identity::IdentityError, moderation::ModerationError,
};
use socialconnect_store::StoreError;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{debug, error};

mod extract;
mod routes;
mod view;

pub type ServerRouter = Router<ServerState>;

/// The one network the process serves, shared by every request.
pub type SharedNetwork = Arc<RwLock<SocialNetwork>>;

#[derive(Clone, Debug, FromRef)]
pub struct ServerState {
    pub network: SharedNetwork,
}

pub fn routes() -> ServerRouter {
    routes::routes().fallback(fallback)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

// Poisoned locks are recovered rather than propagated.
pub fn read_network(network: &RwLock<SocialNetwork>) -> RwLockReadGuard<'_, SocialNetwork> {
    network.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub fn write_network(network: &RwLock<SocialNetwork>) -> RwLockWriteGuard<'_, SocialNetwork> {
    network.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Runs `mutation` on the blocking pool, since every mutation writes the full state to disk.
pub async fn mutate<T, F>(network: SharedNetwork, mutation: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&mut SocialNetwork) -> Result<T, DomainError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || mutation(&mut write_network(&network)))
        .await?
        .map_err(ServerError::from)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("Query string rejected: {0}")]
    QueryRejection(#[from] QueryRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Blocking task failed: {0}")]
    Blocking(#[from] JoinError),
    #[error("User with id {0} was not found.")]
    UserByIdNotFound(Id<UserMarker>),
    #[error("User with username {0} was not found.")]
    UserByUsernameNotFound(String),
    #[error("No user is registered with email {0}.")]
    UserByEmailNotFound(String),
    #[error("Post with id {0} was not found.")]
    PostByIdNotFound(Id<PostMarker>),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::UserByIdNotFound(_)
            | ServerError::UserByUsernameNotFound(_)
            | ServerError::UserByEmailNotFound(_)
            | ServerError::PostByIdNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::JsonRejection(_) | ServerError::QueryRejection(_) => {
                StatusCode::BAD_REQUEST
            }
            ServerError::JsonResponse(_) | ServerError::Store(_) | ServerError::Blocking(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ServerError::Domain(error) => domain_status(error),
        }
    }
}

fn domain_status(error: &DomainError) -> StatusCode {
    match error {
        DomainError::NotLoggedIn => StatusCode::UNAUTHORIZED,
        DomainError::AdminRequired(_) | DomainError::RegularUserRequired(_) => {
            StatusCode::FORBIDDEN
        }
        DomainError::Invalid(_) => StatusCode::BAD_REQUEST,
        DomainError::Identity(error) => match error {
            IdentityError::Invalid(_) => StatusCode::BAD_REQUEST,
            IdentityError::DuplicateUsername(_) | IdentityError::DuplicateEmail(_) => {
                StatusCode::CONFLICT
            }
            IdentityError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            IdentityError::Banned(_) => StatusCode::FORBIDDEN,
            IdentityError::UserNotFound(_) => StatusCode::NOT_FOUND,
        },
        DomainError::Content(error) => match error {
            ContentError::Invalid(_) => StatusCode::BAD_REQUEST,
            ContentError::PostNotFound(_)
            | ContentError::CommentNotFound { .. }
            | ContentError::UserNotFound(_) => StatusCode::NOT_FOUND,
            ContentError::NotPostAuthor { .. } => StatusCode::FORBIDDEN,
        },
        DomainError::Graph(error) => match error {
            GraphError::SelfFollow => StatusCode::BAD_REQUEST,
            GraphError::AdminCannotFollow(_)
            | GraphError::NotFollowable(_)
            | GraphError::NotRegularUser(_) => StatusCode::FORBIDDEN,
            GraphError::UserNotFound(_) | GraphError::NoPendingRequest { .. } => {
                StatusCode::NOT_FOUND
            }
        },
        DomainError::Moderation(error) => match error {
            ModerationError::Invalid(_) | ModerationError::OwnComment => StatusCode::BAD_REQUEST,
            ModerationError::UserNotFound(_)
            | ModerationError::PostNotFound(_)
            | ModerationError::CommentNotFound { .. }
            | ModerationError::ReportNotFound(_)
            | ModerationError::NoPendingVerification(_) => StatusCode::NOT_FOUND,
            ModerationError::NotAdmin(_)
            | ModerationError::NotRegularUser(_)
            | ModerationError::CannotBanAdmin(_) => StatusCode::FORBIDDEN,
            ModerationError::VerificationAlreadyPending(_)
            | ModerationError::AlreadyReported { .. } => StatusCode::CONFLICT,
        },
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
struct ErrorResponse {
    status: u16,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!(error = %self, %status, "Replying with error");
        } else {
            debug!(error = %self, %status, "Rejecting request");
        }

        let error_response = ErrorResponse {
            status: status.as_u16(),
        };
        (status, Json(error_response)).into_response()
    }
}
