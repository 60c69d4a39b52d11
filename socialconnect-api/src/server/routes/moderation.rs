use crate::server::{
    Result, ServerError, ServerRouter, SharedNetwork,
    extract::Json,
    mutate, read_network,
    view::CountResponse,
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::{Deserialize, Serialize};
use socialconnect_common::model::{
    Id,
    moderation::{CommentReport, ReportMarker, VerificationRequest},
    post::{CommentMarker, PostMarker},
    user::UserMarker,
};

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(request_verification)
        .typed_get(get_verification_requests)
        .typed_post(verify_user)
        .typed_post(unverify_user)
        .typed_post(reject_verification_request)
        .typed_post(ban_user)
        .typed_post(unban_user)
        .typed_get(get_moderation_status)
        .typed_post(report_comment)
        .typed_get(get_reports)
        .typed_get(get_report_count)
        .typed_post(resolve_report)
        .typed_delete(delete_reported_comment)
}

#[derive(Deserialize)]
struct VerificationBody {
    evidence_path: String,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/verification-requests", rejection(ServerError))]
struct VerificationRequestsPath();

async fn request_verification(
    VerificationRequestsPath(): VerificationRequestsPath,
    State(network): State<SharedNetwork>,
    Json(VerificationBody { evidence_path }): Json<VerificationBody>,
) -> Result<(StatusCode, Json<VerificationRequest>)> {
    let request = mutate(network, |network| {
        network.request_verification(evidence_path)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(request)))
}

async fn get_verification_requests(
    VerificationRequestsPath(): VerificationRequestsPath,
    State(network): State<SharedNetwork>,
) -> Result<Json<Vec<VerificationRequest>>> {
    let network = read_network(&network);
    let pending = network.pending_verification_requests()?;

    Ok(Json(pending.into_iter().cloned().collect()))
}

#[derive(Serialize)]
struct ModerationStatus {
    banned: bool,
    verification_pending: bool,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}/moderation", rejection(ServerError))]
struct ModerationStatusPath {
    id: Id<UserMarker>,
}

async fn get_moderation_status(
    ModerationStatusPath { id }: ModerationStatusPath,
    State(network): State<SharedNetwork>,
) -> Result<Json<ModerationStatus>> {
    let network = read_network(&network);
    if network.user(id).is_none() {
        return Err(ServerError::UserByIdNotFound(id));
    }

    Ok(Json(ModerationStatus {
        banned: network.is_user_banned(id),
        verification_pending: network.has_pending_verification_request(id),
    }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}/verify", rejection(ServerError))]
struct VerifyPath {
    id: Id<UserMarker>,
}

async fn verify_user(
    VerifyPath { id }: VerifyPath,
    State(network): State<SharedNetwork>,
) -> Result<StatusCode> {
    mutate(network, move |network| network.verify_user(id)).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}/unverify", rejection(ServerError))]
struct UnverifyPath {
    id: Id<UserMarker>,
}

async fn unverify_user(
    UnverifyPath { id }: UnverifyPath,
    State(network): State<SharedNetwork>,
) -> Result<StatusCode> {
    mutate(network, move |network| network.unverify_user(id)).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}/verification/reject", rejection(ServerError))]
struct RejectVerificationPath {
    id: Id<UserMarker>,
}

async fn reject_verification_request(
    RejectVerificationPath { id }: RejectVerificationPath,
    State(network): State<SharedNetwork>,
) -> Result<StatusCode> {
    mutate(network, move |network| network.reject_verification_request(id)).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}/ban", rejection(ServerError))]
struct BanPath {
    id: Id<UserMarker>,
}

async fn ban_user(
    BanPath { id }: BanPath,
    State(network): State<SharedNetwork>,
) -> Result<StatusCode> {
    mutate(network, move |network| network.ban_user(id)).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}/unban", rejection(ServerError))]
struct UnbanPath {
    id: Id<UserMarker>,
}

async fn unban_user(
    UnbanPath { id }: UnbanPath,
    State(network): State<SharedNetwork>,
) -> Result<StatusCode> {
    mutate(network, move |network| network.unban_user(id)).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct ReportBody {
    reason: String,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{post}/comments/{comment}/report", rejection(ServerError))]
struct ReportCommentPath {
    post: Id<PostMarker>,
    comment: Id<CommentMarker>,
}

async fn report_comment(
    ReportCommentPath { post, comment }: ReportCommentPath,
    State(network): State<SharedNetwork>,
    Json(ReportBody { reason }): Json<ReportBody>,
) -> Result<(StatusCode, Json<CommentReport>)> {
    let report = mutate(network, move |network| {
        network.report_comment(post, comment, &reason)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(report)))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/reports", rejection(ServerError))]
struct ReportsPath();

async fn get_reports(
    ReportsPath(): ReportsPath,
    State(network): State<SharedNetwork>,
) -> Result<Json<Vec<CommentReport>>> {
    let network = read_network(&network);
    let unresolved = network.unresolved_reports()?;

    Ok(Json(unresolved.into_iter().cloned().collect()))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/reports/count", rejection(ServerError))]
struct ReportCountPath();

async fn get_report_count(
    ReportCountPath(): ReportCountPath,
    State(network): State<SharedNetwork>,
) -> Result<Json<CountResponse>> {
    let count = read_network(&network).unresolved_report_count()?;

    Ok(Json(CountResponse { count }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/reports/{id}/resolve", rejection(ServerError))]
struct ResolveReportPath {
    id: Id<ReportMarker>,
}

async fn resolve_report(
    ResolveReportPath { id }: ResolveReportPath,
    State(network): State<SharedNetwork>,
) -> Result<StatusCode> {
    mutate(network, move |network| network.resolve_report(id)).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{post}/comments/{comment}", rejection(ServerError))]
struct CommentPath {
    post: Id<PostMarker>,
    comment: Id<CommentMarker>,
}

async fn delete_reported_comment(
    CommentPath { post, comment }: CommentPath,
    State(network): State<SharedNetwork>,
) -> Result<StatusCode> {
    mutate(network, move |network| {
        network.delete_reported_comment(post, comment)
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}
