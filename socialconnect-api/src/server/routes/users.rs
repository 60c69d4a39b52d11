use crate::server::{
    Result, ServerError, ServerRouter, SharedNetwork,
    extract::{Json, Query},
    mutate, read_network,
    view::{self, CountResponse, FollowResponse, UserView},
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::{Deserialize, Serialize};
use socialconnect_common::model::{Id, post::Post, user::UserMarker};
use socialconnect_domain::{Error as DomainError, identity::ProfileChanges};

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(get_users)
        .typed_get(search_users)
        .typed_get(get_email_taken)
        .typed_get(get_user_count)
        .typed_get(get_user_by_username)
        .typed_get(get_user_by_email)
        .typed_get(get_user)
        .typed_get(get_user_posts)
        .typed_get(get_relationship)
        .typed_patch(update_profile)
        .typed_post(follow)
        .typed_get(get_follow_requests)
        .typed_get(get_follow_request_count)
        .typed_post(approve_follow_request)
        .typed_post(reject_follow_request)
        .typed_get(get_feed)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users", rejection(ServerError))]
struct GetUsersPath();

async fn get_users(
    GetUsersPath(): GetUsersPath,
    State(network): State<SharedNetwork>,
) -> Json<Vec<UserView>> {
    Json(view::users(read_network(&network).all_users()))
}

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    query: String,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/search", rejection(ServerError))]
struct SearchUsersPath();

async fn search_users(
    SearchUsersPath(): SearchUsersPath,
    State(network): State<SharedNetwork>,
    Query(SearchQuery { query }): Query<SearchQuery>,
) -> Json<Vec<UserView>> {
    Json(view::users(read_network(&network).search_users(&query)))
}

#[derive(Deserialize)]
struct EmailQuery {
    email: String,
}

#[derive(Serialize)]
struct EmailTakenResponse {
    taken: bool,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/email-taken", rejection(ServerError))]
struct EmailTakenPath();

async fn get_email_taken(
    EmailTakenPath(): EmailTakenPath,
    State(network): State<SharedNetwork>,
    Query(EmailQuery { email }): Query<EmailQuery>,
) -> Json<EmailTakenResponse> {
    Json(EmailTakenResponse {
        taken: read_network(&network).is_email_taken(&email),
    })
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/count", rejection(ServerError))]
struct UserCountPath();

async fn get_user_count(
    UserCountPath(): UserCountPath,
    State(network): State<SharedNetwork>,
) -> Json<CountResponse> {
    Json(CountResponse {
        count: read_network(&network).user_count(),
    })
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/by-username/{username}", rejection(ServerError))]
struct UserByUsernamePath {
    username: String,
}

async fn get_user_by_username(
    UserByUsernamePath { username }: UserByUsernamePath,
    State(network): State<SharedNetwork>,
) -> Result<Json<UserView>> {
    let network = read_network(&network);
    let user = network
        .user_by_username(&username)
        .ok_or(ServerError::UserByUsernameNotFound(username))?;

    Ok(Json(user.into()))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/by-email", rejection(ServerError))]
struct UserByEmailPath();

async fn get_user_by_email(
    UserByEmailPath(): UserByEmailPath,
    State(network): State<SharedNetwork>,
    Query(EmailQuery { email }): Query<EmailQuery>,
) -> Result<Json<UserView>> {
    let network = read_network(&network);
    let user = network
        .user_by_email(&email)
        .ok_or(ServerError::UserByEmailNotFound(email))?;

    Ok(Json(user.into()))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}", rejection(ServerError))]
struct GetUserPath {
    id: Id<UserMarker>,
}

async fn get_user(
    GetUserPath { id }: GetUserPath,
    State(network): State<SharedNetwork>,
) -> Result<Json<UserView>> {
    let network = read_network(&network);
    let user = network.user(id).ok_or(ServerError::UserByIdNotFound(id))?;

    Ok(Json(user.into()))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}/posts", rejection(ServerError))]
struct GetUserPostsPath {
    id: Id<UserMarker>,
}

async fn get_user_posts(
    GetUserPostsPath { id }: GetUserPostsPath,
    State(network): State<SharedNetwork>,
) -> Result<Json<Vec<Post>>> {
    let network = read_network(&network);
    if network.user(id).is_none() {
        return Err(ServerError::UserByIdNotFound(id));
    }

    Ok(Json(
        network.posts_by_user(id).into_iter().cloned().collect(),
    ))
}

#[derive(Serialize)]
struct RelationshipResponse {
    following: bool,
    requested: bool,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}/relationship", rejection(ServerError))]
struct GetRelationshipPath {
    id: Id<UserMarker>,
}

async fn get_relationship(
    GetRelationshipPath { id }: GetRelationshipPath,
    State(network): State<SharedNetwork>,
) -> Json<RelationshipResponse> {
    let network = read_network(&network);

    Json(RelationshipResponse {
        following: network.is_following(id),
        requested: network.has_sent_follow_request(id),
    })
}

/// Only the fields present are changed, and nothing is changed if any of them is rejected. An
/// empty `profile_photo` removes the photo.
#[derive(Deserialize)]
struct ProfileUpdate {
    full_name: Option<String>,
    bio: Option<String>,
    email: Option<String>,
    age: Option<u32>,
    password: Option<String>,
    private_account: Option<bool>,
    profile_photo: Option<String>,
}

impl From<ProfileUpdate> for ProfileChanges {
    fn from(update: ProfileUpdate) -> Self {
        ProfileChanges {
            full_name: update.full_name,
            bio: update.bio,
            email: update.email,
            age: update.age,
            password: update.password,
            private_account: update.private_account,
            profile_photo: update.profile_photo,
        }
    }
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/me", rejection(ServerError))]
struct ProfilePath();

async fn update_profile(
    ProfilePath(): ProfilePath,
    State(network): State<SharedNetwork>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<UserView>> {
    let user = mutate(network, |network| {
        network.update_profile(update.into())?;
        network.current_user().cloned().ok_or(DomainError::NotLoggedIn)
    })
    .await?;

    Ok(Json(UserView::own(&user)))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}/follow", rejection(ServerError))]
struct FollowPath {
    id: Id<UserMarker>,
}

async fn follow(
    FollowPath { id }: FollowPath,
    State(network): State<SharedNetwork>,
) -> Result<Json<FollowResponse>> {
    let outcome = mutate(network, move |network| network.follow(id)).await?;

    Ok(Json(FollowResponse {
        state: outcome.into(),
    }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/me/follow-requests", rejection(ServerError))]
struct FollowRequestsPath();

async fn get_follow_requests(
    FollowRequestsPath(): FollowRequestsPath,
    State(network): State<SharedNetwork>,
) -> Result<Json<Vec<UserView>>> {
    let network = read_network(&network);

    Ok(Json(view::users(network.pending_follow_requests()?)))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/me/follow-requests/count", rejection(ServerError))]
struct FollowRequestCountPath();

async fn get_follow_request_count(
    FollowRequestCountPath(): FollowRequestCountPath,
    State(network): State<SharedNetwork>,
) -> Result<Json<CountResponse>> {
    let count = read_network(&network).pending_follow_request_count()?;

    Ok(Json(CountResponse { count }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/me/follow-requests/{id}/approve", rejection(ServerError))]
struct ApproveFollowRequestPath {
    id: Id<UserMarker>,
}

async fn approve_follow_request(
    ApproveFollowRequestPath { id }: ApproveFollowRequestPath,
    State(network): State<SharedNetwork>,
) -> Result<StatusCode> {
    mutate(network, move |network| network.approve_follow_request(id)).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/me/follow-requests/{id}/reject", rejection(ServerError))]
struct RejectFollowRequestPath {
    id: Id<UserMarker>,
}

async fn reject_follow_request(
    RejectFollowRequestPath { id }: RejectFollowRequestPath,
    State(network): State<SharedNetwork>,
) -> Result<StatusCode> {
    mutate(network, move |network| network.reject_follow_request(id)).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/feed", rejection(ServerError))]
struct FeedPath();

async fn get_feed(
    FeedPath(): FeedPath,
    State(network): State<SharedNetwork>,
) -> Result<Json<Vec<Post>>> {
    let network = read_network(&network);

    Ok(Json(network.feed()?.into_iter().cloned().collect()))
}

#[cfg(test)]
mod tests {
    use crate::server::{
        read_network,
        tests::{app, send},
    };
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use tempfile::TempDir;

    async fn register(app: &axum::Router, username: &str) {
        let (status, _) = send(
            app,
            Method::POST,
            "/register",
            Some(json!({
                "username": username,
                "password": "pw123456",
                "full_name": username,
                "email": format!("{username}@gmail.com"),
                "age": 22,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn rejected_profile_update_changes_nothing() {
        let dir = TempDir::new().unwrap();
        let (app, network) = app(&dir);
        register(&app, "alice").await;
        register(&app, "bob").await;
        send(
            &app,
            Method::POST,
            "/login",
            Some(json!({ "username": "alice", "password": "pw123456" })),
        )
        .await;

        let (status, _) = send(
            &app,
            Method::PATCH,
            "/me",
            Some(json!({ "full_name": "Changed", "email": "bob@gmail.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(
            read_network(&network)
                .user_by_username("alice")
                .map(|user| user.full_name.clone())
                .as_deref(),
            Some("alice")
        );

        let (status, body) = send(
            &app,
            Method::PATCH,
            "/me",
            Some(json!({ "full_name": "Alice A", "bio": "hello" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["full_name"], "Alice A");
        assert_eq!(body["bio"], "hello");
        assert_eq!(body["email"], "alice@gmail.com");
    }

    #[tokio::test]
    async fn other_users_emails_are_hidden() {
        let dir = TempDir::new().unwrap();
        let (app, _) = app(&dir);
        register(&app, "alice").await;
        register(&app, "bob").await;

        let (status, body) = send(&app, Method::GET, "/users", None).await;
        assert_eq!(status, StatusCode::OK);
        let users = body.as_array().unwrap();
        assert_eq!(users.len(), 2);
        assert!(users.iter().all(|user| user.get("email").is_none()));

        let (status, body) = send(&app, Method::GET, "/users/search?query=bo", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["username"], "bob");
        assert!(body[0].get("email").is_none());
    }
}
