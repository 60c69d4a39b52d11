use crate::server::{
    Result, ServerError, ServerRouter, SharedNetwork,
    extract::{Json, Query},
    mutate, read_network,
    view::{SessionView, UserView},
    write_network,
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::{Deserialize, Serialize};
use socialconnect_common::model::user::UserType;
use socialconnect_domain::identity::Registration;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(register)
        .typed_post(login)
        .typed_get(get_login_banned)
        .typed_post(logout)
        .typed_get(get_session)
}

/// `admin` is only honoured for requests made while an administrator is logged in.
#[derive(Deserialize)]
struct RegisterRequest {
    username: String,
    password: String,
    full_name: String,
    email: String,
    age: u32,
    #[serde(default)]
    admin: bool,
}

impl From<RegisterRequest> for Registration {
    fn from(request: RegisterRequest) -> Self {
        Registration {
            username: request.username,
            password: request.password,
            full_name: request.full_name,
            email: request.email,
            age: request.age,
            user_type: UserType::Regular,
        }
    }
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/register", rejection(ServerError))]
struct RegisterPath();

async fn register(
    RegisterPath(): RegisterPath,
    State(network): State<SharedNetwork>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserView>)> {
    let user = mutate(network, |network| {
        if request.admin {
            network.register_admin(request.into())
        } else {
            network.register(request.into())
        }
    })
    .await?;

    Ok((StatusCode::CREATED, Json(UserView::own(&user))))
}

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/login", rejection(ServerError))]
struct LoginPath();

async fn login(
    LoginPath(): LoginPath,
    State(network): State<SharedNetwork>,
    Json(LoginRequest { username, password }): Json<LoginRequest>,
) -> Result<Json<UserView>> {
    let user = mutate(network, move |network| network.login(&username, &password)).await?;

    Ok(Json(UserView::own(&user)))
}

#[derive(Deserialize)]
struct UsernameQuery {
    username: String,
}

#[derive(Serialize)]
struct LoginBannedResponse {
    banned: bool,
}

/// Tells a client whether a failed login was caused by a ban rather than wrong credentials.
#[derive(TypedPath, Deserialize)]
#[typed_path("/login/banned", rejection(ServerError))]
struct LoginBannedPath();

async fn get_login_banned(
    LoginBannedPath(): LoginBannedPath,
    State(network): State<SharedNetwork>,
    Query(UsernameQuery { username }): Query<UsernameQuery>,
) -> Json<LoginBannedResponse> {
    Json(LoginBannedResponse {
        banned: read_network(&network).is_login_banned(&username),
    })
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/logout", rejection(ServerError))]
struct LogoutPath();

async fn logout(LogoutPath(): LogoutPath, State(network): State<SharedNetwork>) -> StatusCode {
    write_network(&network).logout();

    StatusCode::NO_CONTENT
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/session", rejection(ServerError))]
struct SessionPath();

async fn get_session(
    SessionPath(): SessionPath,
    State(network): State<SharedNetwork>,
) -> Json<SessionView> {
    let network = read_network(&network);

    Json(SessionView {
        user: network.current_user().map(UserView::own),
    })
}

#[cfg(test)]
mod tests {
    use crate::server::{
        read_network,
        tests::{app, send},
        write_network,
    };
    use axum::http::{Method, StatusCode};
    use serde_json::{Value, json};
    use socialconnect_common::model::user::UserType;
    use socialconnect_domain::identity::Registration;
    use tempfile::TempDir;

    fn registration(username: &str, admin: bool) -> Value {
        json!({
            "username": username,
            "password": "pw123456",
            "full_name": username.to_uppercase(),
            "email": format!("{username}@gmail.com"),
            "age": 22,
            "admin": admin,
        })
    }

    fn credentials(username: &str) -> Value {
        json!({ "username": username, "password": "pw123456" })
    }

    #[tokio::test]
    async fn anonymous_clients_cannot_register_admins() {
        let dir = TempDir::new().unwrap();
        let (app, network) = app(&dir);

        let (status, body) = send(
            &app,
            Method::POST,
            "/register",
            Some(registration("mallory", true)),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["status"], 401);
        assert!(read_network(&network).user_by_username("mallory").is_none());

        let (status, body) = send(
            &app,
            Method::POST,
            "/register",
            Some(registration("alice", false)),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["user_type"], "regular");
        assert_eq!(body["email"], "alice@gmail.com");
    }

    #[tokio::test]
    async fn only_admin_sessions_register_admins() {
        let dir = TempDir::new().unwrap();
        let (app, network) = app(&dir);
        let (status, _) = send(
            &app,
            Method::POST,
            "/register",
            Some(registration("alice", false)),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        write_network(&network)
            .register(Registration {
                username: "root".to_owned(),
                password: "pw123456".to_owned(),
                full_name: "Root".to_owned(),
                email: "root@gmail.com".to_owned(),
                age: 30,
                user_type: UserType::Admin,
            })
            .unwrap();

        send(&app, Method::POST, "/login", Some(credentials("alice"))).await;
        let (status, _) = send(
            &app,
            Method::POST,
            "/register",
            Some(registration("mallory", true)),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        send(&app, Method::POST, "/login", Some(credentials("root"))).await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/register",
            Some(registration("moderator", true)),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["user_type"], "admin");
    }
}
