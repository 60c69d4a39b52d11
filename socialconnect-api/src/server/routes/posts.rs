use crate::server::{
    Result, ServerError, ServerRouter, SharedNetwork,
    extract::Json,
    mutate, read_network,
    view::{LikeResponse, LikeSummary},
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use socialconnect_common::model::{
    Id,
    post::{Comment, CommentMarker, Post, PostContent, PostMarker},
};

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(get_posts)
        .typed_get(get_post)
        .typed_post(create_post)
        .typed_delete(delete_post)
        .typed_post(toggle_like)
        .typed_get(get_like)
        .typed_post(add_comment)
        .typed_post(toggle_comment_like)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts", rejection(ServerError))]
struct GetPostsPath();

async fn get_posts(
    GetPostsPath(): GetPostsPath,
    State(network): State<SharedNetwork>,
) -> Json<Vec<Post>> {
    Json(
        read_network(&network)
            .all_posts()
            .into_iter()
            .cloned()
            .collect(),
    )
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{post}", rejection(ServerError))]
struct PostPath {
    post: Id<PostMarker>,
}

async fn get_post(
    PostPath { post }: PostPath,
    State(network): State<SharedNetwork>,
) -> Result<Json<Post>> {
    let post = read_network(&network)
        .post(post)
        .cloned()
        .ok_or(ServerError::PostByIdNotFound(post))?;

    Ok(Json(post))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/create", rejection(ServerError))]
struct CreatePostPath();

async fn create_post(
    CreatePostPath(): CreatePostPath,
    State(network): State<SharedNetwork>,
    Json(content): Json<PostContent>,
) -> Result<(StatusCode, Json<Post>)> {
    let post = mutate(network, |network| match content {
        PostContent::Text { body } => network.create_text_post(body),
        PostContent::Image { path, caption } => network.create_image_post(path, caption),
    })
    .await?;

    Ok((StatusCode::CREATED, Json(post)))
}

async fn delete_post(
    PostPath { post }: PostPath,
    State(network): State<SharedNetwork>,
) -> Result<StatusCode> {
    mutate(network, move |network| network.delete_post(post)).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{post}/like", rejection(ServerError))]
struct LikePath {
    post: Id<PostMarker>,
}

async fn toggle_like(
    LikePath { post }: LikePath,
    State(network): State<SharedNetwork>,
) -> Result<Json<LikeResponse>> {
    let liked = mutate(network, move |network| network.toggle_like(post)).await?;

    Ok(Json(LikeResponse { liked }))
}

async fn get_like(
    LikePath { post }: LikePath,
    State(network): State<SharedNetwork>,
) -> Result<Json<LikeSummary>> {
    let network = read_network(&network);
    let count = network
        .post(post)
        .ok_or(ServerError::PostByIdNotFound(post))?
        .like_count();

    Ok(Json(LikeSummary {
        liked: network.is_post_liked_by_current_user(post),
        count,
    }))
}

#[derive(Deserialize)]
struct CommentRequest {
    content: String,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{post}/comments", rejection(ServerError))]
struct CommentsPath {
    post: Id<PostMarker>,
}

async fn add_comment(
    CommentsPath { post }: CommentsPath,
    State(network): State<SharedNetwork>,
    Json(CommentRequest { content }): Json<CommentRequest>,
) -> Result<(StatusCode, Json<Comment>)> {
    let comment = mutate(network, move |network| network.add_comment(post, content)).await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{post}/comments/{comment}/like", rejection(ServerError))]
struct CommentLikePath {
    post: Id<PostMarker>,
    comment: Id<CommentMarker>,
}

async fn toggle_comment_like(
    CommentLikePath { post, comment }: CommentLikePath,
    State(network): State<SharedNetwork>,
) -> Result<Json<LikeResponse>> {
    let liked = mutate(network, move |network| {
        network.toggle_comment_like(post, comment)
    })
    .await?;

    Ok(Json(LikeResponse { liked }))
}
