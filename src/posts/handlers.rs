use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::extractors::{AdminUser, AuthUser},
    db::Persisted,
    error::{AppError, AppResult},
    posts::dto::{PostRequest, PostView},
    state::AppState,
};

pub const SLUG_TAKEN: &str = "Slug already exists";
pub const POST_NOT_FOUND: &str = "Post not found";
pub const POST_NOT_PUBLISHED: &str = "Post not found or not published";

pub fn post_routes() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_published).post(create_post))
        .route("/posts/all", get(list_all))
        .route("/posts/slug/:slug", get(get_by_slug))
        .route("/posts/id/:id", get(get_by_id))
        .route("/posts/:id", put(update_post).delete(delete_post))
}

#[instrument(skip(state))]
pub async fn list_published(State(state): State<AppState>) -> AppResult<Json<Vec<PostView>>> {
    let posts = state.posts.list(true).await?;
    Ok(Json(posts.into_iter().map(PostView::public).collect()))
}

#[instrument(skip(state, _admin))]
pub async fn list_all(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> AppResult<Json<Vec<PostView>>> {
    let posts = state.posts.list(false).await?;
    Ok(Json(posts.into_iter().map(PostView::admin).collect()))
}

#[instrument(skip(state))]
pub async fn get_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<PostView>> {
    match state.posts.find_by_slug(&slug).await? {
        Some(post) if post.is_published => Ok(Json(PostView::public(post))),
        _ => Err(AppError::not_found(POST_NOT_PUBLISHED)),
    }
}

#[instrument(skip(state, _admin))]
pub async fn get_by_id(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Json<PostView>> {
    let Path(id) = id?;
    let post = state
        .posts
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found(POST_NOT_FOUND))?;
    Ok(Json(PostView::admin(post)))
}

#[instrument(skip(state, author, payload))]
pub async fn create_post(
    State(state): State<AppState>,
    AuthUser(author): AuthUser,
    payload: Result<Json<PostRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<PostView>)> {
    let Json(payload) = payload?;
    let draft = payload.into_draft()?;

    if state.posts.find_by_slug(&draft.slug).await?.is_some() {
        return Err(AppError::conflict(SLUG_TAKEN));
    }

    match state.posts.create(author.id, &draft).await? {
        Persisted::Saved(post) => {
            info!(post_id = %post.id, user_id = %author.id, slug = %post.slug, "post created");
            Ok((StatusCode::CREATED, Json(PostView::admin(post))))
        }
        Persisted::Duplicate => {
            warn!(slug = %draft.slug, "slug taken by concurrent insert");
            Err(AppError::conflict(SLUG_TAKEN))
        }
    }
}

#[instrument(skip(state, admin, payload))]
pub async fn update_post(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<PostRequest>, JsonRejection>,
) -> AppResult<Json<PostView>> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let draft = payload.into_draft()?;

    let current = state
        .posts
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found(POST_NOT_FOUND))?;

    if draft.slug != current.slug && state.posts.find_by_slug(&draft.slug).await?.is_some() {
        return Err(AppError::conflict(SLUG_TAKEN));
    }

    match state.posts.update(id, &draft).await? {
        Some(Persisted::Saved(post)) => {
            info!(post_id = %post.id, admin_id = %admin.id, "post updated");
            Ok(Json(PostView::admin(post)))
        }
        Some(Persisted::Duplicate) => Err(AppError::conflict(SLUG_TAKEN)),
        None => Err(AppError::not_found(POST_NOT_FOUND)),
    }
}

#[instrument(skip(state, admin))]
pub async fn delete_post(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<StatusCode> {
    let Path(id) = id?;
    if state.posts.delete(id).await? {
        info!(post_id = %id, admin_id = %admin.id, "post deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found(POST_NOT_FOUND))
    }
}
