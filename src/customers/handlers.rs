use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    middleware::from_extractor_with_state,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::extractors::AdminUser,
    customers::{
        dto::{CustomerRequest, CustomerView},
        repo::CustomerDraft,
    },
    db::Persisted,
    error::{AppError, AppResult},
    state::AppState,
};

pub const CUSTOMER_NOT_FOUND: &str = "Customer not found";
pub const CUSTOMER_EMAIL_TAKEN: &str = "A customer with this email already exists";
pub const LINKED_USER_NOT_FOUND: &str = "Associated user not found";

/// Every customer route is admin-only.
pub fn customer_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/customers", get(list_customers).post(create_customer))
        .route(
            "/customers/:id",
            get(get_customer).put(update_customer).delete(delete_customer),
        )
        .route_layer(from_extractor_with_state::<AdminUser, _>(state))
}

async fn ensure_linked_user(state: &AppState, draft: &CustomerDraft) -> AppResult<()> {
    if let Some(user_id) = draft.user_id {
        if state.users.find_by_id(user_id).await?.is_none() {
            return Err(AppError::not_found(LINKED_USER_NOT_FOUND));
        }
    }
    Ok(())
}

#[instrument(skip(state))]
pub async fn list_customers(State(state): State<AppState>) -> AppResult<Json<Vec<CustomerView>>> {
    let customers = state.customers.list().await?;
    Ok(Json(customers.into_iter().map(CustomerView::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_customer(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Json<CustomerView>> {
    let Path(id) = id?;
    let customer = state
        .customers
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found(CUSTOMER_NOT_FOUND))?;
    Ok(Json(customer.into()))
}

#[instrument(skip(state, payload))]
pub async fn create_customer(
    State(state): State<AppState>,
    payload: Result<Json<CustomerRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<CustomerView>)> {
    let Json(payload) = payload?;
    let draft = payload.into_draft()?;

    if state.customers.find_by_email(&draft.email).await?.is_some() {
        return Err(AppError::conflict(CUSTOMER_EMAIL_TAKEN));
    }
    ensure_linked_user(&state, &draft).await?;

    match state.customers.create(&draft).await? {
        Persisted::Saved(customer) => {
            info!(customer_id = %customer.id, "customer created");
            Ok((StatusCode::CREATED, Json(customer.into())))
        }
        Persisted::Duplicate => {
            warn!("customer email taken by concurrent insert");
            Err(AppError::conflict(CUSTOMER_EMAIL_TAKEN))
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn update_customer(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<CustomerRequest>, JsonRejection>,
) -> AppResult<Json<CustomerView>> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let draft = payload.into_draft()?;

    let current = state
        .customers
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found(CUSTOMER_NOT_FOUND))?;

    if draft.email != current.email && state.customers.find_by_email(&draft.email).await?.is_some() {
        return Err(AppError::conflict(CUSTOMER_EMAIL_TAKEN));
    }
    ensure_linked_user(&state, &draft).await?;

    match state.customers.update(id, &draft).await? {
        Some(Persisted::Saved(customer)) => {
            info!(customer_id = %customer.id, "customer updated");
            Ok(Json(customer.into()))
        }
        Some(Persisted::Duplicate) => Err(AppError::conflict(CUSTOMER_EMAIL_TAKEN)),
        None => Err(AppError::not_found(CUSTOMER_NOT_FOUND)),
    }
}

#[instrument(skip(state))]
pub async fn delete_customer(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<StatusCode> {
    let Path(id) = id?;
    if state.customers.delete(id).await? {
        info!(customer_id = %id, "customer deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found(CUSTOMER_NOT_FOUND))
    }
}
