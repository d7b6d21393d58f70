use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, put},
};
use uuid::Uuid;

use crate::{
    dto::catalog::{ComboList, CreateComboRequest, UpdateComboRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::ServiceCombo,
    response::ApiResponse,
    routes::params::ServiceQuery,
    services::catalog_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_combos).post(create_combo))
        .route("/{id}", get(get_combo))
        .route("/{id}", put(update_combo))
        .route("/{id}", delete(delete_combo))
}

#[utoipa::path(
    get,
    path = "/api/combos",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("q" = Option<String>, Query, description = "Search name/description"),
        ("min_price" = Option<i64>, Query, description = "Minimum price"),
        ("max_price" = Option<i64>, Query, description = "Maximum price")
    ),
    responses(
        (status = 200, description = "List combo packages", body = ApiResponse<ComboList>)
    ),
    tag = "Catalog"
)]
pub async fn list_combos(
    State(state): State<AppState>,
    Query(query): Query<ServiceQuery>,
) -> AppResult<Json<ApiResponse<ComboList>>> {
    let resp = catalog_service::list_combos(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/combos/{id}",
    params(
        ("id" = Uuid, Path, description = "Combo ID")
    ),
    responses(
        (status = 200, description = "Get combo", body = ApiResponse<ServiceCombo>),
        (status = 404, description = "Combo not found"),
    ),
    tag = "Catalog"
)]
pub async fn get_combo(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ServiceCombo>>> {
    let resp = catalog_service::get_combo(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/combos",
    request_body = CreateComboRequest,
    responses(
        (status = 201, description = "Create combo", body = ApiResponse<ServiceCombo>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn create_combo(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateComboRequest>,
) -> AppResult<Json<ApiResponse<ServiceCombo>>> {
    let resp = catalog_service::create_combo(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/combos/{id}",
    params(
        ("id" = Uuid, Path, description = "Combo ID")
    ),
    request_body = UpdateComboRequest,
    responses(
        (status = 200, description = "Updated combo", body = ApiResponse<ServiceCombo>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn update_combo(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateComboRequest>,
) -> AppResult<Json<ApiResponse<ServiceCombo>>> {
    let resp = catalog_service::update_combo(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/combos/{id}",
    params(
        ("id" = Uuid, Path, description = "Combo ID")
    ),
    responses(
        (status = 200, description = "Deleted combo"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn delete_combo(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = catalog_service::delete_combo(&state, &user, id).await?;
    Ok(Json(resp))
}
