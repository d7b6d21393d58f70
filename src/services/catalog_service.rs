use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::catalog::{
        ComboList, CreateComboRequest, CreateServiceRequest, ServiceList, UpdateComboRequest,
        UpdateServiceRequest,
    },
    entity::{
        service_combos::{
            ActiveModel as ComboActive, Column as ComboCol, Entity as ServiceCombos,
            Model as ComboModel,
        },
        services::{
            ActiveModel as ServiceActive, Column as ServiceCol, Entity as Services,
            Model as ServiceModel,
        },
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Service, ServiceCombo},
    response::{ApiResponse, Meta},
    routes::params::{ServiceQuery, ServiceSortBy, SortOrder},
    state::AppState,
};

pub async fn list_services(
    state: &AppState,
    query: ServiceQuery,
) -> AppResult<ApiResponse<ServiceList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all();

    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(ServiceCol::Name).ilike(pattern.clone()))
                .add(Expr::col(ServiceCol::Description).ilike(pattern.clone()))
                .add(Expr::col(ServiceCol::Location).ilike(pattern)),
        );
    }

    if let Some(min_price) = query.min_price {
        condition = condition.add(ServiceCol::Price.gte(min_price));
    }

    if let Some(max_price) = query.max_price {
        condition = condition.add(ServiceCol::Price.lte(max_price));
    }

    let sort_by = query.sort_by.unwrap_or(ServiceSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let sort_col = match sort_by {
        ServiceSortBy::CreatedAt => ServiceCol::CreatedAt,
        ServiceSortBy::Price => ServiceCol::Price,
        ServiceSortBy::Name => ServiceCol::Name,
    };

    let mut finder = Services::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(service_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Services",
        ServiceList { items },
        Some(meta),
    ))
}

pub async fn get_service(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Service>> {
    let result = Services::find_by_id(id)
        .one(&state.orm)
        .await?
        .map(service_from_entity);
    let result = match result {
        Some(s) => s,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success("Service", result, None))
}

pub async fn create_service(
    state: &AppState,
    user: &AuthUser,
    payload: CreateServiceRequest,
) -> AppResult<ApiResponse<Service>> {
    ensure_admin(user)?;
    if payload.price < 0 {
        return Err(AppError::BadRequest("Price cannot be negative".into()));
    }
    let active = ServiceActive {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name),
        description: Set(payload.description),
        price: Set(payload.price),
        duration_days: Set(payload.duration_days.unwrap_or(1)),
        location: Set(payload.location),
        created_at: NotSet,
    };
    let service = active.insert(&state.orm).await?;

    if let Err(err) = log_audit(
        state,
        Some(user.user_id),
        "service_create",
        Some("services"),
        Some(serde_json::json!({ "service_id": service.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Service created",
        service_from_entity(service),
        Some(Meta::empty()),
    ))
}

pub async fn update_service(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateServiceRequest,
) -> AppResult<ApiResponse<Service>> {
    ensure_admin(user)?;
    let existing = Services::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(s) => s,
        None => return Err(AppError::NotFound),
    };

    let mut active: ServiceActive = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(price) = payload.price {
        if price < 0 {
            return Err(AppError::BadRequest("Price cannot be negative".into()));
        }
        active.price = Set(price);
    }
    if let Some(duration_days) = payload.duration_days {
        active.duration_days = Set(duration_days);
    }
    if let Some(location) = payload.location {
        active.location = Set(Some(location));
    }

    let service = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        state,
        Some(user.user_id),
        "service_update",
        Some("services"),
        Some(serde_json::json!({ "service_id": service.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Updated",
        service_from_entity(service),
        Some(Meta::empty()),
    ))
}

pub async fn delete_service(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Services::delete_by_id(id).exec(&state.orm).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        state,
        Some(user.user_id),
        "service_delete",
        Some("services"),
        Some(serde_json::json!({ "service_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn list_combos(
    state: &AppState,
    query: ServiceQuery,
) -> AppResult<ApiResponse<ComboList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all();

    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(ComboCol::Name).ilike(pattern.clone()))
                .add(Expr::col(ComboCol::Description).ilike(pattern)),
        );
    }

    if let Some(min_price) = query.min_price {
        condition = condition.add(ComboCol::Price.gte(min_price));
    }

    if let Some(max_price) = query.max_price {
        condition = condition.add(ComboCol::Price.lte(max_price));
    }

    let sort_by = query.sort_by.unwrap_or(ServiceSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let sort_col = match sort_by {
        ServiceSortBy::CreatedAt => ComboCol::CreatedAt,
        ServiceSortBy::Price => ComboCol::Price,
        ServiceSortBy::Name => ComboCol::Name,
    };

    let mut finder = ServiceCombos::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(combo_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Combos",
        ComboList { items },
        Some(meta),
    ))
}

pub async fn get_combo(state: &AppState, id: Uuid) -> AppResult<ApiResponse<ServiceCombo>> {
    let result = ServiceCombos::find_by_id(id)
        .one(&state.orm)
        .await?
        .map(combo_from_entity);
    let result = match result {
        Some(c) => c,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success("Combo", result, None))
}

pub async fn create_combo(
    state: &AppState,
    user: &AuthUser,
    payload: CreateComboRequest,
) -> AppResult<ApiResponse<ServiceCombo>> {
    ensure_admin(user)?;
    if payload.price < 0 {
        return Err(AppError::BadRequest("Price cannot be negative".into()));
    }
    let active = ComboActive {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name),
        description: Set(payload.description),
        price: Set(payload.price),
        created_at: NotSet,
    };
    let combo = active.insert(&state.orm).await?;

    if let Err(err) = log_audit(
        state,
        Some(user.user_id),
        "combo_create",
        Some("service_combos"),
        Some(serde_json::json!({ "service_combo_id": combo.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Combo created",
        combo_from_entity(combo),
        Some(Meta::empty()),
    ))
}

pub async fn update_combo(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateComboRequest,
) -> AppResult<ApiResponse<ServiceCombo>> {
    ensure_admin(user)?;
    let existing = ServiceCombos::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(c) => c,
        None => return Err(AppError::NotFound),
    };

    let mut active: ComboActive = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(price) = payload.price {
        if price < 0 {
            return Err(AppError::BadRequest("Price cannot be negative".into()));
        }
        active.price = Set(price);
    }

    let combo = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        state,
        Some(user.user_id),
        "combo_update",
        Some("service_combos"),
        Some(serde_json::json!({ "service_combo_id": combo.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Updated",
        combo_from_entity(combo),
        Some(Meta::empty()),
    ))
}

pub async fn delete_combo(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = ServiceCombos::delete_by_id(id).exec(&state.orm).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        state,
        Some(user.user_id),
        "combo_delete",
        Some("service_combos"),
        Some(serde_json::json!({ "service_combo_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

fn service_from_entity(model: ServiceModel) -> Service {
    Service {
        id: model.id,
        name: model.name,
        description: model.description,
        price: model.price,
        duration_days: model.duration_days,
        location: model.location,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn combo_from_entity(model: ComboModel) -> ServiceCombo {
    ServiceCombo {
        id: model.id,
        name: model.name,
        description: model.description,
        price: model.price,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
