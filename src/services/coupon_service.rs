use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::coupons::{CouponList, CreateCouponRequest, UpdateCouponRequest, ValidateCouponRequest},
    entity::coupons::{
        ActiveModel as CouponActive, Column as CouponCol, Entity as Coupons, Model as CouponModel,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Coupon,
    pricing::DiscountType,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

pub async fn list_coupons(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<CouponList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = pagination.normalize();

    let finder = Coupons::find().order_by_desc(CouponCol::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(coupon_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Coupons",
        CouponList { items },
        Some(meta),
    ))
}

pub async fn create_coupon(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCouponRequest,
) -> AppResult<ApiResponse<Coupon>> {
    ensure_admin(user)?;
    validate_discount(payload.discount_type, payload.value)?;

    let exists = Coupons::find()
        .filter(CouponCol::Code.eq(payload.code.clone()))
        .count(&state.orm)
        .await?;
    if exists > 0 {
        return Err(AppError::BadRequest("Coupon code already exists".into()));
    }

    let discount_type = match payload.discount_type {
        DiscountType::Percent => "percent",
        DiscountType::Fixed => "fixed",
    };

    let coupon = CouponActive {
        id: Set(Uuid::new_v4()),
        code: Set(payload.code),
        description: Set(payload.description),
        discount_type: Set(discount_type.to_string()),
        value: Set(payload.value),
        active: Set(true),
        expires_at: Set(payload.expires_at.map(Into::into)),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    if let Err(err) = log_audit(
        state,
        Some(user.user_id),
        "coupon_create",
        Some("coupons"),
        Some(serde_json::json!({ "coupon_id": coupon.id, "code": coupon.code })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Coupon created",
        coupon_from_entity(coupon),
        Some(Meta::empty()),
    ))
}

pub async fn update_coupon(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateCouponRequest,
) -> AppResult<ApiResponse<Coupon>> {
    ensure_admin(user)?;
    let existing = Coupons::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(c) => c,
        None => return Err(AppError::NotFound),
    };

    let discount_type = payload.discount_type.unwrap_or(
        existing
            .discount_type
            .parse()
            .map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))?,
    );
    let value = payload.value.unwrap_or(existing.value);
    validate_discount(discount_type, value)?;

    let mut active: CouponActive = existing.into();
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    active.discount_type = Set(match discount_type {
        DiscountType::Percent => "percent".to_string(),
        DiscountType::Fixed => "fixed".to_string(),
    });
    active.value = Set(value);
    if let Some(is_active) = payload.active {
        active.active = Set(is_active);
    }
    if let Some(expires_at) = payload.expires_at {
        active.expires_at = Set(Some(expires_at.into()));
    }

    let coupon = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        state,
        Some(user.user_id),
        "coupon_update",
        Some("coupons"),
        Some(serde_json::json!({ "coupon_id": coupon.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Updated",
        coupon_from_entity(coupon),
        Some(Meta::empty()),
    ))
}

pub async fn delete_coupon(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Coupons::delete_by_id(id).exec(&state.orm).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        state,
        Some(user.user_id),
        "coupon_delete",
        Some("coupons"),
        Some(serde_json::json!({ "coupon_id": id })),
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

/// Public check used by the checkout form before a booking is created.
pub async fn validate_coupon(
    state: &AppState,
    payload: ValidateCouponRequest,
) -> AppResult<ApiResponse<Coupon>> {
    let coupon = Coupons::find()
        .filter(CouponCol::Code.eq(payload.code))
        .one(&state.orm)
        .await?;
    let coupon = match coupon {
        Some(c) => c,
        None => return Err(AppError::NotFound),
    };

    if !coupon.active {
        return Err(AppError::BadRequest("Coupon is inactive".into()));
    }
    if let Some(expires_at) = coupon.expires_at {
        if expires_at < Utc::now() {
            return Err(AppError::BadRequest("Coupon has expired".into()));
        }
    }

    Ok(ApiResponse::success(
        "Coupon is valid",
        coupon_from_entity(coupon),
        Some(Meta::empty()),
    ))
}

fn validate_discount(discount_type: DiscountType, value: i64) -> AppResult<()> {
    match discount_type {
        DiscountType::Percent => {
            if !(0..=100).contains(&value) {
                return Err(AppError::BadRequest(
                    "Percent discount must be between 0 and 100".into(),
                ));
            }
        }
        DiscountType::Fixed => {
            if value < 0 {
                return Err(AppError::BadRequest(
                    "Fixed discount cannot be negative".into(),
                ));
            }
        }
    }
    Ok(())
}

fn coupon_from_entity(model: CouponModel) -> Coupon {
    Coupon {
        id: model.id,
        code: model.code,
        description: model.description,
        discount_type: model.discount_type,
        value: model.value,
        active: model.active,
        expires_at: model.expires_at.map(|dt| dt.with_timezone(&Utc)),
        created_at: model.created_at.with_timezone(&Utc),
    }
}
