use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::reviews::{CreateReviewRequest, ReviewList, UpdateReviewRequest},
    entity::{
        reviews::{
            ActiveModel as ReviewActive, Column as ReviewCol, Entity as Reviews,
            Model as ReviewModel,
        },
        service_combos::Entity as ServiceCombos,
        services::Entity as Services,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Review,
    response::{ApiResponse, Meta},
    routes::params::ReviewListQuery,
    state::AppState,
};

pub async fn list_reviews(
    state: &AppState,
    query: ReviewListQuery,
) -> AppResult<ApiResponse<ReviewList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all();
    if let Some(service_id) = query.service_id {
        condition = condition.add(ReviewCol::ServiceId.eq(service_id));
    }
    if let Some(service_combo_id) = query.service_combo_id {
        condition = condition.add(ReviewCol::ServiceComboId.eq(service_combo_id));
    }

    let finder = Reviews::find()
        .filter(condition)
        .order_by_desc(ReviewCol::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(review_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Reviews",
        ReviewList { items },
        Some(meta),
    ))
}

pub async fn create_review(
    state: &AppState,
    user: &AuthUser,
    payload: CreateReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    validate_rating(payload.rating)?;

    // A review targets exactly one catalog item, and that item must exist.
    match (payload.service_id, payload.service_combo_id) {
        (Some(service_id), None) => {
            if Services::find_by_id(service_id).one(&state.orm).await?.is_none() {
                return Err(AppError::NotFound);
            }
        }
        (None, Some(combo_id)) => {
            if ServiceCombos::find_by_id(combo_id)
                .one(&state.orm)
                .await?
                .is_none()
            {
                return Err(AppError::NotFound);
            }
        }
        _ => {
            return Err(AppError::BadRequest(
                "Provide exactly one of service_id or service_combo_id".into(),
            ));
        }
    }

    let review = ReviewActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        service_id: Set(payload.service_id),
        service_combo_id: Set(payload.service_combo_id),
        rating: Set(payload.rating),
        comment: Set(payload.comment),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    if let Err(err) = log_audit(
        state,
        Some(user.user_id),
        "review_create",
        Some("reviews"),
        Some(serde_json::json!({ "review_id": review.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Review created",
        review_from_entity(review),
        Some(Meta::empty()),
    ))
}

pub async fn update_review(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    let existing = Reviews::find()
        .filter(
            Condition::all()
                .add(ReviewCol::Id.eq(id))
                .add(ReviewCol::UserId.eq(user.user_id)),
        )
        .one(&state.orm)
        .await?;
    let existing = match existing {
        Some(r) => r,
        None => return Err(AppError::NotFound),
    };

    let mut active: ReviewActive = existing.into();
    if let Some(rating) = payload.rating {
        validate_rating(rating)?;
        active.rating = Set(rating);
    }
    if let Some(comment) = payload.comment {
        active.comment = Set(Some(comment));
    }
    active.updated_at = Set(Utc::now().into());

    let review = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Updated",
        review_from_entity(review),
        Some(Meta::empty()),
    ))
}

pub async fn delete_review(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let mut condition = Condition::all().add(ReviewCol::Id.eq(id));
    // Admins may moderate any review; everyone else only their own.
    if user.role != "admin" {
        condition = condition.add(ReviewCol::UserId.eq(user.user_id));
    }

    let result = Reviews::delete_many()
        .filter(condition)
        .exec(&state.orm)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        state,
        Some(user.user_id),
        "review_delete",
        Some("reviews"),
        Some(serde_json::json!({ "review_id": id })),
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

fn validate_rating(rating: i16) -> AppResult<()> {
    if !(1..=5).contains(&rating) {
        return Err(AppError::BadRequest(
            "Rating must be between 1 and 5".into(),
        ));
    }
    Ok(())
}

fn review_from_entity(model: ReviewModel) -> Review {
    Review {
        id: model.id,
        user_id: model.user_id,
        service_id: model.service_id,
        service_combo_id: model.service_combo_id,
        rating: model.rating,
        comment: model.comment,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
