use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::bookings::{BookingList, UpdateBookingStatusRequest},
    entity::bookings::{Column as BookingCol, Entity as Bookings},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Booking,
    response::{ApiResponse, Meta},
    routes::params::{BookingListQuery, SortOrder},
    services::booking_service::{apply_status_transition, booking_from_entity},
    state::AppState,
};

pub async fn list_all_bookings(
    state: &AppState,
    user: &AuthUser,
    query: BookingListQuery,
) -> AppResult<ApiResponse<BookingList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination.normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(BookingCol::Status.eq(status.clone()));
    }

    let mut finder = Bookings::find().filter(condition);

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(BookingCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(BookingCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let bookings = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(booking_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Bookings",
        BookingList { items: bookings },
        Some(meta),
    ))
}

pub async fn get_booking_admin(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Booking>> {
    ensure_admin(user)?;
    let booking = Bookings::find_by_id(id)
        .one(&state.orm)
        .await?
        .map(booking_from_entity);
    let booking = match booking {
        Some(b) => b,
        None => return Err(AppError::NotFound),
    };

    Ok(ApiResponse::success(
        "Booking found",
        booking,
        Some(Meta::empty()),
    ))
}

pub async fn update_booking_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateBookingStatusRequest,
) -> AppResult<ApiResponse<Booking>> {
    ensure_admin(user)?;

    let existing = Bookings::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(b) => b,
        None => return Err(AppError::NotFound),
    };

    let active = apply_status_transition(existing, payload.status)?;
    let booking = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        state,
        Some(user.user_id),
        "booking_status_update",
        Some("bookings"),
        Some(serde_json::json!({ "booking_id": booking.id, "status": booking.status })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Booking updated",
        booking_from_entity(booking),
        Some(Meta::empty()),
    ))
}
