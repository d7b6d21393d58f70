use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::bookings::{
        BookingList, CreateBookingRequest, UpdateBookingRequest, UpdateBookingStatusRequest,
    },
    entity::{
        bookings::{
            ActiveModel as BookingActive, Column as BookingCol, Entity as Bookings,
            Model as BookingModel,
        },
        coupons::{Column as CouponCol, Entity as Coupons, Model as CouponModel},
        service_combos::Entity as ServiceCombos,
        services::Entity as Services,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Booking,
    pricing::{
        self, BookingStatus, DiscountType, ItemType, apply_agency_discount, apply_coupon,
        line_total,
    },
    response::{ApiResponse, Meta},
    routes::params::{BookingListQuery, SortOrder},
    state::AppState,
};

/// Unit price for the referenced catalog item; `None` when the id is absent
/// or the row does not exist. Bookings never mutate catalog rows.
async fn resolve_unit_price<C: ConnectionTrait>(
    conn: &C,
    item_type: ItemType,
    service_id: Option<Uuid>,
    service_combo_id: Option<Uuid>,
) -> AppResult<Option<i64>> {
    let price = match item_type {
        ItemType::Service => match service_id {
            Some(id) => Services::find_by_id(id).one(conn).await?.map(|s| s.price),
            None => None,
        },
        ItemType::Combo => match service_combo_id {
            Some(id) => ServiceCombos::find_by_id(id)
                .one(conn)
                .await?
                .map(|c| c.price),
            None => None,
        },
    };
    Ok(price)
}

/// Base total: unit price times quantity, zero when the item is missing.
pub async fn calculate_total_amount<C: ConnectionTrait>(
    conn: &C,
    item_type: ItemType,
    service_id: Option<Uuid>,
    service_combo_id: Option<Uuid>,
    quantity: i32,
) -> AppResult<i64> {
    let unit_price = resolve_unit_price(conn, item_type, service_id, service_combo_id).await?;
    Ok(line_total(unit_price, quantity))
}

/// Full quote: base total, then the agency discount for the owning role,
/// then the coupon, clamped non-negative. Always starts from a fresh base.
async fn quote_total<C: ConnectionTrait>(
    conn: &C,
    item_type: ItemType,
    service_id: Option<Uuid>,
    service_combo_id: Option<Uuid>,
    quantity: i32,
    owner_role: &str,
    coupon: Option<&CouponModel>,
) -> AppResult<i64> {
    let base =
        calculate_total_amount(conn, item_type, service_id, service_combo_id, quantity).await?;
    let mut total = apply_agency_discount(base, owner_role);
    if let Some(coupon) = coupon {
        let discount_type: DiscountType = coupon
            .discount_type
            .parse()
            .map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))?;
        total = apply_coupon(total, discount_type, coupon.value);
    }
    Ok(total)
}

/// Look up a coupon that is known, active and unexpired.
async fn resolve_coupon<C: ConnectionTrait>(
    conn: &C,
    code: &str,
) -> AppResult<Option<CouponModel>> {
    let coupon = Coupons::find()
        .filter(CouponCol::Code.eq(code))
        .one(conn)
        .await?;
    let coupon = match coupon {
        Some(c) => c,
        None => return Ok(None),
    };
    if !coupon.active {
        return Ok(None);
    }
    if let Some(expires_at) = coupon.expires_at {
        if expires_at < Utc::now() {
            return Ok(None);
        }
    }
    Ok(Some(coupon))
}

pub async fn create_booking(
    state: &AppState,
    user: &AuthUser,
    payload: CreateBookingRequest,
) -> AppResult<ApiResponse<Booking>> {
    if payload.quantity < 1 {
        return Err(AppError::BadRequest("Quantity must be at least 1".into()));
    }
    let (service_id, service_combo_id) =
        normalize_item_refs(payload.item_type, payload.service_id, payload.service_combo_id)?;

    let coupon = match payload.coupon_code.as_deref() {
        Some(code) => match resolve_coupon(&state.orm, code).await? {
            Some(c) => Some(c),
            None => return Err(AppError::BadRequest("Invalid or expired coupon".into())),
        },
        None => None,
    };

    let total_amount = quote_total(
        &state.orm,
        payload.item_type,
        service_id,
        service_combo_id,
        payload.quantity,
        &user.role,
        coupon.as_ref(),
    )
    .await?;

    let booking_number = unique_booking_number(&state.orm).await?;

    let booking = BookingActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        item_type: Set(payload.item_type.as_str().to_string()),
        service_id: Set(service_id),
        service_combo_id: Set(service_combo_id),
        quantity: Set(payload.quantity),
        notes: Set(payload.notes),
        booking_date: Set(payload.booking_date.map(Into::into)),
        coupon_code: Set(payload.coupon_code),
        booking_number: Set(booking_number),
        total_amount: Set(total_amount),
        status: Set(BookingStatus::Pending.as_str().to_string()),
        confirmed_at: Set(None),
        completed_at: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    if let Err(err) = log_audit(
        state,
        Some(user.user_id),
        "booking_create",
        Some("bookings"),
        Some(serde_json::json!({
            "booking_id": booking.id,
            "booking_number": booking.booking_number,
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Booking created",
        booking_from_entity(booking),
        Some(Meta::empty()),
    ))
}

pub async fn list_bookings(
    state: &AppState,
    user: &AuthUser,
    query: BookingListQuery,
) -> AppResult<ApiResponse<BookingList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all().add(BookingCol::UserId.eq(user.user_id));
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(BookingCol::Status.eq(status.clone()));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let mut finder = Bookings::find().filter(condition);
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

pub async fn get_booking(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Booking>> {
    let booking = find_owned(state, user, id).await?;
    Ok(ApiResponse::success(
        "Booking",
        booking_from_entity(booking),
        Some(Meta::empty()),
    ))
}

pub async fn update_booking(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateBookingRequest,
) -> AppResult<ApiResponse<Booking>> {
    let existing = find_owned(state, user, id).await?;

    let pricing_changed = payload.item_type.is_some()
        || payload.service_id.is_some()
        || payload.service_combo_id.is_some()
        || payload.quantity.is_some()
        || payload.coupon_code.is_some();

    let item_type: ItemType = match payload.item_type {
        Some(it) => it,
        None => existing
            .item_type
            .parse()
            .map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))?,
    };
    let quantity = payload.quantity.unwrap_or(existing.quantity);
    if quantity < 1 {
        return Err(AppError::BadRequest("Quantity must be at least 1".into()));
    }
    let (service_id, service_combo_id) = normalize_item_refs(
        item_type,
        payload.service_id.or(existing.service_id),
        payload.service_combo_id.or(existing.service_combo_id),
    )?;
    let coupon_code = payload.coupon_code.or_else(|| existing.coupon_code.clone());

    let mut active: BookingActive = existing.clone().into();

    if pricing_changed {
        // Recompute from a fresh base; the stored total is never reused.
        // A stored code that has since lapsed simply stops discounting.
        let coupon = match coupon_code.as_deref() {
            Some(code) => resolve_coupon(&state.orm, code).await?,
            None => None,
        };
        let total = quote_total(
            &state.orm,
            item_type,
            service_id,
            service_combo_id,
            quantity,
            &user.role,
            coupon.as_ref(),
        )
        .await?;
        active.item_type = Set(item_type.as_str().to_string());
        active.service_id = Set(service_id);
        active.service_combo_id = Set(service_combo_id);
        active.quantity = Set(quantity);
        active.coupon_code = Set(coupon_code);
        active.total_amount = Set(total);
    }

    if let Some(notes) = payload.notes {
        active.notes = Set(Some(notes));
    }
    if let Some(booking_date) = payload.booking_date {
        active.booking_date = Set(Some(booking_date.into()));
    }
    active.updated_at = Set(Utc::now().into());

    let booking = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        state,
        Some(user.user_id),
        "booking_update",
        Some("bookings"),
        Some(serde_json::json!({ "booking_id": booking.id })),
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

pub async fn update_booking_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateBookingStatusRequest,
) -> AppResult<ApiResponse<Booking>> {
    let existing = if user.role == "admin" {
        Bookings::find_by_id(id)
            .one(&state.orm)
            .await?
            .ok_or(AppError::NotFound)?
    } else {
        // Owners may only cancel their own booking.
        if payload.status != BookingStatus::Cancelled {
            return Err(AppError::Forbidden);
        }
        find_owned(state, user, id).await?
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
        "Status updated",
        booking_from_entity(booking),
        Some(Meta::empty()),
    ))
}

pub async fn delete_booking(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = Bookings::delete_many()
        .filter(
            Condition::all()
                .add(BookingCol::Id.eq(id))
                .add(BookingCol::UserId.eq(user.user_id)),
        )
        .exec(&state.orm)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        state,
        Some(user.user_id),
        "booking_delete",
        Some("bookings"),
        Some(serde_json::json!({ "booking_id": id })),
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

/// Move a booking along its lifecycle, stamping the matching timestamp.
/// Illegal transitions and terminal states are rejected.
pub fn apply_status_transition(
    booking: BookingModel,
    next: BookingStatus,
) -> AppResult<BookingActive> {
    let current: BookingStatus = booking
        .status
        .parse()
        .map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))?;

    if !current.can_transition_to(next) {
        return Err(AppError::BadRequest(format!(
            "Cannot move booking from {current} to {next}"
        )));
    }

    let mut active: BookingActive = booking.into();
    active.status = Set(next.as_str().to_string());
    match next {
        BookingStatus::Confirmed => active.confirmed_at = Set(Some(Utc::now().into())),
        BookingStatus::Completed => active.completed_at = Set(Some(Utc::now().into())),
        BookingStatus::Pending | BookingStatus::Cancelled => {}
    }
    active.updated_at = Set(Utc::now().into());
    Ok(active)
}

/// Exactly one catalog reference survives, on the side named by `item_type`.
fn normalize_item_refs(
    item_type: ItemType,
    service_id: Option<Uuid>,
    service_combo_id: Option<Uuid>,
) -> AppResult<(Option<Uuid>, Option<Uuid>)> {
    match item_type {
        ItemType::Service => {
            if service_id.is_none() {
                return Err(AppError::BadRequest(
                    "service_id is required for service bookings".into(),
                ));
            }
            Ok((service_id, None))
        }
        ItemType::Combo => {
            if service_combo_id.is_none() {
                return Err(AppError::BadRequest(
                    "service_combo_id is required for combo bookings".into(),
                ));
            }
            Ok((None, service_combo_id))
        }
    }
}

/// Generate a reference and retry when a concurrent request within the same
/// second drew the same suffix.
async fn unique_booking_number<C: ConnectionTrait>(conn: &C) -> AppResult<String> {
    for _ in 0..3 {
        let candidate = pricing::build_booking_number();
        let taken = Bookings::find()
            .filter(BookingCol::BookingNumber.eq(candidate.clone()))
            .count(conn)
            .await?;
        if taken == 0 {
            return Ok(candidate);
        }
    }
    Err(AppError::Internal(anyhow::anyhow!(
        "could not allocate a unique booking number"
    )))
}

async fn find_owned(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<BookingModel> {
    Bookings::find()
        .filter(
            Condition::all()
                .add(BookingCol::Id.eq(id))
                .add(BookingCol::UserId.eq(user.user_id)),
        )
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)
}

pub fn booking_from_entity(model: BookingModel) -> Booking {
    Booking {
        id: model.id,
        user_id: model.user_id,
        item_type: model.item_type,
        service_id: model.service_id,
        service_combo_id: model.service_combo_id,
        quantity: model.quantity,
        notes: model.notes,
        booking_date: model.booking_date.map(|dt| dt.with_timezone(&Utc)),
        coupon_code: model.coupon_code,
        booking_number: model.booking_number,
        total_amount: model.total_amount,
        status: model.status,
        confirmed_at: model.confirmed_at.map(|dt| dt.with_timezone(&Utc)),
        completed_at: model.completed_at.map(|dt| dt.with_timezone(&Utc)),
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
