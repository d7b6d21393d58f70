use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QuerySelect, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::payments::CreateIntentRequest,
    entity::{
        bookings::{Column as BookingCol, Entity as Bookings},
        payments::{
            ActiveModel as PaymentActive, Column as PaymentCol, Entity as Payments,
            Model as PaymentModel,
        },
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Payment,
    pricing::BookingStatus,
    response::{ApiResponse, Meta},
    services::booking_service,
    state::AppState,
};

/// Create a checkout intent for an owned pending booking. No outbound call
/// is made; the client is redirected to the hosted checkout page and polls
/// `get_payment` for the outcome.
pub async fn create_intent(
    state: &AppState,
    user: &AuthUser,
    payload: CreateIntentRequest,
) -> AppResult<ApiResponse<Payment>> {
    let booking = Bookings::find()
        .filter(
            Condition::all()
                .add(BookingCol::Id.eq(payload.booking_id))
                .add(BookingCol::UserId.eq(user.user_id)),
        )
        .one(&state.orm)
        .await?;
    let booking = match booking {
        Some(b) => b,
        None => return Err(AppError::NotFound),
    };

    if booking.status != BookingStatus::Pending.as_str() {
        return Err(AppError::BadRequest(
            "Only pending bookings can be paid".into(),
        ));
    }

    let open = Payments::find()
        .filter(
            Condition::all()
                .add(PaymentCol::BookingId.eq(booking.id))
                .add(PaymentCol::Status.is_in(["pending", "paid"])),
        )
        .one(&state.orm)
        .await?;
    if open.is_some() {
        return Err(AppError::BadRequest(
            "Booking already has an open payment".into(),
        ));
    }

    let order_code = Utc::now().timestamp_millis();
    let checkout_url = format!("{}/{}", state.config.payos_checkout_url, order_code);

    let payment = PaymentActive {
        id: Set(Uuid::new_v4()),
        booking_id: Set(booking.id),
        user_id: Set(user.user_id),
        amount: Set(booking.total_amount),
        provider: Set("payos".to_string()),
        order_code: Set(order_code),
        status: Set("pending".to_string()),
        checkout_url: Set(checkout_url),
        paid_at: Set(None),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    if let Err(err) = log_audit(
        state,
        Some(user.user_id),
        "payment_intent",
        Some("payments"),
        Some(serde_json::json!({ "payment_id": payment.id, "booking_id": booking.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Payment intent created",
        payment_from_entity(payment),
        Some(Meta::empty()),
    ))
}

pub async fn get_payment(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Payment>> {
    let payment = Payments::find()
        .filter(
            Condition::all()
                .add(PaymentCol::Id.eq(id))
                .add(PaymentCol::UserId.eq(user.user_id)),
        )
        .one(&state.orm)
        .await?;
    let payment = match payment {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    Ok(ApiResponse::success(
        "Payment",
        payment_from_entity(payment),
        Some(Meta::empty()),
    ))
}

/// Return-URL handler: mark the payment paid and confirm the booking in one
/// transaction.
pub async fn complete_payment(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Payment>> {
    let txn = state.orm.begin().await?;

    let payment = Payments::find()
        .filter(
            Condition::all()
                .add(PaymentCol::Id.eq(id))
                .add(PaymentCol::UserId.eq(user.user_id)),
        )
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let payment = match payment {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    if payment.status != "pending" {
        return Err(AppError::BadRequest("Payment is not pending".into()));
    }

    let booking = Bookings::find_by_id(payment.booking_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: PaymentActive = payment.into();
    active.status = Set("paid".to_string());
    active.paid_at = Set(Some(Utc::now().into()));
    let payment = active.update(&txn).await?;

    // A paid pending booking becomes confirmed; an already confirmed one is
    // left alone.
    if booking.status == BookingStatus::Pending.as_str() {
        let booking_active =
            booking_service::apply_status_transition(booking, BookingStatus::Confirmed)?;
        booking_active.update(&txn).await?;
    }

    txn.commit().await?;

    if let Err(err) = log_audit(
        state,
        Some(user.user_id),
        "payment_complete",
        Some("payments"),
        Some(serde_json::json!({ "payment_id": payment.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Payment recorded",
        payment_from_entity(payment),
        Some(Meta::empty()),
    ))
}

pub async fn cancel_payment(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Payment>> {
    let payment = Payments::find()
        .filter(
            Condition::all()
                .add(PaymentCol::Id.eq(id))
                .add(PaymentCol::UserId.eq(user.user_id)),
        )
        .one(&state.orm)
        .await?;
    let payment = match payment {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    if payment.status != "pending" {
        return Err(AppError::BadRequest("Payment is not pending".into()));
    }

    let mut active: PaymentActive = payment.into();
    active.status = Set("cancelled".to_string());
    let payment = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        state,
        Some(user.user_id),
        "payment_cancel",
        Some("payments"),
        Some(serde_json::json!({ "payment_id": payment.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Payment cancelled",
        payment_from_entity(payment),
        Some(Meta::empty()),
    ))
}

fn payment_from_entity(model: PaymentModel) -> Payment {
    Payment {
        id: model.id,
        booking_id: model.booking_id,
        user_id: model.user_id,
        amount: model.amount,
        provider: model.provider,
        order_code: model.order_code,
        status: model.status,
        checkout_url: model.checkout_url,
        paid_at: model.paid_at.map(|dt| dt.with_timezone(&Utc)),
        created_at: model.created_at.with_timezone(&Utc),
    }
}
