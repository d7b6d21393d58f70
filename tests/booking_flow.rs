use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set, Statement};
use tourism_booking_api::{
    config::AppConfig,
    db::{create_orm_conn, create_pool},
    dto::{
        bookings::{CreateBookingRequest, UpdateBookingRequest, UpdateBookingStatusRequest},
        payments::CreateIntentRequest,
    },
    entity::{
        coupons::ActiveModel as CouponActive, service_combos::ActiveModel as ComboActive,
        services::ActiveModel as ServiceActive, users::ActiveModel as UserActive,
    },
    error::AppError,
    middleware::auth::AuthUser,
    pricing::{BookingStatus, ItemType},
    services::{admin_service, booking_service, payment_service},
    state::AppState,
};
use uuid::Uuid;

// Integration flow: user books a service, edits it, the admin walks the
// booking through its lifecycle; an agency account gets the 3% discount and
// coupons stack on top of it.
#[tokio::test]
async fn booking_pricing_and_lifecycle_flow() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let state = setup_state(&database_url).await?;

    let user_id = create_user(&state, "user", "user@example.com").await?;
    let agency_id = create_user(&state, "agency", "agency@example.com").await?;
    let admin_id = create_user(&state, "admin", "admin@example.com").await?;

    let service = ServiceActive {
        id: Set(Uuid::new_v4()),
        name: Set("Test Trek".into()),
        description: Set(Some("A tour for testing".into())),
        price: Set(100_000),
        duration_days: Set(2),
        location: Set(Some("Sapa".into())),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let combo = ComboActive {
        id: Set(Uuid::new_v4()),
        name: Set("Test Pack".into()),
        description: Set(Some("A combo for testing".into())),
        price: Set(300_000),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    CouponActive {
        id: Set(Uuid::new_v4()),
        code: Set("TEN".into()),
        description: Set(None),
        discount_type: Set("percent".into()),
        value: Set(10),
        active: Set(true),
        expires_at: Set(None),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let auth_user = AuthUser {
        user_id,
        role: "user".into(),
    };
    let auth_agency = AuthUser {
        user_id: agency_id,
        role: "agency".into(),
    };
    let auth_admin = AuthUser {
        user_id: admin_id,
        role: "admin".into(),
    };

    // Plain user pays full price.
    let created = booking_service::create_booking(
        &state,
        &auth_user,
        CreateBookingRequest {
            item_type: ItemType::Service,
            service_id: Some(service.id),
            service_combo_id: None,
            quantity: 2,
            notes: None,
            booking_date: Some(Utc::now()),
            coupon_code: None,
        },
    )
    .await?;
    let booking = created.data.unwrap();
    assert_eq!(booking.total_amount, 200_000);
    assert_eq!(booking.status, "pending");
    assert!(booking.booking_number.starts_with("BK"));
    assert_eq!(booking.booking_number.len(), 20);
    assert!(booking.booking_number[2..].chars().all(|c| c.is_ascii_digit()));

    // Editing notes alone must not touch the total.
    let edited = booking_service::update_booking(
        &state,
        &auth_user,
        booking.id,
        UpdateBookingRequest {
            notes: Some("window seat please".into()),
            ..Default::default()
        },
    )
    .await?;
    let edited = edited.data.unwrap();
    assert_eq!(edited.total_amount, 200_000);
    assert_eq!(edited.notes.as_deref(), Some("window seat please"));

    // Changing quantity recomputes the total.
    let requoted = booking_service::update_booking(
        &state,
        &auth_user,
        booking.id,
        UpdateBookingRequest {
            quantity: Some(3),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(requoted.data.unwrap().total_amount, 300_000);

    // Agency combo booking with a coupon: 300000 * 0.97 = 291000, then 10% off.
    let agency_booking = booking_service::create_booking(
        &state,
        &auth_agency,
        CreateBookingRequest {
            item_type: ItemType::Combo,
            service_id: None,
            service_combo_id: Some(combo.id),
            quantity: 1,
            notes: None,
            booking_date: None,
            coupon_code: Some("TEN".into()),
        },
    )
    .await?;
    let agency_booking = agency_booking.data.unwrap();
    assert_eq!(agency_booking.total_amount, 261_900);

    // Admin confirms, then completes; timestamps appear in order.
    let confirmed = admin_service::update_booking_status(
        &state,
        &auth_admin,
        booking.id,
        UpdateBookingStatusRequest {
            status: BookingStatus::Confirmed,
        },
    )
    .await?;
    let confirmed = confirmed.data.unwrap();
    assert_eq!(confirmed.status, "confirmed");
    assert!(confirmed.confirmed_at.is_some());
    assert!(confirmed.completed_at.is_none());

    let completed = admin_service::update_booking_status(
        &state,
        &auth_admin,
        booking.id,
        UpdateBookingStatusRequest {
            status: BookingStatus::Completed,
        },
    )
    .await?;
    let completed = completed.data.unwrap();
    assert_eq!(completed.status, "completed");
    assert!(completed.completed_at.is_some());

    // Completed bookings cannot go backwards.
    let illegal = admin_service::update_booking_status(
        &state,
        &auth_admin,
        booking.id,
        UpdateBookingStatusRequest {
            status: BookingStatus::Cancelled,
        },
    )
    .await;
    assert!(matches!(illegal, Err(AppError::BadRequest(_))));

    // Owners may cancel their own pending booking, nothing else.
    let own_cancel = booking_service::update_booking_status(
        &state,
        &auth_agency,
        agency_booking.id,
        UpdateBookingStatusRequest {
            status: BookingStatus::Cancelled,
        },
    )
    .await?;
    assert_eq!(own_cancel.data.unwrap().status, "cancelled");

    // Missing ids surface as not-found, never a silent no-op.
    let missing = booking_service::delete_booking(&state, &auth_user, Uuid::new_v4()).await;
    assert!(matches!(missing, Err(AppError::NotFound)));
    let missing = booking_service::update_booking(
        &state,
        &auth_user,
        Uuid::new_v4(),
        UpdateBookingRequest::default(),
    )
    .await;
    assert!(matches!(missing, Err(AppError::NotFound)));

    Ok(())
}

#[tokio::test]
async fn payment_confirms_booking() -> anyhow::Result<()> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let state = setup_state(&database_url).await?;
    let user_id = create_user(&state, "user", "payer@example.com").await?;
    let auth_user = AuthUser {
        user_id,
        role: "user".into(),
    };

    let service = ServiceActive {
        id: Set(Uuid::new_v4()),
        name: Set("Payable Tour".into()),
        description: Set(None),
        price: Set(50_000),
        duration_days: Set(1),
        location: Set(None),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let booking = booking_service::create_booking(
        &state,
        &auth_user,
        CreateBookingRequest {
            item_type: ItemType::Service,
            service_id: Some(service.id),
            service_combo_id: None,
            quantity: 1,
            notes: None,
            booking_date: None,
            coupon_code: None,
        },
    )
    .await?
    .data
    .unwrap();

    let intent = payment_service::create_intent(
        &state,
        &auth_user,
        CreateIntentRequest {
            booking_id: booking.id,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(intent.amount, booking.total_amount);
    assert_eq!(intent.status, "pending");
    assert!(intent.checkout_url.contains(&intent.order_code.to_string()));

    // A second open intent for the same booking is rejected.
    let duplicate = payment_service::create_intent(
        &state,
        &auth_user,
        CreateIntentRequest {
            booking_id: booking.id,
        },
    )
    .await;
    assert!(matches!(duplicate, Err(AppError::BadRequest(_))));

    let paid = payment_service::complete_payment(&state, &auth_user, intent.id)
        .await?
        .data
        .unwrap();
    assert_eq!(paid.status, "paid");
    assert!(paid.paid_at.is_some());

    let booking = booking_service::get_booking(&state, &auth_user, booking.id)
        .await?
        .data
        .unwrap();
    assert_eq!(booking.status, "confirmed");
    assert!(booking.confirmed_at.is_some());

    Ok(())
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    let orm = create_orm_conn(database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE payments, reviews, bookings, coupons, service_combos, services, audit_logs, users RESTART IDENTITY CASCADE",
    ))
    .await?;

    let config = AppConfig {
        database_url: database_url.to_string(),
        host: "127.0.0.1".into(),
        port: 3000,
        payos_checkout_url: "https://pay.payos.vn/web".into(),
    };

    Ok(AppState { pool, orm, config })
}

async fn create_user(state: &AppState, role: &str, email: &str) -> anyhow::Result<Uuid> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        password_hash: Set("dummy".into()),
        role: Set(role.into()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(user.id)
}
