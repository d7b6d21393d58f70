use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        bookings::{BookingList, CreateBookingRequest, UpdateBookingRequest, UpdateBookingStatusRequest},
        catalog::{ComboList, CreateComboRequest, CreateServiceRequest, ServiceList, UpdateComboRequest, UpdateServiceRequest},
        coupons::{CouponList, CreateCouponRequest, UpdateCouponRequest, ValidateCouponRequest},
        payments::CreateIntentRequest,
        reviews::{CreateReviewRequest, ReviewList, UpdateReviewRequest},
    },
    models::{Booking, Coupon, Payment, Review, Service, ServiceCombo, User},
    pricing::{BookingStatus, DiscountType, ItemType},
    response::{ApiResponse, Meta},
    routes::{admin, auth, bookings, combos, coupons, health, params, payments, reviews, services},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        services::list_services,
        services::get_service,
        services::create_service,
        services::update_service,
        services::delete_service,
        combos::list_combos,
        combos::get_combo,
        combos::create_combo,
        combos::update_combo,
        combos::delete_combo,
        bookings::create_booking,
        bookings::list_bookings,
        bookings::get_booking,
        bookings::update_booking,
        bookings::update_booking_status,
        bookings::delete_booking,
        coupons::list_coupons,
        coupons::create_coupon,
        coupons::update_coupon,
        coupons::delete_coupon,
        coupons::validate_coupon,
        reviews::list_reviews,
        reviews::create_review,
        reviews::update_review,
        reviews::delete_review,
        payments::create_intent,
        payments::get_payment,
        payments::complete_payment,
        payments::cancel_payment,
        admin::list_all_bookings,
        admin::get_booking_admin,
        admin::update_booking_status
    ),
    components(
        schemas(
            User,
            Service,
            ServiceCombo,
            Booking,
            Coupon,
            Review,
            Payment,
            ItemType,
            BookingStatus,
            DiscountType,
            CreateServiceRequest,
            UpdateServiceRequest,
            ServiceList,
            CreateComboRequest,
            UpdateComboRequest,
            ComboList,
            CreateBookingRequest,
            UpdateBookingRequest,
            UpdateBookingStatusRequest,
            BookingList,
            CreateCouponRequest,
            UpdateCouponRequest,
            ValidateCouponRequest,
            CouponList,
            CreateReviewRequest,
            UpdateReviewRequest,
            ReviewList,
            CreateIntentRequest,
            params::Pagination,
            params::ServiceQuery,
            params::BookingListQuery,
            params::ReviewListQuery,
            Meta,
            ApiResponse<Service>,
            ApiResponse<ServiceList>,
            ApiResponse<Booking>,
            ApiResponse<BookingList>,
            ApiResponse<Coupon>,
            ApiResponse<Payment>,
            ApiResponse<ReviewList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Catalog", description = "Tour services and combo packages"),
        (name = "Bookings", description = "Booking lifecycle endpoints"),
        (name = "Coupons", description = "Coupon management and validation"),
        (name = "Reviews", description = "Review endpoints"),
        (name = "Payments", description = "PayOS checkout endpoints"),
        (name = "Admin", description = "Admin booking surface"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
