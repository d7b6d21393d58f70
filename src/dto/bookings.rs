use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Booking;
use crate::pricing::{BookingStatus, ItemType};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBookingRequest {
    pub item_type: ItemType,
    pub service_id: Option<Uuid>,
    pub service_combo_id: Option<Uuid>,
    pub quantity: i32,
    pub notes: Option<String>,
    pub booking_date: Option<DateTime<Utc>>,
    pub coupon_code: Option<String>,
}

/// Partial edit; quantity/item changes trigger a total recomputation,
/// notes/date changes do not.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateBookingRequest {
    pub item_type: Option<ItemType>,
    pub service_id: Option<Uuid>,
    pub service_combo_id: Option<Uuid>,
    pub quantity: Option<i32>,
    pub notes: Option<String>,
    pub booking_date: Option<DateTime<Utc>>,
    pub coupon_code: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateBookingStatusRequest {
    pub status: BookingStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BookingList {
    pub items: Vec<Booking>,
}
