//! Booking pricing rules: line totals, the agency discount, coupon
//! application, booking-number generation and the status lifecycle.
//!
//! Everything here is pure so the rules can be tested without a database;
//! `booking_service` supplies the catalog lookups.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Accounts with this role get a flat 3% discount on every booking.
pub const AGENCY_ROLE: &str = "agency";

/// Whether a booking references a single service or a combo package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Service,
    Combo,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Service => "service",
            ItemType::Combo => "combo",
        }
    }
}

impl FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "service" => Ok(ItemType::Service),
            "combo" => Ok(ItemType::Combo),
            other => Err(format!("unknown item type: {other}")),
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Base amount for a booking line. Missing catalog items price at zero.
pub fn line_total(unit_price: Option<i64>, quantity: i32) -> i64 {
    match unit_price {
        Some(price) if quantity > 0 => price * i64::from(quantity),
        _ => 0,
    }
}

/// Apply the 3% agency discount when the owning account's role is "agency"
/// (case-insensitive). Integer arithmetic; amounts are minor currency units.
pub fn apply_agency_discount(amount: i64, role: &str) -> i64 {
    if role.eq_ignore_ascii_case(AGENCY_ROLE) {
        amount * 97 / 100
    } else {
        amount
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    Percent,
    Fixed,
}

impl FromStr for DiscountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percent" => Ok(DiscountType::Percent),
            "fixed" => Ok(DiscountType::Fixed),
            other => Err(format!("unknown discount type: {other}")),
        }
    }
}

/// Reduce `amount` by a coupon. The result never goes negative, no matter
/// how discounts stack.
pub fn apply_coupon(amount: i64, discount_type: DiscountType, value: i64) -> i64 {
    let reduced = match discount_type {
        DiscountType::Percent => amount - amount * value / 100,
        DiscountType::Fixed => amount - value,
    };
    reduced.max(0)
}

/// Human-readable reservation reference: "BK" + yyyyMMddHHmmss + 4 digits.
///
/// The suffix is drawn from a fresh UUID, so two requests in the same second
/// can still collide; callers that persist the number check uniqueness and
/// regenerate.
pub fn build_booking_number() -> String {
    let stamp = Utc::now().format("%Y%m%d%H%M%S");
    let draw = Uuid::new_v4().as_u128() % 9000;
    let suffix = 1000 + draw as u16;
    format!("BK{stamp}{suffix}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    /// Legal lifecycle: pending -> confirmed -> completed, with
    /// cancellation allowed before completion.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Pending, BookingStatus::Confirmed)
                | (BookingStatus::Confirmed, BookingStatus::Completed)
                | (BookingStatus::Pending, BookingStatus::Cancelled)
                | (BookingStatus::Confirmed, BookingStatus::Cancelled)
        )
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "completed" => Ok(BookingStatus::Completed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(format!("unknown booking status: {other}")),
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_total_multiplies_price_by_quantity() {
        assert_eq!(line_total(Some(250_000), 3), 750_000);
        assert_eq!(line_total(Some(250_000), 1), 250_000);
    }

    #[test]
    fn line_total_is_zero_for_missing_item() {
        assert_eq!(line_total(None, 5), 0);
    }

    #[test]
    fn line_total_is_zero_for_non_positive_quantity() {
        assert_eq!(line_total(Some(100), 0), 0);
        assert_eq!(line_total(Some(100), -2), 0);
    }

    #[test]
    fn agency_discount_takes_three_percent() {
        assert_eq!(apply_agency_discount(100_000, "agency"), 97_000);
        assert_eq!(apply_agency_discount(100_000, "Agency"), 97_000);
        assert_eq!(apply_agency_discount(100_000, "AGENCY"), 97_000);
    }

    #[test]
    fn non_agency_roles_pay_full_price() {
        assert_eq!(apply_agency_discount(100_000, "user"), 100_000);
        assert_eq!(apply_agency_discount(100_000, "admin"), 100_000);
        assert_eq!(apply_agency_discount(100_000, ""), 100_000);
    }

    #[test]
    fn percent_coupon_reduces_proportionally() {
        assert_eq!(apply_coupon(200_000, DiscountType::Percent, 10), 180_000);
        assert_eq!(apply_coupon(200_000, DiscountType::Percent, 0), 200_000);
    }

    #[test]
    fn fixed_coupon_subtracts_value() {
        assert_eq!(apply_coupon(200_000, DiscountType::Fixed, 50_000), 150_000);
    }

    #[test]
    fn coupon_never_goes_negative() {
        assert_eq!(apply_coupon(10_000, DiscountType::Fixed, 999_999), 0);
        assert_eq!(apply_coupon(10_000, DiscountType::Percent, 200), 0);
        assert_eq!(apply_coupon(0, DiscountType::Fixed, 1), 0);
    }

    #[test]
    fn agency_then_coupon_composes_sequentially() {
        let base = line_total(Some(100_000), 2);
        let discounted = apply_agency_discount(base, "agency");
        assert_eq!(discounted, 194_000);
        assert_eq!(apply_coupon(discounted, DiscountType::Percent, 50), 97_000);
    }

    #[test]
    fn booking_number_matches_expected_shape() {
        let number = build_booking_number();
        assert_eq!(number.len(), 2 + 14 + 4);
        assert!(number.starts_with("BK"));
        assert!(number[2..].chars().all(|c| c.is_ascii_digit()));
        let suffix: u16 = number[16..].parse().unwrap();
        assert!((1000..=9999).contains(&suffix));
    }

    #[test]
    fn status_lifecycle_allows_forward_transitions() {
        assert!(BookingStatus::Pending.can_transition_to(BookingStatus::Confirmed));
        assert!(BookingStatus::Confirmed.can_transition_to(BookingStatus::Completed));
        assert!(BookingStatus::Pending.can_transition_to(BookingStatus::Cancelled));
        assert!(BookingStatus::Confirmed.can_transition_to(BookingStatus::Cancelled));
    }

    #[test]
    fn status_lifecycle_rejects_backward_and_terminal_transitions() {
        assert!(!BookingStatus::Completed.can_transition_to(BookingStatus::Pending));
        assert!(!BookingStatus::Completed.can_transition_to(BookingStatus::Cancelled));
        assert!(!BookingStatus::Cancelled.can_transition_to(BookingStatus::Confirmed));
        assert!(!BookingStatus::Pending.can_transition_to(BookingStatus::Completed));
        assert!(!BookingStatus::Pending.can_transition_to(BookingStatus::Pending));
    }

    #[test]
    fn status_strings_round_trip() {
        for s in ["pending", "confirmed", "completed", "cancelled"] {
            assert_eq!(s.parse::<BookingStatus>().unwrap().as_str(), s);
        }
        assert!("shipped".parse::<BookingStatus>().is_err());
    }

    #[test]
    fn item_type_parses_known_values_only() {
        assert_eq!("service".parse::<ItemType>().unwrap(), ItemType::Service);
        assert_eq!("combo".parse::<ItemType>().unwrap(), ItemType::Combo);
        assert!("hotel".parse::<ItemType>().is_err());
    }
}
