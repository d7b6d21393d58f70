pub mod audit_logs;
pub mod bookings;
pub mod coupons;
pub mod payments;
pub mod reviews;
pub mod service_combos;
pub mod services;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use bookings::Entity as Bookings;
pub use coupons::Entity as Coupons;
pub use payments::Entity as Payments;
pub use reviews::Entity as Reviews;
pub use service_combos::Entity as ServiceCombos;
pub use services::Entity as Services;
pub use users::Entity as Users;
