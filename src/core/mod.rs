//! Core business logic - framework-agnostic data access and ledger operations.
//!
//! One module per table. Fulfillment and the HTTP layer build on these functions;
//! nothing here knows about requests or previews.

/// Attendance ledger: booked slots, leave requests
pub mod attendance;
/// Class store
pub mod class;
/// Enrollment ledger: per (student, class) credit balances
pub mod enrollment;
/// Orders and their item snapshots
pub mod order;
/// Product catalog lookups
pub mod product;
/// Session store
pub mod session;

/// Generates a fresh primary key for a new row.
#[must_use]
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
