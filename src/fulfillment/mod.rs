//! Order fulfillment - turning a paid order into credits and booked sessions.
//!
//! A pass over an order reads its line items, adds credits to the enrollment ledger,
//! makes sure each class has enough upcoming sessions, and books the student into the
//! earliest free ones. The same pass runs in two modes: a preview that writes nothing
//! and reports the plan, and a confirmation that persists everything and marks the
//! order paid. The mode is chosen by the [`effects`] implementation handed in.

/// Allocation engine: picks free sessions for purchased credits
pub mod allocator;
/// Write capabilities with persisting and preview implementations
pub mod effects;
/// Session generator
pub mod generator;
/// Order-item JSON parsing and override keys
pub mod items;
/// Per-order orchestration and preview DTOs
pub mod orchestrator;
/// Preview and confirm services for pending orders
pub mod payment;
/// Run-scoped caches
pub mod run;

pub use orchestrator::{FulfillmentRequest, PaymentPreview, fulfill_order};
pub use payment::{confirm_order_payment, preview_order_payment};
