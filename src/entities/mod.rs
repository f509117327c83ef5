//! Entity type definitions
//!
//! The registry holds the following record types:
//!
//! **Sequentially numbered:**
//! - [`Asset`] - Fixed-asset register entries (`258-2026-04-01`)
//! - [`GaragePermit`] - Garage permits (`258/2026/01`)
//! - [`Requisition`] - Requisition forms (`RF258/2026/01`)
//!
//! **Other:**
//! - [`ServiceRequest`] - Citizen service requests (`SR-<ULID>`)

pub mod asset;
pub mod garage_permit;
pub mod requisition;
pub mod service_request;

pub use asset::Asset;
pub use garage_permit::GaragePermit;
pub use requisition::Requisition;
pub use service_request::ServiceRequest;
