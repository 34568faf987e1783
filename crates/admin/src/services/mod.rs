//! Business logic services for the commission app.
//!
//! # Services
//!
//! - `commissions` - Resolution, single writes, bulk apply, listing, overview
//! - `catalog` - Product, collection and category listings
//! - `privacy` - Mandatory privacy webhooks

pub mod catalog;
pub mod commissions;
pub mod privacy;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use catalog::{CatalogService, scan_products};
pub use commissions::{
    BulkApplier, BulkApplyOutcome, BulkScope, CommissionLister, CommissionResolver,
    CommissionService, CommissionServiceError, RemovalTarget, StatsAggregator,
};
pub use privacy::PrivacyService;
