//! Core types for Commission Manager.
//!
//! This module provides type-safe wrappers for the commission domain.

pub mod category;
pub mod commission;
pub mod id;
pub mod money;
pub mod shop;
pub mod stats;

pub use category::{Category, CategoryIndex, UNCATEGORIZED};
pub use commission::{
    CollectionCommission, Commission, CommissionError, CommissionKind, CommissionSource,
    CommissionView, ProductCommission, ProductDetails, resolve_precedence,
};
pub use id::*;
pub use money::{CurrencyCode, CurrencyCodeError, parse_amount};
pub use shop::{ShopDomain, ShopDomainError};
pub use stats::{CommissionStats, HighestCommission, StatsBuilder, StatsSummary};
