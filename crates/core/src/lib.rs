//! Commission Manager Core - commission domain types and rules.
//!
//! This crate provides the types shared by every Commission Manager component:
//! - `admin` - The embedded-app backend (HTTP API, persistence, Shopify catalog)
//! - `cli` - Command-line tools for migrations and shop maintenance
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no database
//! access, no HTTP clients. Everything that needs a network round trip lives
//! in the admin crate and calls into these rules with data already in hand.
//!
//! # Modules
//!
//! - [`types`] - Ids, shop domains, currencies, commissions, categories and stats

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
