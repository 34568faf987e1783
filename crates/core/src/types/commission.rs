//! Commission types and the precedence rule.
//!
//! A commission is either a percentage of the product price or a fixed
//! amount in a given currency. Payloads coming from the browser are
//! validated into [`Commission`] once, at the boundary; everything past
//! that point works with the tagged variant only.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{CollectionCommissionId, CollectionGid, CommissionId, ProductGid};
use super::money::{CurrencyCode, CurrencyCodeError, parse_amount};
use super::shop::ShopDomain;

/// Errors raised while validating a commission payload.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CommissionError {
    /// The commission value is not a number.
    #[error("commission value must be a number, got {0}")]
    NotNumeric(String),
    /// A fixed-amount commission was given without a currency.
    #[error("currency is required for fixed-amount commissions")]
    MissingCurrency,
    /// The currency code is malformed.
    #[error(transparent)]
    InvalidCurrency(#[from] CurrencyCodeError),
    /// The commission type is not one we know.
    #[error("unknown commission type {0:?} (expected \"percentage\" or \"fixed-amount\")")]
    UnknownKind(String),
}

/// How a commission value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommissionKind {
    /// Value is a percentage of the product price.
    #[serde(rename = "percentage")]
    Percentage,
    /// Value is a flat amount in a currency.
    #[serde(rename = "fixed-amount", alias = "amount", alias = "fixed_amount")]
    FixedAmount,
}

impl CommissionKind {
    /// Canonical string form, also used as the stored column value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::FixedAmount => "fixed-amount",
        }
    }

    /// Parse a kind, accepting the legacy `amount` and `fixed_amount` spellings.
    ///
    /// # Errors
    ///
    /// Returns [`CommissionError::UnknownKind`] for anything else.
    pub fn parse(s: &str) -> Result<Self, CommissionError> {
        match s.trim() {
            "percentage" => Ok(Self::Percentage),
            "fixed-amount" | "fixed_amount" | "amount" => Ok(Self::FixedAmount),
            other => Err(CommissionError::UnknownKind(other.to_string())),
        }
    }
}

impl core::fmt::Display for CommissionKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated commission.
///
/// Serializes flat as `{"commissionType": .., "commission": .., "currency": ..}`
/// so it can be flattened into API views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "commissionType")]
pub enum Commission {
    /// A percentage of the product price. No range is enforced.
    #[serde(rename = "percentage")]
    Percentage {
        /// Rate in percent (10 means 10%).
        #[serde(rename = "commission", with = "rust_decimal::serde::float")]
        value: Decimal,
    },
    /// A flat amount per sale.
    #[serde(rename = "fixed-amount")]
    FixedAmount {
        /// Amount in `currency`.
        #[serde(rename = "commission", with = "rust_decimal::serde::float")]
        value: Decimal,
        /// Currency of the amount.
        currency: CurrencyCode,
    },
}

impl Commission {
    /// Validate a raw commission payload.
    ///
    /// `kind` defaults to percentage when absent. `currency` is ignored for
    /// percentage commissions and required for fixed amounts.
    ///
    /// # Errors
    ///
    /// Returns [`CommissionError`] if the value is not numeric, the kind is
    /// unknown, or a fixed amount lacks a valid currency.
    pub fn from_input(
        value: &serde_json::Value,
        kind: Option<&str>,
        currency: Option<&str>,
    ) -> Result<Self, CommissionError> {
        let kind = kind.map_or(Ok(CommissionKind::Percentage), CommissionKind::parse)?;
        let amount =
            parse_amount(value).ok_or_else(|| CommissionError::NotNumeric(value.to_string()))?;

        match kind {
            CommissionKind::Percentage => Ok(Self::Percentage { value: amount }),
            CommissionKind::FixedAmount => {
                let currency = currency
                    .filter(|c| !c.trim().is_empty())
                    .ok_or(CommissionError::MissingCurrency)?;
                Ok(Self::FixedAmount {
                    value: amount,
                    currency: CurrencyCode::parse(currency)?,
                })
            }
        }
    }

    /// Rebuild a commission from stored columns.
    ///
    /// # Errors
    ///
    /// Returns [`CommissionError`] if the stored kind is unknown or a fixed
    /// amount row has no valid currency.
    pub fn from_parts(
        kind: &str,
        value: Decimal,
        currency: Option<&str>,
    ) -> Result<Self, CommissionError> {
        match CommissionKind::parse(kind)? {
            CommissionKind::Percentage => Ok(Self::Percentage { value }),
            CommissionKind::FixedAmount => Ok(Self::FixedAmount {
                value,
                currency: CurrencyCode::parse(currency.ok_or(CommissionError::MissingCurrency)?)?,
            }),
        }
    }

    /// Create a percentage commission.
    #[must_use]
    pub const fn percentage(value: Decimal) -> Self {
        Self::Percentage { value }
    }

    /// Create a fixed-amount commission.
    #[must_use]
    pub const fn fixed_amount(value: Decimal, currency: CurrencyCode) -> Self {
        Self::FixedAmount { value, currency }
    }

    /// The commission kind.
    #[must_use]
    pub const fn kind(&self) -> CommissionKind {
        match self {
            Self::Percentage { .. } => CommissionKind::Percentage,
            Self::FixedAmount { .. } => CommissionKind::FixedAmount,
        }
    }

    /// The raw value (percent or amount).
    #[must_use]
    pub const fn value(&self) -> Decimal {
        match self {
            Self::Percentage { value } | Self::FixedAmount { value, .. } => *value,
        }
    }

    /// The currency, for fixed amounts.
    #[must_use]
    pub const fn currency(&self) -> Option<&CurrencyCode> {
        match self {
            Self::Percentage { .. } => None,
            Self::FixedAmount { currency, .. } => Some(currency),
        }
    }

    /// Human readable form: `10%` or `KES 250`.
    #[must_use]
    pub fn display(&self) -> String {
        match self {
            Self::Percentage { value } => format!("{}%", value.normalize()),
            Self::FixedAmount { value, currency } => format!("{currency} {}", value.normalize()),
        }
    }

    /// Earnings from one sale at `price`.
    ///
    /// Percentage commissions earn `price × value / 100` and contribute zero
    /// when the price is unknown; fixed amounts earn their value regardless.
    #[must_use]
    pub fn earnings(&self, price: Option<Decimal>) -> Decimal {
        match self {
            Self::Percentage { value } => {
                price.map_or(Decimal::ZERO, |p| p * *value / Decimal::ONE_HUNDRED)
            }
            Self::FixedAmount { value, .. } => *value,
        }
    }
}

/// Display metadata cached on a product commission row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetails {
    pub title: String,
    pub handle: String,
    pub link: String,
}

impl ProductDetails {
    /// Build details from catalog data, deriving the storefront link.
    #[must_use]
    pub fn new(shop: &ShopDomain, title: impl Into<String>, handle: impl Into<String>) -> Self {
        let handle = handle.into();
        Self {
            title: title.into(),
            link: shop.product_link(&handle),
            handle,
        }
    }

    /// Placeholder used when the catalog could not be reached.
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            title: "Unknown Product".to_string(),
            handle: String::new(),
            link: String::new(),
        }
    }
}

/// A stored per-product commission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCommission {
    pub id: CommissionId,
    pub shop: ShopDomain,
    pub product_id: ProductGid,
    #[serde(flatten)]
    pub commission: Commission,
    pub product_title: String,
    pub product_handle: String,
    pub product_link: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A standing per-collection commission, consulted by the resolver when a
/// product has no commission of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionCommission {
    pub id: CollectionCommissionId,
    pub shop: ShopDomain,
    pub collection_id: CollectionGid,
    #[serde(flatten)]
    pub commission: Commission,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Where a resolved commission came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum CommissionSource {
    /// The product's own record.
    Product,
    /// A collection the product belongs to.
    Collection {
        #[serde(rename = "collectionId")]
        collection_id: CollectionGid,
    },
}

/// The effective commission for a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionView {
    /// Id of the record the commission was read from.
    pub id: i32,
    #[serde(flatten)]
    pub commission: Commission,
    #[serde(flatten)]
    pub source: CommissionSource,
    pub updated_at: DateTime<Utc>,
}

impl From<&ProductCommission> for CommissionView {
    fn from(record: &ProductCommission) -> Self {
        Self {
            id: record.id.as_i32(),
            commission: record.commission.clone(),
            source: CommissionSource::Product,
            updated_at: record.updated_at,
        }
    }
}

impl From<&CollectionCommission> for CommissionView {
    fn from(record: &CollectionCommission) -> Self {
        Self {
            id: record.id.as_i32(),
            commission: record.commission.clone(),
            source: CommissionSource::Collection {
                collection_id: record.collection_id.clone(),
            },
            updated_at: record.updated_at,
        }
    }
}

/// Pick the effective commission for a product.
///
/// A product-level record always wins. Otherwise the collection record with
/// the latest `updated_at` applies; equal timestamps fall back to the higher
/// record id so the outcome never depends on input order. `None` means the
/// product has no commission, which is a normal result.
#[must_use]
pub fn resolve_precedence(
    product: Option<&ProductCommission>,
    collections: &[CollectionCommission],
) -> Option<CommissionView> {
    if let Some(record) = product {
        return Some(CommissionView::from(record));
    }

    collections
        .iter()
        .max_by_key(|c| (c.updated_at, c.id))
        .map(CommissionView::from)
}
