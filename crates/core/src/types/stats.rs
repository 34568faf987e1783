//! Aggregate commission statistics.
//!
//! [`StatsBuilder`] holds the live catalog (product ids and prices) and folds
//! the shop's commission records into a [`CommissionStats`] overview. It is a
//! single linear pass over the records; fetching the catalog is the caller's
//! job.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::commission::{Commission, CommissionKind, ProductCommission};
use super::id::ProductGid;
use super::money::CurrencyCode;

/// The highest commission of one kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HighestCommission {
    #[serde(with = "rust_decimal::serde::float")]
    pub commission: Decimal,
    /// Scope the record belongs to. Always `Product` for stored records.
    #[serde(rename = "type")]
    pub scope: &'static str,
    pub commission_type: CommissionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<CurrencyCode>,
    pub product_id: ProductGid,
}

/// Summary flags for the overview card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub has_commissions: bool,
    pub last_updated: DateTime<Utc>,
}

/// Commission overview for a shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionStats {
    pub total_commissions: usize,
    pub product_commissions: usize,
    pub collection_commissions: usize,
    pub total_products: usize,
    pub products_without_commissions: usize,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_potential_earnings: Decimal,
    /// Mean of percentage commissions only; zero when there are none.
    #[serde(with = "rust_decimal::serde::float")]
    pub average_commission: Decimal,
    /// Highest percentage when any exists, otherwise highest fixed amount.
    /// The two kinds are never compared with each other.
    pub highest_commission: Option<HighestCommission>,
    pub highest_percentage_commission: Option<HighestCommission>,
    pub highest_fixed_amount_commission: Option<HighestCommission>,
    pub percentage_commissions_count: usize,
    pub fixed_amount_commissions_count: usize,
    pub summary: StatsSummary,
}

/// Folds commission records against a catalog snapshot.
#[derive(Debug, Clone, Default)]
pub struct StatsBuilder {
    prices: HashMap<ProductGid, Option<Decimal>>,
}

impl StatsBuilder {
    /// Create a builder from `(product id, price)` pairs of the whole catalog.
    pub fn new<I>(catalog: I) -> Self
    where
        I: IntoIterator<Item = (ProductGid, Option<Decimal>)>,
    {
        Self {
            prices: catalog.into_iter().collect(),
        }
    }

    /// Compute the overview.
    ///
    /// `collection_commissions` is the number of standing collection records,
    /// reported for completeness; they do not count towards earnings.
    #[must_use]
    pub fn build(
        &self,
        commissions: &[ProductCommission],
        collection_commissions: usize,
        now: DateTime<Utc>,
    ) -> CommissionStats {
        let mut total_earnings = Decimal::ZERO;
        let mut percentage_sum = Decimal::ZERO;
        let mut percentage_count = 0usize;
        let mut fixed_count = 0usize;
        let mut highest_pct: Option<HighestCommission> = None;
        let mut highest_fixed: Option<HighestCommission> = None;
        let mut with_commission: HashSet<&ProductGid> = HashSet::new();

        for record in commissions {
            with_commission.insert(&record.product_id);

            let price = self.prices.get(&record.product_id).copied().flatten();
            total_earnings += record.commission.earnings(price);

            let slot = match &record.commission {
                Commission::Percentage { value } => {
                    percentage_sum += *value;
                    percentage_count += 1;
                    &mut highest_pct
                }
                Commission::FixedAmount { .. } => {
                    fixed_count += 1;
                    &mut highest_fixed
                }
            };

            let value = record.commission.value();
            if slot.as_ref().is_none_or(|h| value > h.commission) {
                *slot = Some(HighestCommission {
                    commission: value,
                    scope: "Product",
                    commission_type: record.commission.kind(),
                    currency: record.commission.currency().cloned(),
                    product_id: record.product_id.clone(),
                });
            }
        }

        let average = if percentage_count == 0 {
            Decimal::ZERO
        } else {
            percentage_sum / Decimal::from(percentage_count)
        };

        let products_without = self
            .prices
            .keys()
            .filter(|id| !with_commission.contains(id))
            .count();

        CommissionStats {
            total_commissions: commissions.len(),
            product_commissions: commissions.len(),
            collection_commissions,
            total_products: self.prices.len(),
            products_without_commissions: products_without,
            total_potential_earnings: total_earnings,
            average_commission: average,
            highest_commission: highest_pct.clone().or_else(|| highest_fixed.clone()),
            highest_percentage_commission: highest_pct,
            highest_fixed_amount_commission: highest_fixed,
            percentage_commissions_count: percentage_count,
            fixed_amount_commissions_count: fixed_count,
            summary: StatsSummary {
                has_commissions: !commissions.is_empty(),
                last_updated: now,
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::types::id::CommissionId;
    use crate::types::shop::ShopDomain;

    fn gid(n: u32) -> ProductGid {
        ProductGid::parse(&n.to_string()).unwrap()
    }

    fn record(id: i32, product: u32, commission: Commission) -> ProductCommission {
        let shop = ShopDomain::parse("demo.myshopify.com").unwrap();
        ProductCommission {
            id: CommissionId::new(id),
            product_link: shop.product_link("p"),
            shop,
            product_id: gid(product),
            commission,
            product_title: "P".to_string(),
            product_handle: "p".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_empty_shop() {
        let builder = StatsBuilder::new(vec![(gid(1), Some(dec("10")))]);
        let stats = builder.build(&[], 0, Utc::now());

        assert_eq!(stats.total_commissions, 0);
        assert_eq!(stats.average_commission, Decimal::ZERO);
        assert!(stats.highest_commission.is_none());
        assert_eq!(stats.products_without_commissions, 1);
        assert!(!stats.summary.has_commissions);
    }

    #[test]
    fn test_mixed_kinds() {
        let usd = CurrencyCode::parse("USD").unwrap();
        let builder = StatsBuilder::new(vec![
            (gid(1), Some(dec("100"))),
            (gid(2), Some(dec("50"))),
            (gid(3), None),
            (gid(4), Some(dec("20"))),
        ]);
        let records = vec![
            record(1, 1, Commission::percentage(dec("10"))),
            record(2, 2, Commission::percentage(dec("20"))),
            record(3, 3, Commission::percentage(dec("30"))),
            record(4, 4, Commission::fixed_amount(dec("500"), usd)),
        ];

        let stats = builder.build(&records, 2, Utc::now());

        assert_eq!(stats.total_commissions, 4);
        assert_eq!(stats.collection_commissions, 2);
        assert_eq!(stats.percentage_commissions_count, 3);
        assert_eq!(stats.fixed_amount_commissions_count, 1);
        assert_eq!(stats.average_commission, dec("20"));
        // 10 + 10 + 0 (no price) + 500
        assert_eq!(stats.total_potential_earnings, dec("520"));
        assert_eq!(stats.products_without_commissions, 0);

        let highest = stats.highest_commission.unwrap();
        assert_eq!(highest.commission_type, CommissionKind::Percentage);
        assert_eq!(highest.commission, dec("30"));
        assert_eq!(
            stats.highest_fixed_amount_commission.unwrap().commission,
            dec("500")
        );
    }

    #[test]
    fn test_fixed_only_reports_fixed_highest() {
        let eur = CurrencyCode::parse("EUR").unwrap();
        let builder = StatsBuilder::new(vec![(gid(1), Some(dec("10"))), (gid(2), None)]);
        let records = vec![record(1, 1, Commission::fixed_amount(dec("3"), eur))];

        let stats = builder.build(&records, 0, Utc::now());
        let highest = stats.highest_commission.unwrap();
        assert_eq!(highest.commission_type, CommissionKind::FixedAmount);
        assert_eq!(highest.currency.unwrap().as_str(), "EUR");
        assert_eq!(stats.average_commission, Decimal::ZERO);
        assert_eq!(stats.products_without_commissions, 1);
    }

    #[test]
    fn test_commission_for_deleted_product_does_not_underflow() {
        let builder = StatsBuilder::new(Vec::new());
        let records = vec![record(1, 99, Commission::percentage(dec("5")))];

        let stats = builder.build(&records, 0, Utc::now());
        assert_eq!(stats.products_without_commissions, 0);
        assert_eq!(stats.total_potential_earnings, Decimal::ZERO);
    }
}
