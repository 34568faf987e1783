//! `PostgreSQL` implementation of the shop and commission stores.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use commission_manager_core::{
    CollectionCommission, CollectionCommissionId, CollectionGid, Commission, CommissionId,
    ProductCommission, ProductGid, ShopDomain,
};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;

use super::{
    CommissionPage, CommissionStore, NewProductCommission, RepositoryError, Shop, ShopErasure,
    ShopStore, page_offset,
};

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ShopRow {
    domain: String,
    access_token: Option<String>,
    scope: String,
    installed_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ShopRow> for Shop {
    type Error = RepositoryError;

    fn try_from(row: ShopRow) -> Result<Self, Self::Error> {
        let domain = ShopDomain::parse(&row.domain).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid shop domain {:?}: {e}", row.domain))
        })?;

        Ok(Self {
            domain,
            access_token: row.access_token.map(SecretString::from),
            scope: row.scope,
            installed_at: row.installed_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductCommissionRow {
    id: i32,
    shop: String,
    product_id: String,
    commission_type: String,
    commission_value: Decimal,
    currency: Option<String>,
    product_title: String,
    product_handle: String,
    product_link: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductCommissionRow> for ProductCommission {
    type Error = RepositoryError;

    fn try_from(row: ProductCommissionRow) -> Result<Self, Self::Error> {
        let commission = Commission::from_parts(
            &row.commission_type,
            row.commission_value,
            row.currency.as_deref(),
        )
        .map_err(|e| {
            RepositoryError::DataCorruption(format!("product commission {}: {e}", row.id))
        })?;

        Ok(Self {
            id: CommissionId::new(row.id),
            shop: parse_shop(&row.shop)?,
            product_id: ProductGid::parse(&row.product_id).map_err(|e| {
                RepositoryError::DataCorruption(format!("product commission {}: {e}", row.id))
            })?,
            commission,
            product_title: row.product_title,
            product_handle: row.product_handle,
            product_link: row.product_link,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CollectionCommissionRow {
    id: i32,
    shop: String,
    collection_id: String,
    commission_type: String,
    commission_value: Decimal,
    currency: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CollectionCommissionRow> for CollectionCommission {
    type Error = RepositoryError;

    fn try_from(row: CollectionCommissionRow) -> Result<Self, Self::Error> {
        let commission = Commission::from_parts(
            &row.commission_type,
            row.commission_value,
            row.currency.as_deref(),
        )
        .map_err(|e| {
            RepositoryError::DataCorruption(format!("collection commission {}: {e}", row.id))
        })?;

        Ok(Self {
            id: CollectionCommissionId::new(row.id),
            shop: parse_shop(&row.shop)?,
            collection_id: CollectionGid::parse(&row.collection_id).map_err(|e| {
                RepositoryError::DataCorruption(format!("collection commission {}: {e}", row.id))
            })?,
            commission,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn parse_shop(value: &str) -> Result<ShopDomain, RepositoryError> {
    ShopDomain::parse(value)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid shop domain {value:?}: {e}")))
}

fn ids_as_text<T: AsRef<str>>(ids: &[T]) -> Vec<String> {
    ids.iter().map(|id| id.as_ref().to_owned()).collect()
}

const PRODUCT_COLUMNS: &str = "id, shop, product_id, commission_type, commission_value, currency, \
     product_title, product_handle, product_link, created_at, updated_at";

const COLLECTION_COLUMNS: &str =
    "id, shop, collection_id, commission_type, commission_value, currency, created_at, updated_at";

// =============================================================================
// Store
// =============================================================================

/// Store backed by a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool (shared with the session store).
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ShopStore for PgStore {
    async fn find_shop(&self, shop: &ShopDomain) -> Result<Option<Shop>, RepositoryError> {
        let row = sqlx::query_as::<_, ShopRow>(
            r"
            SELECT domain, access_token, scope, installed_at, updated_at
            FROM shops
            WHERE domain = $1
            ",
        )
        .bind(shop.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Shop::try_from).transpose()
    }

    async fn save_shop_token(
        &self,
        shop: &ShopDomain,
        access_token: &SecretString,
        scope: &str,
    ) -> Result<Shop, RepositoryError> {
        let row = sqlx::query_as::<_, ShopRow>(
            r"
            INSERT INTO shops (domain, access_token, scope)
            VALUES ($1, $2, $3)
            ON CONFLICT (domain) DO UPDATE SET
                access_token = EXCLUDED.access_token,
                scope = EXCLUDED.scope,
                updated_at = NOW()
            RETURNING domain, access_token, scope, installed_at, updated_at
            ",
        )
        .bind(shop.as_str())
        .bind(access_token.expose_secret())
        .bind(scope)
        .fetch_one(&self.pool)
        .await?;

        Shop::try_from(row)
    }

    async fn delete_shop(&self, shop: &ShopDomain) -> Result<ShopErasure, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let product_commissions = sqlx::query("DELETE FROM product_commissions WHERE shop = $1")
            .bind(shop.as_str())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let collection_commissions =
            sqlx::query("DELETE FROM collection_commissions WHERE shop = $1")
                .bind(shop.as_str())
                .execute(&mut *tx)
                .await?
                .rows_affected();

        let shops = sqlx::query("DELETE FROM shops WHERE domain = $1")
            .bind(shop.as_str())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        Ok(ShopErasure {
            shop_deleted: shops > 0,
            product_commissions,
            collection_commissions,
        })
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl CommissionStore for PgStore {
    async fn upsert_product_commission(
        &self,
        shop: &ShopDomain,
        input: &NewProductCommission,
    ) -> Result<ProductCommission, RepositoryError> {
        let sql = format!(
            r"
            INSERT INTO product_commissions (
                shop, product_id, commission_type, commission_value, currency,
                product_title, product_handle, product_link
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (shop, product_id) DO UPDATE SET
                commission_type = EXCLUDED.commission_type,
                commission_value = EXCLUDED.commission_value,
                currency = EXCLUDED.currency,
                product_title = EXCLUDED.product_title,
                product_handle = EXCLUDED.product_handle,
                product_link = EXCLUDED.product_link,
                updated_at = NOW()
            RETURNING {PRODUCT_COLUMNS}
            "
        );

        let row = sqlx::query_as::<_, ProductCommissionRow>(&sql)
            .bind(shop.as_str())
            .bind(input.product_id.as_str())
            .bind(input.commission.kind().as_str())
            .bind(input.commission.value())
            .bind(input.commission.currency().map(|c| c.as_str().to_owned()))
            .bind(&input.details.title)
            .bind(&input.details.handle)
            .bind(&input.details.link)
            .fetch_one(&self.pool)
            .await?;

        ProductCommission::try_from(row)
    }

    async fn find_product_commission(
        &self,
        shop: &ShopDomain,
        product: &ProductGid,
    ) -> Result<Option<ProductCommission>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM product_commissions WHERE shop = $1 AND product_id = $2"
        );

        let row = sqlx::query_as::<_, ProductCommissionRow>(&sql)
            .bind(shop.as_str())
            .bind(product.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(ProductCommission::try_from).transpose()
    }

    async fn find_product_commissions(
        &self,
        shop: &ShopDomain,
        products: &[ProductGid],
    ) -> Result<Vec<ProductCommission>, RepositoryError> {
        if products.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM product_commissions \
             WHERE shop = $1 AND product_id = ANY($2)"
        );

        let rows = sqlx::query_as::<_, ProductCommissionRow>(&sql)
            .bind(shop.as_str())
            .bind(ids_as_text(products))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(ProductCommission::try_from).collect()
    }

    async fn delete_product_commission(
        &self,
        shop: &ShopDomain,
        id: CommissionId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM product_commissions WHERE shop = $1 AND id = $2")
            .bind(shop.as_str())
            .bind(id.as_i32())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_product_commission_for_product(
        &self,
        shop: &ShopDomain,
        product: &ProductGid,
    ) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM product_commissions WHERE shop = $1 AND product_id = $2")
                .bind(shop.as_str())
                .bind(product.as_str())
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_product_commissions(
        &self,
        shop: &ShopDomain,
        page: u32,
        limit: u32,
    ) -> Result<CommissionPage, RepositoryError> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM product_commissions WHERE shop = $1")
                .bind(shop.as_str())
                .fetch_one(&self.pool)
                .await?;

        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM product_commissions \
             WHERE shop = $1 \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2 OFFSET $3"
        );

        let rows = sqlx::query_as::<_, ProductCommissionRow>(&sql)
            .bind(shop.as_str())
            .bind(i64::from(limit))
            .bind(i64::try_from(page_offset(page, limit)).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;

        Ok(CommissionPage {
            records: rows
                .into_iter()
                .map(ProductCommission::try_from)
                .collect::<Result<_, _>>()?,
            total: u64::try_from(total).unwrap_or_default(),
        })
    }

    async fn list_all_product_commissions(
        &self,
        shop: &ShopDomain,
    ) -> Result<Vec<ProductCommission>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM product_commissions \
             WHERE shop = $1 ORDER BY created_at DESC, id DESC"
        );

        let rows = sqlx::query_as::<_, ProductCommissionRow>(&sql)
            .bind(shop.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(ProductCommission::try_from).collect()
    }

    async fn upsert_collection_commission(
        &self,
        shop: &ShopDomain,
        collection: &CollectionGid,
        commission: &Commission,
    ) -> Result<CollectionCommission, RepositoryError> {
        let sql = format!(
            r"
            INSERT INTO collection_commissions (
                shop, collection_id, commission_type, commission_value, currency
            )
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (shop, collection_id) DO UPDATE SET
                commission_type = EXCLUDED.commission_type,
                commission_value = EXCLUDED.commission_value,
                currency = EXCLUDED.currency,
                updated_at = NOW()
            RETURNING {COLLECTION_COLUMNS}
            "
        );

        let row = sqlx::query_as::<_, CollectionCommissionRow>(&sql)
            .bind(shop.as_str())
            .bind(collection.as_str())
            .bind(commission.kind().as_str())
            .bind(commission.value())
            .bind(commission.currency().map(|c| c.as_str().to_owned()))
            .fetch_one(&self.pool)
            .await?;

        CollectionCommission::try_from(row)
    }

    async fn find_collection_commissions(
        &self,
        shop: &ShopDomain,
        collections: &[CollectionGid],
    ) -> Result<Vec<CollectionCommission>, RepositoryError> {
        if collections.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {COLLECTION_COLUMNS} FROM collection_commissions \
             WHERE shop = $1 AND collection_id = ANY($2)"
        );

        let rows = sqlx::query_as::<_, CollectionCommissionRow>(&sql)
            .bind(shop.as_str())
            .bind(ids_as_text(collections))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(CollectionCommission::try_from).collect()
    }

    async fn list_collection_commissions(
        &self,
        shop: &ShopDomain,
    ) -> Result<Vec<CollectionCommission>, RepositoryError> {
        let sql = format!(
            "SELECT {COLLECTION_COLUMNS} FROM collection_commissions \
             WHERE shop = $1 ORDER BY updated_at DESC, id DESC"
        );

        let rows = sqlx::query_as::<_, CollectionCommissionRow>(&sql)
            .bind(shop.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(CollectionCommission::try_from).collect()
    }

    async fn delete_collection_commission(
        &self,
        shop: &ShopDomain,
        collection: &CollectionGid,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM collection_commissions WHERE shop = $1 AND collection_id = $2",
        )
        .bind(shop.as_str())
        .bind(collection.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product_row(kind: &str, currency: Option<&str>) -> ProductCommissionRow {
        ProductCommissionRow {
            id: 7,
            shop: "demo.myshopify.com".to_string(),
            product_id: "gid://shopify/Product/42".to_string(),
            commission_type: kind.to_string(),
            commission_value: Decimal::from(250),
            currency: currency.map(str::to_string),
            product_title: "Shoe".to_string(),
            product_handle: "shoe".to_string(),
            product_link: "https://demo.myshopify.com/products/shoe".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_product_row_converts() {
        let record = ProductCommission::try_from(product_row("fixed-amount", Some("KES"))).unwrap();
        assert_eq!(record.id, CommissionId::new(7));
        assert_eq!(record.product_id.numeric_id(), "42");
        assert_eq!(record.commission.display(), "KES 250");
    }

    #[test]
    fn test_legacy_amount_kind_is_read_as_fixed_amount() {
        let record = ProductCommission::try_from(product_row("amount", Some("USD"))).unwrap();
        assert_eq!(record.commission.kind().as_str(), "fixed-amount");
    }

    #[test]
    fn test_fixed_amount_row_without_currency_is_corrupt() {
        let result = ProductCommission::try_from(product_row("fixed-amount", None));
        assert!(matches!(result, Err(RepositoryError::DataCorruption(_))));
    }

    #[test]
    fn test_collection_row_rejects_product_gid() {
        let row = CollectionCommissionRow {
            id: 1,
            shop: "demo.myshopify.com".to_string(),
            collection_id: "gid://shopify/Product/1".to_string(),
            commission_type: "percentage".to_string(),
            commission_value: Decimal::from(5),
            currency: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(matches!(
            CollectionCommission::try_from(row),
            Err(RepositoryError::DataCorruption(_))
        ));
    }

    #[test]
    fn test_shop_row_keeps_missing_token() {
        let shop = Shop::try_from(ShopRow {
            domain: "demo.myshopify.com".to_string(),
            access_token: None,
            scope: String::new(),
            installed_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .unwrap();
        assert!(shop.token().is_none());
    }

    #[test]
    fn test_commission_value_columns_are_unconstrained_numeric() {
        // A precision/scale would round or overflow values the memory store keeps exactly.
        let schema = include_str!("../../migrations/20260301000002_create_commissions.sql");
        let columns: Vec<&str> = schema
            .lines()
            .map(str::trim)
            .filter(|line| line.starts_with("commission_value"))
            .collect();

        assert_eq!(columns, ["commission_value NUMERIC NOT NULL,"; 2]);
    }
}
