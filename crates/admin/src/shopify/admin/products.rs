//! Product reads for the Admin API.

use commission_manager_core::ProductGid;

use super::{
    AdminClient,
    queries::{
        self, CursorVariables, IdVariables, IdsVariables, NodesData, PageVariables, ProductData,
        ProductPricesData, ProductsData,
    },
};
use crate::shopify::{
    ShopifyError,
    types::{CatalogProduct, Page, ProductPrice},
};

/// Ids per `nodes(ids:)` lookup. At roughly 4 points per product summary
/// this keeps a lookup near 400 of the 1000-point query budget.
const MAX_IDS_PER_REQUEST: usize = 100;

impl AdminClient {
    pub(super) async fn products_page(
        &self,
        cursor: Option<&str>,
        page_size: u32,
        search: Option<&str>,
    ) -> Result<Page<CatalogProduct>, ShopifyError> {
        let variables = PageVariables {
            first: page_size,
            after: cursor,
            query: search.filter(|s| !s.trim().is_empty()),
        };

        let data: ProductsData = self
            .execute("CommissionProducts", queries::PRODUCTS, variables)
            .await?;

        let items = data
            .products
            .nodes
            .into_iter()
            .map(CatalogProduct::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let (has_more, next_cursor) = data
            .products
            .page_info
            .map_or((false, None), |p| (p.has_next_page, p.end_cursor));

        Ok(Page {
            items,
            next_cursor,
            has_more,
        })
    }

    pub(super) async fn product_prices_page(
        &self,
        cursor: Option<&str>,
        page_size: u32,
    ) -> Result<Page<ProductPrice>, ShopifyError> {
        let variables = CursorVariables {
            first: page_size,
            after: cursor,
        };

        let data: ProductPricesData = self
            .execute("CommissionProductPrices", queries::PRODUCT_PRICES, variables)
            .await?;

        let items = data
            .products
            .nodes
            .into_iter()
            .map(ProductPrice::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let (has_more, next_cursor) = data
            .products
            .page_info
            .map_or((false, None), |p| (p.has_next_page, p.end_cursor));

        Ok(Page {
            items,
            next_cursor,
            has_more,
        })
    }

    pub(super) async fn products_by_ids(
        &self,
        ids: &[ProductGid],
    ) -> Result<Vec<CatalogProduct>, ShopifyError> {
        let mut products = Vec::with_capacity(ids.len());

        for chunk in ids.chunks(MAX_IDS_PER_REQUEST) {
            let variables = IdsVariables {
                ids: chunk.iter().map(ProductGid::as_str).collect(),
            };
            let data: NodesData = self
                .execute("CommissionProductsByIds", queries::PRODUCTS_BY_IDS, variables)
                .await?;

            for node in data.nodes.into_iter().flatten() {
                // Deleted products come back as null, other node types as {}.
                if node.id.is_none() {
                    continue;
                }
                products.push(CatalogProduct::try_from(node)?);
            }
        }

        Ok(products)
    }

    pub(super) async fn product(
        &self,
        id: &ProductGid,
    ) -> Result<Option<CatalogProduct>, ShopifyError> {
        let variables = IdVariables { id: id.as_str() };
        let data: ProductData = self
            .execute("CommissionProduct", queries::PRODUCT, variables)
            .await?;

        data.product.map(CatalogProduct::try_from).transpose()
    }
}
