//! Collection reads for the Admin API.

use commission_manager_core::CollectionGid;

use super::{
    AdminClient,
    queries::{self, CollectionProductsData, CollectionProductsVariables, CollectionsData, PageVariables},
};
use crate::shopify::{
    ShopifyError,
    types::{CatalogCollection, CatalogProduct, CollectionMembers, Page},
};

impl AdminClient {
    pub(super) async fn collection_products(
        &self,
        collection: &CollectionGid,
        page_size: u32,
    ) -> Result<CollectionMembers, ShopifyError> {
        let variables = CollectionProductsVariables {
            id: collection.as_str(),
            first: page_size,
        };

        let data: CollectionProductsData = self
            .execute(
                "CommissionCollectionProducts",
                queries::COLLECTION_PRODUCTS,
                variables,
            )
            .await?;

        let collection_data = data
            .collection
            .ok_or_else(|| ShopifyError::NotFound(format!("collection {collection}")))?;

        let products = collection_data
            .products
            .nodes
            .into_iter()
            .map(CatalogProduct::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CollectionMembers {
            title: collection_data.title,
            products,
        })
    }

    pub(super) async fn collections_page(
        &self,
        cursor: Option<&str>,
        page_size: u32,
        search: Option<&str>,
    ) -> Result<Page<CatalogCollection>, ShopifyError> {
        let variables = PageVariables {
            first: page_size,
            after: cursor,
            query: search.filter(|s| !s.trim().is_empty()),
        };

        let data: CollectionsData = self
            .execute("CommissionCollections", queries::COLLECTIONS, variables)
            .await?;

        let items = data
            .collections
            .nodes
            .into_iter()
            .map(CatalogCollection::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let (has_more, next_cursor) = data
            .collections
            .page_info
            .map_or((false, None), |p| (p.has_next_page, p.end_cursor));

        Ok(Page {
            items,
            next_cursor,
            has_more,
        })
    }
}
