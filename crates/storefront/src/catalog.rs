//! Product catalog client.
//!
//! Read-only catalog lookups. Responses are cached with `moka` for the
//! configured TTL; search queries always go to the backend.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, instrument};
use url::form_urlencoded;
use youshop_core::{Category, Product, ProductId};

use crate::api::{ApiClient, ApiError, Method, Page, optional};

const PRODUCTS_PATH: &str = "/catalog/products";
const CATEGORIES_PATH: &str = "/catalog/categories";

/// Cached value types.
#[derive(Debug, Clone)]
enum CacheValue {
    Product(Box<Product>),
    Products(Page<Product>),
    Categories(Vec<Category>),
}

/// Sort direction for product listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Filters for a product listing. Unset fields are left off the query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
}

impl ProductQuery {
    /// A search for `term`.
    #[must_use]
    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search: Some(term.into()),
            ..Self::default()
        }
    }

    /// Products in one category.
    #[must_use]
    pub fn in_category(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// URL query string, without the leading `?`. Empty values are omitted.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        if let Some(page) = self.page {
            query.append_pair("page", &page.to_string());
        }
        if let Some(limit) = self.limit {
            query.append_pair("limit", &limit.to_string());
        }
        for (name, value) in [
            ("search", self.search.as_deref()),
            ("category", self.category.as_deref()),
            ("sortBy", self.sort_by.as_deref()),
        ] {
            if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
                query.append_pair(name, value);
            }
        }
        if let Some(order) = self.sort_order {
            query.append_pair("sortOrder", order.as_str());
        }
        query.finish()
    }

    fn is_search(&self) -> bool {
        self.search.as_deref().is_some_and(|s| !s.trim().is_empty())
    }

    fn path(&self) -> String {
        let query = self.to_query_string();
        if query.is_empty() {
            PRODUCTS_PATH.to_string()
        } else {
            format!("{PRODUCTS_PATH}?{query}")
        }
    }
}

/// Catalog lookups against the backend.
#[derive(Clone)]
pub struct CatalogService {
    inner: Arc<CatalogServiceInner>,
}

struct CatalogServiceInner {
    api: ApiClient,
    cache: Cache<String, CacheValue>,
}

impl std::fmt::Debug for CatalogService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogService")
            .field("cached_entries", &self.inner.cache.entry_count())
            .finish_non_exhaustive()
    }
}

impl CatalogService {
    /// Create a catalog client caching responses for `ttl`.
    #[must_use]
    pub fn new(api: ApiClient, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(ttl)
            .build();

        Self {
            inner: Arc::new(CatalogServiceInner { api, cache }),
        }
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// List products matching `query`.
    ///
    /// # Errors
    ///
    /// Returns the `ApiError` once retries are exhausted.
    #[instrument(skip(self))]
    pub async fn list_products(&self, query: &ProductQuery) -> Result<Page<Product>, ApiError> {
        let path = query.path();
        let cacheable = !query.is_search();

        if cacheable
            && let Some(CacheValue::Products(page)) = self.inner.cache.get(&path).await
        {
            debug!("Cache hit for products");
            return Ok(page);
        }

        let page = self
            .inner
            .api
            .request_with_retry::<Page<Product>>(Method::Get, &path, None, false)
            .await?
            .data;

        if cacheable {
            self.inner
                .cache
                .insert(path, CacheValue::Products(page.clone()))
                .await;
        }

        Ok(page)
    }

    /// One product, or `None` if the backend does not know it.
    ///
    /// # Errors
    ///
    /// Returns the `ApiError` for failures other than not-found.
    #[instrument(skip(self))]
    pub async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, ApiError> {
        let path = format!("{PRODUCTS_PATH}/{id}");

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&path).await {
            debug!("Cache hit for product");
            return Ok(Some(*product));
        }

        let product = optional(
            self.inner
                .api
                .request_with_retry::<Product>(Method::Get, &path, None, false)
                .await,
        )?;

        if let Some(product) = &product {
            self.inner
                .cache
                .insert(path, CacheValue::Product(Box::new(product.clone())))
                .await;
        }

        Ok(product)
    }

    /// Products whose name or description matches `term`.
    ///
    /// # Errors
    ///
    /// Returns the `ApiError` once retries are exhausted.
    pub async fn search_products(&self, term: &str) -> Result<Vec<Product>, ApiError> {
        Ok(self.list_products(&ProductQuery::search(term)).await?.items)
    }

    /// The first `limit` products of the default listing.
    ///
    /// # Errors
    ///
    /// Returns the `ApiError` once retries are exhausted.
    pub async fn featured_products(&self, limit: u32) -> Result<Vec<Product>, ApiError> {
        let mut items = self
            .list_products(&ProductQuery::default().with_limit(limit))
            .await?
            .items;
        items.truncate(limit as usize);
        Ok(items)
    }

    /// Up to `limit` other products from the same category as `id`.
    ///
    /// Unknown products and products without a category have no relatives.
    ///
    /// # Errors
    ///
    /// Returns the `ApiError` once retries are exhausted.
    #[instrument(skip(self))]
    pub async fn related_products(
        &self,
        id: &ProductId,
        limit: usize,
    ) -> Result<Vec<Product>, ApiError> {
        let Some(product) = self.get_product(id).await? else {
            return Ok(Vec::new());
        };
        let Some(category) = product.category_id() else {
            return Ok(Vec::new());
        };

        let page = self
            .list_products(&ProductQuery::in_category(category.as_str()))
            .await?;

        Ok(page
            .items
            .into_iter()
            .filter(|p| &p.id != id && p.category_id() == Some(category))
            .take(limit)
            .collect())
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// All categories.
    ///
    /// # Errors
    ///
    /// Returns the `ApiError` once retries are exhausted.
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        let key = CATEGORIES_PATH.to_string();

        if let Some(CacheValue::Categories(categories)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let categories = self
            .inner
            .api
            .request_with_retry::<Page<Category>>(Method::Get, CATEGORIES_PATH, None, false)
            .await?
            .data
            .items;

        self.inner
            .cache
            .insert(key, CacheValue::Categories(categories.clone()))
            .await;

        Ok(categories)
    }

    // =========================================================================
    // Cache Management
    // =========================================================================

    /// Drop a cached product.
    pub async fn invalidate_product(&self, id: &ProductId) {
        self.inner
            .cache
            .invalidate(&format!("{PRODUCTS_PATH}/{id}"))
            .await;
    }

    /// Drop all cached catalog data.
    pub async fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_query_is_bare_path() {
        let query = ProductQuery::default();
        assert_eq!(query.to_query_string(), "");
        assert_eq!(query.path(), "/catalog/products");
    }

    #[test]
    fn test_query_omits_empty_values() {
        let query = ProductQuery {
            page: Some(2),
            limit: Some(12),
            search: Some("  ".to_string()),
            category: Some("home & garden".to_string()),
            sort_by: Some(String::new()),
            sort_order: Some(SortOrder::Desc),
        };
        assert_eq!(
            query.to_query_string(),
            "page=2&limit=12&category=home+%26+garden&sortOrder=desc"
        );
        assert!(!query.is_search());
    }

    #[test]
    fn test_search_query() {
        let query = ProductQuery::search("tea pot").with_page(1);
        assert_eq!(query.to_query_string(), "page=1&search=tea+pot");
        assert!(query.is_search());
    }
}
