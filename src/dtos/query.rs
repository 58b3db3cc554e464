//! Query DTOs - Query string parameters of list endpoints
//!
//! The same query string is read by [`ListQuery`] and by a resource's filter
//! DTO; unknown keys are ignored by each of them.

use crate::entities::{ProductType, Role};
use crate::repositories::{FilterBy, QuerySpec, SortOrder};
use serde::Deserialize;

/// `page`, `limit`, `search`, `sort`, `order`
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<SortOrder>,
}

impl ListQuery {
    /// Normalized spec searching over `search_fields`. Out-of-range paging is clamped.
    pub fn to_spec(&self, search_fields: &[&str]) -> QuerySpec {
        QuerySpec::new(self.page, self.limit)
            .search(self.search.clone(), search_fields.iter().copied())
            .sort(self.sort.clone(), self.order)
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilters {
    pub category: Option<String>,
    #[serde(rename = "type")]
    pub product_type: Option<ProductType>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

impl ProductFilters {
    pub fn apply(&self, mut spec: QuerySpec) -> QuerySpec {
        if let Some(category) = self.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            spec = spec.filter(FilterBy::exact("category", category));
        }
        if let Some(product_type) = self.product_type {
            spec = spec.filter(FilterBy::exact("type", product_type.as_str()));
        }
        spec.filter(FilterBy::range("price", self.min_price, self.max_price))
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct UserFilters {
    pub role: Option<Role>,
}

impl UserFilters {
    pub fn apply(&self, spec: QuerySpec) -> QuerySpec {
        match self.role {
            Some(role) => spec.filter(FilterBy::exact("role", role.as_str())),
            None => spec,
        }
    }
}
