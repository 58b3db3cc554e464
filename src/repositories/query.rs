//! Query builder - Turns a base filter plus a [`QuerySpec`] into a storage query
//!
//! Composition order matters: the caller's base filter (which already carries
//! any role or visibility narrowing) comes first, then the search disjunction,
//! then exact-match and range overlays. All clauses are conjunctive, so an
//! overlay can only narrow what the base filter allows.

use super::filter::{Condition, FieldValue, Filter};
use super::traits::Entity;
use crate::core::{AppError, ErrorDetails};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 100;
pub const DEFAULT_SORT: &str = "createdAt";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// `1` for ascending, `-1` for descending.
    pub fn direction(self) -> i8 {
        match self {
            Self::Asc => 1,
            Self::Desc => -1,
        }
    }
}

/// Extra narrowing attached to a list request.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterBy {
    Exact {
        field: String,
        value: FieldValue,
    },
    Range {
        field: String,
        min: Option<f64>,
        max: Option<f64>,
    },
}

impl FilterBy {
    pub fn exact(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::Exact {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn range(field: impl Into<String>, min: Option<f64>, max: Option<f64>) -> Self {
        Self::Range {
            field: field.into(),
            min,
            max,
        }
    }
}

/// Normalized pagination/sort/search/filter request.
///
/// `page` and `limit` are clamped on construction, so every spec is in range.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    page: u64,
    limit: u64,
    search: Option<String>,
    search_fields: Vec<String>,
    sort: String,
    order: SortOrder,
    filter_by: Vec<FilterBy>,
}

impl Default for QuerySpec {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            search: None,
            search_fields: Vec::new(),
            sort: DEFAULT_SORT.to_string(),
            order: SortOrder::default(),
            filter_by: Vec::new(),
        }
    }
}

impl QuerySpec {
    /// Clamps `page` to at least 1 and `limit` into `[1, 100]`; missing values take the defaults.
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: page.map_or(DEFAULT_PAGE, |p| p.max(1) as u64),
            limit: limit.map_or(DEFAULT_LIMIT, |l| l.clamp(1, MAX_LIMIT as i64) as u64),
            ..Self::default()
        }
    }

    /// Blank terms are ignored.
    pub fn search<I, S>(mut self, term: Option<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search = term
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        self.search_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn sort(mut self, field: Option<String>, order: Option<SortOrder>) -> Self {
        if let Some(field) = field.filter(|f| !f.trim().is_empty()) {
            self.sort = field.trim().to_string();
        }
        if let Some(order) = order {
            self.order = order;
        }
        self
    }

    pub fn filter(mut self, filter: FilterBy) -> Self {
        self.filter_by.push(filter);
        self
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    pub fn sort_field(&self) -> &str {
        &self.sort
    }

    /// Saturates instead of wrapping for pages far past the end.
    pub fn skip(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

/// Cursor parameters of a bounded fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub sort: Option<(String, SortOrder)>,
    pub skip: u64,
    pub limit: Option<u64>,
}

/// Builds the storage filter and cursor for listing `T`.
///
/// Fails with `INVALID_QUERY_FIELD` when the spec names a field `T` does not expose.
pub fn build_query<T: Entity>(base: Filter, spec: &QuerySpec) -> Result<(Filter, FindOptions), AppError> {
    let mut filter = base;

    if let Some(term) = &spec.search {
        if !spec.search_fields.is_empty() {
            filter.push(Condition::Search {
                fields: spec.search_fields.clone(),
                term: term.clone(),
            });
        }
    }

    for narrowing in &spec.filter_by {
        match narrowing {
            FilterBy::Exact { field, value } => filter.push(Condition::Eq {
                field: field.clone(),
                value: value.clone(),
            }),
            FilterBy::Range { field, min, max } if min.is_some() || max.is_some() => {
                filter.push(Condition::Range {
                    field: field.clone(),
                    min: *min,
                    max: *max,
                })
            }
            FilterBy::Range { .. } => {}
        }
    }

    ensure_known_fields::<T>(&filter)?;
    ensure_known_field::<T>(&spec.sort)?;

    let options = FindOptions {
        sort: Some((spec.sort.clone(), spec.order)),
        skip: spec.skip(),
        limit: Some(spec.limit),
    };
    Ok((filter, options))
}

pub fn ensure_known_fields<T: Entity>(filter: &Filter) -> Result<(), AppError> {
    filter
        .conditions()
        .iter()
        .flat_map(|c| c.fields())
        .try_for_each(ensure_known_field::<T>)
}

fn ensure_known_field<T: Entity>(field: &str) -> Result<(), AppError> {
    if T::queryable(field) {
        return Ok(());
    }
    Err(AppError::bad_request(format!("Unknown field '{field}' for {}", T::NAME))
        .with_code("INVALID_QUERY_FIELD")
        .with_details(ErrorDetails::Field {
            field: field.to_string(),
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Product;

    #[test]
    fn defaults_match_the_wire_contract() {
        let spec = QuerySpec::new(None, None);
        assert_eq!(spec.page(), 1);
        assert_eq!(spec.limit(), 10);
        assert_eq!(spec.sort_field(), "createdAt");
        assert_eq!(spec.order(), SortOrder::Desc);
        assert_eq!(spec.order().direction(), -1);
    }

    #[test]
    fn page_and_limit_are_clamped() {
        for (page, limit, want_page, want_limit) in [
            (0, 0, 1, 1),
            (-3, -50, 1, 1),
            (2, 101, 2, 100),
            (7, 100, 7, 100),
            (1, 1, 1, 1),
        ] {
            let spec = QuerySpec::new(Some(page), Some(limit));
            assert_eq!((spec.page(), spec.limit()), (want_page, want_limit));
        }
    }

    #[test]
    fn skip_is_derived_from_page_and_limit() {
        let (_, options) = build_query::<Product>(Filter::new(), &QuerySpec::new(Some(3), Some(20))).unwrap();
        assert_eq!(options.skip, 40);
        assert_eq!(options.limit, Some(20));
        assert_eq!(options.sort, Some(("createdAt".to_string(), SortOrder::Desc)));
    }

    #[test]
    fn skip_saturates_for_huge_pages() {
        let spec = QuerySpec::new(Some(i64::MAX), Some(10));
        assert_eq!(spec.page(), i64::MAX as u64);
        assert_eq!(spec.skip(), u64::MAX);

        assert_eq!(QuerySpec::new(Some(i64::MAX), Some(1)).skip(), i64::MAX as u64 - 1);
    }

    #[test]
    fn base_filter_precedes_overlays() {
        let spec = QuerySpec::new(None, None)
            .search(Some(" keyboard ".into()), ["name", "sku"])
            .filter(FilterBy::exact("category", "Peripherals"))
            .filter(FilterBy::range("price", Some(10.0), None))
            .filter(FilterBy::range("quantity", None, None));
        let (filter, _) = build_query::<Product>(Filter::new().eq("type", "public"), &spec).unwrap();

        assert_eq!(
            filter.conditions(),
            &[
                Condition::Eq { field: "type".into(), value: "public".into() },
                Condition::Search {
                    fields: vec!["name".into(), "sku".into()],
                    term: "keyboard".into()
                },
                Condition::Eq { field: "category".into(), value: "Peripherals".into() },
                Condition::Range { field: "price".into(), min: Some(10.0), max: None },
            ]
        );
    }

    #[test]
    fn search_without_fields_or_term_adds_nothing() {
        let spec = QuerySpec::new(None, None).search(Some("x".into()), Vec::<String>::new());
        let (filter, _) = build_query::<Product>(Filter::new(), &spec).unwrap();
        assert!(filter.is_empty());

        let spec = QuerySpec::new(None, None).search(Some("   ".into()), ["name"]);
        let (filter, _) = build_query::<Product>(Filter::new(), &spec).unwrap();
        assert!(filter.is_empty());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let spec = QuerySpec::new(None, None).sort(Some("password".into()), None);
        let err = build_query::<Product>(Filter::new(), &spec).unwrap_err();
        assert_eq!(err.code(), "INVALID_QUERY_FIELD");

        let spec = QuerySpec::new(None, None).search(Some("x".into()), ["nope"]);
        assert!(build_query::<Product>(Filter::new(), &spec).is_err());
    }
}
