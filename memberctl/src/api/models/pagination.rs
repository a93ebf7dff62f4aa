//! Shared pagination types for list endpoints.
//!
//! List endpoints take page-number pagination parameters:
//! - `page`: Zero-based page index (default: 0)
//! - `size`: Page size (default: `pagination.default_page_size`, clamped to `pagination.max_page_size`)
//! - `sort`: Repeatable, `property[,property...][,asc|desc]`
//!
//! Raw parameters are collected into a [`PageQuery`] and validated into a [`PageRequest`]
//! before any store call is made. Results are returned as a [`Page`].

use crate::config::PaginationConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use utoipa::{IntoParams, ToSchema};

/// Errors produced while validating pagination input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PageRequestError {
    #[error("Page size must be greater than zero, got {0}")]
    InvalidSize(i64),

    #[error("Page index must not be negative, got {0}")]
    NegativePage(i64),

    #[error("Invalid value for '{param}': '{value}' is not an integer")]
    NotANumber { param: &'static str, value: String },

    #[error("Unknown sort property '{0}'")]
    UnknownSortField(String),

    #[error("Sort expression '{0}' does not name a property")]
    EmptySort(String),

    #[error("Page {page} with size {size} is out of range")]
    OffsetOverflow { page: i64, size: i64 },
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    /// Parse `asc`/`desc`, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("asc") {
            Some(Direction::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Some(Direction::Desc)
        } else {
            None
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }

    /// Apply this direction to an ascending comparison.
    pub fn apply(self, ordering: std::cmp::Ordering) -> std::cmp::Ordering {
        match self {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        }
    }
}

/// A property that a listing can be ordered by.
///
/// Implementors are closed enums, so only whitelisted columns ever reach SQL.
pub trait SortField: Copy + Eq + fmt::Debug + Send + Sync + 'static {
    /// The identifier property, used as the final tie-break.
    const ID: Self;

    /// Parse an external property name. Returns `None` for unknown properties.
    fn parse(name: &str) -> Option<Self>;

    /// External (API) name of the property.
    fn name(self) -> &'static str;

    /// Column expression used in `ORDER BY`.
    fn column(self) -> &'static str;
}

/// One `ORDER BY` term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Order<F> {
    pub field: F,
    pub direction: Direction,
}

impl<F: SortField> Order<F> {
    pub fn asc(field: F) -> Self {
        Self {
            field,
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: F) -> Self {
        Self {
            field,
            direction: Direction::Desc,
        }
    }
}

/// Parse one `sort` parameter value into orders.
///
/// `"username,desc"` sorts by username descending; `"age,username"` sorts by both ascending;
/// `"age,username,DESC"` applies the direction to both properties.
pub fn parse_sort<F: SortField>(expr: &str) -> Result<Vec<Order<F>>, PageRequestError> {
    let mut tokens: Vec<&str> = expr.split(',').map(str::trim).filter(|t| !t.is_empty()).collect();
    if tokens.is_empty() {
        return Ok(Vec::new());
    }

    let direction = match tokens.last().and_then(|t| Direction::parse(t)) {
        Some(direction) => {
            tokens.pop();
            direction
        }
        None => Direction::Asc,
    };

    if tokens.is_empty() {
        return Err(PageRequestError::EmptySort(expr.to_string()));
    }

    tokens
        .into_iter()
        .map(|name| {
            F::parse(name)
                .map(|field| Order { field, direction })
                .ok_or_else(|| PageRequestError::UnknownSortField(name.to_string()))
        })
        .collect()
}

/// Raw page parameters as they arrive on the query string.
///
/// Values are kept as strings so that malformed numbers surface as validation errors
/// rather than extractor rejections.
#[derive(Debug, Clone, Default, PartialEq, Eq, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// Zero-based page index (default: 0)
    #[param(value_type = Option<i64>, minimum = 0)]
    pub page: Option<String>,

    /// Page size (must be positive; values above the configured maximum are clamped)
    #[param(value_type = Option<i64>, minimum = 1)]
    pub size: Option<String>,

    /// Sort expressions, e.g. `username,desc`. Repeatable.
    pub sort: Vec<String>,
}

impl PageQuery {
    /// Collect page parameters from a raw query string. Unrelated parameters are ignored;
    /// for `page` and `size` the last occurrence wins.
    pub fn from_query_string(raw: Option<&str>) -> Self {
        let mut query = PageQuery::default();
        let Some(raw) = raw else {
            return query;
        };

        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            match key.as_ref() {
                "page" => query.page = Some(value.into_owned()),
                "size" => query.size = Some(value.into_owned()),
                "sort" => query.sort.push(value.into_owned()),
                _ => {}
            }
        }
        query
    }
}

fn parse_number(param: &'static str, value: &str) -> Result<i64, PageRequestError> {
    value.trim().parse::<i64>().map_err(|_| PageRequestError::NotANumber {
        param,
        value: value.to_string(),
    })
}

/// A validated page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest<F> {
    page: i64,
    size: i64,
    sort: Vec<Order<F>>,
}

impl<F: SortField> PageRequest<F> {
    /// Build a page request, rejecting a non-positive size, a negative page index, or an
    /// offset that does not fit in an `i64`.
    pub fn new(page: i64, size: i64, sort: Vec<Order<F>>) -> Result<Self, PageRequestError> {
        if size <= 0 {
            return Err(PageRequestError::InvalidSize(size));
        }
        if page < 0 {
            return Err(PageRequestError::NegativePage(page));
        }
        if page.checked_mul(size).is_none() {
            return Err(PageRequestError::OffsetOverflow { page, size });
        }
        Ok(Self { page, size, sort })
    }

    /// Unsorted request, convenient for internal callers.
    pub fn of(page: i64, size: i64) -> Result<Self, PageRequestError> {
        Self::new(page, size, Vec::new())
    }

    /// Validate raw query parameters, applying configured defaults and the size ceiling.
    pub fn from_query(query: &PageQuery, config: &PaginationConfig) -> Result<Self, PageRequestError> {
        let page = match query.page.as_deref() {
            Some(raw) => parse_number("page", raw)?,
            None => 0,
        };
        let size = match query.size.as_deref() {
            Some(raw) => parse_number("size", raw)?,
            None => config.default_page_size,
        };
        if size <= 0 {
            return Err(PageRequestError::InvalidSize(size));
        }
        let size = size.min(config.max_page_size);

        let mut sort = Vec::new();
        for expr in &query.sort {
            sort.extend(parse_sort::<F>(expr)?);
        }

        Self::new(page, size, sort)
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn size(&self) -> i64 {
        self.size
    }

    pub fn sort(&self) -> &[Order<F>] {
        &self.sort
    }

    /// Row offset of the first element on this page.
    pub fn offset(&self) -> i64 {
        // Checked in `new`
        self.page * self.size
    }

    /// The requested orders followed by `id ASC`, unless the id is already part of the sort.
    pub fn order_with_tiebreak(&self) -> Vec<Order<F>> {
        let mut orders = self.sort.clone();
        if !orders.iter().any(|o| o.field == F::ID) {
            orders.push(Order::asc(F::ID));
        }
        orders
    }
}

/// A sort term as reported back to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SortOrderResponse {
    pub property: String,
    pub direction: Direction,
}

impl<F: SortField> From<&Order<F>> for SortOrderResponse {
    fn from(order: &Order<F>) -> Self {
        Self {
            property: order.field.name().to_string(),
            direction: order.direction,
        }
    }
}

/// One page of a larger result set plus pagination metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// The items on this page
    pub content: Vec<T>,
    /// Total number of items across all pages
    pub total_elements: i64,
    /// Total number of pages, `ceil(totalElements / size)`
    pub total_pages: i64,
    /// Zero-based index of this page
    pub number: i64,
    /// Requested page size
    pub size: i64,
    /// Number of items on this page
    pub number_of_elements: i64,
    pub first: bool,
    pub last: bool,
    pub has_next: bool,
    pub has_previous: bool,
    pub empty: bool,
    /// Sort applied to this page
    pub sort: Vec<SortOrderResponse>,
}

impl<T> Page<T> {
    /// Assemble a page from its content, the request that produced it, and the total count.
    pub fn new<F: SortField>(content: Vec<T>, request: &PageRequest<F>, total_elements: i64) -> Self {
        let size = request.size();
        let number = request.page();
        let total_pages = total_elements / size + i64::from(total_elements % size != 0);
        let has_next = request.offset().saturating_add(size) < total_elements;

        Self {
            number_of_elements: content.len() as i64,
            empty: content.is_empty(),
            content,
            total_elements,
            total_pages,
            number,
            size,
            first: number == 0,
            last: !has_next,
            has_next,
            has_previous: number > 0,
            sort: request.sort().iter().map(SortOrderResponse::from).collect(),
        }
    }

    /// Project every item, keeping the metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            total_elements: self.total_elements,
            total_pages: self.total_pages,
            number: self.number,
            size: self.size,
            number_of_elements: self.number_of_elements,
            first: self.first,
            last: self.last,
            has_next: self.has_next,
            has_previous: self.has_previous,
            empty: self.empty,
            sort: self.sort,
        }
    }
}
