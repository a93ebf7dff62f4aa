//! Generic paginated listing.
//!
//! [`list_page`] turns raw page parameters into a [`Page`] of projected records for any
//! [`PageSource`]. Parameters are validated before the source is touched; the content and count
//! queries then run concurrently and the request fails if either does.

use crate::api::models::members::MemberSortField;
use crate::api::models::pagination::{Order, Page, PageQuery, PageRequest, SortField};
use crate::api::models::teams::TeamSortField;
use crate::config::PaginationConfig;
use crate::db::errors::Result;
use crate::db::models::{members::MemberDBResponse, teams::TeamDBResponse};
use crate::errors::Error;
use crate::store::Store;
use tracing::{debug, instrument};

/// Something that can be read one page at a time.
#[async_trait::async_trait]
pub trait PageSource<R: Send, F: SortField>: Send + Sync {
    /// Label used in logs and metrics.
    fn entity(&self) -> &'static str;

    /// Up to `limit` records starting at `offset`, in the given order.
    async fn fetch(&self, offset: i64, limit: i64, order: &[Order<F>]) -> Result<Vec<R>>;

    /// Total number of records.
    async fn count(&self) -> Result<i64>;
}

/// Members of a store, as a page source.
pub struct MemberPages<'a>(pub &'a dyn Store);

#[async_trait::async_trait]
impl PageSource<MemberDBResponse, MemberSortField> for MemberPages<'_> {
    fn entity(&self) -> &'static str {
        "members"
    }

    async fn fetch(&self, offset: i64, limit: i64, order: &[Order<MemberSortField>]) -> Result<Vec<MemberDBResponse>> {
        self.0.page_members(offset, limit, order).await
    }

    async fn count(&self) -> Result<i64> {
        self.0.count_members().await
    }
}

/// Teams of a store, as a page source.
pub struct TeamPages<'a>(pub &'a dyn Store);

#[async_trait::async_trait]
impl PageSource<TeamDBResponse, TeamSortField> for TeamPages<'_> {
    fn entity(&self) -> &'static str {
        "teams"
    }

    async fn fetch(&self, offset: i64, limit: i64, order: &[Order<TeamSortField>]) -> Result<Vec<TeamDBResponse>> {
        self.0.page_teams(offset, limit, order).await
    }

    async fn count(&self) -> Result<i64> {
        self.0.count_teams().await
    }
}

/// Fetch the page described by an already validated request.
///
/// The source is ordered by the request's sort followed by an `id` tie-break, so pages are
/// stable across requests.
pub async fn fetch_page<R, F, S>(source: &S, request: &PageRequest<F>) -> Result<Page<R>>
where
    R: Send,
    F: SortField,
    S: PageSource<R, F> + ?Sized,
{
    let order = request.order_with_tiebreak();
    let (content, total) = tokio::try_join!(source.fetch(request.offset(), request.size(), &order), source.count())?;

    metrics::counter!("memberctl_page_queries_total", "entity" => source.entity()).increment(1);
    debug!(entity = source.entity(), returned = content.len(), total, "Fetched page");

    Ok(Page::new(content, request, total))
}

/// Validate raw page parameters and return the projected page.
///
/// Invalid parameters yield [`Error::BadRequest`] without any call to `source`.
#[instrument(skip(source, config, project), fields(entity = source.entity()), err)]
pub async fn list_page<R, F, P, S>(
    source: &S,
    query: &PageQuery,
    config: &PaginationConfig,
    project: impl FnMut(R) -> P + Send,
) -> std::result::Result<Page<P>, Error>
where
    R: Send,
    F: SortField,
    S: PageSource<R, F> + ?Sized,
{
    let request = PageRequest::<F>::from_query(query, config)?;
    let page = fetch_page(source, &request).await?;
    Ok(page.map(project))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::pagination::{Direction, PageRequestError};
    use crate::db::errors::DbError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Field {
        Id,
        Name,
    }

    impl SortField for Field {
        const ID: Self = Field::Id;

        fn parse(name: &str) -> Option<Self> {
            match name {
                "id" => Some(Field::Id),
                "name" => Some(Field::Name),
                _ => None,
            }
        }

        fn name(self) -> &'static str {
            match self {
                Field::Id => "id",
                Field::Name => "name",
            }
        }

        fn column(self) -> &'static str {
            self.name()
        }
    }

    /// In-memory source that counts how often it is queried.
    struct CountingSource {
        rows: Vec<(i64, String)>,
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingSource {
        fn new(names: &[&str]) -> Self {
            Self {
                rows: names.iter().enumerate().map(|(i, n)| (i as i64 + 1, n.to_string())).collect(),
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl PageSource<(i64, String), Field> for CountingSource {
        fn entity(&self) -> &'static str {
            "test"
        }

        async fn fetch(&self, offset: i64, limit: i64, order: &[Order<Field>]) -> Result<Vec<(i64, String)>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(DbError::Unavailable("pool timed out".to_string()));
            }
            let mut rows = self.rows.clone();
            rows.sort_by(|a, b| {
                order
                    .iter()
                    .map(|o| {
                        let ordering = match o.field {
                            Field::Id => a.0.cmp(&b.0),
                            Field::Name => a.1.cmp(&b.1),
                        };
                        o.direction.apply(ordering)
                    })
                    .find(|o| o.is_ne())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            Ok(rows.into_iter().skip(offset as usize).take(limit as usize).collect())
        }

        async fn count(&self) -> Result<i64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.rows.len() as i64)
        }
    }

    fn config() -> PaginationConfig {
        PaginationConfig::default()
    }

    fn query(page: Option<&str>, size: Option<&str>, sort: &[&str]) -> PageQuery {
        PageQuery {
            page: page.map(str::to_string),
            size: size.map(str::to_string),
            sort: sort.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn names(page: &Page<String>) -> Vec<&str> {
        page.content.iter().map(String::as_str).collect()
    }

    #[tokio::test]
    async fn test_five_members_size_three_desc() {
        let source = CountingSource::new(&["member1", "member2", "member3", "member4", "member5"]);

        let page = list_page(&source, &query(Some("0"), Some("3"), &["name,desc"]), &config(), |(_, n)| n)
            .await
            .unwrap();

        assert_eq!(names(&page), vec!["member5", "member4", "member3"]);
        assert_eq!(page.total_elements, 5);
        assert_eq!(page.total_pages, 2);
        assert!(page.first);
        assert!(page.has_next);
        assert!(!page.last);
        assert_eq!(page.sort.len(), 1);
        assert_eq!(page.sort[0].direction, Direction::Desc);
    }

    #[tokio::test]
    async fn test_zero_size_makes_no_store_call() {
        let source = CountingSource::new(&["a", "b"]);

        let err = list_page(&source, &query(None, Some("0"), &[]), &config(), |(_, n)| n)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::BadRequest { .. }));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_parameters_make_no_store_call() {
        let source = CountingSource::new(&["a", "b"]);
        for q in [
            query(Some("-1"), None, &[]),
            query(Some("abc"), None, &[]),
            query(None, Some("-5"), &[]),
            query(None, None, &["password"]),
        ] {
            assert!(list_page(&source, &q, &config(), |(_, n)| n).await.is_err());
        }
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_desc_then_asc_reverses_with_id_tiebreak() {
        let source = CountingSource::new(&["b", "a", "c", "a", "b"]);

        let desc = list_page(&source, &query(None, Some("10"), &["name,desc"]), &config(), |r| r)
            .await
            .unwrap();
        let asc = list_page(&source, &query(None, Some("10"), &["name,asc"]), &config(), |r| r)
            .await
            .unwrap();

        let desc_names: Vec<_> = desc.content.iter().map(|(_, n)| n.as_str()).collect();
        let asc_names: Vec<_> = asc.content.iter().map(|(_, n)| n.as_str()).collect();
        let mut reversed = desc_names.clone();
        reversed.reverse();
        assert_eq!(asc_names, reversed);

        // Equal names keep ascending id order in both directions
        let asc_ids: Vec<_> = asc.content.iter().map(|(id, _)| *id).collect();
        assert_eq!(asc_ids, vec![2, 4, 1, 5, 3]);
        let desc_ids: Vec<_> = desc.content.iter().map(|(id, _)| *id).collect();
        assert_eq!(desc_ids, vec![3, 1, 5, 2, 4]);
    }

    #[tokio::test]
    async fn test_defaults_and_clamp() {
        let names: Vec<String> = (0..30).map(|i| format!("m{i:02}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let source = CountingSource::new(&refs);
        let config = PaginationConfig {
            default_page_size: 20,
            max_page_size: 25,
        };

        let page = list_page(&source, &PageQuery::default(), &config, |(_, n)| n).await.unwrap();
        assert_eq!(page.size, 20);
        assert_eq!(page.content.len(), 20);
        assert_eq!(page.number, 0);

        let page = list_page(&source, &query(None, Some("1000"), &[]), &config, |(_, n)| n)
            .await
            .unwrap();
        assert_eq!(page.size, 25);
        assert_eq!(page.content.len(), 25);
        assert_eq!(page.total_pages, 2);
    }

    #[tokio::test]
    async fn test_page_past_the_end_is_empty() {
        let source = CountingSource::new(&["a", "b", "c"]);
        let page = list_page(&source, &query(Some("5"), Some("2"), &[]), &config(), |(_, n)| n)
            .await
            .unwrap();

        assert!(page.empty);
        assert_eq!(page.total_elements, 3);
        assert_eq!(page.total_pages, 2);
        assert!(!page.has_next);
        assert!(page.has_previous);
    }

    #[tokio::test]
    async fn test_store_failure_fails_whole_request() {
        let mut source = CountingSource::new(&["a"]);
        source.fail = true;

        let err = list_page(&source, &PageQuery::default(), &config(), |(_, n)| n)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unavailable { .. }));
    }

    #[tokio::test]
    async fn test_fetch_page_properties() {
        let rows: Vec<String> = (0..23).map(|i| format!("m{i}")).collect();
        let refs: Vec<&str> = rows.iter().map(String::as_str).collect();
        let source = CountingSource::new(&refs);

        for size in 1..=25 {
            for page_index in 0..=(23 / size + 1) {
                let request = PageRequest::<Field>::of(page_index, size).unwrap();
                let page = fetch_page(&source, &request).await.unwrap();

                assert!(page.content.len() as i64 <= size);
                assert_eq!(page.total_pages, (23 + size - 1) / size);
                assert_eq!(page.first, page_index == 0);
                assert_eq!(page.has_next, (page_index + 1) * size < 23);
            }
        }
    }

    #[test]
    fn test_page_request_error_is_bad_request() {
        let err: Error = PageRequestError::InvalidSize(0).into();
        assert!(matches!(err, Error::BadRequest { .. }));
    }
}
