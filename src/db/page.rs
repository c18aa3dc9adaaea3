// src/db/page.rs

use serde::Serialize;
use validator::Validate;

use crate::{
    db::{
        filter::{Filter, Sort},
        model::{Document, Model, Populated},
    },
    error::AppError,
};

/// One page of a paginated query.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// 1-based page number that was requested.
    pub page_number: i64,
    pub page_count: i64,
    pub results: Vec<T>,
    /// Total number of matching records.
    pub count: i64,
}

/// Paging input, validated before any query is issued.
#[derive(Debug, Clone, Copy, Validate)]
pub struct PageRequest {
    #[validate(range(min = 1, message = "page must be at least 1"))]
    pub page: i64,
    #[validate(range(min = 1, message = "page size must be at least 1"))]
    pub page_size: i64,
}

impl PageRequest {
    /// Number of records before the requested page.
    pub fn skip(&self) -> Result<i64, AppError> {
        self.validate()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        (self.page - 1)
            .checked_mul(self.page_size)
            .ok_or_else(|| AppError::BadRequest("page is out of range".to_string()))
    }
}

/// `floor((count - 1) / page_size) + 1`: an empty result has zero pages.
/// A `page_size` below 1 is rejected with `BadRequest`.
pub fn page_count(count: i64, page_size: i64) -> Result<i64, AppError> {
    if page_size < 1 {
        return Err(AppError::BadRequest(
            "page size must be at least 1".to_string(),
        ));
    }
    if count <= 0 {
        return Ok(0);
    }
    Ok((count - 1) / page_size + 1)
}

/// Runs the count and the page read concurrently and assembles the page.
/// Either read failing fails the whole call.
pub async fn page_query<D: Document>(
    page: i64,
    page_size: i64,
    model: &Model<D>,
    populate: &[D::Relation],
    filter: &Filter<D::Field>,
    sort: &[Sort<D::Field>],
) -> Result<Page<Populated<D>>, AppError> {
    let request = PageRequest { page, page_size };
    let skip = request.skip()?;

    tracing::debug!(
        "Page query on {}: page={} size={} skip={}",
        model.name(),
        page,
        page_size,
        skip
    );

    let (count, results) = tokio::try_join!(
        model.count(filter),
        model.find_populated(filter, sort, skip, Some(page_size), populate),
    )?;

    Ok(Page {
        page_number: page,
        page_count: page_count(count, page_size)?,
        results,
        count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_count_at_boundaries() {
        let size = 10;
        assert_eq!(page_count(0, size).unwrap(), 0);
        assert_eq!(page_count(1, size).unwrap(), 1);
        assert_eq!(page_count(size, size).unwrap(), 1);
        assert_eq!(page_count(size + 1, size).unwrap(), 2);
        assert_eq!(page_count(2 * size, size).unwrap(), 2);
        assert_eq!(page_count(25, size).unwrap(), 3);
    }

    #[test]
    fn page_count_rejects_non_positive_page_size() {
        for page_size in [0, -1, i64::MIN] {
            let err = page_count(5, page_size).unwrap_err();
            assert!(matches!(err, AppError::BadRequest(_)), "got {:?}", err);
        }
        // Checked even when there is nothing to page
        assert!(matches!(page_count(0, 0), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn skip_is_zero_based_offset() {
        let req = PageRequest { page: 3, page_size: 7 };
        assert_eq!(req.skip().unwrap(), 14);
        let first = PageRequest { page: 1, page_size: 7 };
        assert_eq!(first.skip().unwrap(), 0);
    }

    #[test]
    fn invalid_paging_is_rejected() {
        for (page, page_size) in [(0, 10), (-1, 10), (1, 0), (1, -5)] {
            let req = PageRequest { page, page_size };
            assert!(matches!(req.skip(), Err(AppError::BadRequest(_))));
        }
    }

    #[test]
    fn skip_overflow_is_rejected() {
        let req = PageRequest { page: i64::MAX, page_size: 2 };
        assert!(matches!(req.skip(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn page_serializes_with_legacy_keys() {
        let page: Page<i32> = Page {
            page_number: 2,
            page_count: 3,
            results: vec![1, 2],
            count: 25,
        };
        let value = serde_json::to_value(&page).unwrap();
        assert_eq!(value["pageNumber"], 2);
        assert_eq!(value["pageCount"], 3);
        assert_eq!(value["count"], 25);
        assert_eq!(value["results"], serde_json::json!([1, 2]));
    }
}
