//! Order listing queries and pagination.

use doc_store::{DocumentQuery, SortDirection, SortKey};
use domain::OrderStatus;
use serde::{Deserialize, Serialize};

use crate::error::{LifecycleError, Result};

/// Largest page a caller may ask for.
pub const MAX_PAGE_SIZE: u32 = 50;
/// Page size for a shopper's own orders.
pub const DEFAULT_OWN_PAGE_SIZE: u32 = 10;
/// Page size for the administrator listing.
pub const DEFAULT_ADMIN_PAGE_SIZE: u32 = 20;

/// Field an order listing is sorted by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSort {
    #[default]
    CreatedAt,
    TotalAmount,
    OrderNumber,
    Status,
}

impl OrderSort {
    fn key(&self) -> SortKey {
        match self {
            OrderSort::CreatedAt => SortKey::CreatedAt,
            OrderSort::TotalAmount => SortKey::Field("totals.total".to_string()),
            OrderSort::OrderNumber => SortKey::Field("order_number".to_string()),
            OrderSort::Status => SortKey::Field("status".to_string()),
        }
    }
}

/// Filters and paging for an order listing. Unset fields take defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<OrderStatus>,
    pub sort_by: OrderSort,
    /// Descending unless set.
    pub direction: Option<SortDirection>,
}

/// Validated page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn offset(&self) -> usize {
        (self.page as usize - 1) * self.limit as usize
    }
}

impl ListQuery {
    pub(crate) fn page_request(&self, default_limit: u32) -> Result<PageRequest> {
        let page = self.page.unwrap_or(1);
        if page < 1 {
            return Err(LifecycleError::Validation(
                "Page must be at least 1".to_string(),
            ));
        }
        let limit = self.limit.unwrap_or(default_limit);
        if !(1..=MAX_PAGE_SIZE).contains(&limit) {
            return Err(LifecycleError::Validation(format!(
                "Limit must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        Ok(PageRequest { page, limit })
    }

    /// Builds the document query for one page. `filters` narrows it further.
    pub(crate) fn to_document_query(
        &self,
        request: PageRequest,
        filters: Vec<(&str, serde_json::Value)>,
    ) -> DocumentQuery {
        let mut query = DocumentQuery::default();
        for (path, value) in filters {
            query = query.filter(path, value);
        }
        if let Some(status) = self.status {
            query = query.filter("status", status.as_str());
        }
        query
            .sort_by(
                self.sort_by.key(),
                self.direction.unwrap_or(SortDirection::Descending),
            )
            .limit(request.limit as usize)
            .offset(request.offset())
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub current_page: u32,
    pub total_pages: u32,
    pub total: u64,
}

impl<T> Page<T> {
    pub(crate) fn new(items: Vec<T>, request: PageRequest, total: u64) -> Self {
        Self {
            items,
            current_page: request.page,
            total_pages: total.div_ceil(u64::from(request.limit)) as u32,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let request = ListQuery::default().page_request(DEFAULT_OWN_PAGE_SIZE).unwrap();
        assert_eq!(request, PageRequest { page: 1, limit: 10 });
        assert_eq!(request.offset(), 0);
    }

    #[test]
    fn test_bounds() {
        let zero_page = ListQuery {
            page: Some(0),
            ..Default::default()
        };
        assert!(zero_page.page_request(10).is_err());

        let too_big = ListQuery {
            limit: Some(51),
            ..Default::default()
        };
        assert!(too_big.page_request(10).is_err());

        let last = ListQuery {
            page: Some(3),
            limit: Some(50),
            ..Default::default()
        };
        assert_eq!(last.page_request(10).unwrap().offset(), 100);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let request = PageRequest { page: 1, limit: 10 };
        assert_eq!(Page::new(Vec::<()>::new(), request, 0).total_pages, 0);
        assert_eq!(Page::new(Vec::<()>::new(), request, 10).total_pages, 1);
        assert_eq!(Page::new(Vec::<()>::new(), request, 11).total_pages, 2);
    }

    #[test]
    fn test_sort_keys() {
        assert_eq!(OrderSort::CreatedAt.key(), SortKey::CreatedAt);
        assert_eq!(
            OrderSort::TotalAmount.key(),
            SortKey::Field("totals.total".to_string())
        );
        let parsed: OrderSort = serde_json::from_str("\"order_number\"").unwrap();
        assert_eq!(parsed, OrderSort::OrderNumber);
    }
}
