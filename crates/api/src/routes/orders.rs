//! Order endpoints: checkout, listings, status changes, cancel and reorder.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::OrderId;
use doc_store::{DocumentStore, SortDirection};
use domain::{Order, OrderStatus};
use lifecycle::{
    CheckoutRequest, CheckoutSummary, LifecycleError, ListQuery, OrderSort, Page, ReorderOutcome,
};
use serde::{Deserialize, Serialize};

use super::{ApiResponse, AppState};
use crate::auth::Caller;
use crate::error::ApiError;

type OrderResult = Result<Json<ApiResponse<OrderView>>, ApiError>;

// -- Request types --

/// Query string of the order listings.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl ListParams {
    fn into_query(self) -> Result<ListQuery, ApiError> {
        let status = self
            .status
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<OrderStatus>())
            .transpose()
            .map_err(|e| LifecycleError::Validation(e.to_string()))?;

        let sort_by = match self.sort_by.as_deref() {
            None | Some("") | Some("created_at") | Some("createdAt") => OrderSort::CreatedAt,
            Some("total_amount") | Some("totalAmount") => OrderSort::TotalAmount,
            Some("order_number") | Some("orderNumber") => OrderSort::OrderNumber,
            Some("status") => OrderSort::Status,
            Some(other) => {
                return Err(ApiError::BadRequest(format!("Cannot sort by {other}")));
            }
        };

        let direction = match self.sort_order.as_deref() {
            None | Some("") => None,
            Some(o) if o.eq_ignore_ascii_case("asc") => Some(SortDirection::Ascending),
            Some(o) if o.eq_ignore_ascii_case("desc") => Some(SortDirection::Descending),
            Some(other) => {
                return Err(ApiError::BadRequest(format!("Unknown sort order {other}")));
            }
        };

        Ok(ListQuery {
            page: self.page,
            limit: self.limit,
            status,
            sort_by,
            direction,
        })
    }
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Default, Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

// -- Response types --

/// An order as sent to clients, with the derived progress fields.
#[derive(Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub delivery_progress: u8,
    pub total_items: u32,
}

impl From<Order> for OrderView {
    fn from(order: Order) -> Self {
        Self {
            delivery_progress: order.delivery_progress(),
            total_items: order.total_items(),
            order,
        }
    }
}

#[derive(Serialize)]
pub struct OrderListResponse {
    pub orders: Vec<OrderView>,
    pub current_page: u32,
    pub total_pages: u32,
    pub total_orders: u64,
}

impl From<Page<Order>> for OrderListResponse {
    fn from(page: Page<Order>) -> Self {
        Self {
            orders: page.items.into_iter().map(OrderView::from).collect(),
            current_page: page.current_page,
            total_pages: page.total_pages,
            total_orders: page.total,
        }
    }
}

// -- Handlers --

/// POST /api/orders: turn the caller's cart into an order.
pub async fn create<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
    body: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<CheckoutSummary>>), ApiError> {
    let Json(req) = body?;
    let summary = state.orders.create_order(actor.user_id, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(summary).with_message("Order placed successfully")),
    ))
}

/// GET /api/orders/my
pub async fn list_mine<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<ApiResponse<OrderListResponse>>, ApiError> {
    let Query(params) = params?;
    let query = params.into_query()?;
    let page = state.orders.list_my_orders(actor.user_id, &query).await?;
    Ok(Json(ApiResponse::ok(page.into())))
}

/// GET /api/orders/all: every order, administrators only.
pub async fn list_all<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<ApiResponse<OrderListResponse>>, ApiError> {
    let Query(params) = params?;
    let query = params.into_query()?;
    let page = state.orders.list_all_orders(&actor, &query).await?;
    Ok(Json(ApiResponse::ok(page.into())))
}

/// GET /api/orders/{id}
pub async fn get<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
    id: Result<Path<OrderId>, PathRejection>,
) -> OrderResult {
    let Path(id) = id?;
    let order = state.orders.get_order(&actor, id).await?;
    Ok(Json(ApiResponse::ok(OrderView::from(order))))
}

/// PUT /api/orders/{id}/status
pub async fn update_status<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
    id: Result<Path<OrderId>, PathRejection>,
    body: Result<Json<StatusRequest>, JsonRejection>,
) -> OrderResult {
    let Path(id) = id?;
    let Json(req) = body?;
    let status: OrderStatus = req
        .status
        .parse()
        .map_err(|e: domain::order::UnknownStatus| LifecycleError::Validation(e.to_string()))?;

    let order = state
        .orders
        .update_status(&actor, id, status, req.note)
        .await?;
    let message = format!("Order status updated to {status}");
    Ok(Json(
        ApiResponse::ok(OrderView::from(order)).with_message(message),
    ))
}

/// POST /api/orders/{id}/cancel
pub async fn cancel<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
    id: Result<Path<OrderId>, PathRejection>,
    body: Result<Option<Json<CancelRequest>>, JsonRejection>,
) -> OrderResult {
    let Path(id) = id?;
    let reason = body?.and_then(|Json(req)| req.reason);
    let order = state.orders.cancel_order(&actor, id, reason).await?;
    Ok(Json(
        ApiResponse::ok(OrderView::from(order)).with_message("Order cancelled successfully"),
    ))
}

/// POST /api/orders/{id}/reorder
pub async fn reorder<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
    id: Result<Path<OrderId>, PathRejection>,
) -> Result<Json<ApiResponse<ReorderOutcome>>, ApiError> {
    let Path(id) = id?;
    let outcome = state.orders.reorder(actor.user_id, id).await?;
    let message = format!("{} items added to cart", outcome.added_count);
    Ok(Json(ApiResponse::ok(outcome).with_message(message)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_params_defaults() {
        let query = ListParams::default().into_query().unwrap();
        assert_eq!(query, ListQuery::default());
    }

    #[test]
    fn test_list_params_parse() {
        let params = ListParams {
            page: Some(2),
            limit: Some(5),
            status: Some("out-for-delivery".to_string()),
            sort_by: Some("totalAmount".to_string()),
            sort_order: Some("ASC".to_string()),
        };
        let query = params.into_query().unwrap();
        assert_eq!(query.status, Some(OrderStatus::OutForDelivery));
        assert_eq!(query.sort_by, OrderSort::TotalAmount);
        assert_eq!(query.direction, Some(SortDirection::Ascending));
    }

    #[test]
    fn test_list_params_reject_unknowns() {
        let bad_status = ListParams {
            status: Some("lost".to_string()),
            ..Default::default()
        };
        assert_eq!(bad_status.into_query().unwrap_err().code(), "VALIDATION_ERROR");

        let bad_sort = ListParams {
            sort_by: Some("weight".to_string()),
            ..Default::default()
        };
        assert!(bad_sort.into_query().is_err());
    }
}
