//! Shopping cart endpoints. All act on the caller's own cart.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use common::ProductId;
use doc_store::DocumentStore;
use domain::CartView;
use serde::{Deserialize, Serialize};

use super::{ApiResponse, AppState};
use crate::auth::Caller;
use crate::error::ApiError;

type CartResult = Result<Json<ApiResponse<CartView>>, ApiError>;

#[derive(Deserialize)]
pub struct CartItemRequest {
    pub product_id: ProductId,
    #[serde(default = "one")]
    pub quantity: i64,
}

fn one() -> i64 {
    1
}

#[derive(Deserialize)]
pub struct CouponRequest {
    pub code: String,
}

#[derive(Serialize)]
pub struct CountResponse {
    pub count: u32,
}

/// GET /api/cart
pub async fn get<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
) -> CartResult {
    let cart = state.carts.get_cart(actor.user_id).await?;
    Ok(Json(ApiResponse::ok(cart)))
}

/// GET /api/cart/count
pub async fn count<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
) -> Result<Json<ApiResponse<CountResponse>>, ApiError> {
    let count = state.carts.count(actor.user_id).await?;
    Ok(Json(ApiResponse::ok(CountResponse { count })))
}

/// POST /api/cart/add
pub async fn add<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
    body: Result<Json<CartItemRequest>, JsonRejection>,
) -> CartResult {
    let Json(req) = body?;
    let cart = state
        .carts
        .add_item(actor.user_id, req.product_id, req.quantity)
        .await?;
    Ok(Json(ApiResponse::ok(cart).with_message("Item added to cart")))
}

/// PUT /api/cart/update
pub async fn update<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
    body: Result<Json<CartItemRequest>, JsonRejection>,
) -> CartResult {
    let Json(req) = body?;
    let cart = state
        .carts
        .update_quantity(actor.user_id, req.product_id, req.quantity)
        .await?;
    Ok(Json(ApiResponse::ok(cart).with_message("Cart updated")))
}

/// DELETE /api/cart/remove/{product_id}
pub async fn remove<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
    product_id: Result<Path<ProductId>, PathRejection>,
) -> CartResult {
    let Path(product_id) = product_id?;
    let cart = state.carts.remove_item(actor.user_id, product_id).await?;
    Ok(Json(ApiResponse::ok(cart).with_message("Item removed from cart")))
}

/// DELETE /api/cart/clear
pub async fn clear<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
) -> CartResult {
    let cart = state.carts.clear(actor.user_id).await?;
    Ok(Json(ApiResponse::ok(cart).with_message("Cart cleared")))
}

/// POST /api/cart/apply-coupon
pub async fn apply_coupon<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
    body: Result<Json<CouponRequest>, JsonRejection>,
) -> CartResult {
    let Json(req) = body?;
    let cart = state.carts.apply_coupon(actor.user_id, &req.code).await?;
    Ok(Json(ApiResponse::ok(cart).with_message("Coupon applied")))
}

/// DELETE /api/cart/remove-coupon
pub async fn remove_coupon<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
) -> CartResult {
    let cart = state.carts.remove_coupon(actor.user_id).await?;
    Ok(Json(ApiResponse::ok(cart).with_message("Coupon removed")))
}
