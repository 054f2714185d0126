//! Route handlers and the response envelope they share.

pub mod cart;
pub mod health;
pub mod metrics;
pub mod orders;

use std::sync::Arc;

use common::{Clock, SystemClock};
use doc_store::DocumentStore;
use domain::{CheckoutPolicy, CouponResolver, StaticCouponTable};
use lifecycle::{CartService, OrderLifecycle, StoreProductCatalog};
use serde::Serialize;

/// Uniform JSON body of every `/api` response.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            code: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn failure(message: String, code: &'static str) -> Self {
        Self {
            success: false,
            message: Some(message),
            data: None,
            code: Some(code),
        }
    }
}

/// Shared application state accessible from all handlers.
pub struct AppState<S: DocumentStore> {
    pub carts: CartService<S, StoreProductCatalog<S>>,
    pub orders: OrderLifecycle<S, StoreProductCatalog<S>>,
    pub catalog: Arc<StoreProductCatalog<S>>,
}

impl<S: DocumentStore + Clone> AppState<S> {
    /// Wires the services over one store with the standard coupon table
    /// and the system clock.
    pub fn new(store: S, policy: CheckoutPolicy) -> Self {
        Self::build(
            store,
            policy,
            Arc::new(StaticCouponTable::standard()),
            Arc::new(SystemClock),
        )
    }

    pub fn build(
        store: S,
        policy: CheckoutPolicy,
        coupons: Arc<dyn CouponResolver>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let catalog = Arc::new(StoreProductCatalog::new(store.clone()));
        let policy = Arc::new(policy);
        Self {
            carts: CartService::new(
                store.clone(),
                Arc::clone(&catalog),
                coupons,
                Arc::clone(&policy),
                Arc::clone(&clock),
            ),
            orders: OrderLifecycle::new(store, Arc::clone(&catalog), policy, clock),
            catalog,
        }
    }
}
