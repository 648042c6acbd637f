//! Retail backend endpoints bound to `ApiClient::call`.
//!
//! Each method fixes an endpoint, a method and a payload shape; none adds
//! logic beyond placing parameters.

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::http::{HttpMethod, RequestBody};
use crate::session::SessionProvider;
use crate::transport::Transport;
use crate::types::{
    DashboardStats, NewOrder, NewProduct, OrderCount, OrderDetail, OrderId, OrderLine,
    OrderSummary, Product, ProductId, RecentOrder, Revenue, Uom,
};

pub const GET_PRODUCTS: &str = "getProducts";
pub const INSERT_PRODUCT: &str = "insertProduct";
pub const DELETE_PRODUCT: &str = "deleteProduct";
pub const GET_ALL_ORDERS: &str = "getAllOrders";
pub const GET_ORDERS: &str = "getOrders";
pub const INSERT_ORDER: &str = "insertOrder";
pub const GET_ORDER_DETAILS: &str = "getOrderDetails";
pub const GET_ORDER_COUNT: &str = "getOrderCount";
pub const GET_RECENT_ORDERS: &str = "getRecentOrders";
pub const GET_TOTAL_REVENUE: &str = "getTotalRevenue";
pub const GET_UOM: &str = "getUOM";

impl<S: SessionProvider, T: Transport> ApiClient<S, T> {
    pub async fn get_products(&self) -> Result<Vec<Product>, ApiError> {
        self.get(GET_PRODUCTS).await
    }

    pub async fn insert_product(&self, product: &NewProduct) -> Result<ProductId, ApiError> {
        self.post_json(INSERT_PRODUCT, product).await
    }

    /// The backend reads the id from a form field, not a JSON body.
    pub async fn delete_product(&self, product_id: i64) -> Result<ProductId, ApiError> {
        let form = RequestBody::multipart([("product_id", product_id.to_string())]);
        self.call(DELETE_PRODUCT, HttpMethod::Post, Some(form), &[]).await
    }

    pub async fn get_all_orders(&self) -> Result<Vec<OrderLine>, ApiError> {
        self.get(GET_ALL_ORDERS).await
    }

    pub async fn get_orders(&self) -> Result<Vec<OrderSummary>, ApiError> {
        self.get(GET_ORDERS).await
    }

    pub async fn insert_order(&self, order: &NewOrder) -> Result<OrderId, ApiError> {
        self.post_json(INSERT_ORDER, order).await
    }

    pub async fn get_order_details(&self, order_id: i64) -> Result<Vec<OrderDetail>, ApiError> {
        self.get(&format!("{GET_ORDER_DETAILS}/{order_id}")).await
    }

    pub async fn get_order_count(&self) -> Result<OrderCount, ApiError> {
        self.get(GET_ORDER_COUNT).await
    }

    pub async fn get_recent_orders(&self) -> Result<Vec<RecentOrder>, ApiError> {
        self.get(GET_RECENT_ORDERS).await
    }

    pub async fn get_total_revenue(&self) -> Result<Revenue, ApiError> {
        self.get(GET_TOTAL_REVENUE).await
    }

    pub async fn get_uoms(&self) -> Result<Vec<Uom>, ApiError> {
        self.get(GET_UOM).await
    }

    /// Fetch the four dashboard sources concurrently. The first failure
    /// fails the whole fetch.
    pub async fn fetch_dashboard(&self) -> Result<DashboardStats, ApiError> {
        let (products, revenue, count, recent_orders) = tokio::try_join!(
            self.get_products(),
            self.get_total_revenue(),
            self.get_order_count(),
            self.get_recent_orders(),
        )?;

        Ok(DashboardStats {
            total_products: products.len(),
            total_orders: count.order_count,
            total_revenue: revenue.total_revenue,
            recent_orders,
        })
    }
}
