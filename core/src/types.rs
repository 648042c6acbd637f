//! Wire DTOs for the retail backend.
//!
//! # Design
//! Field names follow the backend's JSON exactly. Numeric columns that the
//! backend stores as decimals may arrive either as JSON numbers or as
//! strings (`"12.50"`), and echoed ids may arrive as strings, so those fields
//! deserialize leniently. Serialization always emits plain numbers.

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    #[serde(deserialize_with = "lenient_i64")]
    pub product_id: i64,
    pub name: String,
    #[serde(deserialize_with = "lenient_i64")]
    pub uom_id: i64,
    #[serde(deserialize_with = "lenient_f64")]
    pub price_per_unit: f64,
    #[serde(default)]
    pub uom_name: Option<String>,
}

/// Payload for `insertProduct`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewProduct {
    pub product_name: String,
    pub uom_id: i64,
    pub price_per_unit: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductId {
    #[serde(deserialize_with = "lenient_i64")]
    pub product_id: i64,
}

/// Unit of measurement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Uom {
    #[serde(deserialize_with = "lenient_i64")]
    pub uom_id: i64,
    pub uom_name: String,
}

/// Payload for `insertOrder`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewOrder {
    pub customer_name: String,
    pub grand_total: f64,
    pub order_details: Vec<NewOrderItem>,
}

impl NewOrder {
    /// Build an order whose `grand_total` is the sum of its line totals.
    pub fn from_items(customer_name: impl Into<String>, items: Vec<NewOrderItem>) -> Self {
        let grand_total = items.iter().map(|item| item.total_price).sum();
        Self {
            customer_name: customer_name.into(),
            grand_total,
            order_details: items,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewOrderItem {
    pub product_id: i64,
    pub quantity: f64,
    pub total_price: f64,
}

impl NewOrderItem {
    /// Line for `quantity` units of a product at its current unit price.
    pub fn for_product(product: &Product, quantity: f64) -> Self {
        Self {
            product_id: product.product_id,
            quantity,
            total_price: quantity * product.price_per_unit,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderId {
    #[serde(deserialize_with = "lenient_i64")]
    pub order_id: i64,
}

/// Row of `getAllOrders`: one order line joined with its product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderLine {
    #[serde(deserialize_with = "lenient_i64")]
    pub order_id: i64,
    #[serde(deserialize_with = "lenient_f64")]
    pub quantity: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub total_price: f64,
    pub name: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub price_per_unit: f64,
}

/// Row of `getOrders`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderSummary {
    #[serde(deserialize_with = "lenient_i64")]
    pub order_id: i64,
    pub customer_name: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub total: f64,
    pub datetime: String,
    #[serde(deserialize_with = "lenient_i64")]
    pub item_count: i64,
}

/// Row of `getRecentOrders`; `datetime` is `YYYY-MM-DD HH:MM:SS`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecentOrder {
    #[serde(deserialize_with = "lenient_i64")]
    pub order_id: i64,
    pub customer_name: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub total: f64,
    pub datetime: String,
}

/// Row of `getOrderDetails/{order_id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderDetail {
    #[serde(deserialize_with = "lenient_i64")]
    pub product_id: i64,
    pub name: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub quantity: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub price_per_unit: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub total_price: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderCount {
    #[serde(deserialize_with = "lenient_i64")]
    pub order_count: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Revenue {
    #[serde(rename = "totalRevenue", default, deserialize_with = "lenient_f64_or_zero")]
    pub total_revenue: f64,
}

/// Figures shown on the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardStats {
    pub total_products: usize,
    pub total_orders: i64,
    pub total_revenue: f64,
    pub recent_orders: Vec<RecentOrder>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Int(i64),
    Float(f64),
    Text(String),
}

impl NumberOrString {
    fn into_f64<E: serde::de::Error>(self) -> Result<f64, E> {
        match self {
            NumberOrString::Int(n) => Ok(n as f64),
            NumberOrString::Float(n) => Ok(n),
            NumberOrString::Text(s) => s.trim().parse().map_err(E::custom),
        }
    }
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    NumberOrString::deserialize(deserializer)?.into_f64()
}

/// Like `lenient_f64`, but `null` reads as 0.
fn lenient_f64_or_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    match Option::<NumberOrString>::deserialize(deserializer)? {
        Some(value) => value.into_f64(),
        None => Ok(0.0),
    }
}

fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Int(n) => Ok(n),
        NumberOrString::Float(n)
            if n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 =>
        {
            Ok(n as i64)
        }
        NumberOrString::Float(n) => Err(serde::de::Error::custom(format!("expected an integer, got {n}"))),
        NumberOrString::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
