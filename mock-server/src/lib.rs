use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
};

use axum::{
    body::Bytes,
    extract::{Multipart, Path, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::trace::TraceLayer;

const RECENT_ORDERS_LIMIT: usize = 5;
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Uom {
    pub uom_id: i64,
    pub uom_name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub product_id: i64,
    pub name: String,
    pub uom_id: i64,
    pub price_per_unit: f64,
    pub uom_name: Option<String>,
}

#[derive(Deserialize)]
pub struct NewProduct {
    pub product_name: String,
    pub uom_id: i64,
    pub price_per_unit: f64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewOrderItem {
    pub product_id: i64,
    pub quantity: f64,
    pub total_price: f64,
}

#[derive(Deserialize)]
pub struct NewOrder {
    pub customer_name: String,
    pub grand_total: f64,
    #[serde(default)]
    pub order_details: Vec<NewOrderItem>,
}

#[derive(Clone, Debug)]
struct OrderRecord {
    customer_name: String,
    total: f64,
    datetime: String,
    items: Vec<NewOrderItem>,
}

#[derive(Debug)]
pub struct Store {
    uoms: Vec<Uom>,
    products: BTreeMap<i64, (String, i64, f64)>,
    orders: BTreeMap<i64, OrderRecord>,
    next_product_id: i64,
    next_order_id: i64,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            uoms: vec![
                Uom {
                    uom_id: 1,
                    uom_name: "each".to_string(),
                },
                Uom {
                    uom_id: 2,
                    uom_name: "kg".to_string(),
                },
            ],
            products: BTreeMap::new(),
            orders: BTreeMap::new(),
            next_product_id: 1,
            next_order_id: 1,
        }
    }
}

impl Store {
    fn uom_name(&self, uom_id: i64) -> Option<String> {
        self.uoms
            .iter()
            .find(|u| u.uom_id == uom_id)
            .map(|u| u.uom_name.clone())
    }

    /// Orders newest first; ids break ties within the same second.
    fn orders_newest_first(&self) -> Vec<(i64, &OrderRecord)> {
        let mut orders: Vec<(i64, &OrderRecord)> =
            self.orders.iter().map(|(id, o)| (*id, o)).collect();
        orders.sort_by(|a, b| b.1.datetime.cmp(&a.1.datetime).then(b.0.cmp(&a.0)));
        orders
    }

    /// Lines of `order_id` joined with their current product. Lines whose
    /// product is gone are dropped.
    fn joined_lines(&self, order_id: i64, order: &OrderRecord) -> Vec<serde_json::Value> {
        order
            .items
            .iter()
            .filter_map(|item| {
                let (name, _, price) = self.products.get(&item.product_id)?;
                Some(json!({
                    "order_id": order_id,
                    "product_id": item.product_id,
                    "name": name,
                    "quantity": item.quantity,
                    "price_per_unit": price,
                    "total_price": item.quantity * price,
                }))
            })
            .collect()
    }
}

/// Which requests the server accepts.
#[derive(Clone, Debug)]
pub enum AuthPolicy {
    Open,
    /// Only `Authorization: Bearer <t>` with `t` in the set is accepted.
    Bearer(Arc<RwLock<HashSet<String>>>),
}

impl AuthPolicy {
    pub fn bearer<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AuthPolicy::Bearer(Arc::new(RwLock::new(
            tokens.into_iter().map(Into::into).collect(),
        )))
    }

    /// Replace the accepted tokens. No-op for `Open`.
    pub async fn rotate<I, S>(&self, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let AuthPolicy::Bearer(accepted) = self {
            *accepted.write().await = tokens.into_iter().map(Into::into).collect();
        }
    }

    async fn allows(&self, authorization: Option<&str>) -> bool {
        match self {
            AuthPolicy::Open => true,
            AuthPolicy::Bearer(accepted) => match authorization.and_then(|v| v.strip_prefix("Bearer ")) {
                Some(token) => accepted.read().await.contains(token),
                None => false,
            },
        }
    }
}

pub type Db = Arc<RwLock<Store>>;

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub auth: AuthPolicy,
}

/// Handler failure rendered as `{"error": "..."}`.
#[derive(Debug)]
pub struct Failure(StatusCode, String);

impl Failure {
    fn internal(message: impl Into<String>) -> Self {
        Failure(StatusCode::INTERNAL_SERVER_ERROR, message.into())
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Failure(StatusCode::BAD_REQUEST, message.into())
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        tracing::warn!(status = %self.0, error = %self.1, "request failed");
        (self.0, Json(json!({ "error": self.1 }))).into_response()
    }
}

pub fn app() -> Router {
    app_with_auth(AuthPolicy::Open)
}

pub fn app_with_auth(auth: AuthPolicy) -> Router {
    let state = AppState {
        db: Arc::new(RwLock::new(Store::default())),
        auth,
    };
    Router::new()
        .route("/getProducts", get(get_products))
        .route("/getUOM", get(get_uoms))
        .route("/insertProduct", post(insert_product))
        .route("/deleteProduct", post(delete_product))
        .route("/insertOrder", post(insert_order))
        .route("/getAllOrders", get(get_all_orders))
        .route("/getOrders", get(get_orders))
        .route("/getOrderCount", get(get_order_count))
        .route("/getRecentOrders", get(get_recent_orders))
        .route("/getOrderDetails/{order_id}", get(get_order_details))
        .route("/getTotalRevenue", get(get_total_revenue))
        .route("/echo", post(echo))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_auth(listener: TcpListener, auth: AuthPolicy) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_auth(auth)).await
}

async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    if state.auth.allows(authorization.as_deref()).await {
        next.run(request).await
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Unauthorized" }))).into_response()
    }
}

/// Parse a JSON body regardless of the declared content type.
fn json_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, Failure> {
    serde_json::from_slice(body).map_err(|e| Failure::internal(e.to_string()))
}

async fn get_products(State(state): State<AppState>) -> Json<Vec<Product>> {
    let db = state.db.read().await;
    Json(
        db.products
            .iter()
            .map(|(id, (name, uom_id, price))| Product {
                product_id: *id,
                name: name.clone(),
                uom_id: *uom_id,
                price_per_unit: *price,
                uom_name: db.uom_name(*uom_id),
            })
            .collect(),
    )
}

async fn get_uoms(State(state): State<AppState>) -> Json<Vec<Uom>> {
    Json(state.db.read().await.uoms.clone())
}

async fn insert_product(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, Failure> {
    let input: NewProduct = json_body(&body)?;
    let mut db = state.db.write().await;
    if db.uom_name(input.uom_id).is_none() {
        return Err(Failure::internal(format!("unknown uom_id {}", input.uom_id)));
    }
    let id = db.next_product_id;
    db.next_product_id += 1;
    db.products
        .insert(id, (input.product_name, input.uom_id, input.price_per_unit));
    Ok(Json(json!({ "product_id": id })))
}

/// Reads `product_id` from a multipart form and echoes it back as text.
async fn delete_product(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, Failure> {
    let mut raw_id = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Failure::bad_request(e.to_string()))?
    {
        if field.name() == Some("product_id") {
            raw_id = Some(
                field
                    .text()
                    .await
                    .map_err(|e| Failure::bad_request(e.to_string()))?,
            );
        }
    }
    let raw_id = raw_id.ok_or_else(|| Failure::bad_request("missing form field product_id"))?;
    let id: i64 = raw_id
        .trim()
        .parse()
        .map_err(|_| Failure::internal(format!("invalid product_id {raw_id:?}")))?;

    let mut db = state.db.write().await;
    let referenced = db
        .orders
        .values()
        .any(|o| o.items.iter().any(|item| item.product_id == id));
    if referenced {
        return Err(Failure::internal(format!(
            "product {id} is referenced by existing orders"
        )));
    }
    db.products.remove(&id);
    Ok(Json(json!({ "product_id": raw_id })))
}

async fn insert_order(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, Failure> {
    let order: NewOrder = json_body(&body)?;
    let mut db = state.db.write().await;
    if let Some(missing) = order
        .order_details
        .iter()
        .find(|item| !db.products.contains_key(&item.product_id))
    {
        return Err(Failure::internal(format!(
            "unknown product_id {}",
            missing.product_id
        )));
    }
    let id = db.next_order_id;
    db.next_order_id += 1;
    db.orders.insert(
        id,
        OrderRecord {
            customer_name: order.customer_name,
            total: order.grand_total,
            datetime: chrono::Local::now().format(DATETIME_FORMAT).to_string(),
            items: order.order_details,
        },
    );
    tracing::info!(order_id = id, "order inserted");
    Ok(Json(json!({ "order_id": id })))
}

async fn get_all_orders(State(state): State<AppState>) -> Json<Vec<serde_json::Value>> {
    let db = state.db.read().await;
    let rows = db
        .orders
        .iter()
        .flat_map(|(id, order)| db.joined_lines(*id, order))
        .map(|mut line| {
            if let Some(obj) = line.as_object_mut() {
                obj.remove("product_id");
            }
            line
        })
        .collect();
    Json(rows)
}

async fn get_orders(State(state): State<AppState>) -> Json<Vec<serde_json::Value>> {
    let db = state.db.read().await;
    Json(
        db.orders_newest_first()
            .into_iter()
            .map(|(id, order)| {
                json!({
                    "order_id": id,
                    "customer_name": order.customer_name,
                    "total": order.total,
                    "datetime": order.datetime,
                    "item_count": order.items.len(),
                })
            })
            .collect(),
    )
}

async fn get_order_count(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "order_count": state.db.read().await.orders.len() }))
}

async fn get_recent_orders(State(state): State<AppState>) -> Json<Vec<serde_json::Value>> {
    let db = state.db.read().await;
    Json(
        db.orders_newest_first()
            .into_iter()
            .take(RECENT_ORDERS_LIMIT)
            .map(|(id, order)| {
                json!({
                    "order_id": id,
                    "customer_name": order.customer_name,
                    "total": order.total,
                    "datetime": order.datetime,
                })
            })
            .collect(),
    )
}

async fn get_order_details(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
) -> Json<Vec<serde_json::Value>> {
    let db = state.db.read().await;
    let lines = match db.orders.get(&order_id) {
        Some(order) => db
            .joined_lines(order_id, order)
            .into_iter()
            .map(|mut line| {
                if let Some(obj) = line.as_object_mut() {
                    obj.remove("order_id");
                }
                line
            })
            .collect(),
        None => Vec::new(),
    };
    Json(lines)
}

async fn get_total_revenue(State(state): State<AppState>) -> Json<serde_json::Value> {
    let total: f64 = state.db.read().await.orders.values().map(|o| o.total).sum();
    Json(json!({ "totalRevenue": total }))
}

/// Reflects the request's content type and raw body bytes.
async fn echo(headers: axum::http::HeaderMap, body: Bytes) -> Json<serde_json::Value> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    Json(json!({
        "content_type": content_type,
        "body": body.to_vec(),
    }))
}
