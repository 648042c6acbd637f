//! Authenticated API client for the retail console backend.
//!
//! # Overview
//! `ApiClient` composes `{base_url}/{endpoint}` URLs, attaches a bearer token
//! from an injected `SessionProvider`, serializes JSON bodies, and retries
//! once per remaining budget on 401 with a freshly fetched token. Every
//! other outcome is returned to the caller as-is.
//!
//! # Design
//! - Request building is a pure function (`http::build_request`); network
//!   I/O sits behind the `Transport` trait so retry behaviour is testable
//!   without sockets. `ReqwestTransport` is the production transport.
//! - The client holds only immutable configuration; concurrent calls share
//!   nothing mutable.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod session;
pub mod transport;
pub mod types;

pub use client::ApiClient;
pub use config::ClientConfig;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, RequestBody};
pub use session::{NoSession, SessionProvider, StaticSession};
pub use transport::{ReqwestTransport, Transport};
pub use types::{
    DashboardStats, NewOrder, NewOrderItem, NewProduct, OrderCount, OrderDetail, OrderId,
    OrderLine, OrderSummary, Product, ProductId, RecentOrder, Revenue, Uom,
};
