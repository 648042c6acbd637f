//! Session provider seam.
//!
//! The identity provider is an injected capability rather than a global. The
//! client asks it for a token before every attempt and never caches the
//! answer itself.

use std::sync::Arc;

use async_trait::async_trait;

#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Whether a user session is currently active.
    async fn is_signed_in(&self) -> bool;

    /// Current bearer token. `force_refresh` asks the provider to bypass any
    /// cache it keeps and mint or fetch a new one.
    async fn token(&self, force_refresh: bool) -> Option<String>;
}

#[async_trait]
impl<P: SessionProvider + ?Sized> SessionProvider for Arc<P> {
    async fn is_signed_in(&self) -> bool {
        (**self).is_signed_in().await
    }

    async fn token(&self, force_refresh: bool) -> Option<String> {
        (**self).token(force_refresh).await
    }
}

#[async_trait]
impl<P: SessionProvider + ?Sized> SessionProvider for Box<P> {
    async fn is_signed_in(&self) -> bool {
        (**self).is_signed_in().await
    }

    async fn token(&self, force_refresh: bool) -> Option<String> {
        (**self).token(force_refresh).await
    }
}

/// Always signed out. Requests go out without `Authorization`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSession;

#[async_trait]
impl SessionProvider for NoSession {
    async fn is_signed_in(&self) -> bool {
        false
    }

    async fn token(&self, _force_refresh: bool) -> Option<String> {
        None
    }
}

/// Signed in with a fixed token; refreshing returns the same value.
#[derive(Debug, Clone)]
pub struct StaticSession {
    token: String,
}

impl StaticSession {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl SessionProvider for StaticSession {
    async fn is_signed_in(&self) -> bool {
        true
    }

    async fn token(&self, _force_refresh: bool) -> Option<String> {
        Some(self.token.clone())
    }
}
