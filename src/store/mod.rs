pub mod query;
pub mod rest;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::AppResult;
use crate::models::profile::{AuthSession, AuthUser, SignUp};

pub use query::{Filter, Order, Query};
pub use rest::RestBackend;

/// Whose credentials a backend call runs under. Row-level policies apply to
/// `User`; `Service` is used by background work with no signed-in caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bearer {
    User(String),
    Service,
}

/// Table, RPC and edge-function access on the hosted backend.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn select(&self, bearer: &Bearer, query: &Query) -> AppResult<Vec<Value>>;

    /// Inserts one row and returns the stored representation.
    async fn insert(&self, bearer: &Bearer, table: &str, row: Value) -> AppResult<Value>;

    /// Inserts `row`, merging into an existing row that matches on the
    /// `on_conflict` columns (the primary key when empty).
    async fn upsert(
        &self,
        bearer: &Bearer,
        table: &str,
        row: Value,
        on_conflict: &[&str],
    ) -> AppResult<()>;

    /// Applies `changes` to every row matching `filter`; returns the updated rows.
    async fn update(&self, bearer: &Bearer, filter: &Query, changes: Value)
        -> AppResult<Vec<Value>>;

    async fn delete(&self, bearer: &Bearer, filter: &Query) -> AppResult<()>;

    async fn rpc(&self, bearer: &Bearer, function: &str, args: Value) -> AppResult<Value>;

    async fn invoke(&self, bearer: &Bearer, function: &str, body: Value) -> AppResult<()>;
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// `Ok(None)` when the token is missing, expired or revoked.
    async fn user_for_token(&self, access_token: &str) -> AppResult<Option<AuthUser>>;

    async fn sign_in(&self, email: &str, password: &str) -> AppResult<AuthSession>;

    /// Some projects require email confirmation, in which case no session is issued.
    async fn sign_up(&self, request: &SignUp) -> AppResult<Option<AuthSession>>;

    async fn sign_out(&self, access_token: &str) -> AppResult<()>;
}
