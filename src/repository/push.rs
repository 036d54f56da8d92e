use std::sync::Arc;

use serde_json::{json, Value};

use crate::error::AppResult;
use crate::store::{Bearer, DataStore, Query};

const TABLE: &str = "push_subscriptions";
const CONFLICT_COLUMNS: &[&str] = &["user_id", "subscription"];

/// Browser push subscriptions, one opaque JSON blob per admin.
#[derive(Clone)]
pub struct PushSubscriptionRepository {
    store: Arc<dyn DataStore>,
}

impl PushSubscriptionRepository {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    pub async fn exists(&self, bearer: &Bearer, user_id: &str) -> AppResult<bool> {
        let query = Query::table(TABLE)
            .select("user_id")
            .eq("user_id", user_id)
            .limit(1);
        Ok(!self.store.select(bearer, &query).await?.is_empty())
    }

    pub async fn save(&self, bearer: &Bearer, user_id: &str, subscription: Value) -> AppResult<()> {
        self.store
            .upsert(
                bearer,
                TABLE,
                json!({ "user_id": user_id, "subscription": subscription }),
                CONFLICT_COLUMNS,
            )
            .await
    }

    pub async fn remove(&self, bearer: &Bearer, user_id: &str) -> AppResult<()> {
        self.store
            .delete(bearer, &Query::table(TABLE).eq("user_id", user_id))
            .await
    }
}
