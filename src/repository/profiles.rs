use std::sync::Arc;

use crate::error::AppResult;
use crate::models::profile::{ProfileRole, Role};
use crate::repository::decode_rows;
use crate::store::{Bearer, DataStore, Query};

#[derive(Clone)]
pub struct ProfileRepository {
    store: Arc<dyn DataStore>,
}

impl ProfileRepository {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// `None` when the user has no profile row visible to `bearer`.
    pub async fn role(&self, bearer: &Bearer, user_id: &str) -> AppResult<Option<Role>> {
        let query = Query::table("profiles")
            .select("role")
            .eq("id", user_id)
            .limit(1);
        let rows: Vec<ProfileRole> = decode_rows(self.store.select(bearer, &query).await?)?;
        Ok(rows.into_iter().next().map(|profile| profile.role))
    }
}
