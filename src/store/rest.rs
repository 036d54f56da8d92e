use std::time::Instant;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::profile::{AuthSession, AuthUser, SignUp};
use crate::observability::metrics::Metrics;
use crate::store::{AuthProvider, Bearer, DataStore, Query};

/// REST client for the hosted backend: PostgREST tables under `/rest/v1`,
/// the auth API under `/auth/v1` and edge functions under `/functions/v1`.
#[derive(Clone)]
pub struct RestBackend {
    client: Client,
    base_url: String,
    anon_key: String,
    service_key: Option<String>,
    metrics: Metrics,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    user: AuthUser,
}

#[derive(Deserialize)]
struct SignUpResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    user: Option<AuthUser>,
    #[serde(default)]
    session: Option<TokenResponse>,
}

impl RestBackend {
    pub fn new(
        base_url: impl Into<String>,
        anon_key: impl Into<String>,
        service_key: Option<String>,
        metrics: Metrics,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            anon_key: anon_key.into(),
            service_key,
            metrics,
        }
    }

    fn bearer_token<'a>(&'a self, bearer: &'a Bearer) -> &'a str {
        match bearer {
            Bearer::User(token) => token.as_str(),
            Bearer::Service => self.service_key.as_deref().unwrap_or(&self.anon_key),
        }
    }

    fn authorized(&self, builder: RequestBuilder, bearer: &Bearer) -> RequestBuilder {
        builder
            .header("apikey", &self.anon_key)
            .bearer_auth(self.bearer_token(bearer))
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    async fn send(&self, operation: &'static str, builder: RequestBuilder) -> AppResult<Response> {
        let start = Instant::now();
        let result = builder.send().await;
        let elapsed = start.elapsed().as_secs_f64();

        let outcome = match &result {
            Ok(resp) if resp.status().is_success() => "success",
            Ok(_) => "rejected",
            Err(_) => "unreachable",
        };
        self.metrics
            .backend_requests_total
            .with_label_values(&[operation, outcome])
            .inc();
        debug!(operation, outcome, elapsed, "backend request finished");

        let response = result?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(rejection(response).await)
        }
    }
}

/// PostgREST merges on the primary key unless told which columns collide.
fn conflict_params(on_conflict: &[&str]) -> Vec<(&'static str, String)> {
    if on_conflict.is_empty() {
        Vec::new()
    } else {
        vec![("on_conflict", on_conflict.join(","))]
    }
}

async fn rejection(response: Response) -> AppError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|value| {
            ["message", "msg", "error_description", "error"]
                .iter()
                .find_map(|key| value.get(*key).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or(body);

    AppError::Backend { status, message }
}

#[async_trait]
impl DataStore for RestBackend {
    async fn select(&self, bearer: &Bearer, query: &Query) -> AppResult<Vec<Value>> {
        let request = self
            .client
            .get(self.table_url(&query.table))
            .query(&query.to_params());
        let response = self.send("select", self.authorized(request, bearer)).await?;
        Ok(response.json::<Vec<Value>>().await?)
    }

    async fn insert(&self, bearer: &Bearer, table: &str, row: Value) -> AppResult<Value> {
        let request = self
            .client
            .post(self.table_url(table))
            .header("Prefer", "return=representation")
            .json(&row);
        let response = self.send("insert", self.authorized(request, bearer)).await?;
        let mut rows = response.json::<Vec<Value>>().await?;
        if rows.is_empty() {
            return Err(AppError::Decode(format!("insert into {table} returned no rows")));
        }
        Ok(rows.swap_remove(0))
    }

    async fn upsert(
        &self,
        bearer: &Bearer,
        table: &str,
        row: Value,
        on_conflict: &[&str],
    ) -> AppResult<()> {
        let request = self
            .client
            .post(self.table_url(table))
            .query(&conflict_params(on_conflict))
            .header("Prefer", "resolution=merge-duplicates")
            .json(&row);
        self.send("upsert", self.authorized(request, bearer)).await?;
        Ok(())
    }

    async fn update(
        &self,
        bearer: &Bearer,
        filter: &Query,
        changes: Value,
    ) -> AppResult<Vec<Value>> {
        let request = self
            .client
            .patch(self.table_url(&filter.table))
            .query(&filter.filter_params())
            .header("Prefer", "return=representation")
            .json(&changes);
        let response = self.send("update", self.authorized(request, bearer)).await?;
        Ok(response.json::<Vec<Value>>().await?)
    }

    async fn delete(&self, bearer: &Bearer, filter: &Query) -> AppResult<()> {
        let request = self
            .client
            .delete(self.table_url(&filter.table))
            .query(&filter.filter_params());
        self.send("delete", self.authorized(request, bearer)).await?;
        Ok(())
    }

    async fn rpc(&self, bearer: &Bearer, function: &str, args: Value) -> AppResult<Value> {
        let request = self
            .client
            .post(format!("{}/rest/v1/rpc/{function}", self.base_url))
            .json(&args);
        let response = self.send("rpc", self.authorized(request, bearer)).await?;
        Ok(response.json::<Value>().await?)
    }

    async fn invoke(&self, bearer: &Bearer, function: &str, body: Value) -> AppResult<()> {
        let request = self
            .client
            .post(format!("{}/functions/v1/{function}", self.base_url))
            .json(&body);
        self.send("invoke", self.authorized(request, bearer)).await?;
        Ok(())
    }
}

#[async_trait]
impl AuthProvider for RestBackend {
    async fn user_for_token(&self, access_token: &str) -> AppResult<Option<AuthUser>> {
        let request = self
            .client
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token);

        match self.send("auth_user", request).await {
            Ok(response) => Ok(Some(response.json::<AuthUser>().await?)),
            Err(AppError::Backend { status, .. }) if (400..500).contains(&status) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> AppResult<AuthSession> {
        let request = self
            .client
            .post(format!("{}/auth/v1/token", self.base_url))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }));

        let token = self
            .send("sign_in", request)
            .await?
            .json::<TokenResponse>()
            .await?;

        Ok(AuthSession {
            access_token: token.access_token,
            user: token.user,
        })
    }

    async fn sign_up(&self, request: &SignUp) -> AppResult<Option<AuthSession>> {
        let body = json!({
            "email": request.email,
            "password": request.password,
            "data": {
                "first_name": request.first_name,
                "last_name": request.last_name,
                "mobile": request.mobile,
                "role": "admin",
            },
        });
        let builder = self
            .client
            .post(format!("{}/auth/v1/signup", self.base_url))
            .header("apikey", &self.anon_key)
            .json(&body);

        let response = self
            .send("sign_up", builder)
            .await?
            .json::<SignUpResponse>()
            .await?;

        let session = match response {
            SignUpResponse {
                session: Some(token),
                ..
            } => Some(AuthSession {
                access_token: token.access_token,
                user: token.user,
            }),
            SignUpResponse {
                access_token: Some(access_token),
                user: Some(user),
                ..
            } => Some(AuthSession { access_token, user }),
            _ => None,
        };

        Ok(session)
    }

    async fn sign_out(&self, access_token: &str) -> AppResult<()> {
        let request = self
            .client
            .post(format!("{}/auth/v1/logout", self.base_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token);
        self.send("sign_out", request).await?;
        Ok(())
    }
}
