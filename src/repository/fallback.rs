use std::future::Future;

use tracing::{error, warn};

use crate::error::{AppError, AppResult};

/// Result of a read that may degrade to a simpler query.
#[derive(Debug)]
pub enum Fallback<T> {
    Primary(T),
    Degraded(T),
    Failed(AppError),
}

impl<T> Fallback<T> {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Fallback::Degraded(_))
    }

    pub fn into_result(self) -> AppResult<T> {
        match self {
            Fallback::Primary(value) | Fallback::Degraded(value) => Ok(value),
            Fallback::Failed(err) => Err(err),
        }
    }
}

/// Runs `primary`; on error logs a warning and runs `fallback`. The fallback is
/// only constructed when needed.
pub async fn with_fallback<T, P, F, Fut>(what: &str, primary: P, fallback: F) -> Fallback<T>
where
    P: Future<Output = AppResult<T>>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    match primary.await {
        Ok(value) => Fallback::Primary(value),
        Err(primary_err) => {
            warn!(query = what, error = %primary_err, "enriched query failed, retrying flat");
            match fallback().await {
                Ok(value) => Fallback::Degraded(value),
                Err(err) => {
                    error!(query = what, error = %err, "flat query failed as well");
                    Fallback::Failed(err)
                }
            }
        }
    }
}
