use std::future::Future;
use std::time::Duration;

use crate::store::{StoreError, StoreResult};

/// Bounds a request-scoped store call. Store writes are single-document, so
/// an abandoned call leaves either the whole write or none of it.
pub async fn with_deadline<T, F>(limit: Duration, fut: F) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(limit)),
    }
}
