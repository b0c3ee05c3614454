use std::future::Future;
use std::time::Duration;

use fitgate_core::{StoreResult, TransportError};

/// Default bound for one key store round-trip.
pub const DEFAULT_KEY_STORE_TIMEOUT: Duration = Duration::from_millis(2_000);

/// Runs one store call, failing with [`TransportError::Timeout`] past `deadline`.
pub(crate) async fn within_deadline<T>(
    deadline: Duration,
    call: impl Future<Output = StoreResult<T>>,
) -> StoreResult<T> {
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout(
            u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX),
        )),
    }
}
