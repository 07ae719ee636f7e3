//! Per-attempt deadline enforcement.

use std::future::Future;
use std::time::Duration;

use crate::error::LLMError;

/// Default per-attempt deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Races `work` against `deadline`.
///
/// The deadline is measured from the moment the guard is first polled. When it
/// elapses first, `work` is dropped, which aborts an in-flight reqwest request and
/// returns its connection, and [`LLMError::Timeout`] is returned instead.
///
/// # Examples
///
/// ```
/// # use std::time::Duration;
/// # use kotoba_assist::timeout::guard;
/// # use kotoba_assist::error::LLMError;
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let value = guard("openai", Duration::from_secs(1), async { Ok::<_, LLMError>(42) })
///     .await
///     .unwrap();
/// assert_eq!(value, 42);
/// # });
/// ```
pub async fn guard<T, F>(provider: &'static str, deadline: Duration, work: F) -> Result<T, LLMError>
where
    F: Future<Output = Result<T, LLMError>>,
{
    match tokio::time::timeout(deadline, work).await {
        Ok(result) => result,
        Err(_elapsed) => Err(LLMError::Timeout {
            provider,
            timeout: deadline,
        }),
    }
}
