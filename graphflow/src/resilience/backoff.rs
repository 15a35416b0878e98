//! Standalone backoff helper for operations outside the node contract.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::context::Context;
use crate::error::GraphError;

/// Retries an async operation with exponential backoff and jitter.
///
/// Meant for ad-hoc work that is not a graph node, store writes or network
/// calls made inside a node body. Delay before attempt n (counting from
/// the second) is `base_delay * 2^(n-2)` scaled by a random factor in
/// [0.75, 1.25]; the wait races context cancellation.
pub async fn retry_with_backoff<T, F, Fut>(
    ctx: &Context,
    max_attempts: u32,
    base_delay: Duration,
    mut operation: F,
) -> Result<T, GraphError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GraphError>>,
{
    let mut last_err = GraphError::ExecutionFailed("no attempts were made".to_string());

    for attempt in 0..max_attempts {
        if attempt > 0 {
            let exponential = base_delay.mul_f64(2f64.powi(attempt as i32 - 1));
            let delay = {
                // rng must not live across an await
                let mut rng = rand::thread_rng();
                exponential.mul_f64(rng.gen_range(0.75..=1.25))
            };
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = ctx.cancelled() => return Err(GraphError::Cancelled),
            }
        }
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => last_err = err,
        }
    }

    Err(GraphError::RetryExhausted {
        attempts: max_attempts,
        source: Box::new(last_err),
    })
}
