//! Single-flight gate for access token refreshes.

use std::sync::Mutex;

use futures::future::{BoxFuture, FutureExt, Shared};
use rbac_core::error::ConsoleResult;
use tracing::debug;

type RefreshFuture = Shared<BoxFuture<'static, ConsoleResult<String>>>;

/// Collapses concurrent refresh attempts into one.
///
/// The first caller starts the refresh; callers arriving while it is still
/// running await the same future and observe the same outcome. Once it has
/// settled, the next caller starts a fresh one.
#[derive(Default)]
pub(crate) struct RefreshBarrier {
    in_flight: Mutex<Option<RefreshFuture>>,
}

impl RefreshBarrier {
    pub(crate) async fn run<F>(&self, start: F) -> ConsoleResult<String>
    where
        F: FnOnce() -> BoxFuture<'static, ConsoleResult<String>>,
    {
        let refresh = {
            let mut slot = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            match slot.as_ref() {
                Some(pending) if pending.peek().is_none() => {
                    debug!("joining in-flight token refresh");
                    pending.clone()
                }
                _ => {
                    let refresh = start().shared();
                    *slot = Some(refresh.clone());
                    refresh
                }
            }
        };
        refresh.await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use rbac_core::error::{AuthError, ConsoleError};

    use super::*;

    fn counted(
        calls: &Arc<AtomicUsize>,
        outcome: ConsoleResult<String>,
    ) -> impl FnOnce() -> BoxFuture<'static, ConsoleResult<String>> {
        let calls = Arc::clone(calls);
        move || {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                outcome
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_refresh() {
        let barrier = RefreshBarrier::default();
        let calls = Arc::new(AtomicUsize::new(0));

        let (a, b, c) = tokio::join!(
            barrier.run(counted(&calls, Ok("t1".into()))),
            barrier.run(counted(&calls, Ok("t2".into()))),
            barrier.run(counted(&calls, Ok("t3".into()))),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(a.unwrap(), "t1");
        assert_eq!(b.unwrap(), "t1");
        assert_eq!(c.unwrap(), "t1");
    }

    #[tokio::test]
    async fn failure_is_shared_and_not_cached() {
        let barrier = RefreshBarrier::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let expired: ConsoleResult<String> = Err(AuthError::TokenExpired.into());

        let (a, b) = tokio::join!(
            barrier.run(counted(&calls, expired.clone())),
            barrier.run(counted(&calls, expired.clone())),
        );
        assert_eq!(a, Err(ConsoleError::Auth(AuthError::TokenExpired)));
        assert_eq!(b, a);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let next = barrier.run(counted(&calls, Ok("fresh".into()))).await;
        assert_eq!(next.unwrap(), "fresh");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
