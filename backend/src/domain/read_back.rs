//! Bounded read-your-write confirmation.
//!
//! Some stores acknowledge a write before it is queryable. [`read_back`]
//! probes for a freshly written record and, on a miss, sleeps and probes
//! again a bounded number of times. Strongly consistent stores can run with
//! `retries = 0`.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

/// Async sleeping abstraction so retry delays can be skipped in tests.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Suspend execution for `duration`.
    ///
    /// ```rust,no_run
    /// use std::sync::{Arc, Mutex};
    /// use std::time::Duration;
    ///
    /// use access_codes::domain::Sleeper;
    /// use async_trait::async_trait;
    ///
    /// #[derive(Default)]
    /// struct CountingSleeper {
    ///     calls: Arc<Mutex<u32>>,
    /// }
    ///
    /// #[async_trait]
    /// impl Sleeper for CountingSleeper {
    ///     async fn sleep(&self, _duration: Duration) {
    ///         *self.calls.lock().expect("calls mutex") += 1;
    ///     }
    /// }
    /// ```
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the Tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// How many times to re-probe after a miss, and how long to wait first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadBackPolicy {
    /// Re-probes after the first miss.
    pub retries: u32,
    /// Delay before each re-probe.
    pub delay: Duration,
}

impl Default for ReadBackPolicy {
    fn default() -> Self {
        Self {
            retries: 1,
            delay: Duration::from_millis(500),
        }
    }
}

/// Probe until a record is found or the policy is spent.
///
/// Returns `Ok(None)` when every probe missed. Probe errors end the loop
/// immediately and are returned unchanged.
///
/// # Examples
/// ```
/// use access_codes::domain::{ReadBackPolicy, TokioSleeper, read_back};
///
/// # tokio::runtime::Runtime::new().expect("runtime").block_on(async {
/// let policy = ReadBackPolicy { retries: 0, ..ReadBackPolicy::default() };
/// let found: Result<Option<u32>, ()> =
///     read_back(policy, &TokioSleeper, || async { Ok(Some(7)) }).await;
/// assert_eq!(found, Ok(Some(7)));
/// # });
/// ```
pub async fn read_back<T, E, F, Fut>(
    policy: ReadBackPolicy,
    sleeper: &dyn Sleeper,
    mut probe: F,
) -> Result<Option<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let mut retries_used = 0_u32;
    loop {
        if let Some(found) = probe().await? {
            return Ok(Some(found));
        }
        if retries_used >= policy.retries {
            return Ok(None);
        }
        retries_used += 1;
        warn!(
            retry = retries_used,
            delay_ms = u64::try_from(policy.delay.as_millis()).unwrap_or(u64::MAX),
            "read-back missed freshly written record; retrying"
        );
        sleeper.sleep(policy.delay).await;
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the read-back helper.

    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::test_support::RecordingSleeper;
    use rstest::rstest;

    fn policy(retries: u32) -> ReadBackPolicy {
        ReadBackPolicy {
            retries,
            delay: Duration::from_millis(250),
        }
    }

    #[rstest]
    #[tokio::test]
    async fn returns_first_hit_without_sleeping() {
        let sleeper = RecordingSleeper::default();
        let found: Result<Option<&str>, ()> =
            read_back(policy(1), &sleeper, || async { Ok(Some("code")) }).await;

        assert_eq!(found, Ok(Some("code")));
        assert!(sleeper.recorded().is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn retries_after_delay_until_hit() {
        let sleeper = RecordingSleeper::default();
        let probes = AtomicU32::new(0);
        let found: Result<Option<u32>, ()> = read_back(policy(3), &sleeper, || {
            let call = probes.fetch_add(1, Ordering::SeqCst);
            async move { Ok((call == 2).then_some(call)) }
        })
        .await;

        assert_eq!(found, Ok(Some(2)));
        assert_eq!(
            sleeper.recorded(),
            vec![Duration::from_millis(250), Duration::from_millis(250)]
        );
    }

    #[rstest]
    #[case(0, 1)]
    #[case(1, 2)]
    #[case(4, 5)]
    #[tokio::test]
    async fn gives_up_after_policy_is_spent(#[case] retries: u32, #[case] expected_probes: u32) {
        let sleeper = RecordingSleeper::default();
        let probes = AtomicU32::new(0);
        let found: Result<Option<u32>, ()> = read_back(policy(retries), &sleeper, || {
            probes.fetch_add(1, Ordering::SeqCst);
            async { Ok(None) }
        })
        .await;

        assert_eq!(found, Ok(None));
        assert_eq!(probes.load(Ordering::SeqCst), expected_probes);
        assert_eq!(sleeper.recorded().len(), retries as usize);
    }

    #[rstest]
    #[tokio::test]
    async fn probe_errors_stop_the_loop() {
        let sleeper = RecordingSleeper::default();
        let found: Result<Option<u32>, &str> =
            read_back(policy(5), &sleeper, || async { Err("store offline") }).await;

        assert_eq!(found, Err("store offline"));
        assert!(sleeper.recorded().is_empty());
    }
}
