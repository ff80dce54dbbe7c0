//! History fetching with polling and bounded concurrency
//!
//! The server may answer a history request with "not yet available" while it
//! loads the data. Each item is polled until the history arrives or the retry
//! budget runs out. Items are fetched concurrently, at most
//! `FetchPolicy::concurrency` at a time, and the first failure aborts the
//! whole batch.

use std::time::Duration;

use futures::{StreamExt, TryStreamExt};
use tokio_util::sync::CancellationToken;
use trackexport_core::{ExportError, HistorySource, Item, RawHistory};

/// Default number of requests per item before giving up
pub const DEFAULT_MAX_ATTEMPTS: u32 = 100;

/// Default wait between two requests for the same item
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Default number of items fetched at once
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Retry budget and parallelism for history fetches
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchPolicy {
    /// Requests per item, including the first one
    pub max_attempts: u32,
    /// Wait between consecutive requests for one item
    pub retry_delay: Duration,
    /// Items in flight at once
    pub concurrency: usize,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl FetchPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of requests per item
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the wait between requests
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Set the number of items fetched at once
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Reject budgets that could never fetch anything
    pub fn validate(&self) -> Result<(), ExportError> {
        if self.max_attempts == 0 {
            return Err(ExportError::InvalidConfig(
                "max_attempts must be at least 1".into(),
            ));
        }
        if self.concurrency == 0 {
            return Err(ExportError::InvalidConfig(
                "concurrency must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Poll the source until `item`'s history is available.
///
/// Fails with `FetchTimeout` once `max_attempts` requests have all answered
/// "not yet available". Source errors are not retried. Cancellation
/// interrupts both a pending request and the wait between requests.
pub async fn fetch_history<S>(
    source: &S,
    item: &Item,
    policy: &FetchPolicy,
    cancel: &CancellationToken,
) -> Result<RawHistory, ExportError>
where
    S: HistorySource + ?Sized,
{
    let cancelled = || ExportError::Cancelled {
        item: item.id.clone(),
    };

    for attempt in 1..=policy.max_attempts {
        if cancel.is_cancelled() {
            return Err(cancelled());
        }

        let response = tokio::select! {
            () = cancel.cancelled() => return Err(cancelled()),
            response = source.fetch_history(&item.history_key) => response,
        };

        match response {
            Ok(Some(history)) => {
                tracing::debug!(
                    item = %item.id,
                    attempt,
                    entries = history.entries.len(),
                    "history available"
                );
                return Ok(history);
            }
            Ok(None) => {
                tracing::debug!(item = %item.id, attempt, "history not yet available");
            }
            Err(err) => {
                return Err(ExportError::Source {
                    item: item.id.clone(),
                    message: err.to_string(),
                });
            }
        }

        if attempt < policy.max_attempts {
            tokio::select! {
                () = cancel.cancelled() => return Err(cancelled()),
                () = tokio::time::sleep(policy.retry_delay) => {}
            }
        }
    }

    tracing::warn!(
        item = %item.id,
        attempts = policy.max_attempts,
        "history still unavailable, giving up"
    );
    Err(ExportError::FetchTimeout {
        item: item.id.clone(),
        attempts: policy.max_attempts,
    })
}

/// Fetch every item's history, at most `policy.concurrency` at a time.
///
/// Results keep the order of `items`. The first error cancels the fetches
/// still in flight and is returned.
pub async fn fetch_all<'a, S>(
    source: &S,
    items: &'a [Item],
    policy: &FetchPolicy,
    cancel: &CancellationToken,
) -> Result<Vec<(&'a Item, RawHistory)>, ExportError>
where
    S: HistorySource + ?Sized,
{
    policy.validate()?;

    futures::stream::iter(items)
        .map(|item| async move {
            let history = fetch_history(source, item, policy, cancel).await?;
            Ok::<_, ExportError>((item, history))
        })
        .buffered(policy.concurrency)
        .try_collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use trackexport_core::{HistoryKey, SourceError};

    /// Answers "not yet available" for the first `pending` polls of each key
    struct LaggingSource {
        pending: HashMap<HistoryKey, u32>,
        polls: Mutex<HashMap<HistoryKey, u32>>,
    }

    impl LaggingSource {
        fn new(pending: &[(&str, u32)]) -> Self {
            Self {
                pending: pending.iter().map(|(k, n)| ((*k).to_string(), *n)).collect(),
                polls: Mutex::new(HashMap::new()),
            }
        }

        fn polls(&self, key: &str) -> u32 {
            self.polls.lock().unwrap().get(key).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl HistorySource for LaggingSource {
        async fn fetch_history(&self, key: &HistoryKey) -> Result<Option<RawHistory>, SourceError> {
            let Some(pending) = self.pending.get(key) else {
                return Err(SourceError::new(format!("no such key {key}")));
            };
            let mut polls = self.polls.lock().unwrap();
            let count = polls.entry(key.clone()).or_default();
            *count += 1;
            if *count > *pending {
                Ok(Some(RawHistory::default()))
            } else {
                Ok(None)
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn returns_immediately_when_available() {
        let source = LaggingSource::new(&[("k1", 0)]);
        let item = Item::new("1", "k1");
        let history = fetch_history(&source, &item, &FetchPolicy::default(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(history.entries.is_empty());
        assert_eq!(source.polls("k1"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_available() {
        let source = LaggingSource::new(&[("k1", 4)]);
        let item = Item::new("1", "k1");
        let start = tokio::time::Instant::now();
        fetch_history(&source, &item, &FetchPolicy::default(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(source.polls("k1"), 5);
        let elapsed = start.elapsed();
        assert!(elapsed >= DEFAULT_RETRY_DELAY * 4, "waited {elapsed:?}");
        assert!(elapsed < DEFAULT_RETRY_DELAY * 5, "waited {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_budget_is_a_timeout() {
        let source = LaggingSource::new(&[("k1", u32::MAX)]);
        let item = Item::new("1042", "k1");
        let result =
            fetch_history(&source, &item, &FetchPolicy::default(), &CancellationToken::new()).await;
        assert_eq!(
            result,
            Err(ExportError::FetchTimeout {
                item: "1042".into(),
                attempts: DEFAULT_MAX_ATTEMPTS,
            })
        );
        assert_eq!(source.polls("k1"), DEFAULT_MAX_ATTEMPTS);
    }

    #[tokio::test(start_paused = true)]
    async fn source_errors_are_not_retried() {
        let source = LaggingSource::new(&[]);
        let item = Item::new("1", "missing");
        let result =
            fetch_history(&source, &item, &FetchPolicy::default(), &CancellationToken::new()).await;
        assert_eq!(
            result,
            Err(ExportError::Source {
                item: "1".into(),
                message: "no such key missing".into(),
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_token_stops_polling() {
        let source = LaggingSource::new(&[("k1", u32::MAX)]);
        let item = Item::new("1", "k1");
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = fetch_history(&source, &item, &FetchPolicy::default(), &cancel).await;
        assert_eq!(result, Err(ExportError::Cancelled { item: "1".into() }));
        assert_eq!(source.polls("k1"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_retry_wait() {
        let source = LaggingSource::new(&[("k1", u32::MAX)]);
        let item = Item::new("1", "k1");
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(DEFAULT_RETRY_DELAY * 5 / 2).await;
            trigger.cancel();
        });

        let result = fetch_history(&source, &item, &FetchPolicy::default(), &cancel).await;
        assert_eq!(result, Err(ExportError::Cancelled { item: "1".into() }));
        // polled at 0, 100 and 200 ms; cancelled while waiting for the fourth
        assert_eq!(source.polls("k1"), 3);
    }

    /// Never answers
    struct StalledSource;

    #[async_trait]
    impl HistorySource for StalledSource {
        async fn fetch_history(&self, _key: &HistoryKey) -> Result<Option<RawHistory>, SourceError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_interrupts_stalled_request() {
        let item = Item::new("7", "k7");
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            trigger.cancel();
        });

        let result = fetch_history(&StalledSource, &item, &FetchPolicy::default(), &cancel).await;
        assert_eq!(result, Err(ExportError::Cancelled { item: "7".into() }));
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_all_keeps_item_order() {
        let source = LaggingSource::new(&[("a", 3), ("b", 0), ("c", 1)]);
        let items = vec![Item::new("A", "a"), Item::new("B", "b"), Item::new("C", "c")];
        let fetched = fetch_all(&source, &items, &FetchPolicy::default(), &CancellationToken::new())
            .await
            .unwrap();
        let ids: Vec<&str> = fetched.iter().map(|(item, _)| item.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_all_polls_items_concurrently() {
        let source = LaggingSource::new(&[("a", 10), ("b", 10), ("c", 10)]);
        let items = vec![Item::new("A", "a"), Item::new("B", "b"), Item::new("C", "c")];
        let start = tokio::time::Instant::now();
        fetch_all(&source, &items, &FetchPolicy::default(), &CancellationToken::new())
            .await
            .unwrap();
        // Three lagging items overlap instead of waiting 3 x 10 delays
        let elapsed = start.elapsed();
        assert!(elapsed >= DEFAULT_RETRY_DELAY * 10, "waited {elapsed:?}");
        assert!(elapsed < DEFAULT_RETRY_DELAY * 20, "waited {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_all_rejects_zero_concurrency() {
        let source = LaggingSource::new(&[("a", 0)]);
        let items = vec![Item::new("A", "a")];
        let policy = FetchPolicy::new().concurrency(0);
        let result = fetch_all(&source, &items, &policy, &CancellationToken::new()).await;
        assert!(matches!(result, Err(ExportError::InvalidConfig(_))));
    }

    #[test]
    fn policy_builder() {
        let policy = FetchPolicy::new()
            .max_attempts(5)
            .retry_delay(Duration::from_millis(20))
            .concurrency(2);
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.retry_delay, Duration::from_millis(20));
        assert_eq!(policy.concurrency, 2);
        assert!(FetchPolicy::new().max_attempts(0).validate().is_err());
    }
}
