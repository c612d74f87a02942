//! Paced batch execution.
//!
//! Items are dispatched in consecutive batches of at most `batch_size`. All
//! tasks of a batch run concurrently; the next batch starts only once the
//! whole previous batch has finished *and* `delay` has elapsed, so an
//! external service never sees more than `batch_size` requests in flight or
//! more than one burst per `delay`.
//!
//! An optional deadline bounds the whole run. When it passes, in-flight tasks
//! are dropped and every item that did not complete is handed back in
//! [`BatchOutcome::expired`] instead of blocking.

use futures::future::try_join_all;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep_until, timeout_at, Instant};
use tracing::{debug, warn};

/// Shape of a batched run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlan {
    /// Maximum concurrent tasks per batch. `0` is treated as `1`.
    pub batch_size: usize,
    /// Pause between the end of one batch and the start of the next.
    pub delay: Duration,
    /// Absolute deadline for the whole run.
    pub deadline: Option<Instant>,
}

impl BatchPlan {
    pub fn new(batch_size: usize, delay: Duration) -> Self {
        Self {
            batch_size,
            delay,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    fn size(&self) -> usize {
        self.batch_size.max(1)
    }

    fn expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// What [`run_in_batches`] produced.
#[derive(Debug)]
pub struct BatchOutcome<T, R> {
    /// Results of tasks that finished, in dispatch order.
    pub completed: Vec<R>,
    /// Items whose task never started or was cut off by the deadline.
    pub expired: Vec<T>,
    /// Number of batches that were started.
    pub batches: usize,
}

/// Run `task` over `items` in paced batches.
///
/// A task returning `Err` aborts the run: the rest of its batch is dropped
/// and no further batch is dispatched. Per-item failures that should *not*
/// abort the run must be encoded in `R`.
///
/// `on_batch` is called with `(batch_index, items_in_batch)` right before a
/// batch is dispatched.
pub async fn run_in_batches<T, R, E, F, Fut>(
    items: Vec<T>,
    plan: &BatchPlan,
    mut task: F,
    mut on_batch: impl FnMut(usize, &[T]),
) -> Result<BatchOutcome<T, R>, E>
where
    T: Clone,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    let size = plan.size();
    let mut outcome = BatchOutcome {
        completed: Vec::with_capacity(items.len()),
        expired: Vec::new(),
        batches: 0,
    };

    let mut pending = items.into_iter().peekable();
    while pending.peek().is_some() {
        if outcome.batches > 0 && !plan.delay.is_zero() {
            let resume = Instant::now() + plan.delay;
            let wake = plan.deadline.map_or(resume, |d| d.min(resume));
            debug!("Pacing {}ms before next batch", plan.delay.as_millis());
            sleep_until(wake).await;
        }

        if plan.expired() {
            outcome.expired.extend(pending);
            warn!(
                "Deadline reached: {} items were not dispatched",
                outcome.expired.len()
            );
            break;
        }

        let batch: Vec<T> = pending.by_ref().take(size).collect();
        on_batch(outcome.batches, &batch);
        debug!("Dispatching batch {} ({} items)", outcome.batches + 1, batch.len());
        outcome.batches += 1;

        let running = batch.into_iter().map(|item| {
            let keep = item.clone();
            let fut = task(item);
            let deadline = plan.deadline;
            async move {
                match deadline {
                    Some(d) => match timeout_at(d, fut).await {
                        Ok(res) => res.map(Ok),
                        Err(_) => Ok(Err(keep)),
                    },
                    None => fut.await.map(Ok),
                }
            }
        });

        for slot in try_join_all(running).await? {
            match slot {
                Ok(result) => outcome.completed.push(result),
                Err(item) => outcome.expired.push(item),
            }
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[tokio::test(start_paused = true)]
    async fn splits_into_paced_batches() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let starts = Arc::new(Mutex::new(Vec::new()));
        let origin = Instant::now();
        let plan = BatchPlan::new(5, Duration::from_secs(1));

        let mut sizes = Vec::new();
        let outcome = run_in_batches(
            (1..=12).collect::<Vec<usize>>(),
            &plan,
            |n| {
                let in_flight = Arc::clone(&in_flight);
                let peak = Arc::clone(&peak);
                let starts = Arc::clone(&starts);
                async move {
                    starts.lock().unwrap().push(origin.elapsed());
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, ()>(n * 10)
                }
            },
            |_, batch| sizes.push(batch.len()),
        )
        .await
        .unwrap();

        assert_eq!(outcome.batches, 3);
        assert_eq!(sizes, vec![5, 5, 2]);
        assert_eq!(peak.load(Ordering::SeqCst), 5);
        assert_eq!(outcome.completed.len(), 12);
        assert!(outcome.expired.is_empty());

        // Batch k starts after k * (100ms work + 1s pacing).
        let starts = starts.lock().unwrap();
        assert_eq!(starts[0], Duration::ZERO);
        assert_eq!(starts[5], Duration::from_millis(1100));
        assert_eq!(starts[10], Duration::from_millis(2200));
    }

    #[tokio::test(start_paused = true)]
    async fn error_aborts_remaining_batches() {
        let calls = Arc::new(AtomicUsize::new(0));
        let plan = BatchPlan::new(2, Duration::from_millis(10));
        let out = run_in_batches(
            vec![1, 2, 3, 4, 5],
            &plan,
            |n| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    if n == 2 {
                        Err("denied")
                    } else {
                        Ok(n)
                    }
                }
            },
            |_, _| {},
        )
        .await;

        assert_eq!(out.err(), Some("denied"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_expires_in_flight_and_pending_items() {
        let plan = BatchPlan::new(2, Duration::from_millis(500))
            .with_deadline(Some(Instant::now() + Duration::from_millis(300)));

        let outcome = run_in_batches(
            vec![1u32, 2, 3, 4],
            &plan,
            |n| async move {
                let work = if n == 1 { 50 } else { 1_000 };
                tokio::time::sleep(Duration::from_millis(work)).await;
                Ok::<_, ()>(n)
            },
            |_, _| {},
        )
        .await
        .unwrap();

        assert_eq!(outcome.completed, vec![1]);
        let mut expired = outcome.expired.clone();
        expired.sort_unstable();
        assert_eq!(expired, vec![2, 3, 4]);
        assert_eq!(outcome.batches, 1);
    }

    #[tokio::test]
    async fn empty_input_dispatches_nothing() {
        let plan = BatchPlan::new(5, Duration::from_secs(1));
        let outcome = run_in_batches(
            Vec::<u8>::new(),
            &plan,
            |n| async move { Ok::<_, ()>(n) },
            |_, _| panic!("no batch expected"),
        )
        .await
        .unwrap();
        assert_eq!(outcome.batches, 0);
        assert!(outcome.completed.is_empty());
    }
}
