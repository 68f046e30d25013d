//! Fan-out with a deadline.
//!
//! Every task is spawned onto the runtime. The caller gets back whatever
//! finished before the deadline; stragglers keep running detached and their
//! output is dropped when they complete. They are never aborted, so any
//! per-call timeouts inside them still govern how long they live.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;

/// Run `tasks` concurrently and wait until all have finished or `deadline`
/// elapses. Results are positional: `out[i]` is `Some` iff task `i`
/// completed in time. A task that panics counts as not completed.
pub async fn join_with_deadline<F, T>(tasks: Vec<F>, deadline: Duration) -> Vec<Option<T>>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let total = tasks.len();
    let mut results: Vec<Option<T>> = std::iter::repeat_with(|| None).take(total).collect();
    if total == 0 {
        return results;
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    for (idx, task) in tasks.into_iter().enumerate() {
        let tx = tx.clone();
        tokio::spawn(async move {
            let out = task.await;
            // Receiver is gone once the deadline passed; the result is discarded.
            let _ = tx.send((idx, out));
        });
    }
    drop(tx);

    let mut finished = 0usize;
    let collect = async {
        while let Some((idx, out)) = rx.recv().await {
            results[idx] = Some(out);
            finished += 1;
        }
    };

    let timed_out = tokio::time::timeout(deadline, collect).await.is_err();
    if timed_out {
        tracing::debug!(
            finished,
            abandoned = total - finished,
            deadline_ms = deadline.as_millis() as u64,
            "Fan-out deadline reached"
        );
    }

    results
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    #[tokio::test]
    async fn test_all_finish() {
        let tasks: Vec<_> = (0..5u32).map(|i| async move { i * 10 }).collect();
        let out = join_with_deadline(tasks, Duration::from_secs(1)).await;
        assert_eq!(out, vec![Some(0), Some(10), Some(20), Some(30), Some(40)]);
    }

    #[tokio::test]
    async fn test_empty() {
        let tasks: Vec<std::future::Ready<u8>> = Vec::new();
        assert!(join_with_deadline(tasks, Duration::from_millis(1)).await.is_empty());
    }

    #[tokio::test]
    async fn test_slow_tasks_abandoned() {
        let tasks: Vec<_> = [10u64, 2000, 20, 2000]
            .into_iter()
            .map(|ms| async move {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                ms
            })
            .collect();

        let start = Instant::now();
        let out = join_with_deadline(tasks, Duration::from_millis(200)).await;
        assert!(start.elapsed() < Duration::from_millis(1500));
        assert_eq!(out, vec![Some(10), None, Some(20), None]);
    }

    #[tokio::test]
    async fn test_stragglers_not_aborted() {
        let done = Arc::new(AtomicBool::new(false));
        let flag = done.clone();
        let tasks = vec![async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            flag.store(true, Ordering::SeqCst);
        }];

        let out = join_with_deadline(tasks, Duration::from_millis(10)).await;
        assert_eq!(out, vec![None]);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(done.load(Ordering::SeqCst), "detached task should run to completion");
    }

    async fn explode() -> u8 {
        panic!("boom")
    }

    #[tokio::test]
    async fn test_panicking_task_is_none() {
        let tasks: Vec<std::pin::Pin<Box<dyn Future<Output = u8> + Send>>> = vec![
            Box::pin(async { 1u8 }),
            Box::pin(explode()),
        ];
        let out = join_with_deadline(tasks, Duration::from_millis(500)).await;
        assert_eq!(out, vec![Some(1), None]);
    }
}
