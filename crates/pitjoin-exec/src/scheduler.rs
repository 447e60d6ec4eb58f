//! Fan-out primitives for independent per-view pipelines.
//!
//! Views share nothing mutable, so each runs on its own worker; results come
//! back in input order for the fan-in. The sync scheduler uses scoped
//! threads; `async-scheduler` adds a tokio variant built on `spawn_blocking`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::ExecError;

/// Run `f` over `items` on at most `max_parallel` scoped threads.
///
/// Returns results in item order, or the error of the first failing item
/// (in item order).
pub fn run_bounded<T, R, F>(items: &[T], max_parallel: usize, f: F) -> Result<Vec<R>, ExecError>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> Result<R, ExecError> + Sync,
{
    let workers = max_parallel.max(1).min(items.len());
    if workers <= 1 {
        return items.iter().map(&f).collect();
    }

    let next = AtomicUsize::new(0);
    let slots: Vec<Mutex<Option<Result<R, ExecError>>>> =
        items.iter().map(|_| Mutex::new(None)).collect();

    let (next, slots_ref, f) = (&next, &slots, &f);
    let panicked = std::thread::scope(|s| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                s.spawn(move || loop {
                    let i = next.fetch_add(1, Ordering::SeqCst);
                    let Some(item) = items.get(i) else {
                        break;
                    };
                    let out = f(item);
                    if let Ok(mut slot) = slots_ref[i].lock() {
                        *slot = Some(out);
                    }
                })
            })
            .collect();
        handles.into_iter().any(|h| h.join().is_err())
    });
    if panicked {
        return Err(ExecError::Scheduler("view worker panicked".into()));
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(i, slot)| {
            slot.into_inner()
                .ok()
                .flatten()
                .unwrap_or_else(|| Err(ExecError::Scheduler(format!("no result for view #{i}"))))
        })
        .collect()
}

#[cfg(feature = "async-scheduler")]
pub use async_impl::run_bounded_async;

#[cfg(feature = "async-scheduler")]
mod async_impl {
    use std::sync::Arc;

    use tokio::sync::Semaphore;

    use crate::ExecError;

    /// Run `f` over `items` as blocking tasks, at most `max_parallel` at once.
    pub async fn run_bounded_async<T, R, F>(
        items: Vec<T>,
        max_parallel: usize,
        f: F,
    ) -> Result<Vec<R>, ExecError>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Result<R, ExecError> + Send + Sync + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(max_parallel.max(1)));
        let f = Arc::new(f);

        let mut handles = Vec::with_capacity(items.len());
        for item in items {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| ExecError::Scheduler(format!("semaphore: {e}")))?;
            let f = Arc::clone(&f);
            handles.push(tokio::task::spawn_blocking(move || {
                let _permit = permit; // held for the duration of the task
                f(item)
            }));
        }

        let mut out = Vec::with_capacity(handles.len());
        for h in handles {
            let r = h
                .await
                .map_err(|e| ExecError::Scheduler(format!("view task join: {e}")))??;
            out.push(r);
        }
        Ok(out)
    }
}
