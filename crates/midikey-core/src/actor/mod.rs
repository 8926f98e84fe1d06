//! Single-threaded task actors.
//!
//! An [`Actor`] owns one resource state on a dedicated thread. Every mutation of that
//! state happens inside a task run on that thread, one task at a time, in the order
//! tasks arrive on the queue. Callers on other threads submit closures and block for
//! the result.
//!
//! Besides its task queue an actor waits on two more sources in the same `select!`:
//! its cancellation token, and the resource's own deadline (see [`Resource`]). Timer
//! expiry is therefore serialized with tasks for free.
//!
//! ```ignore
//! let root = CancelToken::new();
//! let counter = Actor::spawn("counter", &root, Counter::default());
//! counter.submit(|c| c.value += 1)?;
//! let value = counter.submit(|c| c.value)?;
//! ```

mod cancel;

pub use cancel::CancelToken;

use crate::error::{Error, Result};
use crossbeam_channel::{never, select, unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Instant;
use tracing::{debug, trace, warn};

/// State owned by an actor.
///
/// The default implementation has no deadline, which makes the actor a plain task queue.
pub trait Resource: Send + 'static {
    /// Next instant at which [`Resource::on_deadline`] should run. Re-read after every
    /// task, so re-arming or clearing it is just a field update inside a task.
    fn deadline(&self) -> Option<Instant> {
        None
    }

    /// Runs on the actor thread once `deadline()` has passed.
    fn on_deadline(&mut self, _now: Instant) {}
}

type Task<S> = Box<dyn FnOnce(&mut S) + Send>;

/// Handle to a running actor. Clone is cheap (Arc internally).
pub struct Actor<S> {
    inner: Arc<ActorInner<S>>,
}

struct ActorInner<S> {
    name: String,
    tasks: Sender<Task<S>>,
    token: CancelToken,
    thread_id: ThreadId,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl<S> Clone for Actor<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Resource> Actor<S> {
    /// Spawn the actor thread. The actor's token is a child of `parent`, so cancelling
    /// the parent stops this actor too.
    pub fn spawn(name: impl Into<String>, parent: &CancelToken, state: S) -> Self {
        let name = name.into();
        let (tasks, queue) = unbounded::<Task<S>>();
        let token = parent.child();

        let thread_token = token.clone();
        let thread_name = name.clone();
        let handle = thread::Builder::new()
            .name(format!("actor-{name}"))
            .spawn(move || run_loop(&thread_name, queue, thread_token, state))
            .expect("Failed to spawn actor thread");

        Self {
            inner: Arc::new(ActorInner {
                name,
                tasks,
                token,
                thread_id: handle.thread().id(),
                thread: Mutex::new(Some(handle)),
            }),
        }
    }
}

impl<S: 'static> Actor<S> {
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn token(&self) -> &CancelToken {
        &self.inner.token
    }

    pub fn is_running(&self) -> bool {
        !self.inner.token.is_cancelled()
    }

    /// Run `f` on the actor thread and wait for its result.
    ///
    /// Fails with [`Error::Canceled`] if the actor is (or becomes) cancelled before the
    /// task starts; the state is then left untouched. A task already running when the
    /// cancel arrives still completes and its result is returned.
    pub fn submit<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut S) -> R + Send + 'static,
        R: Send + 'static,
    {
        if thread::current().id() == self.inner.thread_id {
            return Err(Error::InternalConsistency(format!(
                "task submitted to actor '{}' from its own thread",
                self.inner.name
            )));
        }
        if self.inner.token.is_cancelled() {
            return Err(Error::Canceled);
        }

        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        let task: Task<S> = Box::new(move |state| {
            let _ = reply_tx.send(f(state));
        });
        self.inner.tasks.send(task).map_err(|_| Error::Canceled)?;

        // The loop drops unstarted tasks on exit, which disconnects the reply.
        reply_rx.recv().map_err(|_| Error::Canceled)
    }

    /// Queue `f` without waiting. Errors (including cancellation) are logged, never
    /// surfaced.
    pub fn submit_detached<F>(&self, what: &'static str, f: F)
    where
        F: FnOnce(&mut S) -> Result<()> + Send + 'static,
    {
        let name = self.inner.name.clone();
        let task: Task<S> = Box::new(move |state| {
            if let Err(e) = f(state) {
                warn!(actor = %name, "{what} failed: {e}");
            }
        });
        if self.inner.token.is_cancelled() || self.inner.tasks.send(task).is_err() {
            warn!(actor = %self.inner.name, "{what} dropped: {}", Error::Canceled);
        }
    }

    /// Stop accepting tasks. Pending tasks are dropped and their submitters get
    /// [`Error::Canceled`].
    pub fn shutdown(&self) {
        self.inner.token.cancel();
    }

    /// Wait for the actor thread to exit. Does not cancel on its own.
    pub fn join(&self) {
        if thread::current().id() == self.inner.thread_id {
            return;
        }
        let handle = self.inner.thread.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!(actor = %self.inner.name, "actor thread panicked");
            }
        }
    }
}

fn run_loop<S: Resource>(name: &str, queue: Receiver<Task<S>>, token: CancelToken, mut state: S) {
    debug!(actor = name, "actor started");

    loop {
        let timer = match state.deadline() {
            Some(deadline) => crossbeam_channel::at(deadline),
            None => never(),
        };

        select! {
            recv(token.done()) -> _ => break,
            recv(queue) -> task => match task {
                Ok(task) => {
                    // select! picks fairly among ready operations; cancellation wins.
                    if token.is_cancelled() {
                        break;
                    }
                    task(&mut state);
                }
                Err(_) => break,
            },
            recv(timer) -> fired => {
                if token.is_cancelled() {
                    break;
                }
                let now = fired.unwrap_or_else(|_| Instant::now());
                trace!(actor = name, "deadline reached");
                state.on_deadline(now);
            }
        }
    }

    let dropped = queue.try_iter().count();
    debug!(actor = name, dropped, "actor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[derive(Default)]
    struct Counter {
        value: u64,
        log: Vec<u64>,
        deadline: Option<Instant>,
        fired: u32,
    }

    impl Resource for Counter {
        fn deadline(&self) -> Option<Instant> {
            self.deadline
        }

        fn on_deadline(&mut self, _now: Instant) {
            self.deadline = None;
            self.fired += 1;
        }
    }

    #[test]
    fn test_submit_returns_task_result() {
        let root = CancelToken::new();
        let actor = Actor::spawn("counter", &root, Counter::default());

        actor.submit(|c| c.value += 5).unwrap();
        assert_eq!(actor.submit(|c| c.value).unwrap(), 5);

        root.cancel();
        actor.join();
    }

    #[test]
    fn test_tasks_from_one_caller_run_in_submission_order() {
        let root = CancelToken::new();
        let actor = Actor::spawn("ordered", &root, Counter::default());

        for i in 0..100 {
            actor.submit_detached("push", move |c| {
                c.log.push(i);
                Ok(())
            });
        }
        let log = actor.submit(|c| c.log.clone()).unwrap();
        assert_eq!(log, (0..100).collect::<Vec<_>>());

        root.cancel();
        actor.join();
    }

    #[test]
    fn test_concurrent_tasks_never_interleave() {
        let root = CancelToken::new();
        let actor = Actor::spawn("interleave", &root, Counter::default());

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let actor = actor.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        actor
                            .submit(|c| {
                                // Read-modify-write split by a yield; would lose updates
                                // if two tasks ever overlapped.
                                let v = c.value;
                                std::thread::yield_now();
                                c.value = v + 1;
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }

        assert_eq!(actor.submit(|c| c.value).unwrap(), 400);
        root.cancel();
        actor.join();
    }

    #[test]
    fn test_cancel_resolves_pending_submission_without_running_it() {
        let root = CancelToken::new();
        let actor = Actor::spawn("blocked", &root, Counter::default());

        // Occupy the actor so the next submission stays queued.
        let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(0);
        let (started_tx, started_rx) = crossbeam_channel::bounded::<()>(1);
        actor.submit_detached("block", move |_| {
            started_tx.send(()).ok();
            release_rx.recv().ok();
            Ok(())
        });
        started_rx.recv().unwrap();

        let pending = {
            let actor = actor.clone();
            std::thread::spawn(move || actor.submit(|c| c.value = 99))
        };
        std::thread::sleep(Duration::from_millis(20));
        root.cancel();
        drop(release_tx);

        assert!(matches!(pending.join().unwrap(), Err(Error::Canceled)));
        actor.join();
    }

    #[test]
    fn test_task_in_flight_at_cancel_reports_its_result() {
        let root = CancelToken::new();
        let actor = Actor::spawn("in-flight", &root, Counter::default());

        let (started_tx, started_rx) = crossbeam_channel::bounded::<()>(1);
        let running = {
            let actor = actor.clone();
            std::thread::spawn(move || {
                actor.submit(move |c| {
                    started_tx.send(()).ok();
                    std::thread::sleep(Duration::from_millis(100));
                    c.value = 7;
                    c.value
                })
            })
        };
        started_rx.recv().unwrap();
        root.cancel();

        assert_eq!(running.join().unwrap().unwrap(), 7);
        actor.join();
        assert!(actor.submit(|c| c.value).unwrap_err().is_canceled());
    }

    #[test]
    fn test_submit_after_shutdown_is_canceled() {
        let root = CancelToken::new();
        let actor = Actor::spawn("closed", &root, Counter::default());
        actor.shutdown();
        actor.join();

        assert!(matches!(actor.submit(|c| c.value), Err(Error::Canceled)));
        assert!(!root.is_cancelled());
    }

    #[test]
    fn test_deadline_fires_once_after_rearming() {
        let root = CancelToken::new();
        let actor = Actor::spawn("timer", &root, Counter::default());

        for _ in 0..10 {
            actor
                .submit(|c| c.deadline = Some(Instant::now() + Duration::from_millis(30)))
                .unwrap();
        }
        std::thread::sleep(Duration::from_millis(120));

        assert_eq!(actor.submit(|c| c.fired).unwrap(), 1);
        root.cancel();
        actor.join();
    }

    #[test]
    fn test_cancel_stops_armed_deadline() {
        let root = CancelToken::new();
        let actor = Actor::spawn("timer", &root, Counter::default());
        actor
            .submit(|c| c.deadline = Some(Instant::now() + Duration::from_secs(60)))
            .unwrap();

        root.cancel();
        actor.join();
        assert!(!actor.is_running());
    }

    #[test]
    fn test_submit_from_own_thread_is_rejected() {
        let root = CancelToken::new();
        let actor = Actor::spawn("reentrant", &root, Counter::default());
        let inner = actor.clone();

        let (tx, rx) = crossbeam_channel::bounded(1);
        actor.submit_detached("reenter", move |_| {
            tx.send(inner.submit(|c| c.value).is_err()).ok();
            Ok(())
        });
        assert!(rx.recv().unwrap());

        root.cancel();
        actor.join();
    }
}
