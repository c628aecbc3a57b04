//! Deferred transport transitions.
//!
//! The player deliberately waits a fixed delay between a transport command and
//! its effect. Only one transition can be pending: scheduling a new one cancels
//! the previous one, and a stale action that already woke up is rejected by
//! [`TransitionSequencer::complete`].

use std::future::Future;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Identifies one scheduled transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

#[derive(Debug)]
struct Pending {
    ticket: Ticket,
    token: CancellationToken,
}

/// Single-slot scheduler for deferred actions
#[derive(Debug)]
pub struct TransitionSequencer {
    runtime: Handle,
    root: CancellationToken,
    pending: Option<Pending>,
    next_id: u64,
}

impl TransitionSequencer {
    /// Create a sequencer spawning its timers on `runtime`
    #[must_use]
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            root: CancellationToken::new(),
            pending: None,
            next_id: 0,
        }
    }

    /// Run `action` once after `delay`, replacing any pending transition.
    ///
    /// The action receives its [`Ticket`] and should call [`complete`](Self::complete)
    /// before mutating anything, so that an action superseded after waking is a no-op.
    /// Nothing runs if the transition is cancelled or the sequencer is shut down
    /// before the delay elapses.
    pub fn schedule_after<F, Fut>(&mut self, delay: Duration, action: F) -> Ticket
    where
        F: FnOnce(Ticket) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel_pending();

        self.next_id += 1;
        let ticket = Ticket(self.next_id);
        let token = self.root.child_token();
        self.pending = Some(Pending {
            ticket,
            token: token.clone(),
        });

        self.runtime.spawn(async move {
            tokio::select! {
                biased;
                () = token.cancelled() => {
                    debug!("Transition {:?} cancelled", ticket);
                }
                () = tokio::time::sleep(delay) => {
                    action(ticket).await;
                }
            }
        });

        ticket
    }

    /// Claim a pending transition. Returns `true` exactly once for the current ticket.
    pub fn complete(&mut self, ticket: Ticket) -> bool {
        if self.root.is_cancelled() {
            return false;
        }
        match &self.pending {
            Some(pending) if pending.ticket == ticket => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    /// Cancel the pending transition, if any. Returns `true` if one was cancelled.
    pub fn cancel_pending(&mut self) -> bool {
        self.pending.take().is_some_and(|pending| {
            pending.token.cancel();
            true
        })
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Cancel everything; later schedules never fire.
    pub fn shutdown(&mut self) {
        self.cancel_pending();
        self.root.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const DELAY: Duration = Duration::from_millis(500);

    fn counting_action(counter: &Arc<AtomicUsize>) -> impl FnOnce(Ticket) -> std::future::Ready<()> {
        let counter = Arc::clone(counter);
        move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_once_after_delay() {
        let mut sequencer = TransitionSequencer::new(Handle::current());
        let counter = Arc::new(AtomicUsize::new(0));

        sequencer.schedule_after(DELAY, counting_action(&counter));

        tokio::time::sleep(Duration::from_millis(499)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_schedule_cancels_previous() {
        let mut sequencer = TransitionSequencer::new(Handle::current());
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        sequencer.schedule_after(DELAY, counting_action(&first));
        tokio::time::sleep(Duration::from_millis(200)).await;
        sequencer.schedule_after(DELAY, counting_action(&second));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_complete_accepts_current_ticket_once() {
        let mut sequencer = TransitionSequencer::new(Handle::current());
        let stale = sequencer.schedule_after(DELAY, |_| std::future::ready(()));
        let current = sequencer.schedule_after(DELAY, |_| std::future::ready(()));

        assert!(!sequencer.complete(stale));
        assert!(sequencer.is_pending());
        assert!(sequencer.complete(current));
        assert!(!sequencer.complete(current));
        assert!(!sequencer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_pending_and_future_schedules() {
        let mut sequencer = TransitionSequencer::new(Handle::current());
        let counter = Arc::new(AtomicUsize::new(0));

        sequencer.schedule_after(DELAY, counting_action(&counter));
        sequencer.shutdown();
        let late = sequencer.schedule_after(DELAY, counting_action(&counter));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert!(!sequencer.complete(late));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_pending() {
        let mut sequencer = TransitionSequencer::new(Handle::current());
        assert!(!sequencer.cancel_pending());

        let counter = Arc::new(AtomicUsize::new(0));
        sequencer.schedule_after(DELAY, counting_action(&counter));
        assert!(sequencer.cancel_pending());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
