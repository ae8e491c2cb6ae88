//! Single-shot completion sinks.
//!
//! Every stream item carries a [`CompletionSink`]: the producing half of a
//! one-shot slot that the matcher fills exactly once, strictly outside the
//! stream mutex. The submitting side keeps the [`Completion`] half and
//! observes the outcome with [`Completion::try_take`], optionally waking a
//! blocked thread through a notifier callback.
//!
//! Delivering twice is unrepresentable: [`CompletionSink::complete`] consumes
//! the sink.

use alloc::boxed::Box;
use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, Ordering};

use spin::Mutex;

use crate::error::Error;
use crate::item::SubmitInfo;

/// One-shot wake callback, invoked when an outcome becomes observable.
pub type Notifier = Box<dyn FnOnce() + Send>;

/// The delivered result of a stream item.
#[derive(Debug)]
pub struct Outcome<T> {
    /// The submit info the item was constructed with, echoed back.
    pub info: SubmitInfo,
    /// The item's result.
    pub result: Result<T, Error>,
}

struct Slot<T> {
    outcome: Option<Outcome<T>>,
    notify: Option<Notifier>,
    /// Set once the sink has delivered.
    completed: bool,
    /// Set when the sink was dropped without delivering.
    producer_gone: bool,
}

struct Shared<T> {
    info: SubmitInfo,
    slot: Mutex<Slot<T>>,
    consumer_alive: AtomicBool,
}

/// Producing half of a completion pair. Consumed by [`complete`](Self::complete).
pub struct CompletionSink<T> {
    shared: Arc<Shared<T>>,
}

/// Consuming half of a completion pair.
pub struct Completion<T> {
    shared: Arc<Shared<T>>,
}

/// Create a completion pair for an item carrying `info`.
pub fn completion<T>(info: SubmitInfo) -> (CompletionSink<T>, Completion<T>) {
    let shared = Arc::new(Shared {
        info,
        slot: Mutex::new(Slot {
            outcome: None,
            notify: None,
            completed: false,
            producer_gone: false,
        }),
        consumer_alive: AtomicBool::new(true),
    });
    (
        CompletionSink {
            shared: shared.clone(),
        },
        Completion { shared },
    )
}

impl<T> CompletionSink<T> {
    /// Deliver the item's outcome.
    ///
    /// # Returns
    ///
    /// `true` if a consumer is still listening for the outcome.
    pub fn complete(self, result: Result<T, Error>) -> bool {
        let notify;
        {
            let mut slot = self.shared.slot.lock();
            debug_assert!(!slot.completed, "completion delivered twice");
            slot.completed = true;
            slot.outcome = Some(Outcome {
                info: self.shared.info,
                result,
            });
            notify = slot.notify.take();
        }
        if let Some(notify) = notify {
            notify();
        }
        self.shared.consumer_alive.load(Ordering::Acquire)
    }

    /// Check whether the consuming half has been dropped.
    pub fn is_abandoned(&self) -> bool {
        !self.shared.consumer_alive.load(Ordering::Acquire)
    }
}

impl<T> Drop for CompletionSink<T> {
    fn drop(&mut self) {
        let notify;
        {
            let mut slot = self.shared.slot.lock();
            if slot.completed {
                return;
            }
            slot.producer_gone = true;
            notify = slot.notify.take();
        }
        // Wake the consumer so it can observe the vanished producer.
        if let Some(notify) = notify {
            notify();
        }
    }
}

impl<T> Completion<T> {
    /// The submit info this completion was created with.
    pub fn info(&self) -> SubmitInfo {
        self.shared.info
    }

    /// Take the outcome, if one is observable.
    ///
    /// # Returns
    ///
    /// - `Some(outcome)` once the sink has delivered
    /// - `Some` with [`Error::ThreadExited`] if the producing side vanished
    ///   without delivering
    /// - `None` while the item is still pending
    pub fn try_take(&self) -> Option<Outcome<T>> {
        let mut slot = self.shared.slot.lock();
        if let Some(outcome) = slot.outcome.take() {
            return Some(outcome);
        }
        if slot.producer_gone {
            return Some(Outcome {
                info: self.shared.info,
                result: Err(Error::ThreadExited),
            });
        }
        None
    }

    /// Check whether an outcome is observable without taking it.
    pub fn is_complete(&self) -> bool {
        let slot = self.shared.slot.lock();
        slot.completed || slot.producer_gone
    }

    /// Register a one-shot wake callback.
    ///
    /// The callback runs when the outcome becomes observable, outside all
    /// stream locks. If the outcome is already observable it runs
    /// immediately on the calling thread.
    pub fn set_notify(&self, notify: Notifier) {
        {
            let mut slot = self.shared.slot.lock();
            if !slot.completed && !slot.producer_gone {
                slot.notify = Some(notify);
                return;
            }
        }
        notify();
    }
}

impl<T> Drop for Completion<T> {
    fn drop(&mut self) {
        self.shared.consumer_alive.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_then_take() {
        let (sink, done) = completion::<u32>(SubmitInfo(7));
        assert!(done.try_take().is_none());

        assert!(sink.complete(Ok(42)));

        let outcome = done.try_take().expect("outcome pending");
        assert_eq!(outcome.info, SubmitInfo(7));
        assert_eq!(outcome.result, Ok(42));

        // The outcome is taken exactly once.
        assert!(done.try_take().is_none());
    }

    #[test]
    fn test_sink_dropped_reports_thread_exited() {
        let (sink, done) = completion::<()>(SubmitInfo(1));
        drop(sink);

        let outcome = done.try_take().expect("producer gone");
        assert_eq!(outcome.result, Err(Error::ThreadExited));
    }

    #[test]
    fn test_abandonment_is_visible_to_the_sink() {
        let (sink, done) = completion::<()>(SubmitInfo(2));
        assert!(!sink.is_abandoned());

        drop(done);
        assert!(sink.is_abandoned());
        assert!(!sink.complete(Ok(())));
    }

    #[test]
    fn test_notify_fires_on_complete() {
        use core::sync::atomic::{AtomicBool, Ordering};

        static FIRED: AtomicBool = AtomicBool::new(false);

        let (sink, done) = completion::<()>(SubmitInfo(3));
        done.set_notify(Box::new(|| FIRED.store(true, Ordering::SeqCst)));
        assert!(!FIRED.load(Ordering::SeqCst));

        sink.complete(Ok(()));
        assert!(FIRED.load(Ordering::SeqCst));
    }

    #[test]
    fn test_notify_fires_immediately_when_ready() {
        use core::sync::atomic::{AtomicBool, Ordering};

        static FIRED: AtomicBool = AtomicBool::new(false);

        let (sink, done) = completion::<()>(SubmitInfo(4));
        sink.complete(Ok(()));

        done.set_notify(Box::new(|| FIRED.store(true, Ordering::SeqCst)));
        assert!(FIRED.load(Ordering::SeqCst));
    }
}
