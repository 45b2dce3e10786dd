//! Consumer callback dispatch with failure isolation

use std::panic::{catch_unwind, AssertUnwindSafe};

use log::warn;

use crate::core::SpectralEvent;

/// A consumer callback, invoked synchronously on the worker thread once
/// per detected event.
pub type EventCallback = Box<dyn FnMut(&SpectralEvent) + Send>;

/// Invokes registered callbacks in registration order, isolating the
/// pipeline from misbehaving consumers: a panicking callback is caught,
/// logged as a warning, and counted; the remaining callbacks still run.
pub struct CallbackDispatcher {
    callbacks: Vec<EventCallback>,
    failures: usize,
}

impl CallbackDispatcher {
    pub fn new(callbacks: Vec<EventCallback>) -> Self {
        Self {
            callbacks,
            failures: 0,
        }
    }

    pub fn dispatch(&mut self, event: &SpectralEvent) {
        for callback in &mut self.callbacks {
            let outcome = catch_unwind(AssertUnwindSafe(|| callback(event)));
            if outcome.is_err() {
                self.failures += 1;
                warn!(
                    "event callback panicked on {} event at {:.2} Hz, continuing",
                    event.band, event.frequency_hz
                );
            }
        }
    }

    pub fn failures(&self) -> usize {
        self.failures
    }

    /// Hand the callbacks back so they survive across pipeline runs.
    pub fn into_callbacks(self) -> Vec<EventCallback> {
        self.callbacks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Band;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn event() -> SpectralEvent {
        SpectralEvent {
            band: Band::Infrasound,
            frequency_hz: 12.0,
            magnitude_db: -20.0,
            source: "test".into(),
            timestamp: None,
        }
    }

    #[test]
    fn callbacks_run_in_registration_order() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let a = order.clone();
        let b = order.clone();
        let mut dispatcher = CallbackDispatcher::new(vec![
            Box::new(move |_| a.lock().unwrap().push(1)),
            Box::new(move |_| b.lock().unwrap().push(2)),
        ]);

        dispatcher.dispatch(&event());
        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
        assert_eq!(dispatcher.failures(), 0);
    }

    #[test]
    fn panicking_callback_does_not_stop_the_rest() {
        let reached = Arc::new(AtomicUsize::new(0));
        let counter = reached.clone();
        let mut dispatcher = CallbackDispatcher::new(vec![
            Box::new(|_| panic!("consumer bug")),
            Box::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        ]);

        dispatcher.dispatch(&event());
        dispatcher.dispatch(&event());

        assert_eq!(reached.load(Ordering::SeqCst), 2);
        assert_eq!(dispatcher.failures(), 2);
    }

    #[test]
    fn same_callback_may_be_registered_twice() {
        let hits = Arc::new(AtomicUsize::new(0));
        let a = hits.clone();
        let b = hits.clone();
        let mut dispatcher = CallbackDispatcher::new(vec![
            Box::new(move |_| {
                a.fetch_add(1, Ordering::SeqCst);
            }),
            Box::new(move |_| {
                b.fetch_add(1, Ordering::SeqCst);
            }),
        ]);

        dispatcher.dispatch(&event());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
