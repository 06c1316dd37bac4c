//! In-memory live check-in store.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Lock poisoning only follows a panicking test

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use youthgroup_core::checkin::{CheckInState, format_check_in_time};
use youthgroup_core::stores::{CheckInStore, StoreFuture};
use youthgroup_core::{Result, YouthGroupError};

/// [`CheckInStore`] holding one [`CheckInState`] per event.
#[derive(Clone, Debug, Default)]
pub struct InMemoryCheckInStore {
    events: Arc<RwLock<HashMap<i64, CheckInState>>>,
    failing: Arc<AtomicBool>,
    calls: Arc<AtomicUsize>,
}

impl InMemoryCheckInStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with an ephemeral store error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of gateway calls made so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn guard(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(YouthGroupError::ephemeral("simulated ephemeral store outage"));
        }
        Ok(())
    }

    fn with_events<T, F>(&self, f: F) -> StoreFuture<'_, T>
    where
        T: Send + 'static,
        F: FnOnce(&mut HashMap<i64, CheckInState>) -> T,
    {
        let result = self
            .guard()
            .map(|()| f(&mut *self.events.write().unwrap()));
        Box::pin(std::future::ready(result))
    }
}

impl CheckInStore for InMemoryCheckInStore {
    fn check_in(&self, event_id: i64, person_id: i64, at: DateTime<Utc>) -> StoreFuture<'_, ()> {
        self.with_events(move |events| {
            let state = events.entry(event_id).or_default();
            state.person_ids.insert(person_id);
            state.times.insert(person_id, format_check_in_time(at));
        })
    }

    fn check_out(&self, event_id: i64, person_id: i64) -> StoreFuture<'_, bool> {
        self.with_events(move |events| {
            events.get_mut(&event_id).is_some_and(|state| {
                state.times.remove(&person_id);
                state.person_ids.remove(&person_id)
            })
        })
    }

    fn list_checked_in(&self, event_id: i64) -> StoreFuture<'_, CheckInState> {
        self.with_events(move |events| events.get(&event_id).cloned().unwrap_or_default())
    }

    fn purge(&self, event_id: i64) -> StoreFuture<'_, ()> {
        self.with_events(move |events| {
            events.remove(&event_id);
        })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(std::future::ready(self.guard()))
    }
}
