//! Process-wide session registry and rendezvous primitive (spec.md §4.4).
//!
//! Concurrency redesign per spec.md §9: the original's set/clear event can
//! miss a notification if `record_leak` fires between a waiter reading
//! `session.step` and it starting to wait. A `tokio::sync::watch` channel
//! fixes this — it always retains the last-sent value, so `await_advance`
//! can check "has anything newer than `known_step` already arrived?"
//! without a race window, mirroring the shared-state-behind-`Arc<Mutex>`-
//! plus-notification-channel architecture the teacher's test server uses
//! (`DummyEditor` + `broadcast` channel).

use std::sync::Arc;
use std::time::{Duration, Instant};

use ahash::AHashMap;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::timeout;

use crate::session::{LeakSetup, Session, StaticSetup};
use crate::browser::Browser;
use fontleak_core::FontArtifact;

struct Entry {
    session: Mutex<Session>,
    step_tx: watch::Sender<usize>,
}

/// Outcome of a `record_leak` call: either an append (reconstruction grew
/// by one character) or an overwrite of an already-observed position.
#[derive(Debug, PartialEq, Eq)]
pub enum RecordOutcome {
    Appended,
    Overwritten,
    /// The idempotence rule (spec.md §4.5 step 3) suppressed a known-bad
    /// double-fire: the decoded character matched what's already there by
    /// way of matching the previous position, and differs from the target
    /// position's existing content.
    Suppressed,
}

#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<AHashMap<String, Arc<Entry>>>,
    static_setups: Mutex<AHashMap<String, StaticSetup>>,
    next_id: Mutex<u64>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the existing session for `id`, or allocates a fresh decimal
    /// id (`"1"`, `"2"`, …) and installs `build` into it.
    pub fn create_or_resume(
        &self,
        id: Option<&str>,
        browser: Browser,
        setup: LeakSetup,
        font: FontArtifact,
    ) -> String {
        if let Some(id) = id {
            if self.sessions.lock().contains_key(id) {
                return id.to_string();
            }
        }
        let new_id = id.map(|s| s.to_string()).unwrap_or_else(|| {
            let mut next = self.next_id.lock();
            *next += 1;
            next.to_string()
        });
        let session = Session::new(new_id.clone(), setup, browser, font);
        let (step_tx, _) = watch::channel(session.step);
        let entry = Arc::new(Entry {
            session: Mutex::new(session),
            step_tx,
        });
        self.sessions.lock().insert(new_id.clone(), entry);
        log::debug!("session {new_id} created");
        new_id
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.lock().contains_key(id)
    }

    /// Runs `f` with exclusive access to the session named `id`, if it
    /// exists.
    pub fn with_session<R>(&self, id: &str, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        let entry = self.sessions.lock().get(id).cloned()?;
        let mut guard = entry.session.lock();
        Some(f(&mut guard))
    }

    pub fn current_step(&self, id: &str) -> Option<usize> {
        self.with_session(id, |s| s.step)
    }

    /// Blocks until `session.step > known_step` or `timeout` elapses.
    /// Returns `true` if it woke due to an advance, `false` on timeout.
    pub async fn await_advance(&self, id: &str, known_step: usize, wait: Duration) -> bool {
        let entry = match self.sessions.lock().get(id).cloned() {
            Some(e) => e,
            None => return false,
        };
        entry.session.lock().last_touched = Instant::now();
        let mut rx = entry.step_tx.subscribe();
        if *rx.borrow() > known_step {
            return true;
        }
        let wait_result = timeout(wait, async {
            loop {
                if rx.changed().await.is_err() {
                    return false;
                }
                if *rx.borrow() > known_step {
                    return true;
                }
            }
        })
        .await;
        matches!(wait_result, Ok(true))
    }

    /// Appends or overwrites a single reconstruction character at `idx`'s
    /// alphabet position, advances `step`, and notifies any waiter. The
    /// mutation and the `watch` send happen under one held lock, so a
    /// concurrent `record_leak` can't observe `session.step` updated without
    /// the corresponding notify having already gone out (spec.md §4.4's
    /// invariant).
    pub fn record_leak(
        &self,
        id: &str,
        ch: char,
        at_step: Option<usize>,
    ) -> Option<RecordOutcome> {
        let entry = self.sessions.lock().get(id).cloned()?;
        let mut session = entry.session.lock();
        session.last_touched = Instant::now();
        let len = session.reconstruction.chars().count();
        let is_append = at_step.map_or(true, |step| step >= len);
        let outcome = if is_append {
            session.reconstruction.push(ch);
            session.step += 1;
            RecordOutcome::Appended
        } else {
            let step = at_step.unwrap();
            let prev = step
                .checked_sub(1)
                .and_then(|p| session.reconstruction.chars().nth(p));
            let current = session.reconstruction.chars().nth(step);
            if let (Some(prev), Some(current)) = (prev, current) {
                if ch == prev && ch != current {
                    RecordOutcome::Suppressed
                } else {
                    set_char_at(&mut session.reconstruction, step, ch);
                    RecordOutcome::Overwritten
                }
            } else {
                set_char_at(&mut session.reconstruction, step, ch);
                RecordOutcome::Overwritten
            }
        };
        if !matches!(outcome, RecordOutcome::Suppressed) {
            let _ = entry.step_tx.send(session.step);
        }
        drop(session);
        Some(outcome)
    }

    pub fn put_static_setup(&self, setup: StaticSetup) {
        self.static_setups.lock().insert(setup.sid.clone(), setup);
    }

    pub fn static_setup(&self, sid: &str) -> Option<StaticSetup> {
        self.static_setups.lock().get(sid).cloned()
    }

    /// Evicts sessions whose `last_touched` is older than `max_idle`. The
    /// original never garbage collects except at process exit (spec.md
    /// §4.5); this sweeper is an ambient-concern addition documented in
    /// DESIGN.md, guarding long-running processes against unbounded session
    /// growth.
    pub fn sweep_idle(&self, max_idle: Duration) {
        let now = Instant::now();
        let mut sessions = self.sessions.lock();
        sessions.retain(|id, entry| {
            let idle = now.duration_since(entry.session.lock().last_touched);
            let keep = idle < max_idle;
            if !keep {
                log::debug!("session {id} evicted after {idle:?} idle");
            }
            keep
        });
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }
}

fn set_char_at(s: &mut String, idx: usize, ch: char) {
    let mut chars: Vec<char> = s.chars().collect();
    if idx < chars.len() {
        chars[idx] = ch;
        *s = chars.into_iter().collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fontleak_core::{AlphabetModel, FontBuilder, FontBuilderOptions};

    fn dummy_font() -> FontArtifact {
        FontBuilder::generate(&FontBuilderOptions {
            alphabet: AlphabetModel::normalise("ab").unwrap(),
            idx_max: 2,
            strip: false,
            prefix: Vec::new(),
            prefix_idx: false,
            offset: 0,
        })
        .unwrap()
    }

    fn setup() -> LeakSetup {
        LeakSetup {
            selector: "script:first-of-type".into(),
            parent: "body".into(),
            alphabet: "ab".into(),
            attr: "textContent".into(),
            strip: false,
            timeout: Duration::from_secs(10),
        }
    }

    #[test]
    fn create_or_resume_reuses_known_ids() {
        let store = SessionStore::new();
        let id = store.create_or_resume(None, Browser::Chrome, setup(), dummy_font());
        let again = store.create_or_resume(Some(&id), Browser::Chrome, setup(), dummy_font());
        assert_eq!(id, again);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn await_advance_wakes_on_record_leak() {
        let store = Arc::new(SessionStore::new());
        let id = store.create_or_resume(None, Browser::Chrome, setup(), dummy_font());

        let waiter_store = store.clone();
        let waiter_id = id.clone();
        let waiter = tokio::spawn(async move {
            waiter_store
                .await_advance(&waiter_id, 0, Duration::from_secs(5))
                .await
        });

        tokio::task::yield_now().await;
        store.record_leak(&id, 'a', None);

        let woke = waiter.await.unwrap();
        assert!(woke);
    }

    #[tokio::test]
    async fn await_advance_times_out_with_no_activity() {
        let store = SessionStore::new();
        let id = store.create_or_resume(None, Browser::Chrome, setup(), dummy_font());
        let woke = store
            .await_advance(&id, 0, Duration::from_millis(20))
            .await;
        assert!(!woke);
    }

    #[test]
    fn record_leak_overwrite_is_idempotent_for_known_bad_double_fires() {
        let store = SessionStore::new();
        let id = store.create_or_resume(None, Browser::Chrome, setup(), dummy_font());
        store.record_leak(&id, 'a', None); // step 0 -> "a"
        store.record_leak(&id, 'b', None); // step 1 -> "ab"
        // A double-fire at step 1 claiming 'a' again (== reconstruction[0],
        // != reconstruction[1]) must be suppressed.
        let outcome = store.record_leak(&id, 'a', Some(1));
        assert_eq!(outcome, Some(RecordOutcome::Suppressed));
        store.with_session(&id, |s| assert_eq!(s.reconstruction, "ab"));
    }

    #[test]
    fn record_leak_step_zero_always_overwrites() {
        let store = SessionStore::new();
        let id = store.create_or_resume(None, Browser::Chrome, setup(), dummy_font());
        store.record_leak(&id, 'a', None);
        let outcome = store.record_leak(&id, 'b', Some(0));
        assert_eq!(outcome, Some(RecordOutcome::Overwritten));
        store.with_session(&id, |s| assert_eq!(s.reconstruction, "b"));
    }

    #[test]
    fn sweep_idle_evicts_sessions_past_the_threshold() {
        let store = SessionStore::new();
        let id = store.create_or_resume(None, Browser::Chrome, setup(), dummy_font());
        store.with_session(&id, |s| {
            s.last_touched -= Duration::from_secs(3600);
        });
        store.sweep_idle(Duration::from_secs(60));
        assert!(!store.contains(&id));
    }

    #[test]
    fn sweep_idle_keeps_recently_touched_sessions() {
        let store = SessionStore::new();
        let id = store.create_or_resume(None, Browser::Chrome, setup(), dummy_font());
        store.sweep_idle(Duration::from_secs(60));
        assert!(store.contains(&id));
    }
}
