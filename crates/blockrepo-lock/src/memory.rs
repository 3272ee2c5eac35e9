use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, OnceLock, Weak};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{LockError, LockResult};
use crate::traits::{next_owner_id, LockCoordinator, LockToken};

#[derive(Debug)]
struct Slot {
    id: u64,
    state: Mutex<SlotState>,
    released: Condvar,
}

#[derive(Debug, Default)]
struct SlotState {
    holder: Option<u64>,
    next_ticket: u64,
}

impl Slot {
    fn new() -> Self {
        Self {
            id: next_owner_id(),
            state: Mutex::new(SlotState::default()),
            released: Condvar::new(),
        }
    }
}

/// Named slots. Entries are weak so a slot dies with its last handle.
fn registry() -> &'static Mutex<HashMap<String, Weak<Slot>>> {
    static REGISTRY: OnceLock<Mutex<HashMap<String, Weak<Slot>>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// In-process lock built on a mutex and condition variable.
///
/// [`MemoryLock::new`] creates a private lock; [`MemoryLock::shared`] returns
/// a handle onto a process-wide slot keyed by name, so independent handles
/// with the same name exclude each other. A named slot lives as long as its
/// handles; once the last one drops, the name maps to a fresh slot. Each
/// handle carries its own timeout.
#[derive(Clone, Debug)]
pub struct MemoryLock {
    name: String,
    timeout: Option<Duration>,
    slot: Arc<Slot>,
}

impl MemoryLock {
    /// A lock not shared with any other handle.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timeout: None,
            slot: Arc::new(Slot::new()),
        }
    }

    /// A handle onto the process-wide lock called `name`.
    pub fn shared(name: impl Into<String>) -> Self {
        let name = name.into();
        let slot = {
            let mut map = registry().lock().expect("lock poisoned");
            match map.get(&name).and_then(Weak::upgrade) {
                Some(slot) => slot,
                None => {
                    map.retain(|_, slot| slot.strong_count() > 0);
                    let slot = Arc::new(Slot::new());
                    map.insert(name.clone(), Arc::downgrade(&slot));
                    slot
                }
            }
        };
        Self {
            name,
            timeout: None,
            slot,
        }
    }

    /// Give up waiting after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns `true` if some token currently holds the lock.
    pub fn is_held(&self) -> bool {
        self.slot.state.lock().expect("lock poisoned").holder.is_some()
    }
}

impl LockCoordinator for MemoryLock {
    fn lock(&self) -> LockResult<LockToken> {
        let started = Instant::now();
        let mut state = self.slot.state.lock().expect("lock poisoned");
        while state.holder.is_some() {
            match self.timeout {
                Some(timeout) => {
                    let waited = started.elapsed();
                    if waited >= timeout {
                        warn!(lock = %self.name, ?waited, "lock acquisition timed out");
                        return Err(LockError::Timeout {
                            name: self.name.clone(),
                            waited,
                        });
                    }
                    let (next, _) = self
                        .slot
                        .released
                        .wait_timeout(state, timeout - waited)
                        .expect("lock poisoned");
                    state = next;
                }
                None => {
                    state = self.slot.released.wait(state).expect("lock poisoned");
                }
            }
        }
        state.next_ticket += 1;
        let ticket = state.next_ticket;
        state.holder = Some(ticket);
        debug!(lock = %self.name, ticket, "lock acquired");
        Ok(LockToken::new(self.slot.id, ticket))
    }

    fn unlock(&self, token: LockToken) -> LockResult<()> {
        if token.owner != self.slot.id {
            return Err(LockError::State {
                name: self.name.clone(),
                reason: "token was issued by a different lock".into(),
            });
        }
        let mut state = self.slot.state.lock().expect("lock poisoned");
        if state.holder != Some(token.ticket) {
            return Err(LockError::State {
                name: self.name.clone(),
                reason: format!("ticket {} does not hold the lock", token.ticket),
            });
        }
        state.holder = None;
        drop(state);
        self.slot.released.notify_one();
        debug!(lock = %self.name, ticket = token.ticket, "lock released");
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
