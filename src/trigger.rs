//! Trigger tokens: one per normalization attempt, dispatched at most once.

use crate::models::{RequestState, TriggerToken};
use crate::{Error, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Upper bound on tokens awaiting dispatch; the oldest are forgotten first.
pub const DEFAULT_PENDING_CAPACITY: usize = 4096;

/// Monotonic per-instance token source.
#[derive(Debug, Default)]
pub struct TriggerSequence {
    last: AtomicU64,
}

impl TriggerSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next token. Never returns the same value twice for this instance.
    pub fn next(&self) -> TriggerToken {
        TriggerToken::new(self.last.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

/// Tokens issued by successful normalizations that have not been dispatched yet,
/// with the state each normalization ended in.
#[derive(Debug)]
pub struct DispatchLedger {
    inner: Mutex<PendingTokens>,
    capacity: usize,
}

#[derive(Debug, Default)]
struct PendingTokens {
    states: HashMap<TriggerToken, RequestState>,
    order: VecDeque<TriggerToken>,
}

impl Default for DispatchLedger {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_PENDING_CAPACITY)
    }
}

impl DispatchLedger {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(PendingTokens::default()),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PendingTokens> {
        // The guarded maps stay consistent even if a holder panicked.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn register(&self, token: TriggerToken, state: RequestState) {
        let mut pending = self.lock();
        if pending.states.insert(token, state).is_some() {
            return;
        }
        pending.order.push_back(token);

        while pending.order.len() > self.capacity {
            if let Some(evicted) = pending.order.pop_front() {
                if pending.states.remove(&evicted).is_some() {
                    tracing::warn!("Evicting undispatched trigger token {}", evicted);
                }
            }
        }
    }

    /// Consume `token`; fails if it was never registered or was already claimed.
    pub fn claim(&self, token: TriggerToken) -> Result<RequestState> {
        let mut pending = self.lock();
        let state = pending
            .states
            .remove(&token)
            .ok_or(Error::DuplicateDispatch(token.get()))?;
        pending.order.retain(|t| *t != token);
        Ok(state)
    }

    pub fn pending(&self) -> usize {
        self.lock().states.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_sequence_strictly_increases() {
        let seq = TriggerSequence::new();
        let a = seq.next();
        let b = seq.next();
        let c = seq.next();
        assert_eq!(a.get(), 1);
        assert!(a < b && b < c);
    }

    #[test]
    fn test_sequence_unique_across_threads() {
        let seq = Arc::new(TriggerSequence::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let seq = Arc::clone(&seq);
                std::thread::spawn(move || (0..500).map(|_| seq.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut all = HashSet::new();
        for handle in handles {
            for token in handle.join().unwrap() {
                assert!(all.insert(token), "token {} issued twice", token);
            }
        }
        assert_eq!(all.len(), 4000);
    }

    #[test]
    fn test_claim_once() {
        let ledger = DispatchLedger::default();
        let token = TriggerToken::new(7);
        ledger.register(token, RequestState::Translating);

        assert_eq!(ledger.claim(token).unwrap(), RequestState::Translating);
        assert!(matches!(
            ledger.claim(token),
            Err(Error::DuplicateDispatch(7))
        ));
    }

    #[test]
    fn test_unknown_token_is_rejected() {
        let ledger = DispatchLedger::default();
        assert!(ledger.claim(TriggerToken::new(99)).is_err());
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let ledger = DispatchLedger::with_capacity(2);
        for i in 1..=3 {
            ledger.register(TriggerToken::new(i), RequestState::Skipped);
        }

        assert_eq!(ledger.pending(), 2);
        assert!(ledger.claim(TriggerToken::new(1)).is_err());
        assert!(ledger.claim(TriggerToken::new(3)).is_ok());
    }
}
