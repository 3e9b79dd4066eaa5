//! Confirmation idempotency guard — prevents double-confirmation.
//!
//! Payment verification can be invoked by a polling path and by a callback
//! path for the same transaction. The order's persisted status is the
//! authoritative duplicate check; this guard closes the remaining window
//! where two deliveries race before the status update lands.
//!
//! The guard maintains an LRU-style bounded cache so memory usage stays
//! predictable in long-running processes.

use std::collections::{HashSet, VecDeque};

use opengate_types::{OpengateError, Result, TransactionId};

/// Tracks which transactions have already been applied to a confirmation.
///
/// Internally stores a bounded set of transaction IDs with LRU eviction.
/// When the set reaches `max_size`, the oldest entry is evicted to make
/// room.
pub struct ConfirmationGuard {
    /// Transaction IDs already applied.
    applied: HashSet<TransactionId>,
    /// Insertion order for LRU eviction (front = oldest).
    order: VecDeque<TransactionId>,
    /// Maximum number of entries before eviction kicks in.
    max_size: usize,
}

impl ConfirmationGuard {
    /// Create a new guard with the given maximum cache size.
    ///
    /// # Panics
    /// Panics if `max_size` is zero.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        assert!(max_size > 0, "ConfirmationGuard max_size must be > 0");
        Self {
            applied: HashSet::with_capacity(max_size),
            order: VecDeque::with_capacity(max_size),
            max_size,
        }
    }

    /// Mark a transaction as applied to a confirmation.
    ///
    /// # Errors
    /// Returns `DuplicateConfirmation` if `transaction_id` was already
    /// marked.
    pub fn mark_confirmed(&mut self, transaction_id: TransactionId) -> Result<()> {
        if self.applied.contains(&transaction_id) {
            return Err(OpengateError::DuplicateConfirmation(transaction_id));
        }

        // Evict oldest if at capacity.
        if self.applied.len() >= self.max_size {
            if let Some(oldest) = self.order.pop_front() {
                self.applied.remove(&oldest);
            }
        }

        self.applied.insert(transaction_id.clone());
        self.order.push_back(transaction_id);
        Ok(())
    }

    /// Check whether a transaction was already applied.
    #[must_use]
    pub fn is_confirmed(&self, transaction_id: &TransactionId) -> bool {
        self.applied.contains(transaction_id)
    }

    /// Number of transactions currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.applied.len()
    }

    /// Whether the guard is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }
}
