//! Bounded admission for concurrent probes
//!
//! The gate is a counting semaphore shared by every probe task of a batch. A
//! task holds an [`AdmissionPermit`] for as long as it is dialing; the permit
//! is released when dropped, on success, timeout or error alike.

use crate::error::{HarvestError, Result};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Limits the number of probes attempting a connection at once
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl AdmissionGate {
    /// Create a gate admitting at most `capacity` concurrent holders
    ///
    /// A capacity of zero is raised to one so that a batch can always make
    /// progress; anything above [`Semaphore::MAX_PERMITS`] is lowered to it.
    ///
    /// # Example
    ///
    /// ```
    /// use ip_harvest::AdmissionGate;
    ///
    /// let gate = AdmissionGate::new(100);
    /// assert_eq!(gate.capacity(), 100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Wait for an admission slot
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::GateClosed`] if the gate was closed while
    /// waiting.
    pub async fn acquire(&self) -> Result<AdmissionPermit> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| HarvestError::GateClosed)?;
        Ok(AdmissionPermit { _permit: permit })
    }

    /// Take a slot without waiting, if one is free
    pub fn try_acquire(&self) -> Option<AdmissionPermit> {
        self.semaphore
            .clone()
            .try_acquire_owned()
            .ok()
            .map(|permit| AdmissionPermit { _permit: permit })
    }

    /// Refuse all further admissions; queued waiters fail with
    /// [`HarvestError::GateClosed`]
    pub fn close(&self) {
        self.semaphore.close();
    }

    /// Maximum number of concurrent holders
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots currently free
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Number of slots currently held
    pub fn in_flight(&self) -> usize {
        self.capacity.saturating_sub(self.available())
    }
}

/// RAII admission slot, released on drop
#[derive(Debug)]
pub struct AdmissionPermit {
    _permit: tokio::sync::OwnedSemaphorePermit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_capacity_exhausted() {
        let gate = AdmissionGate::new(2);

        let _first = gate.acquire().await.unwrap();
        let _second = gate.acquire().await.unwrap();

        assert!(gate.try_acquire().is_none());
        assert_eq!(gate.in_flight(), 2);
    }

    #[tokio::test]
    async fn test_release_on_drop() {
        let gate = AdmissionGate::new(1);

        {
            let _permit = gate.acquire().await.unwrap();
            assert_eq!(gate.available(), 0);
        }

        assert_eq!(gate.available(), 1);
        assert_eq!(gate.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_zero_capacity_is_raised() {
        let gate = AdmissionGate::new(0);
        assert_eq!(gate.capacity(), 1);
        assert!(gate.try_acquire().is_some());
    }

    #[test]
    fn test_oversized_capacity_is_lowered() {
        let gate = AdmissionGate::new(usize::MAX);
        assert_eq!(gate.capacity(), Semaphore::MAX_PERMITS);
        assert_eq!(gate.available(), Semaphore::MAX_PERMITS);
    }

    #[tokio::test]
    async fn test_closed_gate_rejects() {
        let gate = AdmissionGate::new(1);
        gate.close();
        assert!(matches!(gate.acquire().await, Err(HarvestError::GateClosed)));
    }

    #[tokio::test]
    async fn test_clones_share_slots() {
        let gate = AdmissionGate::new(3);
        let other = gate.clone();

        let a = gate.acquire().await.unwrap();
        let _b = other.acquire().await.unwrap();
        assert_eq!(gate.available(), 1);

        drop(a);
        assert_eq!(other.available(), 2);
    }
}
