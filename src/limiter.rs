use deadpool::unmanaged::{Object, Pool};

/// A slot in the limiter; the number only shows up in logs
#[derive(Debug)]
pub(crate) struct Slot(usize);

/// Counting permit pool bounding how many ssh processes are alive at once.
///
/// Permits are handed out as [`Permit`] guards which go back into the pool
/// when dropped, so every exit path of a task gives its permit back.
pub struct Limiter {
    pool: Pool<Slot>,
    capacity: usize,
}

impl Limiter {
    /// Create a pool with `capacity` permits (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let slots: Vec<_> = (0..capacity).map(Slot).collect();
        Limiter {
            pool: Pool::from(slots),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Wait until a permit is free and take it.
    /// There is no timeout: this waits for as long as all permits are held.
    pub async fn acquire(&self) -> Permit {
        let slot = self.pool.get().await;
        debug!("Acquired slot {}", slot.0);
        Permit { slot }
    }
}

/// A held permit of a [`Limiter`]
pub struct Permit {
    slot: Object<Slot>,
}

impl Permit {
    pub fn slot(&self) -> usize {
        self.slot.0
    }

    /// Give the permit back to the pool
    pub fn release(self) {
        debug!("Released slot {}", self.slot());
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[test]
    fn test_capacity_at_least_one() {
        assert_eq!(Limiter::new(0).capacity(), 1);
        assert_eq!(Limiter::new(3).capacity(), 3);
    }

    #[tokio::test]
    async fn test_acquire_blocks_when_exhausted() {
        let limiter = Limiter::new(2);
        let first = limiter.acquire().await;
        let second = limiter.acquire().await;
        assert_ne!(first.slot(), second.slot());

        let third = timeout(Duration::from_millis(50), limiter.acquire()).await;
        assert!(third.is_err(), "third permit must not be handed out");

        first.release();
        let third = timeout(Duration::from_millis(500), limiter.acquire()).await;
        assert!(third.is_ok(), "released permit must be reusable");
        drop(second);
    }

    #[tokio::test]
    async fn test_drop_releases() {
        let limiter = Limiter::new(1);
        {
            let _permit = limiter.acquire().await;
        }
        let again = timeout(Duration::from_millis(500), limiter.acquire()).await;
        assert!(again.is_ok());
    }
}
