//! Lock-free floating point cell
//!
//! Values published by a cyclic thread and read by other threads (pose,
//! velocities, setpoints) are stored in an `AtomicF64` so that readers never
//! hold a lock the cyclic thread might wait on.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::atomic::{AtomicU64, Ordering};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An `f64` which can be shared between threads.
///
/// Each load and store is individually atomic. There is no ordering between
/// different cells, so a reader of several cells may see values from
/// different cycles.
#[derive(Debug, Default)]
pub struct AtomicF64 {
    bits: AtomicU64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl AtomicF64 {
    pub fn new(value: f64) -> Self {
        Self {
            bits: AtomicU64::new(value.to_bits()),
        }
    }

    pub fn load(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }

    pub fn store(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Relaxed)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_atomic_f64() {
        let cell = Arc::new(AtomicF64::new(0.25));
        assert_eq!(cell.load(), 0.25);

        let writer = {
            let cell = cell.clone();
            thread::spawn(move || cell.store(-1.5))
        };
        writer.join().unwrap();

        assert_eq!(cell.load(), -1.5);
        assert_eq!(AtomicF64::default().load(), 0.0);
    }
}
