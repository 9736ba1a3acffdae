//! Active slot selection, kept outside the registry lock so the control
//! loop can read it every tick without contending with packet ingest.

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::info;

use super::MAX_SLOTS;
use crate::error::{BridgeError, Result};

/// Index of the slot routed to the driver.
#[derive(Debug)]
pub struct ActiveSlot(AtomicUsize);

impl ActiveSlot {
    /// # Errors
    ///
    /// Returns `InvalidSlot` if `index` is not below [`MAX_SLOTS`].
    pub fn new(index: usize) -> Result<Self> {
        check(index)?;
        Ok(Self(AtomicUsize::new(index)))
    }

    #[must_use]
    pub fn get(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }

    /// Routes `index` to the driver from the next control tick on.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSlot` if `index` is not below [`MAX_SLOTS`].
    pub fn set(&self, index: usize) -> Result<()> {
        check(index)?;
        let previous = self.0.swap(index, Ordering::AcqRel);
        if previous != index {
            info!("Active slot changed: {} -> {}", previous, index);
        }
        Ok(())
    }
}

impl Default for ActiveSlot {
    fn default() -> Self {
        Self(AtomicUsize::new(0))
    }
}

fn check(index: usize) -> Result<()> {
    if index >= MAX_SLOTS {
        return Err(BridgeError::InvalidSlot(index));
    }
    Ok(())
}
