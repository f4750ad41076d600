use alloc::sync::Arc;
use core::ops::RangeInclusive;

use tracing::instrument;

use crate::{
    BasicRangeAllocator, Gid, Result,
    mutex::{Mutex, lock},
};

/// A lock-based gid table suitable for multi-threaded environments.
///
/// This wraps a [`BasicRangeAllocator`] in an [`Arc<Mutex<_>>`]. Clones are
/// handles to the same table, so every caller serving a storage class sees
/// and mutates the same allocation state, and no two concurrent
/// [`Self::allocate_next`] calls can return the same id.
///
/// ## Features
/// - ✅ Thread-safe
/// - ✅ Cheap to clone and hand out from a registry
///
/// ## See Also
/// - [`BasicRangeAllocator`]
#[derive(Clone, Debug)]
pub struct LockRangeAllocator {
    pub(crate) state: Arc<Mutex<BasicRangeAllocator>>,
}

impl LockRangeAllocator {
    /// Creates an empty shared table whose hard bounds and initial window are
    /// both `[min, max]`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidRange`] if `min > max`.
    ///
    /// # Example
    /// ```
    /// use gidalloc::LockRangeAllocator;
    ///
    /// let table = LockRangeAllocator::new(2000, 2002).unwrap();
    /// let handle = table.clone();
    ///
    /// assert_eq!(table.allocate_next().unwrap(), 2000);
    /// assert_eq!(handle.allocate_next().unwrap(), 2001);
    /// assert!(table.ptr_eq(&handle));
    /// ```
    pub fn new(min: Gid, max: Gid) -> Result<Self> {
        BasicRangeAllocator::new(min, max).map(Self::from)
    }

    /// Marks `gid` as allocated. See [`BasicRangeAllocator::allocate`].
    ///
    /// # Errors
    /// - [`crate::Error::OutOfBounds`] or [`crate::Error::Conflict`] from the
    ///   table.
    /// - [`crate::Error::LockPoisoned`] if the lock is poisoned (std mutex
    ///   only).
    pub fn allocate(&self, gid: Gid) -> Result<()> {
        lock(&self.state)?.allocate(gid)
    }

    /// Allocates and returns the smallest free id in the active window. See
    /// [`BasicRangeAllocator::allocate_next`].
    ///
    /// # Errors
    /// - [`crate::Error::Exhausted`] if the window is full.
    /// - [`crate::Error::LockPoisoned`] if the lock is poisoned (std mutex
    ///   only).
    #[instrument(level = "trace", skip(self))]
    pub fn allocate_next(&self) -> Result<Gid> {
        lock(&self.state)?.allocate_next()
    }

    /// Clears the allocated mark on `gid`; a no-op when it is not allocated.
    ///
    /// # Errors
    /// Returns [`crate::Error::LockPoisoned`] if the lock is poisoned (std
    /// mutex only).
    pub fn release(&self, gid: Gid) -> Result<()> {
        lock(&self.state)?.release(gid);
        Ok(())
    }

    /// Replaces the active window. See [`BasicRangeAllocator::set_range`].
    ///
    /// # Errors
    /// - [`crate::Error::InvalidRange`] if the window is not within the hard
    ///   bounds.
    /// - [`crate::Error::LockPoisoned`] if the lock is poisoned (std mutex
    ///   only).
    pub fn set_range(&self, min: Gid, max: Gid) -> Result<()> {
        lock(&self.state)?.set_range(min, max)
    }

    /// Returns `true` if `gid` is allocated.
    ///
    /// # Errors
    /// Returns [`crate::Error::LockPoisoned`] if the lock is poisoned (std
    /// mutex only).
    pub fn contains(&self, gid: Gid) -> Result<bool> {
        Ok(lock(&self.state)?.contains(gid))
    }

    /// Total number of allocated ids.
    ///
    /// # Errors
    /// Returns [`crate::Error::LockPoisoned`] if the lock is poisoned (std
    /// mutex only).
    pub fn len(&self) -> Result<u64> {
        Ok(lock(&self.state)?.len())
    }

    /// Number of free ids left in the active window.
    ///
    /// # Errors
    /// Returns [`crate::Error::LockPoisoned`] if the lock is poisoned (std
    /// mutex only).
    pub fn free(&self) -> Result<u64> {
        Ok(lock(&self.state)?.free())
    }

    /// The active window.
    ///
    /// # Errors
    /// Returns [`crate::Error::LockPoisoned`] if the lock is poisoned (std
    /// mutex only).
    pub fn range(&self) -> Result<RangeInclusive<Gid>> {
        Ok(lock(&self.state)?.range())
    }

    /// Returns `true` if both handles point at the same table.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl From<BasicRangeAllocator> for LockRangeAllocator {
    fn from(table: BasicRangeAllocator) -> Self {
        Self {
            state: Arc::new(Mutex::new(table)),
        }
    }
}
