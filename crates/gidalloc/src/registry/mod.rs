use std::collections::HashMap;
use std::collections::hash_map::Entry;

use tracing::{debug, info, instrument};

use crate::{
    ABSOLUTE_GID_MAX, ABSOLUTE_GID_MIN, BasicRangeAllocator, ClassParameters, LockRangeAllocator,
    Result, VolumeLister,
    mutex::{Mutex, lock},
    recovery::recover,
};


/// Owns exactly one [`LockRangeAllocator`] per storage class.
///
/// Tables are created lazily. The first request for a class builds a fresh
/// table over the full gid space, seeds it from the existing volumes and
/// publishes it; later requests reuse the published table and only move its
/// window to the bounds they were given.
///
/// The map lock is held for lookups and inserts only, never while volumes
/// are being listed, so a slow cold start of one class does not stall any
/// other class. Two callers racing on the same cold class may both build a
/// table; the first to publish wins and the other discards its copy.
pub struct ClassRegistry<L> {
    lister: L,
    tables: Mutex<HashMap<String, LockRangeAllocator>>,
}

impl<L> ClassRegistry<L>
where
    L: VolumeLister,
{
    pub fn new(lister: L) -> Self {
        Self {
            lister,
            tables: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the table for `class` with its window set to
    /// `[params.gid_min, params.gid_max]`, building and recovering it first
    /// if this process has not seen `class` yet.
    ///
    /// # Errors
    /// - [`crate::Error::VolumeList`] if a new table had to be built and the
    ///   volumes could not be listed. Nothing is published in that case, so
    ///   the next call retries the scan.
    /// - [`crate::Error::InvalidRange`] if the window falls outside the gid
    ///   space.
    /// - [`crate::Error::LockPoisoned`] if a lock is poisoned (std mutex
    ///   only).
    #[instrument(level = "debug", skip(self))]
    pub fn get_or_create(&self, class: &str, params: &ClassParameters) -> Result<LockRangeAllocator> {
        if let Some(table) = self.get(class)? {
            table.set_range(params.gid_min, params.gid_max)?;
            return Ok(table);
        }

        // built outside the map lock: recovery lists every volume
        let mut fresh = BasicRangeAllocator::new(ABSOLUTE_GID_MIN, ABSOLUTE_GID_MAX)?;
        let report = recover(&self.lister, class, &mut fresh)?;
        fresh.set_range(params.gid_min, params.gid_max)?;

        let (table, published) = match lock(&self.tables)?.entry(class.to_owned()) {
            Entry::Occupied(entry) => (entry.get().clone(), false),
            Entry::Vacant(entry) => (entry.insert(LockRangeAllocator::from(fresh)).clone(), true),
        };

        if published {
            info!(
                class,
                recorded = report.recorded,
                min = params.gid_min,
                max = params.gid_max,
                "published gid table"
            );
        } else {
            debug!(class, "gid table published concurrently, discarding ours");
            table.set_range(params.gid_min, params.gid_max)?;
        }
        Ok(table)
    }

    /// Returns the published table for `class`, if any.
    ///
    /// # Errors
    /// Returns [`crate::Error::LockPoisoned`] if the map lock is poisoned
    /// (std mutex only).
    pub fn get(&self, class: &str) -> Result<Option<LockRangeAllocator>> {
        Ok(lock(&self.tables)?.get(class).cloned())
    }

    /// Number of classes with a published table.
    ///
    /// # Errors
    /// Returns [`crate::Error::LockPoisoned`] if the map lock is poisoned
    /// (std mutex only).
    pub fn len(&self) -> Result<usize> {
        Ok(lock(&self.tables)?.len())
    }

    pub fn lister(&self) -> &L {
        &self.lister
    }
}
