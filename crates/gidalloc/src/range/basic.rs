use alloc::collections::BTreeMap;
use core::ops::RangeInclusive;

use crate::{Error, Gid, Result};

/// A single-owner gid table over a fixed numeric id space.
///
/// The table has two sets of bounds:
/// - the hard bounds `[lower, upper]`, fixed at construction, outside of
///   which no id can ever be recorded, and
/// - the active window `[min, max]`, which only limits where
///   [`Self::allocate_next`] searches.
///
/// Moving the window never touches what is already allocated: an id outside
/// the new window stays allocated until it is released.
///
/// Allocated ids are kept as maximal runs of consecutive ids, keyed by their
/// first id. Because runs are always coalesced, the id right after a run is
/// free, so finding the smallest free id costs one ordered lookup regardless
/// of how many ids are taken.
///
/// ## Features
/// - ❌ Not thread-safe
/// - ✅ `O(log runs)` allocation, explicit allocation and release
///
/// ## See Also
/// - [`LockRangeAllocator`]
///
/// [`LockRangeAllocator`]: crate::LockRangeAllocator
#[derive(Clone, Debug)]
pub struct BasicRangeAllocator {
    // first id of each run -> last id of that run (inclusive)
    runs: BTreeMap<Gid, Gid>,
    allocated: u64,
    lower: Gid,
    upper: Gid,
    min: Gid,
    max: Gid,
}

impl BasicRangeAllocator {
    /// Creates an empty table whose hard bounds and initial window are both
    /// `[min, max]`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidRange`] if `min > max`.
    ///
    /// # Example
    /// ```
    /// use gidalloc::BasicRangeAllocator;
    ///
    /// let mut table = BasicRangeAllocator::new(2000, 2002).unwrap();
    /// assert_eq!(table.allocate_next().unwrap(), 2000);
    /// assert_eq!(table.allocate_next().unwrap(), 2001);
    /// ```
    pub fn new(min: Gid, max: Gid) -> Result<Self> {
        if min > max {
            return Err(Error::InvalidRange {
                min,
                max,
                lower: Gid::MIN,
                upper: Gid::MAX,
            });
        }
        Ok(Self {
            runs: BTreeMap::new(),
            allocated: 0,
            lower: min,
            upper: max,
            min,
            max,
        })
    }

    /// Marks `gid` as allocated.
    ///
    /// # Errors
    /// - [`Error::OutOfBounds`] if `gid` is outside the hard bounds.
    /// - [`Error::Conflict`] if `gid` is already allocated.
    pub fn allocate(&mut self, gid: Gid) -> Result<()> {
        if !self.bounds().contains(&gid) {
            return Err(Error::OutOfBounds {
                gid,
                lower: self.lower,
                upper: self.upper,
            });
        }
        if self.contains(gid) {
            return Err(Error::Conflict(gid));
        }
        self.insert(gid);
        Ok(())
    }

    /// Allocates and returns the smallest free id in the active window.
    ///
    /// # Errors
    /// Returns [`Error::Exhausted`] if every id in the window is taken.
    pub fn allocate_next(&mut self) -> Result<Gid> {
        let exhausted = Error::Exhausted {
            min: self.min,
            max: self.max,
        };

        let candidate = match self.run_containing(self.min) {
            Some((_, end)) => match end.checked_add(1) {
                Some(next) => next,
                None => return Err(exhausted),
            },
            None => self.min,
        };
        if candidate > self.max {
            return Err(exhausted);
        }

        self.insert(candidate);
        Ok(candidate)
    }

    /// Clears the allocated mark on `gid`.
    ///
    /// Releasing an id that is not allocated, including one outside the hard
    /// bounds, is a no-op: the table cannot always tell whether it handed the
    /// id out in the first place.
    pub fn release(&mut self, gid: Gid) {
        let Some((start, end)) = self.run_containing(gid) else {
            return;
        };

        self.runs.remove(&start);
        if start < gid {
            self.runs.insert(start, gid - 1);
        }
        if gid < end {
            self.runs.insert(gid + 1, end);
        }
        self.allocated -= 1;
    }

    /// Replaces the active window with `[min, max]`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidRange`] unless `lower <= min <= max <= upper`.
    pub fn set_range(&mut self, min: Gid, max: Gid) -> Result<()> {
        if min < self.lower || max > self.upper || min > max {
            return Err(Error::InvalidRange {
                min,
                max,
                lower: self.lower,
                upper: self.upper,
            });
        }
        self.min = min;
        self.max = max;
        Ok(())
    }

    /// Returns `true` if `gid` is allocated.
    pub fn contains(&self, gid: Gid) -> bool {
        self.run_containing(gid).is_some()
    }

    /// Total number of allocated ids, in or out of the window.
    pub fn len(&self) -> u64 {
        self.allocated
    }

    /// Returns `true` if nothing is allocated.
    pub fn is_empty(&self) -> bool {
        self.allocated == 0
    }

    /// Number of ids in the active window still available to
    /// [`Self::allocate_next`].
    pub fn free(&self) -> u64 {
        let window = u64::from(self.max) - u64::from(self.min) + 1;
        let used: u64 = self
            .runs_overlapping(self.min, self.max)
            .map(|(start, end)| {
                u64::from(end.min(self.max)) - u64::from(start.max(self.min)) + 1
            })
            .sum();
        window - used
    }

    /// The active window.
    pub fn range(&self) -> RangeInclusive<Gid> {
        self.min..=self.max
    }

    /// The hard bounds fixed at construction.
    pub fn bounds(&self) -> RangeInclusive<Gid> {
        self.lower..=self.upper
    }

    /// Iterates over the allocated ids as runs of consecutive ids, in
    /// ascending order.
    pub fn runs(&self) -> impl Iterator<Item = RangeInclusive<Gid>> + '_ {
        self.runs.iter().map(|(&start, &end)| start..=end)
    }

    fn run_containing(&self, gid: Gid) -> Option<(Gid, Gid)> {
        self.runs
            .range(..=gid)
            .next_back()
            .filter(|&(_, &end)| gid <= end)
            .map(|(&start, &end)| (start, end))
    }

    fn runs_overlapping(&self, min: Gid, max: Gid) -> impl Iterator<Item = (Gid, Gid)> + '_ {
        let head = self.run_containing(min).filter(|&(start, _)| start < min);
        head.into_iter()
            .chain(self.runs.range(min..=max).map(|(&start, &end)| (start, end)))
    }

    // Caller guarantees `gid` is free and inside the hard bounds.
    fn insert(&mut self, gid: Gid) {
        let mut start = gid;
        let mut end = gid;

        if let Some(prev) = gid.checked_sub(1) {
            if let Some((prev_start, _)) = self.run_containing(prev) {
                start = prev_start;
            }
        }
        if let Some(next) = gid.checked_add(1) {
            if let Some(next_end) = self.runs.remove(&next) {
                end = next_end;
            }
        }

        self.runs.insert(start, end);
        self.allocated += 1;
    }
}
