//! Error types for GID allocation.
//!
//! Errors raised while serving a live request (bad class parameters, an
//! exhausted window, an unreadable annotation on the volume being released)
//! are returned to the caller. Errors found while rebuilding a table from
//! existing volumes are logged by the recovery scan and never surface here,
//! with the single exception of the volume listing itself failing.

use crate::{Gid, GidParseError, ParameterError};

/// Boxed error produced by external collaborators (volume listing, class
/// lookup).
pub type BoxError = Box<dyn core::error::Error + Send + Sync + 'static>;

/// Result alias defaulting to the crate [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All errors `gidalloc` can produce.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A window or table bound was requested outside the hard bounds, or with
    /// `min > max`.
    #[error("invalid range [{min}, {max}] (allowed: [{lower}, {upper}])")]
    InvalidRange {
        min: Gid,
        max: Gid,
        lower: Gid,
        upper: Gid,
    },

    /// An explicit allocation targeted an id outside the hard bounds.
    #[error("gid {gid} is outside [{lower}, {upper}]")]
    OutOfBounds { gid: Gid, lower: Gid, upper: Gid },

    /// The id is already allocated.
    #[error("gid {0} is already allocated")]
    Conflict(Gid),

    /// No free id remains in the active window.
    #[error("no free gid left in range [{min}, {max}]")]
    Exhausted { min: Gid, max: Gid },

    /// The storage class parameters were rejected.
    #[error("invalid storage class parameters: {0}")]
    Parameter(#[from] ParameterError),

    /// The gid annotation on a volume could not be parsed.
    #[error("volume {volume}: {source}")]
    AnnotationParse {
        volume: String,
        #[source]
        source: GidParseError,
    },

    /// The storage class of a volume could not be resolved.
    #[error("failed to resolve storage class for volume {volume}: {source}")]
    ClassLookup {
        volume: String,
        #[source]
        source: BoxError,
    },

    /// Listing the existing volumes failed, so a table could not be
    /// recovered.
    #[error("failed to list existing volumes: {0}")]
    VolumeList(#[source] BoxError),

    /// The operation failed because a table lock was **poisoned**.
    ///
    /// This occurs when a thread panics while holding the lock. When the
    /// `parking-lot` feature is enabled, mutexes do **not** poison, so this
    /// variant is not available.
    #[cfg_attr(docsrs, doc(cfg(not(feature = "parking-lot"))))]
    #[cfg(not(feature = "parking-lot"))]
    #[error("lock poisoned")]
    LockPoisoned,
}

#[cfg(not(feature = "parking-lot"))]
use crate::mutex::{MutexGuard, PoisonError};
#[cfg(not(feature = "parking-lot"))]
impl<T> From<PoisonError<MutexGuard<'_, T>>> for Error {
    fn from(_: PoisonError<MutexGuard<'_, T>>) -> Self {
        Self::LockPoisoned
    }
}
