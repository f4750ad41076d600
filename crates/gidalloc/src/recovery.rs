//! Rebuilds a storage class's gid table from the volumes that already exist.
//!
//! Tables are not persisted. The gids already handed out are recorded only as
//! annotations on the volumes, so the first time a class is used in a process
//! its table is seeded by scanning every volume once.
//!
//! The scan is best effort. Volume metadata may be missing, corrupt or
//! contradictory (two volumes claiming the same gid); each such volume is
//! logged and skipped so that the class stays usable. Only a failure to list
//! the volumes at all is reported to the caller.

use tracing::{debug, error, instrument, warn};

use crate::{BasicRangeAllocator, Error, Result, Volume, VolumeLister};

/// What a recovery scan found.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RecoveryReport {
    /// Volumes of the scanned class.
    pub scanned: usize,
    /// Gids recorded in the table.
    pub recorded: usize,
    /// Volumes without a gid annotation.
    pub missing_annotation: usize,
    /// Volumes whose gid annotation could not be parsed.
    pub malformed: usize,
    /// Gids claimed by more than one volume.
    pub conflicts: usize,
    /// Gids outside the table's hard bounds.
    pub out_of_bounds: usize,
}

/// Lists all volumes through `lister` and seeds `table` with the gids of
/// those belonging to `class`.
///
/// # Errors
/// Returns [`Error::VolumeList`] if the volumes cannot be listed. Problems
/// with individual volumes are logged and counted in the report instead.
#[instrument(level = "debug", skip(lister, table))]
pub fn recover<L>(lister: &L, class: &str, table: &mut BasicRangeAllocator) -> Result<RecoveryReport>
where
    L: VolumeLister + ?Sized,
{
    let volumes = lister.list_volumes().map_err(|e| {
        error!(error = %e, "failed to list existing volumes");
        Error::VolumeList(e)
    })?;
    Ok(seed(class, &volumes, table))
}

/// Seeds `table` with the gids of the volumes in `volumes` that belong to
/// `class`.
pub fn seed(class: &str, volumes: &[Volume], table: &mut BasicRangeAllocator) -> RecoveryReport {
    let mut report = RecoveryReport::default();

    for volume in volumes.iter().filter(|volume| volume.belongs_to(class)) {
        report.scanned += 1;
        let name = volume.name.as_str();

        let gid = match volume.gid() {
            Ok(Some(gid)) => gid,
            Ok(None) => {
                warn!(volume = name, "no gid found in volume");
                report.missing_annotation += 1;
                continue;
            }
            Err(e) => {
                error!(error = %e, "skipping volume with unreadable gid");
                report.malformed += 1;
                continue;
            }
        };

        match table.allocate(gid) {
            Ok(()) => report.recorded += 1,
            Err(Error::Conflict(_)) => {
                warn!(volume = name, gid, "gid found in volume was already allocated");
                report.conflicts += 1;
            }
            Err(e) => {
                error!(volume = name, gid, error = %e, "failed to store gid found in volume");
                report.out_of_bounds += 1;
            }
        }
    }

    debug!(class, ?report, "recovered gid table");
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ABSOLUTE_GID_MAX, ABSOLUTE_GID_MIN, BoxError, GID_ANNOTATION_KEY};

    fn volume(name: &str, class: &str, gid: Option<&str>) -> Volume {
        let mut volume = Volume::new(name, class);
        if let Some(gid) = gid {
            volume
                .annotations
                .insert(GID_ANNOTATION_KEY.into(), gid.into());
        }
        volume
    }

    fn full_table() -> BasicRangeAllocator {
        BasicRangeAllocator::new(ABSOLUTE_GID_MIN, ABSOLUTE_GID_MAX).unwrap()
    }

    #[test]
    fn duplicates_do_not_abort_and_classes_stay_apart() {
        let volumes = [
            volume("a", "x", Some("5000")),
            volume("b", "x", Some("5000")),
            volume("c", "y", Some("6000")),
        ];

        let mut x = full_table();
        let report = seed("x", &volumes, &mut x);
        assert!(x.contains(5000));
        assert!(!x.contains(6000));
        assert_eq!(x.len(), 1);
        assert_eq!(
            report,
            RecoveryReport {
                scanned: 2,
                recorded: 1,
                conflicts: 1,
                ..RecoveryReport::default()
            }
        );

        let mut y = full_table();
        seed("y", &volumes, &mut y);
        assert!(y.contains(6000));
        assert!(!y.contains(5000));
    }

    #[test]
    fn bad_volumes_are_skipped() {
        let volumes = [
            volume("missing", "x", None),
            volume("garbage", "x", Some("five")),
            volume("negative", "x", Some("-5")),
            volume("overflow", "x", Some("9999999999")),
            volume("legacy", "x", Some("1000")),
            volume("good", "x", Some("2001")),
            Volume {
                name: "unclassified".into(),
                ..Volume::default()
            },
        ];

        let mut table = full_table();
        let report = seed("x", &volumes, &mut table);
        assert_eq!(
            report,
            RecoveryReport {
                scanned: 6,
                recorded: 1,
                missing_annotation: 1,
                malformed: 3,
                out_of_bounds: 1,
                conflicts: 0,
            }
        );
        assert_eq!(table.runs().collect::<Vec<_>>(), [2001..=2001]);
    }

    #[test]
    fn recovered_ids_are_not_handed_out_again() {
        let volumes = [
            volume("a", "x", Some("2000")),
            volume("b", "x", Some("2002")),
        ];
        let mut table = full_table();
        seed("x", &volumes, &mut table);
        table.set_range(2000, 2003).unwrap();

        assert_eq!(table.allocate_next().unwrap(), 2001);
        assert_eq!(table.allocate_next().unwrap(), 2003);
        assert!(table.allocate_next().is_err());
    }

    struct FailingLister;

    impl VolumeLister for FailingLister {
        fn list_volumes(&self) -> Result<Vec<Volume>, BoxError> {
            Err("api server unavailable".into())
        }
    }

    #[test]
    fn listing_failure_is_reported() {
        let mut table = full_table();
        let err = recover(&FailingLister, "x", &mut table).unwrap_err();
        assert!(matches!(err, Error::VolumeList(_)));
        assert!(table.is_empty());
    }
}
