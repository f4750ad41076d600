use anyhow::{Context, anyhow, bail};
use gidalloc::{
    ABSOLUTE_GID_MAX, ABSOLUTE_GID_MIN, BasicRangeAllocator, ClassParameters, Gid, GidAllocator,
    RecoveryReport, Snapshot, Volume, recovery,
};
use serde::Serialize;
use tracing::info;

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct Allocated {
    pub volume: String,
    pub class: String,
    pub gid: Gid,
}

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct Released {
    pub volume: String,
    pub gid: Option<Gid>,
}

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct Scanned {
    pub class: String,
    pub min: Gid,
    pub max: Gid,
    pub allocated: u64,
    pub free: u64,
    pub report: RecoveryReport,
}

/// Allocates a gid for a new `volume` of `class` and records the annotated
/// volume in `snapshot`.
pub fn allocate(snapshot: &mut Snapshot, class: &str, volume: &str) -> anyhow::Result<Allocated> {
    if snapshot.volume(volume).is_some() {
        bail!("volume {volume} already exists");
    }
    let storage_class = snapshot
        .class(class)
        .ok_or_else(|| anyhow!("storage class {class} not found"))?;

    let gid = GidAllocator::new(&*snapshot, &*snapshot)
        .allocate_next(class, &storage_class.parameters)
        .with_context(|| format!("failed to allocate gid for volume {volume}"))?;

    snapshot.volumes.push(Volume::new(volume, class).with_gid(gid));
    info!(volume, class, gid, "provisioned volume");

    Ok(Allocated {
        volume: volume.to_owned(),
        class: class.to_owned(),
        gid,
    })
}

/// Releases the gid of `volume` and removes it from `snapshot`.
pub fn release(snapshot: &mut Snapshot, volume: &str) -> anyhow::Result<Released> {
    let target = snapshot
        .volume(volume)
        .cloned()
        .ok_or_else(|| anyhow!("volume {volume} not found"))?;

    GidAllocator::new(&*snapshot, &*snapshot)
        .release(&target)
        .with_context(|| format!("failed to release gid of volume {volume}"))?;

    snapshot.remove_volume(volume);
    let gid = target.gid()?;
    info!(volume, ?gid, "deleted volume");

    Ok(Released {
        volume: volume.to_owned(),
        gid,
    })
}

/// Rebuilds the table for `class` the way a cold allocator would.
pub fn scan(snapshot: &Snapshot, class: &str) -> anyhow::Result<Scanned> {
    let params = match snapshot.class(class) {
        Some(storage_class) => ClassParameters::parse(&storage_class.parameters)
            .with_context(|| format!("storage class {class} has invalid parameters"))?,
        None => ClassParameters::default(),
    };

    let mut table = BasicRangeAllocator::new(ABSOLUTE_GID_MIN, ABSOLUTE_GID_MAX)?;
    let report = recovery::recover(snapshot, class, &mut table)?;
    table.set_range(params.gid_min, params.gid_max)?;

    Ok(Scanned {
        class: class.to_owned(),
        min: params.gid_min,
        max: params.gid_max,
        allocated: table.len(),
        free: table.free(),
        report,
    })
}
