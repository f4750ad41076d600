use tracing::{debug, instrument};

use crate::{
    ClassParameters, ClassRegistry, ClassResolver, Error, Gid, Result, Volume, VolumeLister,
};

/// Hands out and takes back gids for provisioned volumes.
///
/// Each storage class gets its own table (see [`ClassRegistry`]). The caller
/// is responsible for writing the gid returned by [`Self::allocate_next`]
/// onto the volume it provisions (e.g. with [`Volume::set_gid`]); that
/// annotation is what lets a later process rebuild the table.
///
/// # Example
/// ```
/// use gidalloc::{GidAllocator, Snapshot, StorageClass, Volume};
///
/// let snapshot = Snapshot {
///     classes: vec![StorageClass::new("efs", [("gidMin", "2000"), ("gidMax", "2002")])],
///     volumes: vec![Volume::new("pv-0", "efs").with_gid(2000)],
/// };
/// let allocator = GidAllocator::new(&snapshot, &snapshot);
///
/// let params = &snapshot.class("efs").unwrap().parameters;
/// assert_eq!(allocator.allocate_next("efs", params).unwrap(), 2001);
///
/// allocator.release(&snapshot.volumes[0]).unwrap();
/// assert_eq!(allocator.allocate_next("efs", params).unwrap(), 2000);
/// ```
pub struct GidAllocator<L, R> {
    registry: ClassRegistry<L>,
    resolver: R,
}

impl<L, R> GidAllocator<L, R>
where
    L: VolumeLister,
    R: ClassResolver,
{
    pub fn new(lister: L, resolver: R) -> Self {
        Self {
            registry: ClassRegistry::new(lister),
            resolver,
        }
    }

    /// Allocates the smallest free gid in the window configured by
    /// `parameters` for `class`.
    ///
    /// # Errors
    /// - [`Error::Parameter`] if `parameters` are invalid.
    /// - [`Error::Exhausted`] if the class's window is full.
    /// - [`Error::VolumeList`] if the class's table had to be recovered and
    ///   the volumes could not be listed.
    #[instrument(level = "debug", skip(self, parameters))]
    pub fn allocate_next<I, K, V>(&self, class: &str, parameters: I) -> Result<Gid>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let params = ClassParameters::parse(parameters)?;
        let table = self.registry.get_or_create(class, &params)?;
        let gid = table.allocate_next()?;
        debug!(gid, "allocated gid");
        Ok(gid)
    }

    /// Returns the gid recorded on `volume` to its class's table.
    ///
    /// A volume without a gid annotation was not provisioned with one, so
    /// there is nothing to release.
    ///
    /// # Errors
    /// - [`Error::ClassLookup`] if the volume's class cannot be resolved.
    /// - [`Error::Parameter`] if the class's parameters are invalid.
    /// - [`Error::AnnotationParse`] if the gid annotation is malformed.
    #[instrument(level = "debug", skip_all, fields(volume = %volume.name))]
    pub fn release(&self, volume: &Volume) -> Result<()> {
        let class = self
            .resolver
            .class_for_volume(volume)
            .map_err(|source| Error::ClassLookup {
                volume: volume.name.clone(),
                source,
            })?;
        let params = ClassParameters::parse(&class.parameters)?;

        let Some(gid) = volume.gid()? else {
            debug!("volume has no gid, nothing to release");
            return Ok(());
        };

        let table = self.registry.get_or_create(&class.name, &params)?;
        table.release(gid)?;
        debug!(gid, class = %class.name, "released gid");
        Ok(())
    }

    pub fn registry(&self) -> &ClassRegistry<L> {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ABSOLUTE_GID_MIN, GID_ANNOTATION_KEY, ParameterError, Snapshot, StorageClass};

    fn snapshot() -> Snapshot {
        Snapshot {
            classes: vec![
                StorageClass::new("small", [("gidmin", "2000"), ("gidmax", "2002")]),
                StorageClass::new("default", Vec::<(String, String)>::new()),
                StorageClass::new("broken", [("gidMin", "3000"), ("gidMax", "2000")]),
            ],
            volumes: vec![],
        }
    }

    fn params<'a>(snapshot: &'a Snapshot, class: &str) -> &'a std::collections::HashMap<String, String> {
        &snapshot.class(class).unwrap().parameters
    }

    #[test]
    fn allocate_release_allocate() {
        let snapshot = snapshot();
        let allocator = GidAllocator::new(&snapshot, &snapshot);
        let small = params(&snapshot, "small");

        assert_eq!(allocator.allocate_next("small", small).unwrap(), 2000);
        assert_eq!(allocator.allocate_next("small", small).unwrap(), 2001);
        assert_eq!(allocator.allocate_next("small", small).unwrap(), 2002);
        assert!(matches!(
            allocator.allocate_next("small", small),
            Err(Error::Exhausted { min: 2000, max: 2002 })
        ));

        let volume = Volume::new("pv-1", "small").with_gid(2001);
        allocator.release(&volume).unwrap();
        assert_eq!(allocator.allocate_next("small", small).unwrap(), 2001);
    }

    #[test]
    fn default_parameters_start_at_absolute_minimum() {
        let snapshot = snapshot();
        let allocator = GidAllocator::new(&snapshot, &snapshot);
        let gid = allocator
            .allocate_next("default", params(&snapshot, "default"))
            .unwrap();
        assert_eq!(gid, ABSOLUTE_GID_MIN);
    }

    #[test]
    fn bad_parameters_are_surfaced() {
        let snapshot = snapshot();
        let allocator = GidAllocator::new(&snapshot, &snapshot);

        assert!(matches!(
            allocator.allocate_next("x", [("gidmin", "100")]),
            Err(Error::Parameter(ParameterError::BelowMinimum { .. }))
        ));
        assert!(matches!(
            allocator.allocate_next("x", [("gidmin", "3000"), ("gidmax", "2000")]),
            Err(Error::Parameter(ParameterError::Inverted { .. }))
        ));
        assert_eq!(allocator.registry().len().unwrap(), 0);
    }

    #[test]
    fn recovery_happens_before_first_allocation() {
        let mut snapshot = snapshot();
        snapshot.volumes = vec![
            Volume::new("a", "small").with_gid(2000),
            Volume::new("b", "small").with_gid(2002),
        ];
        let allocator = GidAllocator::new(&snapshot, &snapshot);
        let small = params(&snapshot, "small");

        assert_eq!(allocator.allocate_next("small", small).unwrap(), 2001);
        assert!(matches!(
            allocator.allocate_next("small", small),
            Err(Error::Exhausted { .. })
        ));
    }

    #[test]
    fn release_without_annotation_is_a_no_op() {
        let snapshot = snapshot();
        let allocator = GidAllocator::new(&snapshot, &snapshot);
        allocator.release(&Volume::new("pv", "small")).unwrap();
        // no table needed, so no table built
        assert_eq!(allocator.registry().len().unwrap(), 0);
    }

    #[test]
    fn release_twice_is_harmless() {
        let snapshot = snapshot();
        let allocator = GidAllocator::new(&snapshot, &snapshot);
        let small = params(&snapshot, "small");
        let gid = allocator.allocate_next("small", small).unwrap();

        let volume = Volume::new("pv", "small").with_gid(gid);
        allocator.release(&volume).unwrap();
        allocator.release(&volume).unwrap();
        assert_eq!(allocator.allocate_next("small", small).unwrap(), gid);
    }

    #[test]
    fn release_errors_are_surfaced() {
        let snapshot = snapshot();
        let allocator = GidAllocator::new(&snapshot, &snapshot);

        let unknown = Volume::new("pv-unknown", "nope").with_gid(2000);
        assert!(matches!(
            allocator.release(&unknown),
            Err(Error::ClassLookup { volume, .. }) if volume == "pv-unknown"
        ));

        let mut malformed = Volume::new("pv-bad", "small");
        malformed
            .annotations
            .insert(GID_ANNOTATION_KEY.into(), "two thousand".into());
        assert!(matches!(
            allocator.release(&malformed),
            Err(Error::AnnotationParse { .. })
        ));

        let broken = Volume::new("pv-broken", "broken").with_gid(3000);
        assert!(matches!(
            allocator.release(&broken),
            Err(Error::Parameter(_))
        ));
    }
}
