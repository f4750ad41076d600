//! The volume-side view the allocator depends on.
//!
//! Provisioned volumes are owned by some external system. All the allocator
//! needs from it is a full listing of the volumes that exist
//! ([`VolumeLister`]) and a way to find the storage class a volume was
//! provisioned from ([`ClassResolver`]).

use alloc::sync::Arc;
use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{BoxError, Error, GID_ANNOTATION_KEY, Gid, Result, format_gid, parse_gid};

/// A provisioned volume as seen by the allocator.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Volume {
    pub name: String,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub storage_class: Option<String>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "HashMap::is_empty")
    )]
    pub annotations: HashMap<String, String>,
}

impl Volume {
    /// Creates an unannotated volume belonging to `storage_class`.
    pub fn new(name: impl Into<String>, storage_class: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            storage_class: Some(storage_class.into()),
            annotations: HashMap::new(),
        }
    }

    /// Returns the gid recorded on this volume, if any.
    ///
    /// # Errors
    /// Returns [`Error::AnnotationParse`] if the annotation is present but is
    /// not a valid gid.
    pub fn gid(&self) -> Result<Option<Gid>> {
        self.annotations
            .get(GID_ANNOTATION_KEY)
            .map(|value| {
                parse_gid(value).map_err(|source| Error::AnnotationParse {
                    volume: self.name.clone(),
                    source,
                })
            })
            .transpose()
    }

    /// Records `gid` on this volume.
    pub fn set_gid(&mut self, gid: Gid) {
        self.annotations
            .insert(GID_ANNOTATION_KEY.to_owned(), format_gid(gid));
    }

    /// Builder form of [`Self::set_gid`].
    #[must_use]
    pub fn with_gid(mut self, gid: Gid) -> Self {
        self.set_gid(gid);
        self
    }

    /// Returns `true` if the volume was provisioned from `class`.
    pub fn belongs_to(&self, class: &str) -> bool {
        self.storage_class.as_deref() == Some(class)
    }
}

/// A named storage class and its raw parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StorageClass {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub parameters: HashMap<String, String>,
}

impl StorageClass {
    pub fn new<I, K, V>(name: impl Into<String>, parameters: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            parameters: parameters
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Lists every volume that currently exists.
///
/// The listing is a full snapshot; it is read once per storage class when
/// that class's table is first built.
pub trait VolumeLister {
    fn list_volumes(&self) -> Result<Vec<Volume>, BoxError>;
}

/// Finds the storage class a volume was provisioned from.
pub trait ClassResolver {
    fn class_for_volume(&self, volume: &Volume) -> Result<StorageClass, BoxError>;
}

impl<T: VolumeLister + ?Sized> VolumeLister for &T {
    fn list_volumes(&self) -> Result<Vec<Volume>, BoxError> {
        (**self).list_volumes()
    }
}

impl<T: VolumeLister + ?Sized> VolumeLister for Arc<T> {
    fn list_volumes(&self) -> Result<Vec<Volume>, BoxError> {
        (**self).list_volumes()
    }
}

impl<T: ClassResolver + ?Sized> ClassResolver for &T {
    fn class_for_volume(&self, volume: &Volume) -> Result<StorageClass, BoxError> {
        (**self).class_for_volume(volume)
    }
}

impl<T: ClassResolver + ?Sized> ClassResolver for Arc<T> {
    fn class_for_volume(&self, volume: &Volume) -> Result<StorageClass, BoxError> {
        (**self).class_for_volume(volume)
    }
}

/// Why a [`Snapshot`] could not resolve a volume's class.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum LookupError {
    #[error("volume {0} has no storage class")]
    Unclassified(String),

    #[error("storage class {0} not found")]
    UnknownClass(String),
}

/// An in-memory set of storage classes and volumes.
///
/// Serves as both [`VolumeLister`] and [`ClassResolver`], which makes it the
/// natural backing store for tests and for tools that keep volume metadata
/// in a file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Snapshot {
    #[cfg_attr(feature = "serde", serde(default))]
    pub classes: Vec<StorageClass>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub volumes: Vec<Volume>,
}

impl Snapshot {
    pub fn class(&self, name: &str) -> Option<&StorageClass> {
        self.classes.iter().find(|class| class.name == name)
    }

    pub fn volume(&self, name: &str) -> Option<&Volume> {
        self.volumes.iter().find(|volume| volume.name == name)
    }

    /// Removes and returns the volume called `name`.
    pub fn remove_volume(&mut self, name: &str) -> Option<Volume> {
        let index = self.volumes.iter().position(|volume| volume.name == name)?;
        Some(self.volumes.remove(index))
    }
}

impl VolumeLister for Snapshot {
    fn list_volumes(&self) -> Result<Vec<Volume>, BoxError> {
        Ok(self.volumes.clone())
    }
}

impl ClassResolver for Snapshot {
    fn class_for_volume(&self, volume: &Volume) -> Result<StorageClass, BoxError> {
        let name = volume
            .storage_class
            .as_deref()
            .ok_or_else(|| LookupError::Unclassified(volume.name.clone()))?;
        self.class(name)
            .cloned()
            .ok_or_else(|| LookupError::UnknownClass(name.to_owned()).into())
    }
}
