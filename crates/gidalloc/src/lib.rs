#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

mod error;
mod facade;
mod gid;
mod mutex;
mod params;
mod range;
pub mod recovery;
mod registry;
mod volume;

pub use crate::error::*;
pub use crate::facade::*;
pub use crate::gid::*;
pub use crate::params::*;
pub use crate::range::*;
pub use crate::recovery::RecoveryReport;
pub use crate::registry::*;
pub use crate::volume::*;
