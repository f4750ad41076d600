//! Storage class parameters that shape a class's gid window.
//!
//! A storage class carries free-form string parameters. Two of them are
//! meaningful here, compared case-insensitively:
//!
//! | key      | meaning                         | default             |
//! |----------|---------------------------------|---------------------|
//! | `gidMin` | inclusive lower bound of window | [`DEFAULT_GID_MIN`] |
//! | `gidMax` | inclusive upper bound of window | [`DEFAULT_GID_MAX`] |
//!
//! Every other key belongs to someone else and is ignored.

use tracing::trace;

use crate::{
    ABSOLUTE_GID_MAX, ABSOLUTE_GID_MIN, DEFAULT_GID_MAX, DEFAULT_GID_MIN, Gid, GidParseError,
    parse_gid,
};

const GID_MIN_KEY: &str = "gidmin";
const GID_MAX_KEY: &str = "gidmax";

/// Why a set of storage class parameters was rejected.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum ParameterError {
    #[error("invalid value {value:?} for parameter {key}: {source}")]
    InvalidValue {
        key: String,
        value: String,
        #[source]
        source: GidParseError,
    },

    #[error("{key} must be >= {bound}")]
    BelowMinimum { key: String, bound: Gid },

    #[error("{key} must be <= {bound}")]
    AboveMaximum { key: String, bound: Gid },

    #[error("gidMax {max} is not >= gidMin {min}")]
    Inverted { min: Gid, max: Gid },

    #[error("parameter {key} is set more than once")]
    Duplicate { key: String },
}

/// The validated gid window of a storage class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClassParameters {
    pub gid_min: Gid,
    pub gid_max: Gid,
}

impl Default for ClassParameters {
    fn default() -> Self {
        Self {
            gid_min: DEFAULT_GID_MIN,
            gid_max: DEFAULT_GID_MAX,
        }
    }
}

impl ClassParameters {
    /// Parses raw storage class parameters.
    ///
    /// Missing keys take their defaults. Each recognized value must be a
    /// non-negative decimal gid within
    /// `[ABSOLUTE_GID_MIN, ABSOLUTE_GID_MAX]`, and the resulting window must
    /// not be inverted.
    ///
    /// # Errors
    /// Returns a [`ParameterError`] describing the first offending key.
    ///
    /// # Example
    /// ```
    /// use gidalloc::{ClassParameters, ParameterError};
    ///
    /// let params = ClassParameters::parse([("gidMin", "3000"), ("provisioningMode", "efs-ap")]).unwrap();
    /// assert_eq!(params.gid_min, 3000);
    ///
    /// let err = ClassParameters::parse([("gidMin", "3000"), ("gidMax", "2000")]).unwrap_err();
    /// assert_eq!(err, ParameterError::Inverted { min: 3000, max: 2000 });
    /// ```
    pub fn parse<I, K, V>(params: I) -> Result<Self, ParameterError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut gid_min = None;
        let mut gid_max = None;

        for (key, value) in params {
            let (key, value) = (key.as_ref(), value.as_ref());
            let slot = match key.to_ascii_lowercase().as_str() {
                GID_MIN_KEY => &mut gid_min,
                GID_MAX_KEY => &mut gid_max,
                _ => {
                    trace!(key, "ignoring unrelated storage class parameter");
                    continue;
                }
            };
            if slot.is_some() {
                return Err(ParameterError::Duplicate { key: key.to_owned() });
            }
            *slot = Some(parse_bound(key, value)?);
        }

        let defaults = Self::default();
        let params = Self {
            gid_min: gid_min.unwrap_or(defaults.gid_min),
            gid_max: gid_max.unwrap_or(defaults.gid_max),
        };
        if params.gid_min > params.gid_max {
            return Err(ParameterError::Inverted {
                min: params.gid_min,
                max: params.gid_max,
            });
        }
        Ok(params)
    }
}

fn parse_bound(key: &str, value: &str) -> Result<Gid, ParameterError> {
    let gid = parse_gid(value).map_err(|source| ParameterError::InvalidValue {
        key: key.to_owned(),
        value: value.to_owned(),
        source,
    })?;

    if gid < ABSOLUTE_GID_MIN {
        return Err(ParameterError::BelowMinimum {
            key: key.to_owned(),
            bound: ABSOLUTE_GID_MIN,
        });
    }
    if gid > ABSOLUTE_GID_MAX {
        return Err(ParameterError::AboveMaximum {
            key: key.to_owned(),
            bound: ABSOLUTE_GID_MAX,
        });
    }
    Ok(gid)
}
