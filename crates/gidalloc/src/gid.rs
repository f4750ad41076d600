use core::num::ParseIntError;

/// A POSIX group id handed out by the allocator.
pub type Gid = u32;

/// Lowest gid the allocator will ever hand out or record.
pub const ABSOLUTE_GID_MIN: Gid = 2000;

/// Highest gid the allocator will ever hand out or record. Gids travel as
/// 32-bit signed integers, so this is `i32::MAX`.
pub const ABSOLUTE_GID_MAX: Gid = i32::MAX as Gid;

/// Window lower bound used when a storage class does not set `gidMin`.
pub const DEFAULT_GID_MIN: Gid = 2000;

/// Window upper bound used when a storage class does not set `gidMax`.
pub const DEFAULT_GID_MAX: Gid = ABSOLUTE_GID_MAX;

const _: () = assert!(
    ABSOLUTE_GID_MIN <= DEFAULT_GID_MIN
        && DEFAULT_GID_MIN <= DEFAULT_GID_MAX
        && DEFAULT_GID_MAX <= ABSOLUTE_GID_MAX
);

/// Volume annotation holding the decimal gid assigned at provision time.
pub const GID_ANNOTATION_KEY: &str = "pv.beta.kubernetes.io/gid";

/// Why a decimal gid string was rejected.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum GidParseError {
    /// Not a base-10 integer, or does not fit in an `i32`.
    #[error("failed to parse gid {value:?}: {source}")]
    Malformed {
        value: String,
        #[source]
        source: ParseIntError,
    },

    /// Parsed, but negative.
    #[error("negative gids are not allowed: {value:?}")]
    Negative { value: String },
}

/// Parses the decimal text form of a gid.
///
/// The value must parse as a 32-bit signed integer and must not be negative,
/// so every accepted value lies in `[0, i32::MAX]`. Bounds narrower than that
/// are enforced by the caller.
///
/// # Example
/// ```
/// use gidalloc::{GidParseError, parse_gid};
///
/// assert_eq!(parse_gid("2048"), Ok(2048));
/// assert!(matches!(parse_gid("-1"), Err(GidParseError::Negative { .. })));
/// assert!(matches!(parse_gid("4294967296"), Err(GidParseError::Malformed { .. })));
/// ```
pub fn parse_gid(value: &str) -> Result<Gid, GidParseError> {
    let parsed: i32 = value.parse().map_err(|source| GidParseError::Malformed {
        value: value.to_owned(),
        source,
    })?;

    Gid::try_from(parsed).map_err(|_| GidParseError::Negative {
        value: value.to_owned(),
    })
}

/// Formats a gid the way it is stored in [`GID_ANNOTATION_KEY`].
pub fn format_gid(gid: Gid) -> String {
    gid.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_decimal() {
        assert_eq!(parse_gid("0"), Ok(0));
        assert_eq!(parse_gid("5000"), Ok(5000));
        assert_eq!(parse_gid("2147483647"), Ok(ABSOLUTE_GID_MAX));
    }

    #[test]
    fn rejects_overflow_and_garbage() {
        for value in ["2147483648", "abc", "", "12.5", "0x10", " 12"] {
            assert!(
                matches!(parse_gid(value), Err(GidParseError::Malformed { .. })),
                "{value:?} should be malformed"
            );
        }
    }

    #[test]
    fn rejects_negative() {
        assert_eq!(
            parse_gid("-2000"),
            Err(GidParseError::Negative {
                value: "-2000".into()
            })
        );
    }

    #[test]
    fn format_is_inverse_of_parse() {
        assert_eq!(format_gid(2001), "2001");
        assert_eq!(parse_gid(&format_gid(ABSOLUTE_GID_MAX)), Ok(ABSOLUTE_GID_MAX));
    }
}
