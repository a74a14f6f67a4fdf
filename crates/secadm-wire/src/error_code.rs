//! `{ code: u32 }` reply codes and their mapping to/from `SecadmError`.
//!
//! Kept separate from `SecadmError` itself the same way `frankenlibc-abi`'s
//! `errno_abi` keeps C `errno` values separate from the safe core's
//! `Result` types: the wire code is a stable, small integer contract;
//! `SecadmError` is free to grow richer variants (e.g. carrying a path)
//! without breaking callers who only look at the code.

use secadm_core::SecadmError;

/// `code == 0` is success; every other value is one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ReplyCode {
    /// The operation completed as requested.
    Success = 0,
    /// `SecadmError::InvalidArgument`.
    InvalidArgument = 1,
    /// `SecadmError::PathResolution`.
    PathResolution = 2,
    /// `SecadmError::NotRegularFile`.
    NotRegularFile = 3,
    /// `SecadmError::Unsupported`.
    Unsupported = 4,
    /// `SecadmError::Duplicate`.
    Duplicate = 5,
    /// `SecadmError::NotFound`.
    NotFound = 6,
    /// `SecadmError::IntegrityViolation`.
    IntegrityViolation = 7,
    /// `SecadmError::Immutable`.
    Immutable = 8,
    /// `SecadmError::Internal`.
    Internal = 9,
}

impl ReplyCode {
    /// Parse a raw wire code back into a `ReplyCode`, rejecting anything
    /// this version of the protocol does not define.
    #[must_use]
    pub fn from_u32(raw: u32) -> Option<Self> {
        Some(match raw {
            0 => Self::Success,
            1 => Self::InvalidArgument,
            2 => Self::PathResolution,
            3 => Self::NotRegularFile,
            4 => Self::Unsupported,
            5 => Self::Duplicate,
            6 => Self::NotFound,
            7 => Self::IntegrityViolation,
            8 => Self::Immutable,
            9 => Self::Internal,
            _ => return None,
        })
    }
}

impl From<&SecadmError> for ReplyCode {
    fn from(err: &SecadmError) -> Self {
        match err {
            SecadmError::InvalidArgument(_) => Self::InvalidArgument,
            SecadmError::PathResolution { .. } => Self::PathResolution,
            SecadmError::NotRegularFile(_) => Self::NotRegularFile,
            SecadmError::Unsupported => Self::Unsupported,
            SecadmError::Duplicate => Self::Duplicate,
            SecadmError::NotFound => Self::NotFound,
            SecadmError::IntegrityViolation => Self::IntegrityViolation,
            SecadmError::Immutable => Self::Immutable,
            SecadmError::Internal(_) => Self::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_error_variant_maps_to_a_nonzero_code() {
        let errors = [
            SecadmError::InvalidArgument("x".to_string()),
            SecadmError::PathResolution {
                path: "/x".to_string(),
                reason: "y".to_string(),
            },
            SecadmError::NotRegularFile("/x".to_string()),
            SecadmError::Unsupported,
            SecadmError::Duplicate,
            SecadmError::NotFound,
            SecadmError::IntegrityViolation,
            SecadmError::Immutable,
            SecadmError::Internal("z".to_string()),
        ];
        for e in errors {
            assert_ne!(ReplyCode::from(&e) as u32, ReplyCode::Success as u32);
        }
    }

    #[test]
    fn success_round_trips_through_raw_u32() {
        assert_eq!(ReplyCode::from_u32(0), Some(ReplyCode::Success));
        assert_eq!(ReplyCode::from_u32(9), Some(ReplyCode::Internal));
        assert_eq!(ReplyCode::from_u32(255), None);
    }
}
