use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParcelError {
    #[error("parcel underflow: wanted {wanted} byte(s), {remaining} left")]
    Underflow {
        wanted:    usize,
        remaining: usize,
    },

    #[error("invalid boolean byte {0}")]
    InvalidBool(u8),

    #[error("string is not valid UTF-8")]
    InvalidUtf8,

    #[error("length {0} exceeds the parcel limit")]
    LengthOverflow(usize),

    #[error("{needed} exceeds the caller capacity of {capacity}")]
    CapacityExceeded {
        needed:   usize,
        capacity: usize,
    },
}
