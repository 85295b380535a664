//! Runtime side of the HDI marshalling contract.
//!
//! A parcel is an ordered byte buffer holding fixed-width little-endian
//! scalars, 32-bit length-prefixed byte runs and raw unpadded blocks.
//! [`Parcel`] reads, [`ParcelMut`] writes, and [`Value`] models anything an
//! IDL type can carry across the wire.
//!
//! ```
//! use hdi_parcel::*;
//!
//! let mut out = ParcelMut::new();
//! out.write_scalar(7i32);
//! out.write_string("ping").unwrap();
//! let bytes = out.data();
//!
//! let mut parcel = Parcel::new(&bytes);
//! assert_eq!(parcel.read_scalar::<i32>(), Ok(7));
//! assert_eq!(parcel.read_string(), Ok("ping".to_owned()));
//! assert!(parcel.is_exhausted());
//! ```

pub mod error;
pub mod parcel;
pub mod value;

pub use error::ParcelError;
pub use parcel::*;
pub use value::*;

/// Largest length prefix a parcel accepts (mirrors `HDI_BUFF_MAX_SIZE`).
pub const MAX_BUFFER_SIZE: u32 = 1024 * 200;
