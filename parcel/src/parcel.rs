use crate::{error::ParcelError, MAX_BUFFER_SIZE};

/// A fixed-width value stored in a parcel as little-endian bytes.
pub trait Scalar: Sized + Copy {
    const WIDTH: usize;

    fn put(self, out: &mut Vec<u8>);

    /// `bytes` is always exactly `WIDTH` long.
    fn take(bytes: &[u8]) -> Result<Self, ParcelError>;
}

macro_rules! impl_scalar {
    ($($ty:ty),*) => {$(
        impl Scalar for $ty {
            const WIDTH: usize = std::mem::size_of::<$ty>();

            fn put(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            fn take(bytes: &[u8]) -> Result<Self, ParcelError> {
                let mut raw = [0u8; std::mem::size_of::<$ty>()];
                raw.copy_from_slice(bytes);
                Ok(<$ty>::from_le_bytes(raw))
            }
        }
    )*};
}

impl_scalar!(i8, u8, i16, u16, i32, u32, i64, u64, f32, f64);

impl Scalar for bool {
    const WIDTH: usize = 1;

    fn put(self, out: &mut Vec<u8>) {
        out.push(u8::from(self));
    }

    fn take(bytes: &[u8]) -> Result<Self, ParcelError> {
        match bytes[0] {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(ParcelError::InvalidBool(other)),
        }
    }
}

/// A parcel meant for reading.
///
/// Example usage:
///
/// ```
/// let mut parcel = hdi_parcel::Parcel::new(&[3, 0, 0, 0, 97, 98, 99, 1]);
/// assert_eq!(parcel.read_string(), Ok("abc".to_owned()));
/// assert_eq!(parcel.read_scalar::<bool>(), Ok(true));
/// ```
///
pub struct Parcel<'a> {
    data:  &'a [u8],
    index: usize,
}

impl<'a> Parcel<'a> {
    /// Create a new Parcel that wraps the provided byte slice.
    pub fn new(data: &'a [u8]) -> Parcel<'a> {
        Parcel { data, index: 0 }
    }

    /// Retrieves the underlying byte slice.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Retrieves the current read position. This starts off as 0 and ends up
    /// as `self.data().len()` when everything has been read.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.index
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Read `len` raw bytes with no length prefix (union blocks).
    pub fn read_raw(&mut self, len: usize) -> Result<&'a [u8], ParcelError> {
        if len > self.remaining() {
            return Err(ParcelError::Underflow {
                wanted:    len,
                remaining: self.remaining(),
            });
        }
        let value = &self.data[self.index..self.index + len];
        self.index += len;
        Ok(value)
    }

    pub fn read_scalar<T: Scalar>(&mut self) -> Result<T, ParcelError> {
        let bytes = self.read_raw(T::WIDTH)?;
        T::take(bytes)
    }

    /// Read a 32-bit element count or length prefix.
    pub fn read_len(&mut self) -> Result<usize, ParcelError> {
        let len = self.read_scalar::<u32>()?;
        if len > MAX_BUFFER_SIZE {
            return Err(ParcelError::LengthOverflow(len as usize));
        }
        Ok(len as usize)
    }

    pub fn read_length_prefixed_bytes(&mut self) -> Result<&'a [u8], ParcelError> {
        let len = self.read_len()?;
        self.read_raw(len)
    }

    /// Read a length-prefixed UTF-8 string into an owned buffer.
    pub fn read_string(&mut self) -> Result<String, ParcelError> {
        let bytes = self.read_length_prefixed_bytes()?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| ParcelError::InvalidUtf8)
    }

    pub fn read_fd(&mut self) -> Result<i32, ParcelError> {
        self.read_scalar::<i32>()
    }

    /// Read a remote-object handle token.
    pub fn read_remote_object(&mut self) -> Result<u64, ParcelError> {
        self.read_scalar::<u64>()
    }
}

#[test]
fn read_bool() {
    let read = |bytes| Parcel::new(bytes).read_scalar::<bool>();
    assert_eq!(read(&[]), Err(ParcelError::Underflow { wanted: 1, remaining: 0 }));
    assert_eq!(read(&[0]), Ok(false));
    assert_eq!(read(&[1]), Ok(true));
    assert_eq!(read(&[2]), Err(ParcelError::InvalidBool(2)));
}

#[test]
fn read_fixed_width_integers() {
    let mut parcel = Parcel::new(&[0xff, 0x34, 0x12, 0xfe, 0xff, 0xff, 0xff]);
    assert_eq!(parcel.read_scalar::<u8>(), Ok(255));
    assert_eq!(parcel.read_scalar::<i16>(), Ok(0x1234));
    assert_eq!(parcel.read_scalar::<i32>(), Ok(-2));
    assert!(parcel.is_exhausted());
}

#[test]
fn read_raw() {
    let read = |bytes, len| Parcel::new(bytes).read_raw(len);
    assert_eq!(read(&[], 0), Ok(vec![].as_slice()));
    assert_eq!(read(&[], 1), Err(ParcelError::Underflow { wanted: 1, remaining: 0 }));
    assert_eq!(read(&[1, 2], 2), Ok(vec![1, 2].as_slice()));
}

#[test]
fn read_string() {
    let read = |bytes| Parcel::new(bytes).read_string();
    assert_eq!(read(&[0, 0, 0, 0]), Ok(String::new()));
    assert_eq!(read(&[2, 0, 0, 0, 104, 105]), Ok("hi".to_owned()));
    assert_eq!(read(&[2, 0, 0, 0, 0xc3, 0x28]), Err(ParcelError::InvalidUtf8));
    assert_eq!(
        read(&[5, 0, 0, 0, 104]),
        Err(ParcelError::Underflow { wanted: 5, remaining: 1 })
    );
}

#[test]
fn read_rejects_oversized_length() {
    let mut parcel = Parcel::new(&[0xff, 0xff, 0xff, 0xff]);
    assert_eq!(
        parcel.read_length_prefixed_bytes(),
        Err(ParcelError::LengthOverflow(u32::MAX as usize))
    );
}

#[test]
fn read_floats() {
    let mut bytes = 1.5f32.to_le_bytes().to_vec();
    bytes.extend_from_slice(&(-0.25f64).to_le_bytes());
    let mut parcel = Parcel::new(&bytes);
    assert_eq!(parcel.read_scalar::<f32>(), Ok(1.5));
    assert_eq!(parcel.read_scalar::<f64>(), Ok(-0.25));
}

/// A parcel meant for writing.
///
/// Example usage:
///
/// ```
/// let mut parcel = hdi_parcel::ParcelMut::new();
/// parcel.write_scalar(1u16);
/// parcel.write_length_prefixed_bytes(&[9]).unwrap();
/// assert_eq!(parcel.data(), [1, 0, 1, 0, 0, 0, 9]);
/// ```
///
#[derive(Debug, Default, Clone)]
pub struct ParcelMut {
    data: Vec<u8>,
}

impl ParcelMut {
    /// Creates an empty parcel ready for writing.
    pub fn new() -> ParcelMut {
        ParcelMut { data: vec![] }
    }

    /// Consumes this parcel and returns the underlying backing store.
    pub fn data(self) -> Vec<u8> {
        self.data
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Returns the number of bytes written so far.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn write_scalar<T: Scalar>(&mut self, value: T) {
        value.put(&mut self.data);
    }

    /// Write raw bytes with no length prefix (union blocks).
    pub fn write_raw(&mut self, value: &[u8]) {
        self.data.extend_from_slice(value);
    }

    /// Write a 32-bit element count or length prefix.
    pub fn write_len(&mut self, len: usize) -> Result<(), ParcelError> {
        if len > MAX_BUFFER_SIZE as usize {
            return Err(ParcelError::LengthOverflow(len));
        }
        self.write_scalar(len as u32);
        Ok(())
    }

    pub fn write_length_prefixed_bytes(&mut self, value: &[u8]) -> Result<(), ParcelError> {
        self.write_len(value.len())?;
        self.write_raw(value);
        Ok(())
    }

    pub fn write_string(&mut self, value: &str) -> Result<(), ParcelError> {
        self.write_length_prefixed_bytes(value.as_bytes())
    }

    pub fn write_fd(&mut self, fd: i32) {
        self.write_scalar(fd);
    }

    /// Write a remote-object handle token.
    pub fn write_remote_object(&mut self, handle: u64) {
        self.write_scalar(handle);
    }
}

#[cfg(test)]
fn write_once(cb: fn(&mut ParcelMut)) -> Vec<u8> {
    let mut parcel = ParcelMut::new();
    cb(&mut parcel);
    parcel.data()
}

#[test]
fn write_bool() {
    assert_eq!(write_once(|p| p.write_scalar(false)), [0]);
    assert_eq!(write_once(|p| p.write_scalar(true)), [1]);
}

#[test]
fn write_fixed_width_integers() {
    assert_eq!(write_once(|p| p.write_scalar(-1i8)), [255]);
    assert_eq!(write_once(|p| p.write_scalar(0x1234u16)), [0x34, 0x12]);
    assert_eq!(write_once(|p| p.write_scalar(-2i32)), [0xfe, 0xff, 0xff, 0xff]);
    assert_eq!(write_once(|p| p.write_scalar(1u64)), [1, 0, 0, 0, 0, 0, 0, 0]);
}

#[test]
fn write_string() {
    assert_eq!(write_once(|p| p.write_string("").unwrap()), [0, 0, 0, 0]);
    assert_eq!(write_once(|p| p.write_string("hi").unwrap()), [2, 0, 0, 0, 104, 105]);
}

#[test]
fn write_rejects_oversized_buffer() {
    let mut parcel = ParcelMut::new();
    let big = vec![0u8; MAX_BUFFER_SIZE as usize + 1];
    assert_eq!(
        parcel.write_length_prefixed_bytes(&big),
        Err(ParcelError::LengthOverflow(big.len()))
    );
    assert!(parcel.is_empty());
}

#[test]
fn write_sequence() {
    let mut parcel = ParcelMut::new();
    parcel.write_scalar(2.5f64);
    parcel.write_string("🍕").unwrap();
    parcel.write_fd(3);
    parcel.write_remote_object(0xabcd);
    let bytes = parcel.data();

    let mut reader = Parcel::new(&bytes);
    assert_eq!(reader.read_scalar::<f64>(), Ok(2.5));
    assert_eq!(reader.read_string(), Ok("🍕".to_owned()));
    assert_eq!(reader.read_fd(), Ok(3));
    assert_eq!(reader.read_remote_object(), Ok(0xabcd));
    assert!(reader.is_exhausted());
}
