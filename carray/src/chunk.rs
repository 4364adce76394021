use std::mem;

use bytes::Bytes;
use carray_types::{Array, DType};

use crate::codec::{Backend, CodecError};
use crate::config::CParams;
use crate::Error;

#[derive(Debug, PartialEq)]
/// An immutable, compressed run of elements of a single type.
///
/// A chunk always decompresses to exactly `len * itemsize` bytes. It is
/// never partially decompressed, reading a single value restores the
/// entire chunk.
pub struct Chunk {
    dtype: DType,
    len: usize,
    cparams: CParams,
    payload: Bytes,
}

impl Clone for Chunk {
    /// Copies the payload so the clone owns its own buffer.
    fn clone(&self) -> Self {
        Self {
            dtype: self.dtype,
            len: self.len,
            cparams: self.cparams,
            payload: Bytes::copy_from_slice(&self.payload),
        }
    }
}

impl Chunk {
    /// Compresses a buffer holding the native representation of
    /// `dtype` values.
    pub fn from_buffer(
        backend: &Backend,
        bytes: &[u8],
        dtype: DType,
        cparams: CParams,
    ) -> Result<Self, Error> {
        let itemsize = dtype.itemsize();
        if bytes.len() % itemsize != 0 {
            return Err(Error::InvalidParameter(format!(
                "buffer of {} bytes does not hold a whole number of {dtype} values",
                bytes.len(),
            )));
        }

        let payload = backend.compress(bytes, itemsize, cparams)?;
        Ok(Self {
            dtype,
            len: bytes.len() / itemsize,
            cparams,
            payload,
        })
    }

    /// Compresses the values of a dense array.
    pub fn from_array(backend: &Backend, array: &Array, cparams: CParams) -> Result<Self, Error> {
        Self::from_buffer(backend, &array.to_bytes(), array.dtype(), cparams)
    }

    /// Creates a chunk from an already compressed payload.
    pub(crate) fn from_parts(dtype: DType, len: usize, cparams: CParams, payload: Bytes) -> Self {
        Self {
            dtype,
            len,
            cparams,
            payload,
        }
    }

    #[inline]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    #[inline]
    /// The number of elements in the chunk.
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn cparams(&self) -> CParams {
        self.cparams
    }

    #[inline]
    /// The uncompressed size of the chunk in bytes.
    pub fn nbytes(&self) -> usize {
        self.len * self.dtype.itemsize()
    }

    #[inline]
    /// The compressed size of the chunk in bytes.
    pub fn cbytes(&self) -> usize {
        self.payload.len()
    }

    #[inline]
    pub(crate) fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// The memory held by the chunk including its bookkeeping.
    pub(crate) fn size_in_memory(&self) -> usize {
        mem::size_of::<Self>() + self.cbytes()
    }

    /// Restores the exact buffer the chunk was created from.
    pub fn decompress(&self, backend: &Backend) -> Result<Vec<u8>, CodecError> {
        backend.decompress(
            &self.payload,
            self.dtype.itemsize(),
            self.nbytes(),
            self.cparams,
        )
    }

    /// Restores the values of the chunk as a dense array.
    pub fn to_array(&self, backend: &Backend) -> Result<Array, Error> {
        let bytes = self.decompress(backend)?;
        Array::from_bytes(self.dtype, &bytes).ok_or(Error::Corrupted(CodecError::SizeMismatch {
            expected: self.nbytes(),
            actual: bytes.len(),
        }))
    }
}
