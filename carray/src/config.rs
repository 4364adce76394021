use std::fmt::{Display, Formatter};

use bon::Builder;
use carray_types::DType;
use serde_derive::{Deserialize, Serialize};

use crate::codec::Backend;
use crate::Error;

/// The highest supported compression level.
pub const MAX_CLEVEL: u8 = 9;
const DEFAULT_CLEVEL: u8 = 5;

/// The uncompressed size targeted by a chunk when nothing is known about
/// the final size of the array.
const DEFAULT_CHUNK_BYTES: usize = 32 << 10;
const MIN_CHUNK_BYTES: usize = 16 << 10;
const MAX_CHUNK_BYTES: usize = 1 << 20;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// The compression parameters of a chunk or array.
pub struct CParams {
    clevel: u8,
    shuffle: bool,
}

impl Default for CParams {
    fn default() -> Self {
        Self {
            clevel: DEFAULT_CLEVEL,
            shuffle: true,
        }
    }
}

impl CParams {
    /// Creates a new set of compression parameters.
    ///
    /// `clevel` must be within `0..=9`, level `0` disables compression.
    pub fn new(clevel: u8, shuffle: bool) -> Result<Self, Error> {
        if clevel > MAX_CLEVEL {
            return Err(Error::InvalidParameter(format!(
                "compression level must be between 0 and {MAX_CLEVEL}, got {clevel}"
            )));
        }
        Ok(Self { clevel, shuffle })
    }

    #[inline]
    pub fn clevel(&self) -> u8 {
        self.clevel
    }

    #[inline]
    /// Whether the bytes are shuffled by position within their element
    /// before being compressed.
    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    pub(crate) fn validate(self) -> Result<Self, Error> {
        Self::new(self.clevel, self.shuffle)
    }
}

impl Display for CParams {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "cparams(clevel={}, shuffle={})", self.clevel, self.shuffle)
    }
}

#[derive(Debug, Clone, Builder)]
/// Options used when creating a new compressed array.
pub struct ArrayOptions {
    #[builder(default)]
    /// The compression parameters applied to every chunk.
    pub cparams: CParams,
    /// The number of elements held by each chunk.
    ///
    /// When unset the length is derived from `expected_len` and the
    /// element size.
    pub chunk_len: Option<usize>,
    /// A hint for the final number of elements in the array.
    ///
    /// Larger arrays get larger chunks which compress better, smaller
    /// arrays get smaller chunks which are cheaper to access randomly.
    pub expected_len: Option<usize>,
    #[builder(default = Backend::shared())]
    /// The compression backend used for the chunks of the array.
    pub backend: Backend,
}

impl Default for ArrayOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ArrayOptions {
    /// Returns the options with the given compression parameters.
    pub fn with_cparams(mut self, cparams: CParams) -> Self {
        self.cparams = cparams;
        self
    }

    /// Works out the number of elements held by each chunk.
    pub(crate) fn resolve_chunk_len(&self, dtype: DType) -> Result<usize, Error> {
        match self.chunk_len {
            Some(0) => Err(Error::InvalidParameter(
                "chunk length must be greater than zero".to_string(),
            )),
            Some(len) => Ok(len),
            None => Ok(chunk_len_for(dtype, self.expected_len)),
        }
    }
}

/// Computes the chunk length for the given element type.
///
/// Without a size hint chunks target 32 KiB of uncompressed data,
/// otherwise roughly 1/64th of the expected payload rounded up to a power
/// of two, between 16 KiB and 1 MiB.
pub fn chunk_len_for(dtype: DType, expected_len: Option<usize>) -> usize {
    let itemsize = dtype.itemsize();
    let target = match expected_len {
        None => DEFAULT_CHUNK_BYTES,
        Some(len) => (len.saturating_mul(itemsize) / 64)
            .max(1)
            .next_power_of_two()
            .clamp(MIN_CHUNK_BYTES, MAX_CHUNK_BYTES),
    };
    (target / itemsize).max(1)
}

#[derive(Debug, Copy, Clone, Default, Builder)]
/// Overrides applied when copying an array or table.
///
/// Unset fields inherit the parameters of the source.
pub struct CopyOptions {
    pub clevel: Option<u8>,
    pub shuffle: Option<bool>,
}

impl CopyOptions {
    /// Applies the overrides on top of the given parameters.
    pub(crate) fn apply(&self, base: CParams) -> Result<CParams, Error> {
        CParams::new(
            self.clevel.unwrap_or(base.clevel),
            self.shuffle.unwrap_or(base.shuffle),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest::rstest]
    #[case(DType::I32, None, 8192)]
    #[case(DType::F64, None, 4096)]
    #[case(DType::Bool, None, 32768)]
    #[case(DType::I32, Some(111), 4096)]
    #[case(DType::F64, Some(10_000_000), 131_072)]
    #[case(DType::U8, Some(usize::MAX), 1 << 20)]
    fn test_chunk_len_for(
        #[case] dtype: DType,
        #[case] expected_len: Option<usize>,
        #[case] chunk_len: usize,
    ) {
        assert_eq!(chunk_len_for(dtype, expected_len), chunk_len);
    }

    #[test]
    fn test_cparams_validation() {
        assert!(CParams::new(9, false).is_ok());
        assert!(matches!(
            CParams::new(10, true),
            Err(Error::InvalidParameter(_))
        ));
        assert_eq!(CParams::default().clevel(), 5);
        assert!(CParams::default().shuffle());
    }

    #[test]
    fn test_copy_options_inherit() {
        let base = CParams::new(3, true).unwrap();
        let applied = CopyOptions::builder().clevel(9).build().apply(base).unwrap();
        assert_eq!(applied, CParams::new(9, true).unwrap());

        let applied = CopyOptions::default().apply(base).unwrap();
        assert_eq!(applied, base);
    }

    #[test]
    fn test_explicit_chunk_len() {
        let options = ArrayOptions::builder().chunk_len(10).build();
        assert_eq!(options.resolve_chunk_len(DType::F64).unwrap(), 10);

        let options = ArrayOptions::builder().chunk_len(0).build();
        assert!(options.resolve_chunk_len(DType::F64).is_err());
    }
}
