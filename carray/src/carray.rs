use std::borrow::Cow;
use std::fmt::{Display, Formatter};
use std::mem;
use std::ops::Range;

use carray_types::{Array, DType, Element, Scalar, Slice};
use tracing::{debug, instrument};

use crate::chunk::Chunk;
use crate::codec::{self, Backend};
use crate::config::{ArrayOptions, CParams, CopyOptions};
use crate::Error;

/// Values shown at each end of an abbreviated display.
const DISPLAY_EDGE_ITEMS: usize = 3;

#[derive(Debug, Clone)]
/// A chunked, compressed array of values of a single type.
///
/// Values are held in a sequence of equally sized compressed [Chunk]s
/// followed by an uncompressed leftover buffer holding the tail that does
/// not yet fill a whole chunk. Reads only decompress the chunks they touch.
///
/// The array only ever grows through [CArray::append], which is failure
/// atomic: on error the array is left exactly as it was.
pub struct CArray {
    dtype: DType,
    /// The number of elements held by every chunk.
    chunk_len: usize,
    cparams: CParams,
    chunks: Vec<Chunk>,
    /// The values that do not fill a whole chunk yet.
    ///
    /// Always shorter than `chunk_len`.
    leftover: Array,
    len: usize,
    /// The running total of the compressed size of all chunks.
    chunk_cbytes: usize,
    backend: Backend,
}

/// Chunks and leftover computed by an append that has not been applied yet.
pub(crate) struct StagedAppend {
    chunks: Vec<Chunk>,
    leftover: Array,
    added: usize,
}

impl CArray {
    /// Creates a new empty array of the given type.
    pub fn new(dtype: DType, options: ArrayOptions) -> Result<Self, Error> {
        let cparams = options.cparams.validate()?;
        let chunk_len = options.resolve_chunk_len(dtype)?;
        Ok(Self {
            dtype,
            chunk_len,
            cparams,
            chunks: Vec::new(),
            leftover: Array::with_capacity(dtype, chunk_len),
            len: 0,
            chunk_cbytes: 0,
            backend: options.backend,
        })
    }

    /// Compresses the values of a dense array.
    ///
    /// Unless set explicitly, the length of the array is used as the
    /// expected length when sizing the chunks.
    pub fn from_array(array: &Array, mut options: ArrayOptions) -> Result<Self, Error> {
        if options.expected_len.is_none() {
            options.expected_len = Some(array.len());
        }
        let mut carray = Self::new(array.dtype(), options)?;
        carray.append(array)?;
        Ok(carray)
    }

    /// Compresses the values produced by an iterator.
    ///
    /// Values are buffered one chunk at a time, the input is never
    /// materialised as a whole.
    pub fn from_values<T, I>(values: I, options: ArrayOptions) -> Result<Self, Error>
    where
        T: Element,
        I: IntoIterator<Item = T>,
    {
        let mut carray = Self::new(T::DTYPE, options)?;
        let mut buffer = Vec::with_capacity(carray.chunk_len);
        for value in values {
            buffer.push(value);
            if buffer.len() == carray.chunk_len {
                let block = mem::replace(&mut buffer, Vec::with_capacity(carray.chunk_len));
                carray.append(&Array::from(block))?;
            }
        }
        carray.append(&Array::from(buffer))?;
        Ok(carray)
    }

    /// Reassembles an array from its parts, validating the layout.
    pub(crate) fn from_parts(
        dtype: DType,
        chunk_len: usize,
        cparams: CParams,
        chunks: Vec<Chunk>,
        leftover: Array,
        backend: Backend,
    ) -> Result<Self, Error> {
        let cparams = cparams.validate()?;
        if chunk_len == 0 {
            return Err(Error::InvalidFormat("chunk length is zero".to_string()));
        }
        if leftover.dtype() != dtype || leftover.len() >= chunk_len {
            return Err(Error::InvalidFormat(format!(
                "leftover of {} {} values does not fit {dtype} chunks of {chunk_len}",
                leftover.len(),
                leftover.dtype(),
            )));
        }
        if let Some(chunk) = chunks
            .iter()
            .find(|chunk| chunk.dtype() != dtype || chunk.len() != chunk_len)
        {
            return Err(Error::InvalidFormat(format!(
                "chunk of {} {} values does not fit {dtype} chunks of {chunk_len}",
                chunk.len(),
                chunk.dtype(),
            )));
        }

        let itemsize = dtype.itemsize();
        let chunk_nbytes = chunk_len.checked_mul(itemsize);
        let len = chunks
            .len()
            .checked_mul(chunk_len)
            .and_then(|len| len.checked_add(leftover.len()))
            .filter(|len| len.checked_mul(itemsize).is_some());
        let (Some(chunk_nbytes), Some(len)) = (chunk_nbytes, len) else {
            return Err(Error::InvalidFormat(format!(
                "{} chunks of {chunk_len} {dtype} values overflow the addressable size",
                chunks.len(),
            )));
        };

        for (i, chunk) in chunks.iter().enumerate() {
            codec::check_payload(chunk.payload(), chunk_nbytes, chunk.cparams()).map_err(|e| {
                Error::InvalidFormat(format!("chunk {i} has an invalid payload: {e}"))
            })?;
        }

        let chunk_cbytes = chunks.iter().map(Chunk::cbytes).sum();
        Ok(Self {
            dtype,
            chunk_len,
            cparams,
            len,
            chunks,
            leftover,
            chunk_cbytes,
            backend,
        })
    }

    #[inline]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    #[inline]
    /// The total number of values.
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    /// The number of values held by each chunk.
    pub fn chunk_len(&self) -> usize {
        self.chunk_len
    }

    #[inline]
    pub fn cparams(&self) -> CParams {
        self.cparams
    }

    #[inline]
    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    #[inline]
    pub fn num_chunks(&self) -> usize {
        self.chunks.len()
    }

    #[inline]
    pub(crate) fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    #[inline]
    pub(crate) fn leftover(&self) -> &Array {
        &self.leftover
    }

    #[inline]
    /// The uncompressed size of all values in bytes.
    pub fn nbytes(&self) -> usize {
        self.len * self.dtype.itemsize()
    }

    #[inline]
    /// The compressed size of all values in bytes.
    ///
    /// The leftover has not been compressed yet and counts at its
    /// uncompressed size.
    pub fn cbytes(&self) -> usize {
        self.chunk_cbytes + self.leftover.nbytes()
    }

    /// The memory held by the array including its bookkeeping.
    pub fn size_in_memory(&self) -> usize {
        mem::size_of::<Self>()
            + self.chunks.iter().map(Chunk::size_in_memory).sum::<usize>()
            + self.leftover.nbytes()
    }

    /// Appends the values of a dense array.
    ///
    /// The values must be of the same type as the array or safely castable
    /// to it, otherwise [Error::TypeMismatch] is returned and the array is
    /// left untouched.
    pub fn append(&mut self, values: &Array) -> Result<(), Error> {
        let staged = self.stage_append(values)?;
        self.commit(staged);
        Ok(())
    }

    /// Appends all values of another compressed array.
    pub fn extend_from(&mut self, other: &CArray) -> Result<(), Error> {
        self.append(&other.to_array()?)
    }

    /// Compresses the chunks an append would produce without modifying
    /// the array.
    pub(crate) fn stage_append(&self, values: &Array) -> Result<StagedAppend, Error> {
        let values = if values.dtype() == self.dtype {
            Cow::Borrowed(values)
        } else {
            Cow::Owned(values.cast(self.dtype)?)
        };

        let mut pending = self.leftover.clone();
        pending.extend(&values)?;

        let num_full = pending.len() / self.chunk_len;
        let mut chunks = Vec::with_capacity(num_full);
        for i in 0..num_full {
            let block = pending.slice(i * self.chunk_len..(i + 1) * self.chunk_len);
            chunks.push(Chunk::from_array(&self.backend, &block, self.cparams)?);
        }

        let leftover = if num_full == 0 {
            pending
        } else {
            pending.slice(num_full * self.chunk_len..pending.len())
        };

        Ok(StagedAppend {
            chunks,
            leftover,
            added: values.len(),
        })
    }

    /// Applies a previously staged append.
    pub(crate) fn commit(&mut self, staged: StagedAppend) {
        if !staged.chunks.is_empty() {
            debug!(
                dtype = %self.dtype,
                num_chunks = staged.chunks.len(),
                chunk_len = self.chunk_len,
                "Compressed chunks",
            );
        }

        self.chunk_cbytes += staged.chunks.iter().map(Chunk::cbytes).sum::<usize>();
        self.chunks.extend(staged.chunks);
        self.leftover = staged.leftover;
        self.len += staged.added;
    }

    /// Returns the value at the given position.
    ///
    /// Only the chunk holding the value is decompressed.
    pub fn get(&self, index: usize) -> Result<Scalar, Error> {
        let out_of_range = Error::IndexOutOfRange {
            index,
            len: self.len,
        };
        if index >= self.len {
            return Err(out_of_range);
        }

        let chunked = self.chunked_len();
        let value = if index >= chunked {
            self.leftover.get(index - chunked)
        } else {
            let chunk = &self.chunks[index / self.chunk_len];
            chunk.to_array(&self.backend)?.get(index % self.chunk_len)
        };
        value.ok_or(out_of_range)
    }

    /// Returns the values within `start..stop`.
    pub fn get_range(&self, start: usize, stop: usize) -> Result<Array, Error> {
        if start > stop || stop > self.len {
            return Err(Error::IndexOutOfRange {
                index: stop.max(start),
                len: self.len,
            });
        }
        self.read_span(start..stop)
    }

    /// Returns the values selected by a slice, in slice order.
    ///
    /// Negative bounds and steps follow the usual sequence semantics and
    /// out of range bounds are clamped, so an empty selection is never
    /// an error.
    pub fn get_slice(&self, slice: impl Into<Slice>) -> Result<Array, Error> {
        let indices = slice.into().indices(self.len)?;
        if indices.count == 0 {
            return Ok(Array::empty(self.dtype));
        }

        let span = indices.span();
        let dense = self.read_span(span.clone())?;
        if indices.step == 1 {
            return Ok(dense);
        }
        Ok(dense.stride(
            indices.start - span.start,
            indices.step as isize,
            indices.count,
        ))
    }

    /// Decompresses all values into a dense array.
    pub fn to_array(&self) -> Result<Array, Error> {
        self.read_span(0..self.len)
    }

    /// Iterates over the contents of each chunk followed by the leftover.
    pub fn blocks(&self) -> impl Iterator<Item = Result<Array, Error>> + '_ {
        let leftover = (!self.leftover.is_empty()).then(|| Ok(self.leftover.clone()));
        self.chunks
            .iter()
            .map(|chunk| chunk.to_array(&self.backend))
            .chain(leftover)
    }

    /// Keeps the values whose mask entry is `true`.
    ///
    /// Chunks where the mask selects nothing are never decompressed.
    pub fn filter(&self, mask: &[bool]) -> Result<Array, Error> {
        if mask.len() != self.len {
            return Err(Error::LengthMismatch {
                expected: self.len,
                actual: mask.len(),
            });
        }

        let mut selected = Array::empty(self.dtype);
        for (i, chunk) in self.chunks.iter().enumerate() {
            let window = &mask[i * self.chunk_len..(i + 1) * self.chunk_len];
            if window.iter().any(|keep| *keep) {
                selected.extend(&chunk.to_array(&self.backend)?.filter(window))?;
            }
        }

        let window = &mask[self.chunked_len()..];
        if window.iter().any(|keep| *keep) {
            selected.extend(&self.leftover.filter(window))?;
        }
        Ok(selected)
    }

    #[instrument(skip_all, fields(dtype = %self.dtype, len = self.len))]
    /// Creates an independent copy of the array.
    ///
    /// Every chunk is rebuilt from its decompressed content with the
    /// compression parameters of `options`, defaulting to those of this
    /// array.
    pub fn copy(&self, options: CopyOptions) -> Result<CArray, Error> {
        let cparams = options.apply(self.cparams)?;
        let chunks = self
            .chunks
            .iter()
            .map(|chunk| {
                let values = chunk.to_array(&self.backend)?;
                Chunk::from_array(&self.backend, &values, cparams)
            })
            .collect::<Result<Vec<_>, Error>>()?;

        debug!(num_chunks = chunks.len(), %cparams, "Copied array");

        let chunk_cbytes = chunks.iter().map(Chunk::cbytes).sum();
        Ok(CArray {
            dtype: self.dtype,
            chunk_len: self.chunk_len,
            cparams,
            chunks,
            leftover: self.leftover.clone(),
            len: self.len,
            chunk_cbytes,
            backend: self.backend.clone(),
        })
    }

    #[inline]
    /// The number of values held in chunks.
    fn chunked_len(&self) -> usize {
        self.chunks.len() * self.chunk_len
    }

    /// Decompresses the chunks overlapping `range` and gathers its values.
    fn read_span(&self, range: Range<usize>) -> Result<Array, Error> {
        let mut out = Array::with_capacity(self.dtype, range.len());
        if range.is_empty() {
            return Ok(out);
        }

        let chunked = self.chunked_len();
        if range.start < chunked {
            let first = range.start / self.chunk_len;
            let last = (range.end.min(chunked) - 1) / self.chunk_len;
            for i in first..=last {
                let offset = i * self.chunk_len;
                let start = range.start.max(offset) - offset;
                let stop = range.end.min(offset + self.chunk_len) - offset;

                let values = self.chunks[i].to_array(&self.backend)?;
                if start == 0 && stop == self.chunk_len {
                    out.extend(&values)?;
                } else {
                    out.extend(&values.slice(start..stop))?;
                }
            }
        }

        if range.end > chunked {
            let start = range.start.max(chunked) - chunked;
            let stop = range.end - chunked;
            out.extend(&self.leftover.slice(start..stop))?;
        }

        Ok(out)
    }
}

impl TryFrom<Array> for CArray {
    type Error = Error;

    fn try_from(array: Array) -> Result<Self, Self::Error> {
        Self::from_array(&array, ArrayOptions::default())
    }
}

impl Display for CArray {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let ratio = if self.cbytes() == 0 {
            0.0
        } else {
            self.nbytes() as f64 / self.cbytes() as f64
        };
        writeln!(f, "carray(({},), {})", self.len, self.dtype)?;
        writeln!(
            f,
            "  nbytes: {}; cbytes: {}; ratio: {ratio:.2}",
            self.nbytes(),
            self.cbytes(),
        )?;
        writeln!(f, "  {}", self.cparams)?;

        let preview = if self.len <= DISPLAY_EDGE_ITEMS * 2 {
            self.to_array().map(|values| values.to_string())
        } else {
            preview_edges(self)
        };
        match preview {
            Ok(values) => write!(f, "{values}"),
            Err(e) => write!(f, "[<unreadable: {e}>]"),
        }
    }
}

fn preview_edges(carray: &CArray) -> Result<String, Error> {
    let head = carray.get_range(0, DISPLAY_EDGE_ITEMS)?;
    let tail = carray.get_range(carray.len() - DISPLAY_EDGE_ITEMS, carray.len())?;
    let join = |values: &Array| {
        values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    };
    Ok(format!("[{}, ..., {}]", join(&head), join(&tail)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::BackendOptions;

    fn options(chunk_len: usize) -> ArrayOptions {
        ArrayOptions::builder()
            .chunk_len(chunk_len)
            .backend(Backend::new(BackendOptions::builder().num_threads(1).build()))
            .build()
    }

    fn arange_i32(n: i32) -> Array {
        Array::from((0..n).collect::<Vec<_>>())
    }

    #[rstest::rstest]
    #[case(Array::from((0..1000).map(|i| i % 2 == 0).collect::<Vec<_>>()))]
    #[case(Array::from((0..1000).map(|i| (i % 100) as i8).collect::<Vec<_>>()))]
    #[case(Array::from((0..1000).map(|i| i as i16 - 500).collect::<Vec<_>>()))]
    #[case(arange_i32(1000))]
    #[case(Array::from((0..1000).map(|i| i * 1_000_000_007i64).collect::<Vec<_>>()))]
    #[case(Array::from((0..1000).map(|i| (i % 256) as u8).collect::<Vec<_>>()))]
    #[case(Array::from((0..1000).map(|i| i as u16).collect::<Vec<_>>()))]
    #[case(Array::from((0..1000).map(|i| i as u32 * 3).collect::<Vec<_>>()))]
    #[case(Array::from((0..1000).map(|i| u64::MAX - i).collect::<Vec<_>>()))]
    #[case(Array::from((0..1000).map(|i| i as f32 * 0.25).collect::<Vec<_>>()))]
    #[case(Array::from((0..1000).map(|i| (i as f64).sqrt()).collect::<Vec<_>>()))]
    fn test_roundtrip(
        #[case] array: Array,
        #[values(0, 1, 2, 3, 4, 5, 6, 7, 8, 9)] clevel: u8,
        #[values(true, false)] shuffle: bool,
    ) {
        let cparams = CParams::new(clevel, shuffle).unwrap();
        let carray = CArray::from_array(&array, options(128).with_cparams(cparams)).unwrap();

        assert_eq!(carray.len(), 1000);
        assert_eq!(carray.num_chunks(), 7);
        assert_eq!(carray.leftover().len(), 1000 - 7 * 128);
        assert_eq!(carray.nbytes(), array.nbytes());
        assert_eq!(carray.to_array().unwrap(), array);
    }

    #[test]
    fn test_append_is_associative() {
        let a = arange_i32(150);
        let b = Array::from((150..420).collect::<Vec<i32>>());

        let mut split = CArray::new(DType::I32, options(64)).unwrap();
        split.append(&a).unwrap();
        split.append(&b).unwrap();

        let mut joined = a.clone();
        joined.extend(&b).unwrap();
        let whole = CArray::from_array(&joined, options(64)).unwrap();

        assert_eq!(split.len(), whole.len());
        assert_eq!(split.num_chunks(), whole.num_chunks());
        assert_eq!(split.to_array().unwrap(), whole.to_array().unwrap());
        assert_eq!(split.cbytes(), whole.cbytes());
    }

    #[test]
    fn test_append_type_mismatch_is_atomic() {
        let mut carray = CArray::from_array(&arange_i32(100), options(64)).unwrap();
        let before = (carray.len(), carray.num_chunks(), carray.cbytes());

        let err = carray.append(&Array::from(vec![0.5f64; 100])).unwrap_err();
        assert!(matches!(
            err,
            Error::TypeMismatch {
                from: DType::F64,
                to: DType::I32
            }
        ));
        assert_eq!((carray.len(), carray.num_chunks(), carray.cbytes()), before);

        carray.append(&Array::from(vec![7i16; 30])).expect("i16 widens to i32");
        assert_eq!(carray.len(), 130);
        assert_eq!(carray.get(129).unwrap(), Scalar::I32(7));
    }

    #[test]
    fn test_get() {
        let carray = CArray::from_array(&arange_i32(300), options(64)).unwrap();
        assert_eq!(carray.get(0).unwrap(), Scalar::I32(0));
        assert_eq!(carray.get(63).unwrap(), Scalar::I32(63));
        assert_eq!(carray.get(64).unwrap(), Scalar::I32(64));
        assert_eq!(carray.get(299).unwrap(), Scalar::I32(299));
        assert!(matches!(
            carray.get(300),
            Err(Error::IndexOutOfRange { index: 300, len: 300 })
        ));
    }

    #[rstest::rstest]
    #[case(Slice::full())]
    #[case(Slice::from(10..200))]
    #[case(Slice::from(60..70))]
    #[case(Slice::from(250..))]
    #[case(Slice::from(..5))]
    #[case(Slice::from(3..290).with_step(7))]
    #[case(Slice::full().with_step(-1))]
    #[case(Slice::new(Some(-10), None, Some(-3)))]
    #[case(Slice::new(Some(280), Some(5), Some(-64)))]
    #[case(Slice::new(Some(500), Some(600), None))]
    #[case(Slice::new(Some(100), Some(50), None))]
    fn test_get_slice(#[case] slice: Slice) {
        let dense: Vec<i32> = (0..300).collect();
        let carray = CArray::from_array(&Array::from(dense.clone()), options(64)).unwrap();

        let expected: Vec<i32> = slice.indices(300).unwrap().iter().map(|i| dense[i]).collect();
        let actual = carray.get_slice(slice).unwrap();
        assert_eq!(actual, Array::from(expected), "Slice {slice:?}");
    }

    #[test]
    fn test_get_range() {
        let carray = CArray::from_array(&arange_i32(300), options(64)).unwrap();
        assert_eq!(carray.get_range(62, 66).unwrap(), Array::from(vec![62i32, 63, 64, 65]));
        assert_eq!(carray.get_range(5, 5).unwrap(), Array::from(Vec::<i32>::new()));
        assert!(carray.get_range(10, 301).is_err());
    }

    #[test]
    fn test_filter() {
        let carray = CArray::from_array(&arange_i32(300), options(64)).unwrap();
        let mask: Vec<bool> = (0..300).map(|i| i % 97 == 0 || i == 299).collect();
        assert_eq!(
            carray.filter(&mask).unwrap(),
            Array::from(vec![0i32, 97, 194, 291, 299])
        );

        let err = carray.filter(&mask[1..]).unwrap_err();
        assert!(matches!(
            err,
            Error::LengthMismatch {
                expected: 300,
                actual: 299
            }
        ));
    }

    #[test]
    fn test_blocks() {
        let carray = CArray::from_array(&arange_i32(150), options(64)).unwrap();
        let blocks = carray.blocks().collect::<Result<Vec<_>, _>>().unwrap();
        let lens: Vec<usize> = blocks.iter().map(Array::len).collect();
        assert_eq!(lens, vec![64, 64, 22]);
    }

    #[test]
    fn test_size_accounting() {
        let carray = CArray::from_array(&arange_i32(40), options(64)).unwrap();
        assert_eq!(carray.num_chunks(), 0);
        assert_eq!(carray.cbytes(), carray.nbytes());
        assert!(carray.size_in_memory() > carray.nbytes());

        let carray = CArray::from_array(&arange_i32(10_000), options(1024)).unwrap();
        assert!(carray.cbytes() < carray.nbytes());
    }

    #[test]
    fn test_copy() {
        let values = Array::from((0..20_000).map(|i| (i * i % 1000) as i64).collect::<Vec<_>>());
        let low = CArray::from_array(
            &values,
            options(4096).with_cparams(CParams::new(1, true).unwrap()),
        )
        .unwrap();

        let high = low.copy(CopyOptions::builder().clevel(9).build()).unwrap();
        assert_eq!(high.cparams(), CParams::new(9, true).unwrap());
        assert_eq!(high.to_array().unwrap(), values);
        assert!(high.cbytes() <= low.cbytes());

        let unshuffled = low.copy(CopyOptions::builder().shuffle(false).build()).unwrap();
        assert_eq!(unshuffled.cparams(), CParams::new(1, false).unwrap());
        assert_eq!(unshuffled.to_array().unwrap(), values);

        let ints = CArray::from_array(
            &Array::from((0..20_000).collect::<Vec<i64>>()),
            options(4096).with_cparams(CParams::new(5, false).unwrap()),
        )
        .unwrap();
        let shuffled = ints.copy(CopyOptions::builder().shuffle(true).build()).unwrap();
        assert!(shuffled.cbytes() < ints.cbytes());
    }

    #[test]
    fn test_cbytes_never_grow_with_clevel() {
        let values: Array = (0..10_000).map(|i| (i as f64).powf(2.2)).collect();
        let base = CArray::from_array(&values, options(2048)).unwrap();

        let mut previous = usize::MAX;
        for clevel in 1..=crate::config::MAX_CLEVEL {
            let copy = base.copy(CopyOptions::builder().clevel(clevel).build()).unwrap();
            assert!(
                copy.cbytes() <= previous,
                "clevel {clevel} holds {} bytes, the level below {previous}",
                copy.cbytes(),
            );
            previous = copy.cbytes();
        }
    }

    #[test]
    fn test_from_values() {
        let carray = CArray::from_values((0..1000u32).map(|i| i * 2), options(100)).unwrap();
        assert_eq!(carray.dtype(), DType::U32);
        assert_eq!(carray.num_chunks(), 10);
        assert_eq!(carray.len(), 1000);
        assert_eq!(carray.get(999).unwrap(), Scalar::U32(1998));
    }

    #[test]
    fn test_display() {
        let carray = CArray::from_array(&arange_i32(10), options(64)).unwrap();
        let rendered = carray.to_string();
        assert!(rendered.starts_with("carray((10,), int32)\n"), "{rendered}");
        assert!(rendered.contains("nbytes: 40; cbytes: 40; ratio: 1.00"));
        assert!(rendered.ends_with("[0, 1, 2, ..., 7, 8, 9]"), "{rendered}");
    }
}
