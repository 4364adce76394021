//! The block compression backend used by chunks.
//!
//! Chunks are compressed with zstd after an optional byte shuffle which
//! groups the n-th byte of every element together, this greatly improves
//! the compression ratio of numeric data where the high bytes rarely change.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use bon::Builder;
use bytes::Bytes;
use tracing::info;
use zstd::stream::raw::CParameter;

use crate::config::CParams;

/// The zstd level used for each compression level, level `0` stores the
/// data uncompressed.
const ZSTD_LEVELS: [i32; 10] = [0, 1, 3, 5, 7, 9, 11, 13, 15, 19];

#[derive(Debug, thiserror::Error)]
/// An error raised by the compression backend.
pub enum CodecError {
    #[error("compression failed: {0}")]
    Compress(io::Error),
    #[error("decompression failed: {0}")]
    /// The payload could not be decompressed, it is most likely corrupted.
    Decompress(io::Error),
    #[error("payload restored to {actual} bytes, expected {expected}")]
    /// The payload decompressed to a different size than was recorded
    /// when it was compressed.
    SizeMismatch { expected: usize, actual: usize },
}

/// Returns the number of cores available to the process.
pub fn available_cores() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[derive(Debug, Builder)]
/// Configuration options for creating a compression [Backend].
pub struct BackendOptions {
    #[builder(default = available_cores())]
    /// The number of worker threads used to compress a single chunk.
    ///
    /// When this is `1` compression happens on the calling thread.
    num_threads: usize,
}

#[derive(Debug, Clone)]
/// A handle on the compression backend configuration.
///
/// Handles are cheap to clone and all clones share the same configuration,
/// so changing the thread count on one is visible to every array holding
/// a clone.
pub struct Backend {
    num_threads: Arc<AtomicUsize>,
}

impl Default for Backend {
    fn default() -> Self {
        Self::shared()
    }
}

impl Backend {
    /// Creates a new backend with its own configuration.
    pub fn new(options: BackendOptions) -> Self {
        Self {
            num_threads: Arc::new(AtomicUsize::new(options.num_threads.max(1))),
        }
    }

    /// Returns the process wide backend.
    ///
    /// Arrays are created with this backend unless another one is given.
    pub fn shared() -> Self {
        static SHARED: OnceLock<Backend> = OnceLock::new();
        SHARED
            .get_or_init(|| Backend::new(BackendOptions::builder().build()))
            .clone()
    }

    #[inline]
    pub fn num_threads(&self) -> usize {
        self.num_threads.load(Ordering::Relaxed)
    }

    /// Sets the number of compression threads, returning the previous value.
    ///
    /// When a multithreaded expression evaluation runs alongside compression
    /// it is best to give each half of the available cores.
    pub fn set_num_threads(&self, num_threads: usize) -> usize {
        let num_threads = num_threads.max(1);
        let previous = self.num_threads.swap(num_threads, Ordering::Relaxed);
        info!(previous, num_threads, "Set compression threads");
        previous
    }

    /// Compresses a buffer of elements `typesize` bytes wide.
    ///
    /// zstd does not always produce smaller output at higher levels, so
    /// the zstd levels of every lower compression level are tried as well
    /// and the smallest payload is kept. Raising `clevel` therefore never
    /// grows a chunk.
    pub fn compress(
        &self,
        bytes: &[u8],
        typesize: usize,
        cparams: CParams,
    ) -> Result<Bytes, CodecError> {
        let shuffled;
        let input = if cparams.shuffle() && typesize > 1 {
            shuffled = shuffle(bytes, typesize);
            shuffled.as_slice()
        } else {
            bytes
        };

        let clevel = cparams.clevel() as usize;
        if clevel == 0 {
            return Ok(Bytes::copy_from_slice(input));
        }

        let mut compressor = zstd::bulk::Compressor::new(ZSTD_LEVELS[1])
            .map_err(CodecError::Compress)?;

        let num_threads = self.num_threads();
        if num_threads > 1 {
            compressor
                .set_parameter(CParameter::NbWorkers(num_threads as u32))
                .map_err(CodecError::Compress)?;
        }

        let mut smallest: Option<Vec<u8>> = None;
        for &level in &ZSTD_LEVELS[1..=clevel] {
            compressor
                .set_compression_level(level)
                .map_err(CodecError::Compress)?;
            let compressed = compressor.compress(input).map_err(CodecError::Compress)?;
            if smallest
                .as_ref()
                .map_or(true, |best| compressed.len() < best.len())
            {
                smallest = Some(compressed);
            }
        }

        Ok(smallest.map(Bytes::from).unwrap_or_default())
    }

    /// Restores a buffer produced by [Backend::compress].
    ///
    /// The restored buffer must be exactly `expected_len` bytes long.
    pub fn decompress(
        &self,
        payload: &[u8],
        typesize: usize,
        expected_len: usize,
        cparams: CParams,
    ) -> Result<Vec<u8>, CodecError> {
        check_payload(payload, expected_len, cparams)?;

        let raw = if cparams.clevel() == 0 {
            payload.to_vec()
        } else {
            zstd::bulk::decompress(payload, expected_len).map_err(CodecError::Decompress)?
        };

        if raw.len() != expected_len {
            return Err(CodecError::SizeMismatch {
                expected: expected_len,
                actual: raw.len(),
            });
        }

        if cparams.shuffle() && typesize > 1 {
            Ok(unshuffle(&raw, typesize))
        } else {
            Ok(raw)
        }
    }
}

/// Checks the size a payload restores to without decompressing it.
///
/// Raw payloads must be exactly `expected_len` bytes, zstd frames must not
/// record a different content size in their header.
pub(crate) fn check_payload(
    payload: &[u8],
    expected_len: usize,
    cparams: CParams,
) -> Result<(), CodecError> {
    let recorded = if cparams.clevel() == 0 {
        Some(payload.len() as u64)
    } else {
        zstd::zstd_safe::get_frame_content_size(payload).map_err(|_| {
            CodecError::Decompress(io::Error::new(
                io::ErrorKind::InvalidData,
                "payload does not start with a zstd frame header",
            ))
        })?
    };

    match recorded {
        Some(actual) if actual != expected_len as u64 => Err(CodecError::SizeMismatch {
            expected: expected_len,
            actual: usize::try_from(actual).unwrap_or(usize::MAX),
        }),
        _ => Ok(()),
    }
}

/// Transposes the bytes of a buffer so the n-th byte of every element
/// is stored contiguously.
///
/// Trailing bytes that do not form a whole element are kept in place.
pub(crate) fn shuffle(bytes: &[u8], typesize: usize) -> Vec<u8> {
    let count = bytes.len() / typesize;
    let body = count * typesize;

    let mut out = vec![0u8; bytes.len()];
    for (i, element) in bytes[..body].chunks_exact(typesize).enumerate() {
        for (j, byte) in element.iter().enumerate() {
            out[j * count + i] = *byte;
        }
    }
    out[body..].copy_from_slice(&bytes[body..]);
    out
}

/// Reverses [shuffle].
pub(crate) fn unshuffle(bytes: &[u8], typesize: usize) -> Vec<u8> {
    let count = bytes.len() / typesize;
    let body = count * typesize;

    let mut out = vec![0u8; bytes.len()];
    for (i, element) in out[..body].chunks_exact_mut(typesize).enumerate() {
        for (j, byte) in element.iter_mut().enumerate() {
            *byte = bytes[j * count + i];
        }
    }
    out[body..].copy_from_slice(&bytes[body..]);
    out
}
