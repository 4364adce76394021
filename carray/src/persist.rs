//! Saving and loading arrays and tables as MessagePack documents.
//!
//! Chunk payloads are stored exactly as they are held in memory and are
//! only decompressed when they are read after loading.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use carray_types::{Array, DType};
use serde_derive::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::chunk::Chunk;
use crate::codec::Backend;
use crate::config::{ArrayOptions, CParams};
use crate::{CArray, CTable, Error};

#[derive(Serialize, Deserialize)]
struct ChunkRecord {
    len: usize,
    cparams: CParams,
    payload: Bytes,
}

#[derive(Serialize, Deserialize)]
struct ArrayRecord {
    dtype: DType,
    chunk_len: usize,
    cparams: CParams,
    len: usize,
    chunks: Vec<ChunkRecord>,
    /// The raw bytes of the leftover values.
    leftover: Bytes,
}

#[derive(Serialize, Deserialize)]
struct TableRecord {
    len: usize,
    cparams: CParams,
    columns: Vec<(String, ArrayRecord)>,
}

#[derive(Serialize, Deserialize)]
enum Document {
    Array(ArrayRecord),
    Table(TableRecord),
}

impl ArrayRecord {
    fn from_carray(carray: &CArray) -> Self {
        let chunks = carray
            .chunks()
            .iter()
            .map(|chunk| ChunkRecord {
                len: chunk.len(),
                cparams: chunk.cparams(),
                payload: chunk.payload().clone(),
            })
            .collect();

        Self {
            dtype: carray.dtype(),
            chunk_len: carray.chunk_len(),
            cparams: carray.cparams(),
            len: carray.len(),
            chunks,
            leftover: Bytes::from(carray.leftover().to_bytes()),
        }
    }

    fn into_carray(self, backend: Backend) -> Result<CArray, Error> {
        let leftover = Array::from_bytes(self.dtype, &self.leftover).ok_or_else(|| {
            Error::InvalidFormat(format!(
                "leftover of {} bytes does not hold whole {} values",
                self.leftover.len(),
                self.dtype,
            ))
        })?;

        let chunks = self
            .chunks
            .into_iter()
            .map(|chunk| {
                let cparams = chunk.cparams.validate()?;
                Ok(Chunk::from_parts(self.dtype, chunk.len, cparams, chunk.payload))
            })
            .collect::<Result<Vec<_>, Error>>()?;

        let carray = CArray::from_parts(
            self.dtype,
            self.chunk_len,
            self.cparams,
            chunks,
            leftover,
            backend,
        )?;
        if carray.len() != self.len {
            return Err(Error::InvalidFormat(format!(
                "array records {} values but holds {}",
                self.len,
                carray.len(),
            )));
        }
        Ok(carray)
    }
}

fn write_document(path: &Path, document: &Document) -> Result<(), Error> {
    let encoded = rmp_serde::to_vec_named(document)?;
    fs::write(path, &encoded)?;
    info!(path = %path.display(), num_bytes = encoded.len(), "Saved container");
    Ok(())
}

fn read_document(path: &Path) -> Result<Document, Error> {
    let encoded = fs::read(path)?;
    Ok(rmp_serde::from_slice(&encoded)?)
}

impl CArray {
    #[instrument(skip(self, path), fields(len = self.len()))]
    /// Writes the array to a file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        write_document(path.as_ref(), &Document::Array(ArrayRecord::from_carray(self)))
    }

    /// Loads an array written by [CArray::save] using the shared backend.
    pub fn open(path: impl AsRef<Path>) -> Result<CArray, Error> {
        Self::open_with_backend(path, Backend::shared())
    }

    #[instrument(skip_all)]
    /// Loads an array written by [CArray::save].
    pub fn open_with_backend(path: impl AsRef<Path>, backend: Backend) -> Result<CArray, Error> {
        match read_document(path.as_ref())? {
            Document::Array(record) => record.into_carray(backend),
            Document::Table(_) => Err(Error::InvalidFormat(
                "file holds a table, not an array".to_string(),
            )),
        }
    }
}

impl CTable {
    #[instrument(skip(self, path), fields(rows = self.len()))]
    /// Writes the table to a file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let columns = self
            .columns()
            .map(|(name, column)| (name.to_string(), ArrayRecord::from_carray(column)))
            .collect();
        let record = TableRecord {
            len: self.len(),
            cparams: self.options().cparams,
            columns,
        };
        write_document(path.as_ref(), &Document::Table(record))
    }

    /// Loads a table written by [CTable::save] using the shared backend.
    pub fn open(path: impl AsRef<Path>) -> Result<CTable, Error> {
        Self::open_with_backend(path, Backend::shared())
    }

    #[instrument(skip_all)]
    /// Loads a table written by [CTable::save].
    pub fn open_with_backend(path: impl AsRef<Path>, backend: Backend) -> Result<CTable, Error> {
        let record = match read_document(path.as_ref())? {
            Document::Table(record) => record,
            Document::Array(_) => {
                return Err(Error::InvalidFormat(
                    "file holds an array, not a table".to_string(),
                ))
            },
        };

        let options = ArrayOptions::builder()
            .cparams(record.cparams.validate()?)
            .backend(backend.clone())
            .build();
        let mut table = CTable::new(options);
        for (name, column) in record.columns {
            let column = column.into_carray(backend.clone())?;
            if table.num_columns() > 0 && column.len() != record.len {
                return Err(Error::InvalidFormat(format!(
                    "column {name:?} holds {} rows, expected {}",
                    column.len(),
                    record.len,
                )));
            }
            table
                .addcol(Arc::new(column), Some(name.as_str()), None)
                .map_err(|e| Error::InvalidFormat(e.to_string()))?;
        }

        if table.len() != record.len {
            return Err(Error::InvalidFormat(format!(
                "table records {} rows but holds {}",
                record.len,
                table.len(),
            )));
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use carray_types::Scalar;

    use super::*;
    use crate::codec::BackendOptions;

    fn backend() -> Backend {
        Backend::new(BackendOptions::builder().num_threads(1).build())
    }

    fn options() -> ArrayOptions {
        ArrayOptions::builder().chunk_len(64).backend(backend()).build()
    }

    #[test]
    fn test_array_save_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("array.carray");

        let values = Array::from((0..1000).map(|i| i as f64 * 0.5).collect::<Vec<_>>());
        let carray = CArray::from_array(&values, options()).unwrap();
        carray.save(&path).unwrap();

        let loaded = CArray::open_with_backend(&path, backend()).unwrap();
        assert_eq!(loaded.len(), 1000);
        assert_eq!(loaded.chunk_len(), 64);
        assert_eq!(loaded.cbytes(), carray.cbytes());
        assert_eq!(loaded.to_array().unwrap(), values);
    }

    #[test]
    fn test_table_save_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.ctable");

        let table = CTable::from_columns(
            [
                Array::from((0..200).collect::<Vec<i32>>()),
                Array::from((0..200).map(|i| i % 3 == 0).collect::<Vec<_>>()),
            ],
            Some(&["id", "flag"][..]),
            options(),
        )
        .unwrap();
        table.save(&path).unwrap();

        let loaded = CTable::open_with_backend(&path, backend()).unwrap();
        assert_eq!(loaded.names(), table.names());
        assert_eq!(loaded.len(), 200);
        assert_eq!(
            loaded.row(199).unwrap(),
            vec![Scalar::I32(199), Scalar::Bool(false)]
        );
        assert_eq!(loaded.rows(..).unwrap(), table.rows(..).unwrap());
    }

    #[test]
    fn test_open_wrong_kind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("array.carray");
        CArray::from_array(&Array::from(vec![1u8, 2, 3]), options())
            .unwrap()
            .save(&path)
            .unwrap();

        let err = CTable::open_with_backend(&path, backend()).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }

    #[test]
    fn test_open_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage");
        fs::write(&path, b"definitely not msgpack").unwrap();

        let err = CArray::open_with_backend(&path, backend()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Corruption);
    }

    #[test]
    fn test_invalid_layout_rejected() {
        let record = ArrayRecord {
            dtype: DType::I32,
            chunk_len: 4,
            cparams: CParams::default(),
            len: 6,
            chunks: Vec::new(),
            leftover: Bytes::from(vec![0u8; 24]),
        };
        let err = record.into_carray(backend()).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }

    #[rstest::rstest]
    #[case(0)]
    #[case(1)]
    fn test_oversized_layout_rejected(#[case] num_chunks: usize) {
        let chunk_len = usize::MAX / 4;
        let chunks = (0..num_chunks)
            .map(|_| ChunkRecord {
                len: chunk_len,
                cparams: CParams::default(),
                payload: Bytes::from_static(&[0; 16]),
            })
            .collect();
        let record = ArrayRecord {
            dtype: DType::F64,
            chunk_len,
            cparams: CParams::default(),
            len: num_chunks * chunk_len,
            chunks,
            leftover: Bytes::new(),
        };

        let err = record.into_carray(backend()).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)), "Got {err:?}");
    }

    #[test]
    fn test_payload_size_checked_on_open() {
        let backend = backend();
        let values = Array::from((0..64).collect::<Vec<i64>>());
        let chunk = Chunk::from_array(&backend, &values, CParams::default()).unwrap();

        let record = ArrayRecord {
            dtype: DType::I64,
            chunk_len: 1 << 16,
            cparams: CParams::default(),
            len: 1 << 16,
            chunks: vec![ChunkRecord {
                len: 1 << 16,
                cparams: CParams::default(),
                payload: chunk.payload().clone(),
            }],
            leftover: Bytes::new(),
        };

        let err = record.into_carray(backend).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)), "Got {err:?}");
    }
}
