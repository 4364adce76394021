//! Chunked, compressed arrays and tables.
//!
//! A [CArray] keeps a large array compressed in fixed size chunks and only
//! decompresses the chunks touched by a read. A [CTable] composes a set of
//! equally long, named [CArray] columns into a table supporting schema
//! edits, row appends and filtering rows with string expressions:
//!
//! ```
//! use carray::{ArrayOptions, CTable};
//! use carray_expr::Bindings;
//! use carray_types::Array;
//!
//! let table = CTable::from_columns(
//!     [
//!         Array::from((0..10).collect::<Vec<i32>>()),
//!         Array::from((0..10).map(|i| i as f64 * 2.0).collect::<Vec<_>>()),
//!     ],
//!     None,
//!     ArrayOptions::default(),
//! )
//! .unwrap();
//!
//! let product = table.eval("f0 * f1", &Bindings::new()).unwrap();
//! assert_eq!(product.get(3).unwrap().as_f64(), 18.0);
//!
//! let rows = table.filter("f0 >= f1").unwrap();
//! assert_eq!(rows.len(), 1);
//! ```

mod bridge;
mod carray;
mod chunk;
mod codec;
mod config;
mod error;
mod persist;
mod table;

pub use self::carray::CArray;
pub use self::chunk::Chunk;
pub use self::codec::{available_cores, Backend, BackendOptions, CodecError};
pub use self::config::{chunk_len_for, ArrayOptions, CParams, CopyOptions, MAX_CLEVEL};
pub use self::error::{Error, ErrorKind};
pub use self::table::{
    next_default_name,
    AppendSource,
    CTable,
    ColumnRef,
    ColumnSource,
    Key,
    Selection,
};
