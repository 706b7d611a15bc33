pub mod reader;
pub mod timestamp;

pub use reader::{read_rows, read_rows_from, RawRow, ReaderError};
pub use timestamp::{
    CanonicalTimestamp, Component, FieldOrder, Normalized, TimestampError, TimestampNormalizer,
};
