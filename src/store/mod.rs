pub mod bucket;
pub mod filter;
pub mod record;

pub use bucket::{bucketize, BucketKey, Buckets, Granularity, InvalidGranularity};
pub use filter::{Comparison, Predicate};
pub use record::{FieldError, LoadError, LoadSummary, Record, RecordBatch, RecordStore, Schema};
