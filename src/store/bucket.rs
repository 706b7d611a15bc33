use super::record::{FieldError, RecordBatch};
use crate::source::timestamp::CanonicalTimestamp;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown granularity '{0}': expected one of year, month, day, hour, minute, second")]
pub struct InvalidGranularity(pub String);

/// Calendar precision for grouping. Each level includes every coarser one.
///
/// Variants are declared coarsest first, so `a < b` means `a` is coarser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

impl Granularity {
    pub const ALL: [Granularity; 6] = [
        Granularity::Year,
        Granularity::Month,
        Granularity::Day,
        Granularity::Hour,
        Granularity::Minute,
        Granularity::Second,
    ];

    /// Number of leading calendar components kept at this level
    pub fn depth(&self) -> usize {
        *self as usize + 1
    }

    pub fn label(&self) -> &'static str {
        match self {
            Granularity::Year => "year",
            Granularity::Month => "month",
            Granularity::Day => "day",
            Granularity::Hour => "hour",
            Granularity::Minute => "minute",
            Granularity::Second => "second",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Granularity {
    type Err = InvalidGranularity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Granularity::ALL
            .into_iter()
            .find(|g| g.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| InvalidGranularity(s.to_string()))
    }
}

/// Calendar components of a timestamp truncated to a granularity.
///
/// Components past the granularity are zero, so ordering is coarsest-first
/// lexicographic on the kept components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BucketKey {
    granularity: Granularity,
    // year, month, day, hour, minute, second
    parts: [u32; 6],
}

impl BucketKey {
    pub fn new(ts: &CanonicalTimestamp, granularity: Granularity) -> Self {
        let full = [ts.year, ts.month, ts.day, ts.hour, ts.minute, ts.second];
        let mut parts = [0u32; 6];
        parts[..granularity.depth()].copy_from_slice(&full[..granularity.depth()]);
        Self { granularity, parts }
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// The kept components, coarsest first
    pub fn components(&self) -> &[u32] {
        &self.parts[..self.granularity.depth()]
    }

    pub fn contains(&self, ts: &CanonicalTimestamp) -> bool {
        BucketKey::new(ts, self.granularity) == *self
    }

    /// The same bucket seen at a coarser (or equal) granularity
    pub fn coarsen(&self, granularity: Granularity) -> BucketKey {
        let granularity = granularity.min(self.granularity);
        let mut parts = [0u32; 6];
        parts[..granularity.depth()].copy_from_slice(&self.parts[..granularity.depth()]);
        BucketKey { granularity, parts }
    }

    /// First instant of the bucket, when it is a real calendar date.
    pub fn start(&self) -> Option<NaiveDateTime> {
        let [year, month, day, hour, minute, second] = self.parts;
        NaiveDate::from_ymd_opt(year as i32, month.max(1), day.max(1))?
            .and_hms_opt(hour, minute, second)
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [year, month, day, hour, minute, second] = self.parts;
        match self.granularity {
            Granularity::Year => write!(f, "{year:04}"),
            Granularity::Month => write!(f, "{year:04}-{month:02}"),
            Granularity::Day => write!(f, "{year:04}-{month:02}-{day:02}"),
            Granularity::Hour => write!(f, "{year:04}-{month:02}-{day:02} {hour:02}h"),
            Granularity::Minute => {
                write!(f, "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}")
            }
            Granularity::Second => write!(
                f,
                "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}"
            ),
        }
    }
}

/// Record ids grouped by bucket; ids keep batch order within a bucket.
pub type Buckets = BTreeMap<BucketKey, Vec<usize>>;

/// Group every record of `batch` by its `date_field` truncated to `granularity`.
pub fn bucketize(
    batch: &RecordBatch,
    date_field: &str,
    granularity: Granularity,
) -> Result<Buckets, FieldError> {
    let index = batch.schema().index_of(date_field)?;
    if !batch.schema().date_field_indices().contains(&index) {
        return Err(FieldError::NotADateField(date_field.to_string()));
    }

    let mut buckets = Buckets::new();
    for record in batch.iter() {
        // Every loaded record carries each date field
        if let Some(ts) = record.timestamp(index) {
            buckets
                .entry(BucketKey::new(&ts, granularity))
                .or_default()
                .push(record.id());
        }
    }

    Ok(buckets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::record::tests::{row, store};

    fn batch() -> RecordBatch {
        let rows = vec![
            row(2, "Error", "a", "15/03/2023 10:20:30"),
            row(3, "Error", "a", "15/03/2023 10:20:45"),
            row(4, "Error", "a", "15/03/2023 10:21:00"),
            row(5, "Error", "a", "15/03/2023 11:00:00"),
            row(6, "Error", "a", "16/03/2023 10:20:30"),
            row(7, "Error", "a", "16/04/2023 10:20:30"),
            row(8, "Error", "a", "16/04/2024 10:20:30"),
        ];
        store().load(rows).unwrap().0
    }

    #[test]
    fn test_parse_granularity() {
        assert_eq!("minute".parse::<Granularity>().unwrap(), Granularity::Minute);
        assert_eq!("Hour".parse::<Granularity>().unwrap(), Granularity::Hour);
        assert_eq!(
            "fortnight".parse::<Granularity>(),
            Err(InvalidGranularity("fortnight".into()))
        );
    }

    #[test]
    fn test_bucket_counts_per_level() {
        let batch = batch();
        let counts: Vec<usize> = Granularity::ALL
            .iter()
            .map(|g| bucketize(&batch, "sdk_date", *g).unwrap().len())
            .collect();

        assert_eq!(counts, vec![2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_bucket_membership_keeps_order() {
        let buckets = bucketize(&batch(), "sdk_date", Granularity::Minute).unwrap();
        let (key, ids) = buckets.iter().next().unwrap();

        assert_eq!(key.to_string(), "2023-03-15 10:20");
        assert_eq!(key.components(), &[2023, 3, 15, 10, 20]);
        assert_eq!(ids, &vec![0, 1]);
    }

    #[test]
    fn test_finer_partition_refines_coarser() {
        let batch = batch();
        for (i, coarse) in Granularity::ALL.iter().enumerate() {
            let coarse_buckets = bucketize(&batch, "sdk_date", *coarse).unwrap();
            for fine in &Granularity::ALL[i..] {
                for (key, ids) in bucketize(&batch, "sdk_date", *fine).unwrap() {
                    let parent = &coarse_buckets[&key.coarsen(*coarse)];
                    assert!(ids.iter().all(|id| parent.contains(id)));
                }
            }
        }
    }

    #[test]
    fn test_keys_ordered_coarsest_first() {
        let buckets = bucketize(&batch(), "sdk_date", Granularity::Day).unwrap();
        let labels: Vec<String> = buckets.keys().map(|k| k.to_string()).collect();

        assert_eq!(
            labels,
            vec!["2023-03-15", "2023-03-16", "2023-04-16", "2024-04-16"]
        );
    }

    #[test]
    fn test_bucket_start() {
        let ts = CanonicalTimestamp::new(2023, 3, 15, 10, 20, 30).unwrap();
        let key = BucketKey::new(&ts, Granularity::Month);

        assert!(key.contains(&ts));
        assert_eq!(
            key.start().unwrap().format("%Y-%m-%d %H:%M:%S").to_string(),
            "2023-03-01 00:00:00"
        );
        assert_eq!(key.to_string(), "2023-03");
    }

    #[test]
    fn test_non_date_field_rejected() {
        let result = bucketize(&batch(), "severity", Granularity::Day);
        assert_eq!(result, Err(FieldError::NotADateField("severity".into())));
    }
}
