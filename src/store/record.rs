use crate::config::types::{AmbiguityPolicy, ParseErrorStrategy};
use crate::source::reader::RawRow;
use crate::source::timestamp::{CanonicalTimestamp, TimestampError, TimestampNormalizer};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("schema has no fields")]
    EmptySchema,

    #[error("duplicate field name in schema: {0}")]
    DuplicateField(String),

    #[error("date field '{0}' is not part of the schema")]
    UnknownDateField(String),

    #[error("line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("line {line}, record {id}, field '{field}': {source}")]
    Timestamp {
        line: u64,
        id: usize,
        field: String,
        #[source]
        source: TimestampError,
    },
}

/// Lookup failures against a loaded batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("field '{0}' is not a normalized date field")]
    NotADateField(String),
}

/// The fixed, ordered field list every row must match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<String>,
    date_fields: Vec<usize>,
}

impl Schema {
    pub fn new<S: AsRef<str>>(fields: Vec<String>, date_fields: &[S]) -> Result<Self, LoadError> {
        if fields.is_empty() {
            return Err(LoadError::EmptySchema);
        }

        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(field.as_str()) {
                return Err(LoadError::DuplicateField(field.clone()));
            }
        }

        let mut date_indices = Vec::with_capacity(date_fields.len());
        for name in date_fields {
            let name = name.as_ref();
            let index = fields
                .iter()
                .position(|f| f == name)
                .ok_or_else(|| LoadError::UnknownDateField(name.to_string()))?;
            if !date_indices.contains(&index) {
                date_indices.push(index);
            }
        }

        Ok(Self {
            fields,
            date_fields: date_indices,
        })
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn index_of(&self, field: &str) -> Result<usize, FieldError> {
        self.fields
            .iter()
            .position(|f| f == field)
            .ok_or_else(|| FieldError::UnknownField(field.to_string()))
    }

    pub fn date_field_indices(&self) -> &[usize] {
        &self.date_fields
    }
}

/// One ingested row. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    id: usize,
    values: Vec<String>,
    // (field index, normalized value) for each date field
    timestamps: Vec<(usize, CanonicalTimestamp)>,
}

impl Record {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn value(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn timestamp(&self, index: usize) -> Option<CanonicalTimestamp> {
        self.timestamps
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, ts)| *ts)
    }
}

/// An ordered set of records sharing one schema.
///
/// Filtering yields a new batch that shares the underlying records.
#[derive(Debug, Clone)]
pub struct RecordBatch {
    schema: Arc<Schema>,
    records: Vec<Arc<Record>>,
}

impl RecordBatch {
    pub(crate) fn from_parts(schema: Arc<Schema>, records: Vec<Arc<Record>>) -> Self {
        Self { schema, records }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter().map(|r| r.as_ref())
    }

    pub fn get(&self, id: usize) -> Option<&Record> {
        self.iter().find(|r| r.id == id)
    }

    pub fn ids(&self) -> Vec<usize> {
        self.iter().map(Record::id).collect()
    }

    /// Distinct values observed in `field` across the batch
    pub fn observed_values(&self, field: &str) -> Result<BTreeSet<&str>, FieldError> {
        let index = self.schema.index_of(field)?;
        Ok(self.iter().filter_map(|r| r.value(index)).collect())
    }

    pub(crate) fn shared_schema(&self) -> Arc<Schema> {
        self.schema.clone()
    }

    pub(crate) fn shared_records(&self) -> impl Iterator<Item = &Arc<Record>> {
        self.records.iter()
    }
}

/// Counts from one load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub rows: usize,
    pub loaded: usize,
    pub malformed_dropped: usize,
    pub ambiguous: usize,
    pub ambiguous_dropped: usize,
}

/// Turns raw rows into a [`RecordBatch`], normalizing every date field.
#[derive(Debug, Clone)]
pub struct RecordStore {
    schema: Arc<Schema>,
    normalizer: TimestampNormalizer,
    on_parse_error: ParseErrorStrategy,
    on_ambiguous: AmbiguityPolicy,
}

impl RecordStore {
    pub fn new(schema: Schema, normalizer: TimestampNormalizer) -> Self {
        Self {
            schema: Arc::new(schema),
            normalizer,
            on_parse_error: ParseErrorStrategy::default(),
            on_ambiguous: AmbiguityPolicy::default(),
        }
    }

    pub fn with_parse_error_strategy(mut self, strategy: ParseErrorStrategy) -> Self {
        self.on_parse_error = strategy;
        self
    }

    pub fn with_ambiguity_policy(mut self, policy: AmbiguityPolicy) -> Self {
        self.on_ambiguous = policy;
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Load rows in arrival order. Row `n` receives id `n`; ids of dropped
    /// rows are never handed to another record.
    pub fn load(&self, rows: Vec<RawRow>) -> Result<(RecordBatch, LoadSummary), LoadError> {
        let mut summary = LoadSummary {
            rows: rows.len(),
            ..Default::default()
        };
        let mut records = Vec::with_capacity(rows.len());

        'rows: for (id, row) in rows.into_iter().enumerate() {
            if row.values.len() != self.schema.len() {
                return Err(LoadError::FieldCount {
                    line: row.line,
                    expected: self.schema.len(),
                    found: row.values.len(),
                });
            }

            let mut values = row.values;
            let mut timestamps = Vec::with_capacity(self.schema.date_fields.len());

            for &index in &self.schema.date_fields {
                let field = &self.schema.fields[index];
                let raw = &values[index];

                let normalized = match self.normalizer.normalize(raw) {
                    Ok(normalized) => normalized,
                    Err(source) => match self.on_parse_error {
                        ParseErrorStrategy::Abort => {
                            return Err(LoadError::Timestamp {
                                line: row.line,
                                id,
                                field: field.clone(),
                                source,
                            });
                        }
                        ParseErrorStrategy::Drop => {
                            warn!(
                                line = row.line,
                                id,
                                field = %field,
                                error = %source,
                                "Dropping record with malformed timestamp"
                            );
                            summary.malformed_dropped += 1;
                            continue 'rows;
                        }
                    },
                };

                if normalized.is_ambiguous() {
                    summary.ambiguous += 1;
                    match self.on_ambiguous {
                        AmbiguityPolicy::Accept => {}
                        AmbiguityPolicy::Warn => {
                            warn!(
                                line = row.line,
                                id,
                                field = %field,
                                value = %raw,
                                resolved = %normalized.timestamp(),
                                "Ambiguous day/month order"
                            );
                        }
                        AmbiguityPolicy::Drop => {
                            warn!(
                                line = row.line,
                                id,
                                field = %field,
                                value = %raw,
                                "Dropping record with ambiguous day/month order"
                            );
                            summary.ambiguous_dropped += 1;
                            continue 'rows;
                        }
                    }
                }

                let ts = normalized.timestamp();
                values[index] = ts.to_string();
                timestamps.push((index, ts));
            }

            records.push(Arc::new(Record {
                id,
                values,
                timestamps,
            }));
        }

        summary.loaded = records.len();
        info!(
            rows = summary.rows,
            loaded = summary.loaded,
            malformed_dropped = summary.malformed_dropped,
            ambiguous = summary.ambiguous,
            ambiguous_dropped = summary.ambiguous_dropped,
            "Loaded record batch"
        );

        Ok((RecordBatch::from_parts(self.schema.clone(), records), summary))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn schema() -> Schema {
        Schema::new(
            vec!["severity".into(), "bundle_id".into(), "sdk_date".into()],
            &["sdk_date"],
        )
        .unwrap()
    }

    pub(crate) fn store() -> RecordStore {
        RecordStore::new(schema(), TimestampNormalizer::default())
    }

    pub(crate) fn row(line: u64, severity: &str, bundle: &str, date: &str) -> RawRow {
        RawRow::new(line, vec![severity, bundle, date])
    }

    #[test]
    fn test_ids_follow_arrival_order() {
        let rows = vec![
            row(2, "Error", "a", "01/02/2023 10:00:00"),
            row(3, "Info", "b", "02/02/2023 10:00:00"),
            row(4, "Error", "c", "03/02/2023 10:00:00"),
        ];
        let (batch, summary) = store().load(rows).unwrap();

        assert_eq!(batch.ids(), vec![0, 1, 2]);
        assert_eq!(summary.loaded, 3);
    }

    #[test]
    fn test_date_field_rewritten_in_place() {
        let (batch, _) = store()
            .load(vec![row(2, "Error", "a", "2023/03/15 10:20:30")])
            .unwrap();
        let record = batch.get(0).unwrap();

        assert_eq!(record.value(2), Some("2023-03-15 10:20:30"));
        assert_eq!(
            record.timestamp(2),
            Some(CanonicalTimestamp::new(2023, 3, 15, 10, 20, 30).unwrap())
        );
        assert_eq!(record.value(0), Some("Error"));
    }

    #[test]
    fn test_field_count_mismatch_fails_load() {
        let rows = vec![
            row(2, "Error", "a", "01/02/2023 10:00:00"),
            RawRow::new(3, vec!["Error", "a"]),
        ];
        let err = store().load(rows).unwrap_err();

        assert!(matches!(
            err,
            LoadError::FieldCount {
                line: 3,
                expected: 3,
                found: 2
            }
        ));
    }

    #[test]
    fn test_malformed_timestamp_dropped_and_id_retired() {
        let rows = vec![
            row(2, "Error", "a", "01/02/2023 10:00:00"),
            row(3, "Error", "b", "garbage"),
            row(4, "Error", "c", "03/02/2023 10:00:00"),
        ];
        let (batch, summary) = store().load(rows).unwrap();

        assert_eq!(batch.ids(), vec![0, 2]);
        assert_eq!(summary.malformed_dropped, 1);
        assert_eq!(summary.rows, 3);
    }

    #[test]
    fn test_malformed_timestamp_aborts_when_configured() {
        let rows = vec![row(2, "Error", "a", "15/03/2023")];
        let err = store()
            .with_parse_error_strategy(ParseErrorStrategy::Abort)
            .load(rows)
            .unwrap_err();

        match err {
            LoadError::Timestamp { id, field, .. } => {
                assert_eq!(id, 0);
                assert_eq!(field, "sdk_date");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_ambiguity_policies() {
        let rows = || {
            vec![
                row(2, "Error", "a", "03/04/2022 00:00:00"),
                row(3, "Error", "b", "13/04/2022 00:00:00"),
            ]
        };

        let (batch, summary) = store().load(rows()).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(summary.ambiguous, 1);

        let (batch, summary) = store()
            .with_ambiguity_policy(AmbiguityPolicy::Drop)
            .load(rows())
            .unwrap();
        assert_eq!(batch.ids(), vec![1]);
        assert_eq!(summary.ambiguous_dropped, 1);

        let (batch, summary) = store()
            .with_ambiguity_policy(AmbiguityPolicy::Warn)
            .load(rows())
            .unwrap();
        assert_eq!(batch.ids(), vec![0, 1]);
        assert_eq!(summary.ambiguous, 1);
        assert_eq!(summary.ambiguous_dropped, 0);
        assert_eq!(batch.get(0).unwrap().value(2), Some("2022-04-03 00:00:00"));
    }

    #[test]
    fn test_schema_validation() {
        assert!(matches!(
            Schema::new(Vec::new(), &["x"]),
            Err(LoadError::EmptySchema)
        ));
        assert!(matches!(
            Schema::new(vec!["a".into(), "a".into()], &["a"]),
            Err(LoadError::DuplicateField(f)) if f == "a"
        ));
        assert!(matches!(
            Schema::new(vec!["a".into()], &["date"]),
            Err(LoadError::UnknownDateField(f)) if f == "date"
        ));
    }

    #[test]
    fn test_observed_values() {
        let rows = vec![
            row(2, "Error", "a", "01/02/2023 10:00:00"),
            row(3, "Info", "a", "02/02/2023 10:00:00"),
        ];
        let (batch, _) = store().load(rows).unwrap();

        let values = batch.observed_values("severity").unwrap();
        assert_eq!(values.into_iter().collect::<Vec<_>>(), vec!["Error", "Info"]);
        assert_eq!(
            batch.observed_values("missing"),
            Err(FieldError::UnknownField("missing".into()))
        );
    }
}
