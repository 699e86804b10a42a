//! Event capture for economy runs.
//!
//! A `tracing` subscriber turns every `info!` event into one row of a
//! per-target table. Columns appear as fields are first seen, so the schema
//! of each table comes from the events themselves.
//!
//! # Usage
//!
//! ```ignore
//! // In simulation code:
//! tracing::info!(target: "location_day", day, location_id, good_id, price);
//!
//! // In a test:
//! let mut run = instrument::RunRecorder::new("price_band");
//! // ... advance the world ...
//! let prices = &run.frames()["location_day"];
//! ```

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Record};
use tracing::{Event, Id, Metadata, Subscriber};

// ============================================================================
// Tables
// ============================================================================

/// One typed column of an event table.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueColumn {
    U64(Vec<u64>),
    I64(Vec<i64>),
    F64(Vec<f64>),
    Bool(Vec<bool>),
    Str(Vec<String>),
}

/// A single field value taken from an event.
#[derive(Debug, Clone, PartialEq)]
enum FieldValue {
    U64(u64),
    I64(i64),
    F64(f64),
    Bool(bool),
    Str(String),
}

impl ValueColumn {
    pub fn len(&self) -> usize {
        match self {
            ValueColumn::U64(v) => v.len(),
            ValueColumn::I64(v) => v.len(),
            ValueColumn::F64(v) => v.len(),
            ValueColumn::Bool(v) => v.len(),
            ValueColumn::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Empty column of the value's type, padded to `rows`.
    fn for_value(value: &FieldValue, rows: usize) -> Self {
        match value {
            FieldValue::U64(_) => ValueColumn::U64(vec![0; rows]),
            FieldValue::I64(_) => ValueColumn::I64(vec![0; rows]),
            FieldValue::F64(_) => ValueColumn::F64(vec![0.0; rows]),
            FieldValue::Bool(_) => ValueColumn::Bool(vec![false; rows]),
            FieldValue::Str(_) => ValueColumn::Str(vec![String::new(); rows]),
        }
    }

    fn pad_to(&mut self, rows: usize) {
        let missing = rows.saturating_sub(self.len());
        match self {
            ValueColumn::U64(v) => v.extend(std::iter::repeat_n(0, missing)),
            ValueColumn::I64(v) => v.extend(std::iter::repeat_n(0, missing)),
            ValueColumn::F64(v) => v.extend(std::iter::repeat_n(0.0, missing)),
            ValueColumn::Bool(v) => v.extend(std::iter::repeat_n(false, missing)),
            ValueColumn::Str(v) => v.extend(std::iter::repeat_n(String::new(), missing)),
        }
    }

    fn widen_to_f64(&mut self) {
        let widened = match self {
            ValueColumn::U64(v) => v.iter().map(|&x| x as f64).collect(),
            ValueColumn::I64(v) => v.iter().map(|&x| x as f64).collect(),
            _ => return,
        };
        *self = ValueColumn::F64(widened);
    }

    fn push(&mut self, value: FieldValue) {
        // Integer columns widen when a wider value arrives for the same field
        match value {
            FieldValue::F64(_) if matches!(self, ValueColumn::U64(_) | ValueColumn::I64(_)) => {
                self.widen_to_f64()
            }
            FieldValue::I64(_) => {
                if let ValueColumn::U64(v) = self {
                    let signed = v.iter().map(|&u| u as i64).collect();
                    *self = ValueColumn::I64(signed);
                }
            }
            _ => {}
        }

        match (self, value) {
            (ValueColumn::U64(v), FieldValue::U64(x)) => v.push(x),
            (ValueColumn::I64(v), FieldValue::I64(x)) => v.push(x),
            (ValueColumn::I64(v), FieldValue::U64(x)) => v.push(x as i64),
            (ValueColumn::F64(v), FieldValue::F64(x)) => v.push(x),
            (ValueColumn::F64(v), FieldValue::U64(x)) => v.push(x as f64),
            (ValueColumn::F64(v), FieldValue::I64(x)) => v.push(x as f64),
            (ValueColumn::Bool(v), FieldValue::Bool(x)) => v.push(x),
            (ValueColumn::Str(v), FieldValue::Str(x)) => v.push(x),
            // Mismatched kinds keep the column type and record a default
            (column, _) => {
                let rows = column.len() + 1;
                column.pad_to(rows);
            }
        }
    }
}

/// Rows of one tracing target. Columns are kept in name order.
#[derive(Debug, Clone, Default)]
pub struct EventTable {
    pub columns: BTreeMap<String, ValueColumn>,
    pub row_count: usize,
}

impl EventTable {
    /// Append one event. Columns missing from the event get a default value.
    fn append(&mut self, fields: Vec<(String, FieldValue)>) {
        let rows = self.row_count;
        for (name, value) in fields {
            let column = self
                .columns
                .entry(name)
                .or_insert_with(|| ValueColumn::for_value(&value, rows));
            column.pad_to(rows);
            column.push(value);
        }
        self.row_count += 1;
        for column in self.columns.values_mut() {
            column.pad_to(self.row_count);
        }
    }

    pub fn column(&self, name: &str) -> Option<&ValueColumn> {
        self.columns.get(name)
    }

    /// Numeric column as f64, whatever its stored integer width.
    pub fn column_f64(&self, name: &str) -> Option<Vec<f64>> {
        match self.columns.get(name)? {
            ValueColumn::U64(v) => Some(v.iter().map(|&x| x as f64).collect()),
            ValueColumn::I64(v) => Some(v.iter().map(|&x| x as f64).collect()),
            ValueColumn::F64(v) => Some(v.clone()),
            _ => None,
        }
    }
}

/// Every table captured on this thread, keyed by tracing target.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    pub tables: HashMap<String, EventTable>,
}

impl EventLog {
    pub fn table(&self, target: &str) -> Option<&EventTable> {
        self.tables.get(target)
    }

    /// Targets seen so far, sorted
    pub fn targets(&self) -> Vec<&str> {
        let mut targets: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        targets.sort_unstable();
        targets
    }
}

thread_local! {
    static EVENT_LOG: RefCell<EventLog> = RefCell::default();
}

// ============================================================================
// Subscriber
// ============================================================================

#[derive(Default)]
struct FieldCollector {
    fields: Vec<(String, FieldValue)>,
}

impl Visit for FieldCollector {
    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.push((field.name().to_string(), FieldValue::U64(value)));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.push((field.name().to_string(), FieldValue::I64(value)));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.push((field.name().to_string(), FieldValue::F64(value)));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.push((field.name().to_string(), FieldValue::Bool(value)));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.fields
            .push((field.name().to_string(), FieldValue::Str(value.to_string())));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.record_str(field, &format!("{:?}", value));
    }
}

/// Subscriber that appends info-level events to the thread's `EventLog`.
pub struct TableSubscriber;

impl Subscriber for TableSubscriber {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.is_event() && *metadata.level() <= tracing::Level::INFO
    }

    fn new_span(&self, _span: &Attributes<'_>) -> Id {
        Id::from_u64(1)
    }

    fn record(&self, _span: &Id, _values: &Record<'_>) {}

    fn record_follows_from(&self, _span: &Id, _follows: &Id) {}

    fn event(&self, event: &Event<'_>) {
        let mut collector = FieldCollector::default();
        event.record(&mut collector);
        let target = event.metadata().target().to_string();
        EVENT_LOG.with(|log| {
            log.borrow_mut()
                .tables
                .entry(target)
                .or_default()
                .append(collector.fields);
        });
    }

    fn enter(&self, _span: &Id) {}

    fn exit(&self, _span: &Id) {}
}

/// Install `TableSubscriber` as the global default. Later calls are no-ops.
pub fn install_subscriber() {
    let _ = tracing::subscriber::set_global_default(TableSubscriber);
}

/// Take everything captured on this thread.
pub fn drain() -> EventLog {
    EVENT_LOG.with(|log| std::mem::take(&mut *log.borrow_mut()))
}

/// Drop everything captured on this thread.
pub fn clear() {
    EVENT_LOG.with(|log| *log.borrow_mut() = EventLog::default());
}

// ============================================================================
// Polars
// ============================================================================

use polars::prelude::*;

impl EventTable {
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let columns: Vec<Column> = self
            .columns
            .iter()
            .map(|(name, column)| match column {
                ValueColumn::U64(v) => Column::new(name.into(), v),
                ValueColumn::I64(v) => Column::new(name.into(), v),
                ValueColumn::F64(v) => Column::new(name.into(), v),
                ValueColumn::Bool(v) => Column::new(name.into(), v),
                ValueColumn::Str(v) => Column::new(name.into(), v),
            })
            .collect();
        DataFrame::new(columns)
    }
}

impl EventLog {
    pub fn to_dataframes(&self) -> PolarsResult<HashMap<String, DataFrame>> {
        self.tables
            .iter()
            .map(|(target, table)| Ok((target.clone(), table.to_dataframe()?)))
            .collect()
    }
}

/// Write each frame to `{dir}/{target}.parquet`.
pub fn write_parquet(frames: &mut HashMap<String, DataFrame>, dir: &Path) -> PolarsResult<()> {
    let io_err = |e: std::io::Error| PolarsError::IO {
        error: e.into(),
        msg: None,
    };
    std::fs::create_dir_all(dir).map_err(io_err)?;
    for (target, df) in frames.iter_mut() {
        let file = std::fs::File::create(dir.join(format!("{}.parquet", target))).map_err(io_err)?;
        ParquetWriter::new(file).finish(df)?;
    }
    Ok(())
}

/// Captures one run's events from creation until `frames` is called.
///
/// With an output directory set, the frames are also written as parquet
/// under `{dir}/{name}/` when the recorder drops.
pub struct RunRecorder {
    name: String,
    output_dir: Option<PathBuf>,
    frames: Option<HashMap<String, DataFrame>>,
}

impl RunRecorder {
    pub fn new(name: impl Into<String>) -> Self {
        clear();
        install_subscriber();
        Self {
            name: name.into(),
            output_dir: None,
            frames: None,
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Drain captured events into DataFrames. Later calls return the same
    /// frames. A table that fails to convert is reported and skipped.
    pub fn frames(&mut self) -> &HashMap<String, DataFrame> {
        self.frames.get_or_insert_with(|| {
            let log = drain();
            let mut frames = HashMap::new();
            for (target, table) in &log.tables {
                match table.to_dataframe() {
                    Ok(df) => {
                        frames.insert(target.clone(), df);
                    }
                    Err(e) => eprintln!("RunRecorder: skipping table {}: {}", target, e),
                }
            }
            frames
        })
    }
}

impl Drop for RunRecorder {
    fn drop(&mut self) {
        let Some(dir) = self.output_dir.take() else {
            return;
        };
        let run_dir = dir.join(&self.name);
        self.frames();
        let Some(frames) = self.frames.as_mut() else {
            return;
        };
        if frames.is_empty() {
            return;
        }
        match write_parquet(frames, &run_dir) {
            Ok(()) => eprintln!(
                "RunRecorder: wrote {} tables to {}",
                frames.len(),
                run_dir.display()
            ),
            Err(e) => eprintln!("RunRecorder({}): failed to write parquet: {}", self.name, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::subscriber::with_default;

    #[test]
    fn test_missing_fields_get_defaults() {
        let mut table = EventTable::default();
        table.append(vec![
            ("day".to_string(), FieldValue::U64(0)),
            ("price".to_string(), FieldValue::F64(1.5)),
        ]);
        table.append(vec![
            ("day".to_string(), FieldValue::U64(1)),
            ("side".to_string(), FieldValue::Str("buy".to_string())),
        ]);

        assert_eq!(table.row_count, 2);
        assert_eq!(table.column("day"), Some(&ValueColumn::U64(vec![0, 1])));
        assert_eq!(table.column("price"), Some(&ValueColumn::F64(vec![1.5, 0.0])));
        assert_eq!(
            table.column("side"),
            Some(&ValueColumn::Str(vec![String::new(), "buy".to_string()]))
        );
    }

    #[test]
    fn test_integer_column_widens_for_floats() {
        let mut table = EventTable::default();
        table.append(vec![("money".to_string(), FieldValue::U64(10))]);
        table.append(vec![("money".to_string(), FieldValue::F64(2.5))]);
        assert_eq!(table.column("money"), Some(&ValueColumn::F64(vec![10.0, 2.5])));
        assert_eq!(table.column_f64("money"), Some(vec![10.0, 2.5]));
    }

    #[test]
    fn test_events_become_rows() {
        clear();
        with_default(TableSubscriber, || {
            tracing::info!(target: "fill", farmer_id = 7u64, quantity = 2u32, total = 9.0f64, side = "sell");
            tracing::info!(target: "fill", farmer_id = 7u64, quantity = 1u32, total = 5.5f64, side = "buy");
            tracing::info!(target: "world_init", seed = 134u64);
            tracing::debug!(target: "fill", ignored = true);
        });

        let log = drain();
        assert_eq!(log.targets(), vec!["fill", "world_init"]);
        let fills = log.table("fill").unwrap();
        assert_eq!(fills.row_count, 2);
        assert_eq!(fills.column_f64("total"), Some(vec![9.0, 5.5]));
        assert_eq!(fills.column_f64("quantity"), Some(vec![2.0, 1.0]));
        assert!(fills.column("ignored").is_none());

        let df = fills.to_dataframe().unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 4);

        // Drained log leaves nothing behind
        assert!(drain().tables.is_empty());
    }

    fn temp_dir(prefix: &str) -> PathBuf {
        let unique = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!(
            "instrument-tests-{prefix}-{}-{unique}",
            std::process::id()
        ))
    }

    fn read_parquet(path: &Path) -> DataFrame {
        let file = std::fs::File::open(path).unwrap();
        ParquetReader::new(file).finish().unwrap()
    }

    #[test]
    fn test_write_parquet_round_trip() {
        let mut table = EventTable::default();
        table.append(vec![
            ("day".to_string(), FieldValue::U64(0)),
            ("price".to_string(), FieldValue::F64(1.25)),
        ]);
        table.append(vec![
            ("day".to_string(), FieldValue::U64(1)),
            ("price".to_string(), FieldValue::F64(2.5)),
        ]);
        let df = table.to_dataframe().unwrap();
        let mut frames = HashMap::from([("location_day".to_string(), df.clone())]);

        let dir = temp_dir("write");
        write_parquet(&mut frames, &dir).unwrap();
        let back = read_parquet(&dir.join("location_day.parquet"));
        assert!(back.equals(&df));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_recorder_writes_run_dir_on_drop() {
        let dir = temp_dir("recorder");
        {
            let mut run = RunRecorder::new("seed_7").with_output_dir(&dir);
            with_default(TableSubscriber, || {
                tracing::info!(target: "farmer_day", day = 0u64, money = 12.5f64);
                tracing::info!(target: "farmer_day", day = 1u64, money = 13.0f64);
            });
            assert_eq!(run.frames()["farmer_day"].height(), 2);
        }

        let back = read_parquet(&dir.join("seed_7").join("farmer_day.parquet"));
        assert_eq!(back.height(), 2);
        let money: Vec<f64> = back
            .column("money")
            .unwrap()
            .f64()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(money, vec![12.5, 13.0]);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
