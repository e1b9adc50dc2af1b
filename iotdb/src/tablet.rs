//! Insert payload shapes
//!
//! A [`Tablet`] is the columnar form of one batch: a target, a column layout
//! and `values[column][row]`. [`DeviceRecords`] is the row form used by the
//! record-oriented session calls.

use tsbench_shared::{Record, SensorType, Value};

/// Role of a tablet column in the table model. Tree tablets only carry
/// field columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnCategory {
    Tag,
    Field,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TabletColumn {
    pub name: String,
    pub data_type: SensorType,
    pub category: ColumnCategory,
}

impl TabletColumn {
    pub fn field(name: impl Into<String>, data_type: SensorType) -> Self {
        Self {
            name: name.into(),
            data_type,
            category: ColumnCategory::Field,
        }
    }

    pub fn tag(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: SensorType::String,
            category: ColumnCategory::Tag,
        }
    }
}

/// Column-major batch payload
#[derive(Debug, Clone, PartialEq)]
pub struct Tablet {
    /// Device path (tree) or qualified table name (table)
    pub target: String,
    pub columns: Vec<TabletColumn>,
    pub timestamps: Vec<i64>,
    /// `values[column][row]`
    pub values: Vec<Vec<Option<Value>>>,
    /// Aligned series (tree model only)
    pub aligned: bool,
}

impl Tablet {
    /// Create an empty tablet sized for `rows` rows
    pub fn with_capacity(
        target: impl Into<String>,
        columns: Vec<TabletColumn>,
        rows: usize,
        aligned: bool,
    ) -> Self {
        let values = columns.iter().map(|_| Vec::with_capacity(rows)).collect();
        Self {
            target: target.into(),
            columns,
            timestamps: Vec::with_capacity(rows),
            values,
            aligned,
        }
    }

    /// Append one row. Missing trailing values are stored as nulls.
    pub fn add_row<I>(&mut self, timestamp: i64, row: I)
    where
        I: IntoIterator<Item = Option<Value>>,
    {
        self.timestamps.push(timestamp);
        let mut row = row.into_iter();
        for column in &mut self.values {
            column.push(row.next().flatten());
        }
    }

    pub fn row_count(&self) -> usize {
        self.timestamps.len()
    }

    /// Names of the columns in order
    pub fn measurements(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Number of non-null field values
    pub fn point_count(&self) -> u64 {
        self.columns
            .iter()
            .zip(&self.values)
            .filter(|(c, _)| c.category == ColumnCategory::Field)
            .map(|(_, values)| values.iter().filter(|v| v.is_some()).count() as u64)
            .sum()
    }
}

/// Row-oriented payload for one device
#[derive(Debug, Clone, Copy)]
pub struct DeviceRecords<'a> {
    pub device: &'a str,
    pub aligned: bool,
    pub measurements: &'a [String],
    pub types: &'a [SensorType],
    pub records: &'a [Record],
}
