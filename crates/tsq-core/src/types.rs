use crate::error::{QueryError, Result};
use arrow::array::{
    Array, Float64Array, Int64Array, TimestampMicrosecondArray, TimestampMillisecondArray,
    TimestampNanosecondArray, TimestampSecondArray,
};
use arrow::datatypes::{DataType as ArrowDataType, TimeUnit};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic type of a frame field, independent of its physical Arrow type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Time,
    Number,
    String,
    Boolean,
    Other,
}

impl FieldType {
    pub fn from_arrow(dt: &ArrowDataType) -> Self {
        match dt {
            ArrowDataType::Timestamp(_, _) | ArrowDataType::Date32 | ArrowDataType::Date64 => {
                FieldType::Time
            }
            ArrowDataType::Int8
            | ArrowDataType::Int16
            | ArrowDataType::Int32
            | ArrowDataType::Int64
            | ArrowDataType::UInt8
            | ArrowDataType::UInt16
            | ArrowDataType::UInt32
            | ArrowDataType::UInt64
            | ArrowDataType::Float16
            | ArrowDataType::Float32
            | ArrowDataType::Float64
            | ArrowDataType::Decimal128(_, _)
            | ArrowDataType::Decimal256(_, _) => FieldType::Number,
            ArrowDataType::Utf8 | ArrowDataType::LargeUtf8 => FieldType::String,
            ArrowDataType::Boolean => FieldType::Boolean,
            _ => FieldType::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Time => "time",
            FieldType::Number => "number",
            FieldType::String => "string",
            FieldType::Boolean => "boolean",
            FieldType::Other => "other",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether an Arrow type can serve as the time column of a frame
pub fn is_time_column(dt: &ArrowDataType) -> bool {
    matches!(
        dt,
        ArrowDataType::Timestamp(_, _) | ArrowDataType::Int64 | ArrowDataType::Float64
    )
}

fn downcast<T: 'static>(array: &dyn Array) -> Result<&T> {
    array.as_any().downcast_ref::<T>().ok_or_else(|| {
        QueryError::SchemaError(format!(
            "time column of type {} could not be decoded",
            array.data_type()
        ))
    })
}

/// Decode a time column into epoch milliseconds.
///
/// Timestamps of any unit are normalised to milliseconds; `Int64` and
/// `Float64` columns are read as epoch milliseconds already. Null slots
/// decode to whatever the underlying buffer holds.
pub fn time_values_ms(array: &dyn Array) -> Result<Vec<i64>> {
    let values = match array.data_type() {
        ArrowDataType::Timestamp(TimeUnit::Millisecond, _) => downcast::<TimestampMillisecondArray>(array)?
            .values()
            .to_vec(),
        ArrowDataType::Timestamp(TimeUnit::Second, _) => downcast::<TimestampSecondArray>(array)?
            .values()
            .iter()
            .map(|s| s.saturating_mul(1_000))
            .collect(),
        ArrowDataType::Timestamp(TimeUnit::Microsecond, _) => {
            downcast::<TimestampMicrosecondArray>(array)?
                .values()
                .iter()
                .map(|us| us.div_euclid(1_000))
                .collect()
        }
        ArrowDataType::Timestamp(TimeUnit::Nanosecond, _) => {
            downcast::<TimestampNanosecondArray>(array)?
                .values()
                .iter()
                .map(|ns| ns.div_euclid(1_000_000))
                .collect()
        }
        ArrowDataType::Int64 => downcast::<Int64Array>(array)?.values().to_vec(),
        ArrowDataType::Float64 => downcast::<Float64Array>(array)?
            .values()
            .iter()
            .map(|ms| *ms as i64)
            .collect(),
        other => {
            return Err(QueryError::TypeMismatch {
                expected: "timestamp, int64 or float64 time column".to_string(),
                found: other.to_string(),
            })
        }
    };
    Ok(values)
}
