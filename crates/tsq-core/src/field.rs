//! Frame fields: a named Arrow column with labels and display config

use crate::error::{QueryError, Result};
use crate::types::FieldType;
use arrow::array::{Array, ArrayRef, Float64Array, TimestampMillisecondArray, UInt32Array};
use arrow::compute::take;
use arrow::datatypes::Field as ArrowField;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Series labels, ordered so that identical label sets compare and hash equal
pub type Labels = BTreeMap<String, String>;

/// Free-form display configuration attached to a field
pub type FieldConfig = serde_json::Map<String, serde_json::Value>;

/// Arrow field metadata key holding the JSON-encoded labels
pub const LABELS_METADATA_KEY: &str = "labels";
/// Arrow field metadata key holding the JSON-encoded config
pub const CONFIG_METADATA_KEY: &str = "config";

#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    labels: Labels,
    config: FieldConfig,
    values: ArrayRef,
}

impl Field {
    /// Create a field with no labels or config
    pub fn new(name: impl Into<String>, values: ArrayRef) -> Self {
        Self {
            name: name.into(),
            labels: Labels::new(),
            config: FieldConfig::new(),
            values,
        }
    }

    /// Time field with epoch-millisecond timestamps
    pub fn time(name: impl Into<String>, millis: Vec<i64>) -> Self {
        Self::new(name, Arc::new(TimestampMillisecondArray::from(millis)))
    }

    /// Number field from non-null values
    pub fn number(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self::new(name, Arc::new(Float64Array::from(values)))
    }

    /// Number field where `None` marks a missing sample
    pub fn nullable_number(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self::new(name, Arc::new(Float64Array::from(values)))
    }

    /// Replace the label set
    pub fn with_labels(mut self, labels: Labels) -> Self {
        self.labels = labels;
        self
    }

    /// Add a single label
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Replace the display config
    pub fn with_config(mut self, config: FieldConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the field name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the series labels
    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    /// Get the display config
    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    /// Get the display config for in-place edits
    pub fn config_mut(&mut self) -> &mut FieldConfig {
        &mut self.config
    }

    /// Get the value array
    pub fn values(&self) -> &ArrayRef {
        &self.values
    }

    /// Replace the value array, keeping name, labels and config
    pub fn set_values(&mut self, values: ArrayRef) {
        self.values = values;
    }

    /// Number of values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the field has no values
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Semantic type derived from the Arrow type
    pub fn field_type(&self) -> FieldType {
        FieldType::from_arrow(self.values.data_type())
    }

    /// Copy the field, including its value buffers.
    ///
    /// A plain `clone` shares the Arrow buffers; this produces storage that
    /// is not reachable from the original.
    pub fn deep_clone(&self) -> Result<Self> {
        let indices = UInt32Array::from_iter_values(0..self.values.len() as u32);
        let values = take(self.values.as_ref(), &indices, None)?;
        Ok(Self {
            name: self.name.clone(),
            labels: self.labels.clone(),
            config: self.config.clone(),
            values,
        })
    }

    /// Convert to an Arrow field with labels and config in its metadata
    pub fn to_arrow(&self) -> Result<ArrowField> {
        let mut metadata = HashMap::new();
        if !self.labels.is_empty() {
            metadata.insert(
                LABELS_METADATA_KEY.to_string(),
                serde_json::to_string(&self.labels)?,
            );
        }
        if !self.config.is_empty() {
            metadata.insert(
                CONFIG_METADATA_KEY.to_string(),
                serde_json::to_string(&self.config)?,
            );
        }
        Ok(
            ArrowField::new(self.name.clone(), self.values.data_type().clone(), true)
                .with_metadata(metadata),
        )
    }

    /// Rebuild a field from an Arrow field and its values, reading labels and config from metadata
    pub fn from_arrow(field: &ArrowField, values: ArrayRef) -> Result<Self> {
        if field.data_type() != values.data_type() {
            return Err(QueryError::TypeMismatch {
                expected: field.data_type().to_string(),
                found: values.data_type().to_string(),
            });
        }
        let metadata = field.metadata();
        let labels = match metadata.get(LABELS_METADATA_KEY) {
            Some(raw) => serde_json::from_str(raw)?,
            None => Labels::new(),
        };
        let config = match metadata.get(CONFIG_METADATA_KEY) {
            Some(raw) => serde_json::from_str(raw)?,
            None => FieldConfig::new(),
        };
        Ok(Self {
            name: field.name().clone(),
            labels,
            config,
            values,
        })
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.labels == other.labels
            && self.config == other.config
            && self.values.to_data() == other.values.to_data()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::DataType;

    #[test]
    fn test_field_metadata_round_trip() {
        let mut config = FieldConfig::new();
        config.insert("displayNameFromDS".to_string(), "+Inf".into());
        let field = Field::number("Value", vec![1.0, 2.0])
            .with_label("le", "+Inf")
            .with_label("job", "api")
            .with_config(config);

        let arrow_field = field.to_arrow().unwrap();
        assert_eq!(arrow_field.data_type(), &DataType::Float64);
        assert!(arrow_field.metadata().contains_key(LABELS_METADATA_KEY));

        let restored = Field::from_arrow(&arrow_field, field.values().clone()).unwrap();
        assert_eq!(restored, field);
    }

    #[test]
    fn test_from_arrow_type_mismatch() {
        let arrow_field = ArrowField::new("Time", DataType::Int64, false);
        let values: ArrayRef = Arc::new(Float64Array::from(vec![1.0]));
        assert!(Field::from_arrow(&arrow_field, values).is_err());
    }

    #[test]
    fn test_deep_clone_copies_buffers() {
        let field = Field::time("Time", vec![1_000, 2_000, 3_000]);
        let copy = field.deep_clone().unwrap();

        assert_eq!(copy, field);
        let original = field.values().to_data();
        let copied = copy.values().to_data();
        assert_ne!(
            original.buffers()[0].as_ptr(),
            copied.buffers()[0].as_ptr()
        );
    }

    #[test]
    fn test_field_type() {
        assert_eq!(Field::time("t", vec![]).field_type(), FieldType::Time);
        assert_eq!(Field::number("v", vec![]).field_type(), FieldType::Number);
    }
}
