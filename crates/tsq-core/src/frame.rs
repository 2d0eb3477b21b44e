//! Data frames: one time column followed by one or more value columns

use crate::error::{QueryError, Result};
use crate::field::Field;
use crate::types::time_values_ms;
use arrow::array::{Array, ArrayRef};
use arrow::datatypes::Schema as ArrowSchema;
use arrow::record_batch::RecordBatch;
use std::collections::HashMap;
use std::sync::Arc;

/// Schema metadata key holding the frame name
pub const NAME_METADATA_KEY: &str = "name";
/// Schema metadata key holding the ref id of the target that produced the frame
pub const REF_ID_METADATA_KEY: &str = "refId";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    name: Option<String>,
    ref_id: Option<String>,
    fields: Vec<Field>,
}

impl Frame {
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            name: None,
            ref_id: None,
            fields,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_ref_id(mut self, ref_id: impl Into<String>) -> Self {
        self.ref_id = Some(ref_id.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn ref_id(&self) -> Option<&str> {
        self.ref_id.as_deref()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut [Field] {
        &mut self.fields
    }

    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    /// The time column
    pub fn time_field(&self) -> Option<&Field> {
        self.fields.first()
    }

    /// The first value column, which identifies the series a frame carries
    pub fn value_field(&self) -> Option<&Field> {
        self.fields.get(1)
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.fields.first().map(Field::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode the time column into epoch milliseconds
    pub fn time_values(&self) -> Result<Vec<i64>> {
        let time = self
            .time_field()
            .ok_or_else(|| QueryError::SchemaError("frame has no time field".to_string()))?;
        time_values_ms(time.values().as_ref())
    }

    pub fn columns(&self) -> Vec<ArrayRef> {
        self.fields.iter().map(|f| f.values().clone()).collect()
    }

    /// Replace the value arrays of every field, keeping names, labels and config
    pub fn set_columns(&mut self, columns: Vec<ArrayRef>) -> Result<()> {
        if columns.len() != self.fields.len() {
            return Err(QueryError::SchemaError(format!(
                "expected {} columns, got {}",
                self.fields.len(),
                columns.len()
            )));
        }
        if let Some(first) = columns.first() {
            if columns.iter().any(|c| c.len() != first.len()) {
                return Err(QueryError::SchemaError(
                    "columns have differing lengths".to_string(),
                ));
            }
        }
        for (field, values) in self.fields.iter_mut().zip(columns) {
            field.set_values(values);
        }
        Ok(())
    }

    /// Copy the frame, including every value buffer
    pub fn deep_clone(&self) -> Result<Self> {
        Ok(Self {
            name: self.name.clone(),
            ref_id: self.ref_id.clone(),
            fields: self
                .fields
                .iter()
                .map(Field::deep_clone)
                .collect::<Result<Vec<_>>>()?,
        })
    }

    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let arrow_fields = self
            .fields
            .iter()
            .map(Field::to_arrow)
            .collect::<Result<Vec<_>>>()?;

        let mut metadata = HashMap::new();
        if let Some(name) = &self.name {
            metadata.insert(NAME_METADATA_KEY.to_string(), name.clone());
        }
        if let Some(ref_id) = &self.ref_id {
            metadata.insert(REF_ID_METADATA_KEY.to_string(), ref_id.clone());
        }

        let schema = Arc::new(ArrowSchema::new_with_metadata(arrow_fields, metadata));
        Ok(RecordBatch::try_new(schema, self.columns())?)
    }

    pub fn from_record_batch(batch: &RecordBatch) -> Result<Self> {
        let schema = batch.schema();
        let fields = schema
            .fields()
            .iter()
            .zip(batch.columns())
            .map(|(field, values)| Field::from_arrow(field, values.clone()))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name: schema.metadata().get(NAME_METADATA_KEY).cloned(),
            ref_id: schema.metadata().get(REF_ID_METADATA_KEY).cloned(),
            fields,
        })
    }
}

impl TryFrom<&RecordBatch> for Frame {
    type Error = QueryError;

    fn try_from(batch: &RecordBatch) -> Result<Self> {
        Frame::from_record_batch(batch)
    }
}
