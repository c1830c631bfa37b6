//! Dataset → Schema

use std::collections::{BTreeMap, HashSet};

use extractflow_protocol::{ColumnDef, ColumnType, Dataset, Schema, TableName};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::coerce::ValueCoercer;
use crate::inference::{infer_column_type, sample_type};
use crate::{Result, SchemaError};

/// Caller-controlled knobs for schema construction and row encoding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaOptions {
    /// Table identity inside the extract.
    pub table: TableName,
    /// Forced column types, bypassing inference.
    pub overrides: BTreeMap<String, ColumnType>,
    /// Store missing text as `""`.
    pub fill_text_nulls: bool,
    /// Fail the build on values that do not fit their column.
    pub strict: bool,
}

impl SchemaOptions {
    pub fn coercer(&self) -> ValueCoercer {
        ValueCoercer::new(self.fill_text_nulls, self.strict)
    }
}

/// Where a column's type came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnOrigin {
    /// Taken from the first non-null value at `row`.
    Sampled { row: usize },
    /// No non-null value; fell back to text.
    Defaulted,
    /// Forced by [`SchemaOptions::overrides`].
    Override,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InferredColumn {
    pub name: String,
    pub column_type: ColumnType,
    pub origin: ColumnOrigin,
}

/// A built schema plus how each column was typed.
#[derive(Debug, Clone)]
pub struct SchemaReport {
    pub schema: Schema,
    pub columns: Vec<InferredColumn>,
}

/// Builds a [`Schema`] from a [`Dataset`], one column at a time, in
/// dataset column order.
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    options: SchemaOptions,
}

impl SchemaBuilder {
    pub fn new(options: SchemaOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SchemaOptions {
        &self.options
    }

    pub fn build(&self, dataset: &Dataset) -> Result<Schema> {
        self.build_with_report(dataset).map(|report| report.schema)
    }

    pub fn build_with_report(&self, dataset: &Dataset) -> Result<SchemaReport> {
        let names = dataset.columns();
        if names.is_empty() {
            return Err(SchemaError::EmptySchema);
        }

        let mut seen = HashSet::with_capacity(names.len());
        for name in names {
            if !seen.insert(name.as_str()) {
                return Err(SchemaError::DuplicateColumn { name: name.clone() });
            }
        }

        if let Some(unknown) = self
            .options
            .overrides
            .keys()
            .find(|column| !seen.contains(column.as_str()))
        {
            return Err(SchemaError::UnknownOverrideColumn {
                column: unknown.clone(),
            });
        }

        let inferred: Vec<InferredColumn> = names
            .iter()
            .enumerate()
            .map(|(idx, name)| self.type_column(dataset, idx, name))
            .collect();

        for column in &inferred {
            debug!(
                column = %column.name,
                column_type = %column.column_type,
                origin = ?column.origin,
                "Typed column"
            );
        }

        let schema = Schema::try_new(
            self.options.table.clone(),
            inferred
                .iter()
                .map(|c| ColumnDef::new(c.name.clone(), c.column_type))
                .collect(),
        )?;

        info!(
            table = %schema.table(),
            columns = schema.len(),
            rows = dataset.num_rows(),
            "Built schema {}",
            schema
        );

        Ok(SchemaReport {
            schema,
            columns: inferred,
        })
    }

    fn type_column(&self, dataset: &Dataset, idx: usize, name: &str) -> InferredColumn {
        if let Some(forced) = self.options.overrides.get(name) {
            return InferredColumn {
                name: name.to_string(),
                column_type: *forced,
                origin: ColumnOrigin::Override,
            };
        }

        let origin = dataset
            .column_values(idx)
            .position(|value| sample_type(value).is_some())
            .map(|row| ColumnOrigin::Sampled { row })
            .unwrap_or(ColumnOrigin::Defaulted);

        InferredColumn {
            name: name.to_string(),
            column_type: infer_column_type(dataset.column_values(idx)),
            origin,
        }
    }
}
