use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, ArrayRef, AsArray, BooleanArray, Float64Array, StringArray};
use arrow::datatypes::{
    DataType, Field, Float32Type, Float64Type, Int32Type, Int64Type, Schema,
};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Column, ColumnValues, Table, Value};

/// Field holding the row keys in tables written by [`write_parquet`].
pub const ROW_KEY_FIELD: &str = "row_key";
/// Arrow field-metadata entry carrying a column's unit tag.
pub const UNIT_METADATA_KEY: &str = "unit";

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a population table from a file.  Dispatch by extension.
///
/// `key_column` names the column whose values become the row keys.
///
/// Supported formats:
/// * `.parquet` – one column per field, units in field metadata
/// * `.json`    – `[{ "name": "...", "mass": 1.0, ... }, ...]`
/// * `.csv`     – header row, one body per line
pub fn load_table(path: &Path, key_column: &str) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let (names, units, cells) = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path)?,
        "json" => load_json(path)?,
        "csv" => load_csv(path)?,
        other => bail!("Unsupported file extension: .{other}"),
    };
    build_table(names, units, cells, key_column)
        .with_context(|| format!("building table from {}", path.display()))
}

/// Column names, unit tags and typed values, in file order.
type RawColumns = (Vec<String>, Vec<String>, Vec<ColumnValues>);

fn build_table(
    names: Vec<String>,
    units: Vec<String>,
    cells: Vec<ColumnValues>,
    key_column: &str,
) -> Result<Table> {
    let key_idx = names
        .iter()
        .position(|n| n == key_column)
        .with_context(|| format!("missing key column '{key_column}'"))?;

    let key_values = &cells[key_idx];
    let keys = (0..key_values.len())
        .map(|row| match key_values.get(row) {
            Value::Missing => bail!("row {row}: missing '{key_column}'"),
            Value::Text(s) => Ok(s),
            other => Ok(other.to_string()),
        })
        .collect::<Result<Vec<String>>>()?;

    let columns = names
        .into_iter()
        .zip(units)
        .zip(cells)
        .filter(|((name, _), _)| name != ROW_KEY_FIELD)
        .map(|((name, unit), values)| Column { name, unit, values })
        .collect();

    Ok(Table::new(keys, columns)?)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "name": "Earth", "mass": 1.0, "radius": 1.0 },
///   ...
/// ]
/// ```
///
/// Keys absent from a record are missing values for that row.
fn load_json(path: &Path) -> Result<RawColumns> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut names: Vec<String> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut cells: Vec<Vec<Value>> = Vec::new();

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        for (key, val) in obj {
            let col = *index.entry(key.clone()).or_insert_with(|| {
                names.push(key.clone());
                cells.push(vec![Value::Missing; i]);
                names.len() - 1
            });
            cells[col].push(json_to_value(val));
        }
        // Pad columns this record did not mention.
        for column in &mut cells {
            if column.len() == i {
                column.push(Value::Missing);
            }
        }
    }

    let units = vec![String::new(); names.len()];
    let cells = cells.into_iter().map(ColumnValues::from_values).collect();
    Ok((names, units, cells))
}

fn json_to_value(val: &JsonValue) -> Value {
    match val {
        JsonValue::String(s) => Value::Text(s.clone()),
        JsonValue::Number(n) => n
            .as_f64()
            .map(Value::Number)
            .unwrap_or_else(|| Value::Text(n.to_string())),
        JsonValue::Bool(b) => Value::Flag(*b),
        JsonValue::Null => Value::Missing,
        other => Value::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one body per record.
/// Cell types are guessed per value and unified per column.
fn load_csv(path: &Path) -> Result<RawColumns> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let names: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut cells: Vec<Vec<Value>> = vec![Vec::new(); names.len()];

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        if record.len() != names.len() {
            bail!(
                "CSV row {row_no}: expected {} fields, found {}",
                names.len(),
                record.len()
            );
        }
        for (column, value) in cells.iter_mut().zip(record.iter()) {
            column.push(guess_value(value));
        }
    }

    let units = vec![String::new(); names.len()];
    let cells = cells.into_iter().map(ColumnValues::from_values).collect();
    Ok((names, units, cells))
}

pub(crate) fn guess_value(s: &str) -> Value {
    let s = s.trim();
    if s.is_empty() {
        return Value::Missing;
    }
    if let Ok(f) = s.parse::<f64>() {
        return if f.is_finite() {
            Value::Number(f)
        } else {
            Value::Missing
        };
    }
    if s == "true" || s == "false" {
        return Value::Flag(s == "true");
    }
    Value::Text(s.to_string())
}

// ---------------------------------------------------------------------------
// Parquet loader / writer
// ---------------------------------------------------------------------------

/// Load a Parquet file into columns.
///
/// Numeric fields (Float32/64, Int32/64) become numeric columns, Utf8 /
/// LargeUtf8 become text, Boolean becomes flags. Units are read from the
/// `unit` entry of each field's metadata.
fn load_parquet(path: &Path) -> Result<RawColumns> {
    let file = File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let schema = builder.schema().clone();
    let reader = builder.build().context("building parquet reader")?;

    let names: Vec<String> = schema.fields().iter().map(|f| f.name().clone()).collect();
    let units: Vec<String> = schema
        .fields()
        .iter()
        .map(|f| f.metadata().get(UNIT_METADATA_KEY).cloned().unwrap_or_default())
        .collect();

    let mut cells: Vec<Option<ColumnValues>> = vec![None; names.len()];

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for (col_idx, slot) in cells.iter_mut().enumerate() {
            let values = column_values(batch.column(col_idx))
                .with_context(|| format!("column '{}'", names[col_idx]))?;
            match slot {
                None => *slot = Some(values),
                Some(existing) => append(existing, values)?,
            }
        }
    }

    let cells = cells
        .into_iter()
        .zip(schema.fields().iter())
        .map(|(values, field)| match values {
            Some(values) => Ok(values),
            None => empty_values(field.data_type()),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok((names, units, cells))
}

fn column_values(col: &ArrayRef) -> Result<ColumnValues> {
    let values = match col.data_type() {
        DataType::Float64 => {
            ColumnValues::Numeric(col.as_primitive::<Float64Type>().iter().collect())
        }
        DataType::Float32 => ColumnValues::Numeric(
            col.as_primitive::<Float32Type>()
                .iter()
                .map(|v| v.map(f64::from))
                .collect(),
        ),
        DataType::Int32 => ColumnValues::Numeric(
            col.as_primitive::<Int32Type>()
                .iter()
                .map(|v| v.map(f64::from))
                .collect(),
        ),
        DataType::Int64 => ColumnValues::Numeric(
            col.as_primitive::<Int64Type>()
                .iter()
                .map(|v| v.map(|v| v as f64))
                .collect(),
        ),
        DataType::Utf8 => ColumnValues::Text(
            col.as_string::<i32>()
                .iter()
                .map(|v| v.map(str::to_string))
                .collect(),
        ),
        DataType::LargeUtf8 => ColumnValues::Text(
            col.as_string::<i64>()
                .iter()
                .map(|v| v.map(str::to_string))
                .collect(),
        ),
        DataType::Boolean => ColumnValues::Flag(col.as_boolean().iter().collect()),
        other => bail!("unsupported column type {other:?}"),
    };
    Ok(match values {
        ColumnValues::Numeric(v) => {
            ColumnValues::Numeric(v.into_iter().map(|x| x.filter(|x| x.is_finite())).collect())
        }
        other => other,
    })
}

fn empty_values(data_type: &DataType) -> Result<ColumnValues> {
    Ok(match data_type {
        DataType::Utf8 | DataType::LargeUtf8 => ColumnValues::Text(Vec::new()),
        DataType::Boolean => ColumnValues::Flag(Vec::new()),
        DataType::Float64 | DataType::Float32 | DataType::Int32 | DataType::Int64 => {
            ColumnValues::Numeric(Vec::new())
        }
        other => bail!("unsupported column type {other:?}"),
    })
}

fn append(existing: &mut ColumnValues, more: ColumnValues) -> Result<()> {
    match (existing, more) {
        (ColumnValues::Numeric(a), ColumnValues::Numeric(b)) => a.extend(b),
        (ColumnValues::Text(a), ColumnValues::Text(b)) => a.extend(b),
        (ColumnValues::Flag(a), ColumnValues::Flag(b)) => a.extend(b),
        (a, b) => bail!("column changed type between batches ({} → {})", a.kind(), b.kind()),
    }
    Ok(())
}

/// Convert a table to a single Arrow record batch: the row keys first, then
/// every column with its unit in the field metadata.
pub fn table_to_record_batch(table: &Table) -> Result<RecordBatch> {
    let mut fields = vec![Field::new(ROW_KEY_FIELD, DataType::Utf8, false)];
    let keys: Vec<&str> = table.keys().iter().map(String::as_str).collect();
    let mut arrays: Vec<ArrayRef> = vec![Arc::new(StringArray::from(keys))];

    for column in table.columns() {
        let (data_type, array): (DataType, ArrayRef) = match &column.values {
            ColumnValues::Numeric(v) => {
                (DataType::Float64, Arc::new(Float64Array::from(v.clone())))
            }
            ColumnValues::Text(v) => (
                DataType::Utf8,
                Arc::new(StringArray::from(
                    v.iter().map(|s| s.as_deref()).collect::<Vec<_>>(),
                )),
            ),
            ColumnValues::Flag(v) => (DataType::Boolean, Arc::new(BooleanArray::from(v.clone()))),
        };
        let metadata = HashMap::from([(UNIT_METADATA_KEY.to_string(), column.unit.clone())]);
        fields.push(Field::new(&column.name, data_type, true).with_metadata(metadata));
        arrays.push(array);
    }

    let schema = Arc::new(Schema::new(fields));
    RecordBatch::try_new(schema, arrays).context("assembling record batch")
}

/// Write a table to Parquet, readable again with `load_table(path, ROW_KEY_FIELD)`.
pub fn write_parquet(table: &Table, path: &Path) -> Result<()> {
    let batch = table_to_record_batch(table)?;
    let file = File::create(path)
        .with_context(|| format!("creating parquet file {}", path.display()))?;
    let mut writer =
        ArrowWriter::try_new(file, batch.schema(), None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet record batch")?;
    writer.close().context("finalizing parquet file")?;
    log::debug!("wrote {} rows to {}", table.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_csv_guesses_column_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "planets.csv",
            "name,mass,transiting,facility\nEarth,1.0,false,\nMars,0.107,false,Ground\n",
        );
        let table = load_table(&path, "name").unwrap();
        assert_eq!(table.keys(), ["Earth", "Mars"]);
        assert_eq!(table.column("mass").unwrap().values.kind(), "numeric");
        assert_eq!(table.column("transiting").unwrap().values.kind(), "flag");
        assert_eq!(
            table.column("facility").unwrap().values,
            ColumnValues::Text(vec![None, Some("Ground".into())])
        );
    }

    #[test]
    fn test_load_json_pads_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "planets.json",
            r#"[{"name": "Earth", "mass": 1.0}, {"name": "Venus", "radius": 0.949}]"#,
        );
        let table = load_table(&path, "name").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.column("mass").unwrap().values,
            ColumnValues::Numeric(vec![Some(1.0), None])
        );
        assert_eq!(
            table.column("radius").unwrap().values,
            ColumnValues::Numeric(vec![None, Some(0.949)])
        );
    }

    #[test]
    fn test_missing_key_column_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "bodies.csv", "mass\n1.0\n");
        let err = load_table(&path, "name").unwrap_err();
        assert!(format!("{err:#}").contains("missing key column 'name'"));
    }

    #[test]
    fn test_unsupported_extension() {
        let err = load_table(Path::new("bodies.pkl"), "name").unwrap_err();
        assert!(err.to_string().contains(".pkl"));
    }

    #[test]
    fn test_parquet_keeps_units_and_missing_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("standard.parquet");
        let table = Table::new(
            vec!["b".into(), "a".into()],
            vec![
                Column::numeric("mass", "earthMass", vec![Some(2.0), None]),
                Column::text("discovery_method", vec![None, Some("Transit".into())]),
                Column::flag("detected_in_transit", vec![Some(true), None]),
            ],
        )
        .unwrap();

        write_parquet(&table, &path).unwrap();
        let loaded = load_table(&path, ROW_KEY_FIELD).unwrap();

        assert_eq!(loaded.keys(), table.keys());
        assert_eq!(loaded.columns(), table.columns());
        assert!(loaded.column(ROW_KEY_FIELD).is_none());
    }
}
