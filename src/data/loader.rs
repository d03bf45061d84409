use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, AsArray};
use arrow::datatypes::{DataType, Float32Type, Float64Type, Int32Type, Int64Type};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Dataset, Passenger};
use super::schema::{AttributeKind, AGE, PCLASS, SEX, SURVIVED, TITANIC};
use crate::error::{Result, TitanicError};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a passenger dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.arff`    – attribute-relation file, header must declare the schema
/// * `.csv`     – header `pclass,age,sex[,survived]`
/// * `.json`    – `[{ "pclass": "1", "age": 22, "sex": "male", "survived": "0" }, ...]`
/// * `.parquet` – columns `pclass`, `age`, `sex` and optionally `survived`
///
/// The label column is attribute index 3 in every format.  Missing values
/// are accepted for `age` and `survived` only.
pub fn load_dataset(path: &Path) -> Result<Dataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let dataset = match ext.as_str() {
        "arff" => load_arff(path),
        "csv" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => Err(TitanicError::data(format!(
            "unsupported file extension: .{other} ({})",
            path.display()
        ))),
    }?;

    log::info!(
        "loaded {} passengers ({} labelled) from {}",
        dataset.len(),
        dataset.labelled().len(),
        path.display()
    );
    Ok(dataset)
}

fn read_error(path: &Path, err: impl std::fmt::Display) -> TitanicError {
    TitanicError::data(format!("cannot read {}: {err}", path.display()))
}

// ---------------------------------------------------------------------------
// Shared cell handling
// ---------------------------------------------------------------------------

/// Treat empty cells and the ARFF `?` marker as missing.
fn cell(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|v| !v.is_empty() && *v != "?")
}

/// Build one record from raw textual cells, validating levels against the
/// schema.  Level errors are reported with the row number as data errors.
fn parse_row(
    row: usize,
    pclass: Option<&str>,
    age: Option<&str>,
    sex: Option<&str>,
    survived: Option<&str>,
) -> Result<Passenger> {
    let pclass = required(row, pclass, PCLASS)?;
    let sex = required(row, sex, SEX)?;

    let age = age
        .map(|a| {
            a.parse::<f64>()
                .map_err(|_| TitanicError::data(format!("row {row}: age '{a}' is not a number")))
                .and_then(|v| finite_age(row, v))
        })
        .transpose()?;

    Passenger::from_levels(pclass, age, sex, survived)
        .map_err(|e| TitanicError::data(format!("row {row}: {e}")))
}

/// `NaN` and the infinities are not ages; missing values use `?` or an
/// empty cell.
fn finite_age(row: usize, age: f64) -> Result<f64> {
    if age.is_finite() {
        Ok(age)
    } else {
        Err(TitanicError::data(format!("row {row}: age {age} is not finite")))
    }
}

fn required(row: usize, value: Option<&str>, attribute: usize) -> Result<&str> {
    value.ok_or_else(|| {
        TitanicError::data(format!(
            "row {row}: missing value for nominal attribute '{}'",
            TITANIC.attribute(attribute).name
        ))
    })
}

/// Check a named-column header: the three predictors in schema order,
/// optionally followed by the label.
fn check_columns(columns: &[&str]) -> Result<()> {
    let expected: Vec<&str> = TITANIC.names().collect();
    let ok = columns == &expected[..] || columns == &expected[..TITANIC.class_index];
    if ok {
        Ok(())
    } else {
        Err(TitanicError::data(format!(
            "columns {columns:?} do not match schema {expected:?} (label column optional)"
        )))
    }
}

// ---------------------------------------------------------------------------
// ARFF loader
// ---------------------------------------------------------------------------

/// Declared type of an `@attribute` line.
#[derive(Debug, PartialEq)]
enum Declared {
    Numeric,
    Nominal(Vec<String>),
}

/// Expected layout:
///
/// ```text
/// @relation titanic
/// @attribute pclass {1,2,3}
/// @attribute age numeric
/// @attribute sex {male,female}
/// @attribute survived {0,1}
/// @data
/// 3,22,male,0
/// 1,?,female,?
/// ```
fn load_arff(path: &Path) -> Result<Dataset> {
    let text = std::fs::read_to_string(path).map_err(|e| read_error(path, e))?;
    parse_arff(&text)
}

pub(crate) fn parse_arff(text: &str) -> Result<Dataset> {
    let mut relation = None;
    let mut declared: Vec<(String, Declared)> = Vec::new();
    let mut data_start = None;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        offset += line.len();
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('%') {
            continue;
        }

        let (keyword, rest) = trimmed
            .split_once(char::is_whitespace)
            .unwrap_or((trimmed, ""));
        match keyword.to_ascii_lowercase().as_str() {
            "@relation" => relation = Some(unquote(rest.trim()).to_string()),
            "@attribute" => declared.push(parse_attribute(rest.trim())?),
            "@data" => {
                data_start = Some(offset);
                break;
            }
            _ => {
                return Err(TitanicError::data(format!(
                    "unexpected ARFF header line: {trimmed}"
                )))
            }
        }
    }

    let data_start = data_start.ok_or_else(|| TitanicError::data("ARFF file has no @data section"))?;
    check_declared(&declared)?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'%'))
        .quote(b'\'')
        .trim(csv::Trim::All)
        .from_reader(text[data_start..].as_bytes());

    let mut passengers = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record =
            result.map_err(|e| TitanicError::data(format!("ARFF data row {row_no}: {e}")))?;

        if record.len() == 1 && record.get(0).map_or(true, str::is_empty) {
            continue;
        }
        if record.get(0).is_some_and(|f| f.starts_with('{')) {
            return Err(TitanicError::data("sparse ARFF data is not supported"));
        }
        if record.len() != TITANIC.attributes.len() {
            return Err(TitanicError::data(format!(
                "ARFF data row {row_no}: expected {} values, found {}",
                TITANIC.attributes.len(),
                record.len()
            )));
        }

        passengers.push(parse_row(
            row_no,
            cell(record.get(PCLASS)),
            cell(record.get(AGE)),
            cell(record.get(SEX)),
            cell(record.get(SURVIVED)),
        )?);
    }

    Ok(Dataset {
        relation: relation.unwrap_or_else(|| TITANIC.relation.to_string()),
        passengers,
    })
}

/// Parse the part of an `@attribute` line after the keyword.
fn parse_attribute(rest: &str) -> Result<(String, Declared)> {
    let (name, ty) = split_name(rest)?;
    let ty = ty.trim();

    let declared = if let Some(body) = ty.strip_prefix('{') {
        let body = body
            .strip_suffix('}')
            .ok_or_else(|| TitanicError::data(format!("unterminated nominal list: {ty}")))?;
        Declared::Nominal(
            body.split(',')
                .map(|l| unquote(l.trim()).to_string())
                .collect(),
        )
    } else {
        match ty.to_ascii_lowercase().as_str() {
            "numeric" | "real" | "integer" => Declared::Numeric,
            other => {
                return Err(TitanicError::data(format!(
                    "unsupported type '{other}' for attribute '{name}'"
                )))
            }
        }
    };

    Ok((name, declared))
}

/// Split an attribute name (possibly quoted) from its type declaration.
fn split_name(rest: &str) -> Result<(String, &str)> {
    match rest.chars().next() {
        Some(q @ ('\'' | '"')) => {
            let end = rest[1..]
                .find(q)
                .ok_or_else(|| TitanicError::data(format!("unterminated quote in: {rest}")))?;
            Ok((rest[1..=end].to_string(), &rest[end + 2..]))
        }
        Some(_) => {
            let (name, ty) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| TitanicError::data(format!("attribute without type: {rest}")))?;
            Ok((name.to_string(), ty))
        }
        None => Err(TitanicError::data("empty @attribute declaration")),
    }
}

fn unquote(s: &str) -> &str {
    for q in ['\'', '"'] {
        if let Some(inner) = s.strip_prefix(q).and_then(|s| s.strip_suffix(q)) {
            return inner;
        }
    }
    s
}

/// The declared header must reproduce the schema exactly: same names, same
/// order, same level lists.
fn check_declared(declared: &[(String, Declared)]) -> Result<()> {
    if declared.len() != TITANIC.attributes.len() {
        return Err(TitanicError::data(format!(
            "expected {} attributes, header declares {}",
            TITANIC.attributes.len(),
            declared.len()
        )));
    }

    for (index, ((name, ty), attr)) in declared.iter().zip(TITANIC.attributes.iter()).enumerate() {
        if name != attr.name {
            return Err(TitanicError::data(format!(
                "attribute {index} is '{name}', expected '{}'",
                attr.name
            )));
        }
        let matches = match (&attr.kind, ty) {
            (AttributeKind::Numeric, Declared::Numeric) => true,
            (AttributeKind::Nominal(levels), Declared::Nominal(found)) => {
                found.iter().map(String::as_str).eq(levels.iter().copied())
            }
            _ => false,
        };
        if !matches {
            return Err(TitanicError::data(format!(
                "attribute '{name}' declared as {ty:?}, expected {:?}",
                attr.kind
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row `pclass,age,sex[,survived]`, empty cell = missing.
fn load_csv(path: &Path) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| read_error(path, e))?;
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| TitanicError::data(format!("reading CSV headers: {e}")))?
        .iter()
        .map(|h| h.to_string())
        .collect();
    let columns: Vec<&str> = headers.iter().map(String::as_str).collect();
    check_columns(&columns)?;

    let mut passengers = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.map_err(|e| TitanicError::data(format!("CSV row {row_no}: {e}")))?;
        passengers.push(parse_row(
            row_no,
            cell(record.get(PCLASS)),
            cell(record.get(AGE)),
            cell(record.get(SEX)),
            cell(record.get(SURVIVED)),
        )?);
    }

    Ok(Dataset::new(passengers))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON:
///
/// ```json
/// [
///   { "pclass": "1", "age": 29.0, "sex": "female", "survived": "1" },
///   { "pclass": 3,   "age": null, "sex": "male" }
/// ]
/// ```
fn load_json(path: &Path) -> Result<Dataset> {
    let text = std::fs::read_to_string(path).map_err(|e| read_error(path, e))?;
    let root: JsonValue = serde_json::from_str(&text)
        .map_err(|e| TitanicError::data(format!("parsing JSON: {e}")))?;

    let records = root
        .as_array()
        .ok_or_else(|| TitanicError::data("expected top-level JSON array"))?;

    let mut passengers = Vec::with_capacity(records.len());
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .ok_or_else(|| TitanicError::data(format!("row {i} is not a JSON object")))?;

        if let Some(key) = obj.keys().find(|k| !TITANIC.names().any(|n| n == k.as_str())) {
            return Err(TitanicError::data(format!("row {i}: unknown field '{key}'")));
        }

        let pclass = json_level(obj.get("pclass"));
        let sex = json_level(obj.get("sex"));
        let survived = json_level(obj.get("survived"));
        let age = match obj.get("age") {
            None | Some(JsonValue::Null) => None,
            Some(v) => {
                let age = v.as_f64().ok_or_else(|| {
                    TitanicError::data(format!("row {i}: age {v} is not a number"))
                })?;
                Some(finite_age(i, age)?)
            }
        };

        let passenger = parse_row(
            i,
            cell(pclass.as_deref()),
            None,
            cell(sex.as_deref()),
            cell(survived.as_deref()),
        )?;
        passengers.push(Passenger { age, ..passenger });
    }

    Ok(Dataset::new(passengers))
}

/// Nominal cells may be written as strings or as bare integers.
fn json_level(val: Option<&JsonValue>) -> Option<String> {
    match val? {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file holding the passenger table.
///
/// Expected schema:
/// - `pclass`, `sex`: Utf8 / LargeUtf8 or Int32 / Int64
/// - `age`: Float64, Float32, Int32 or Int64, nullable
/// - `survived`: optional column, same types as the nominal columns
fn load_parquet(path: &Path) -> Result<Dataset> {
    let file = std::fs::File::open(path).map_err(|e| read_error(path, e))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| TitanicError::data(format!("reading parquet metadata: {e}")))?;

    // a file with no rows yields no batches, so check the footer schema
    let columns: Vec<&str> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().as_str())
        .collect();
    check_columns(&columns)?;

    let reader = builder
        .build()
        .map_err(|e| TitanicError::data(format!("building parquet reader: {e}")))?;

    let mut passengers = Vec::new();

    for batch_result in reader {
        let batch = batch_result
            .map_err(|e| TitanicError::data(format!("reading parquet record batch: {e}")))?;

        let pclass_col = batch.column(PCLASS);
        let age_col = batch.column(AGE);
        let sex_col = batch.column(SEX);
        let survived_col = (batch.num_columns() > SURVIVED).then(|| batch.column(SURVIVED));

        for row in 0..batch.num_rows() {
            let row_no = passengers.len();
            let pclass = nominal_value(pclass_col, row)?;
            let sex = nominal_value(sex_col, row)?;
            let survived = match survived_col {
                Some(col) => nominal_value(col, row)?,
                None => None,
            };
            let age = numeric_value(age_col, row)?
                .map(|a| finite_age(row_no, a))
                .transpose()?;

            let passenger = parse_row(
                row_no,
                cell(pclass.as_deref()),
                None,
                cell(sex.as_deref()),
                cell(survived.as_deref()),
            )?;
            passengers.push(Passenger { age, ..passenger });
        }
    }

    Ok(Dataset::new(passengers))
}

// -- Parquet / Arrow helpers --

/// Textual form of a nominal cell.
fn nominal_value(col: &Arc<dyn Array>, row: usize) -> Result<Option<String>> {
    if col.is_null(row) {
        return Ok(None);
    }
    let value = match col.data_type() {
        DataType::Utf8 => col.as_string::<i32>().value(row).to_string(),
        DataType::LargeUtf8 => col.as_string::<i64>().value(row).to_string(),
        DataType::Int32 => col.as_primitive::<Int32Type>().value(row).to_string(),
        DataType::Int64 => col.as_primitive::<Int64Type>().value(row).to_string(),
        other => {
            return Err(TitanicError::data(format!(
                "nominal column has unsupported type {other:?}"
            )))
        }
    };
    Ok(Some(value))
}

fn numeric_value(col: &Arc<dyn Array>, row: usize) -> Result<Option<f64>> {
    if col.is_null(row) {
        return Ok(None);
    }
    let value = match col.data_type() {
        DataType::Float64 => col.as_primitive::<Float64Type>().value(row),
        DataType::Float32 => col.as_primitive::<Float32Type>().value(row) as f64,
        DataType::Int32 => col.as_primitive::<Int32Type>().value(row) as f64,
        DataType::Int64 => col.as_primitive::<Int64Type>().value(row) as f64,
        other => {
            return Err(TitanicError::data(format!(
                "age column has unsupported type {other:?}"
            )))
        }
    };
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Pclass, Sex, Survival};

    const TRAIN: &str = "\
% passenger table
@RELATION titanic

@attribute pclass {1,2,3}
@attribute age numeric
@attribute 'sex' {male,female}
@attribute survived {'0','1'}

@data
3,22,male,0
1,38,female,1
% comment inside data
2,?,female,1
3,4.5,male,?
";

    #[test]
    fn parses_arff_header_and_rows() {
        let ds = parse_arff(TRAIN).unwrap();
        assert_eq!(ds.relation, "titanic");
        assert_eq!(ds.len(), 4);
        assert_eq!(ds.passengers[0].pclass, Pclass::Third);
        assert_eq!(ds.passengers[1].sex, Sex::Female);
        assert_eq!(ds.passengers[1].survived, Some(Survival::Survived));
        assert_eq!(ds.passengers[2].age, None);
        assert_eq!(ds.passengers[3].age, Some(4.5));
        assert_eq!(ds.passengers[3].survived, None);
    }

    #[test]
    fn empty_data_section_is_not_an_error() {
        let header = TRAIN.split("@data").next().unwrap().to_string() + "@data\n";
        let ds = parse_arff(&header).unwrap();
        assert!(ds.is_empty());
    }

    #[test]
    fn rejects_reordered_attributes() {
        let text = "@relation t\n@attribute age numeric\n@attribute pclass {1,2,3}\n\
                    @attribute sex {male,female}\n@attribute survived {0,1}\n@data\n";
        assert!(matches!(parse_arff(text), Err(TitanicError::DataFormat(_))));
    }

    #[test]
    fn rejects_different_level_lists() {
        let text = TRAIN.replace("{male,female}", "{female,male}");
        assert!(matches!(parse_arff(&text), Err(TitanicError::DataFormat(_))));
    }

    #[test]
    fn rejects_unknown_level_in_data() {
        let text = TRAIN.replace("3,22,male,0", "9,22,male,0");
        let err = parse_arff(&text).unwrap_err();
        assert!(matches!(err, TitanicError::DataFormat(ref m) if m.contains("pclass")));
    }

    #[test]
    fn rejects_wrong_field_count_and_missing_data() {
        let text = TRAIN.replace("3,22,male,0", "3,22,male");
        assert!(parse_arff(&text).is_err());

        let text = TRAIN.replace("@data", "");
        assert!(parse_arff(&text).is_err());

        let text = TRAIN.replace("3,22,male,0", "?,22,male,0");
        assert!(parse_arff(&text).is_err());
    }

    #[test]
    fn missing_file_is_data_format_error() {
        let err = load_dataset(Path::new("does/not/exist.arff")).unwrap_err();
        assert!(matches!(err, TitanicError::DataFormat(_)));
    }

    #[test]
    fn unsupported_extension() {
        let err = load_dataset(Path::new("passengers.xlsx")).unwrap_err();
        assert!(matches!(err, TitanicError::DataFormat(ref m) if m.contains("xlsx")));
    }

    #[test]
    fn named_columns_may_omit_label() {
        assert!(check_columns(&["pclass", "age", "sex", "survived"]).is_ok());
        assert!(check_columns(&["pclass", "age", "sex"]).is_ok());
        assert!(check_columns(&["age", "pclass", "sex"]).is_err());
        assert!(check_columns(&["pclass", "age"]).is_err());
    }

    #[test]
    fn non_finite_ages_are_rejected() {
        let dir = tempfile::tempdir().unwrap();

        for (name, body) in [
            ("nan.csv", "pclass,age,sex,survived\n1,NaN,female,1\n"),
            ("inf.csv", "pclass,age,sex\n1,inf,female\n"),
            ("neg_inf.csv", "pclass,age,sex\n3,-inf,male\n"),
        ] {
            let path = dir.path().join(name);
            std::fs::write(&path, body).unwrap();
            let err = load_dataset(&path).unwrap_err();
            assert!(matches!(err, TitanicError::DataFormat(ref m) if m.contains("finite")), "{name}");
        }

        let text = TRAIN.replace("3,22,male,0", "3,NaN,male,0");
        assert!(matches!(parse_arff(&text), Err(TitanicError::DataFormat(_))));

        let path = dir.path().join("nan.parquet");
        let rows = vec![Passenger::from_levels("2", Some(f64::NAN), "male", None).unwrap()];
        crate::data::writer::write_parquet(&Dataset::new(rows), &path).unwrap();
        assert!(matches!(load_dataset(&path), Err(TitanicError::DataFormat(_))));
    }

    #[test]
    fn empty_parquet_files_are_still_schema_checked() {
        use arrow::datatypes::{Field, Schema};
        use arrow::record_batch::RecordBatch;
        use parquet::arrow::ArrowWriter;

        let dir = tempfile::tempdir().unwrap();
        let write_empty = |name: &str, fields: Vec<Field>| {
            let path = dir.path().join(name);
            let schema = Arc::new(Schema::new(fields));
            let file = std::fs::File::create(&path).unwrap();
            let mut writer = ArrowWriter::try_new(file, schema.clone(), None).unwrap();
            writer.write(&RecordBatch::new_empty(schema)).unwrap();
            writer.close().unwrap();
            path
        };

        let wrong = write_empty("wrong.parquet", vec![Field::new("foo", DataType::Utf8, true)]);
        assert!(matches!(load_dataset(&wrong), Err(TitanicError::DataFormat(_))));

        let right = write_empty(
            "right.parquet",
            vec![
                Field::new("pclass", DataType::Utf8, false),
                Field::new("age", DataType::Float64, true),
                Field::new("sex", DataType::Utf8, false),
            ],
        );
        assert!(load_dataset(&right).unwrap().is_empty());
    }
}
