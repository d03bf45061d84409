use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema as ArrowSchema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use super::model::{Dataset, Passenger};
use super::schema::{AttributeKind, TITANIC};
use crate::error::{Result, TitanicError};

fn write_error(path: &Path, err: impl std::fmt::Display) -> TitanicError {
    TitanicError::data(format!("cannot write {}: {err}", path.display()))
}

/// Write a dataset in the format implied by the file extension
/// (`.arff`, `.csv` or `.parquet`).
pub fn write_dataset(dataset: &Dataset, path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "arff" => write_arff(dataset, path),
        "csv" => write_csv(dataset, path),
        "parquet" | "pq" => write_parquet(dataset, path),
        other => Err(TitanicError::data(format!(
            "cannot write datasets as .{other}"
        ))),
    }?;

    log::info!("wrote {} passengers to {}", dataset.len(), path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// ARFF
// ---------------------------------------------------------------------------

/// ARFF header generated from the schema, followed by one instance per line.
pub fn write_arff(dataset: &Dataset, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|e| write_error(path, e))?;
    let mut out = BufWriter::new(file);
    arff_to(&mut out, dataset).map_err(|e| write_error(path, e))?;
    out.flush().map_err(|e| write_error(path, e))
}

fn arff_to<W: Write>(out: &mut W, dataset: &Dataset) -> std::io::Result<()> {
    writeln!(out, "@relation {}", dataset.relation)?;
    writeln!(out)?;
    for attr in &TITANIC.attributes {
        match attr.kind {
            AttributeKind::Nominal(levels) => {
                writeln!(out, "@attribute {} {{{}}}", attr.name, levels.join(","))?
            }
            AttributeKind::Numeric => writeln!(out, "@attribute {} numeric", attr.name)?,
        }
    }
    writeln!(out)?;
    writeln!(out, "@data")?;
    for passenger in dataset.iter() {
        writeln!(out, "{passenger}")?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// CSV with a schema header; missing values become empty cells.
pub fn write_csv(dataset: &Dataset, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| write_error(path, e))?;
    writer
        .write_record(TITANIC.names())
        .map_err(|e| write_error(path, e))?;

    for p in dataset.iter() {
        let age = p.age.map(|a| a.to_string()).unwrap_or_default();
        let survived = p.survived.map(|s| s.to_string()).unwrap_or_default();
        writer
            .write_record([p.pclass.to_string(), age, p.sex.to_string(), survived])
            .map_err(|e| write_error(path, e))?;
    }
    writer.flush().map_err(|e| write_error(path, e))
}

// ---------------------------------------------------------------------------
// Parquet
// ---------------------------------------------------------------------------

/// Parquet with Utf8 nominal columns and a nullable Float64 `age`.
pub fn write_parquet(dataset: &Dataset, path: &Path) -> Result<()> {
    let batch = to_record_batch(&dataset.passengers)?;
    let file = File::create(path).map_err(|e| write_error(path, e))?;
    let mut writer =
        ArrowWriter::try_new(file, batch.schema(), None).map_err(|e| write_error(path, e))?;
    writer.write(&batch).map_err(|e| write_error(path, e))?;
    writer.close().map_err(|e| write_error(path, e))?;
    Ok(())
}

fn to_record_batch(passengers: &[Passenger]) -> Result<RecordBatch> {
    let names: Vec<&str> = TITANIC.names().collect();
    let schema = Arc::new(ArrowSchema::new(vec![
        Field::new(names[0], DataType::Utf8, false),
        Field::new(names[1], DataType::Float64, true),
        Field::new(names[2], DataType::Utf8, false),
        Field::new(names[3], DataType::Utf8, true),
    ]));

    let pclass = StringArray::from_iter_values(passengers.iter().map(|p| p.pclass.to_string()));
    let age: Float64Array = passengers.iter().map(|p| p.age).collect();
    let sex = StringArray::from_iter_values(passengers.iter().map(|p| p.sex.to_string()));
    let survived: StringArray = passengers
        .iter()
        .map(|p| p.survived.map(|s| s.to_string()))
        .collect();

    let columns: Vec<ArrayRef> = vec![
        Arc::new(pclass),
        Arc::new(age),
        Arc::new(sex),
        Arc::new(survived),
    ];
    RecordBatch::try_new(schema, columns)
        .map_err(|e| TitanicError::data(format!("building record batch: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arff_header_comes_from_schema() {
        let ds = Dataset::new(vec![
            Passenger::from_levels("3", Some(22.0), "male", Some("0")).unwrap(),
            Passenger::from_levels("1", None, "female", None).unwrap(),
        ]);
        let mut buf = Vec::new();
        arff_to(&mut buf, &ds).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.starts_with("@relation titanic\n"));
        assert!(text.contains("@attribute pclass {1,2,3}\n"));
        assert!(text.contains("@attribute age numeric\n"));
        assert!(text.contains("@attribute sex {male,female}\n"));
        assert!(text.contains("@attribute survived {0,1}\n"));
        assert!(text.ends_with("@data\n3,22,male,0\n1,?,female,?\n"));

        let parsed = crate::data::loader::parse_arff(&text).unwrap();
        assert_eq!(parsed.passengers, ds.passengers);
    }
}
