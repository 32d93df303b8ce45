use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use thiserror::Error;

use crate::{Balances, Operation, Payer, Points};

/// Errors that can occur when reading operations or writing balances
#[derive(Debug, Error)]
pub enum CsvError {
    #[error("failed to open csv input: {0}")]
    Open(csv::Error),

    #[error("line {line}: failed to parse row: {source}")]
    Parse { line: usize, source: csv::Error },

    #[error("line {line}: unrecognized operation type '{op_type}'")]
    UnrecognizedType { line: usize, op_type: String },

    #[error("line {line}: {op_type} missing {field}")]
    MissingField {
        line: usize,
        op_type: &'static str,
        field: &'static str,
    },

    #[error("failed to write csv output: {0}")]
    Write(#[from] csv::Error),
}

#[derive(Debug, Deserialize)]
struct InputRow {
    r#type: String,
    payer: Option<Payer>,
    points: Option<Points>,
    timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct OutputRow<'a> {
    payer: &'a str,
    points: Points,
}

/// Read ledger operations from a csv file
pub fn read_operations(
    path: impl AsRef<Path>,
) -> Result<impl Iterator<Item = Result<Operation, CsvError>>, CsvError> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(CsvError::Open)?;

    Ok(reader
        .into_deserialize::<InputRow>()
        .enumerate()
        .map(|(idx, result)| {
            let line = idx + 2; // 1-indexed, skip header
            let row = result.map_err(|source| CsvError::Parse { line, source })?;
            parse_row(line, row)
        }))
}

fn parse_row(line: usize, row: InputRow) -> Result<Operation, CsvError> {
    let missing = |op_type, field| CsvError::MissingField {
        line,
        op_type,
        field,
    };

    match row.r#type.as_str() {
        "add" => Ok(Operation::AddCredit {
            payer: row
                .payer
                .filter(|payer| !payer.is_empty())
                .ok_or_else(|| missing("add", "payer"))?,
            points: row.points.ok_or_else(|| missing("add", "points"))?,
            timestamp: row.timestamp.ok_or_else(|| missing("add", "timestamp"))?,
        }),
        "spend" => Ok(Operation::Spend {
            points: row.points.ok_or_else(|| missing("spend", "points"))?,
        }),
        other => Err(CsvError::UnrecognizedType {
            line,
            op_type: other.to_string(),
        }),
    }
}

/// Write payer balances in csv format
pub fn write_balances(balances: &Balances, out: impl io::Write) -> Result<(), CsvError> {
    let mut writer = csv::Writer::from_writer(out);

    for (payer, points) in balances.iter() {
        writer.serialize(OutputRow { payer, points })?;
    }

    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}
