use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::PathBuf,
};

use clap::{Args, ValueEnum};
use csv::{Position, ReaderBuilder, StringRecord, Trim};
use miette::{Diagnostic, IntoDiagnostic, Result, WrapErr};
use peptide_mass::{Charge, MassCalculator, MassResult, PeptideMassError};
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Args)]
pub struct BatchArgs {
    /// A CSV file with a sequence and a charge on each row (tab-separated files are fine too)
    input: PathBuf,

    /// Where to write the results, instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// The format of the results
    #[arg(short, long, value_enum, default_value_t = Format::Csv)]
    format: Format,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, ValueEnum)]
pub enum Format {
    /// Comma-separated values, with a header
    Csv,
    /// One JSON object per line
    Json,
}

pub fn run(calculator: &MassCalculator, args: &BatchArgs) -> Result<()> {
    let input = fs::read_to_string(&args.input)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read peptides from {}", args.input.display()))?;

    let records = calculate_rows(calculator, &input)?;
    info!(peptides = records.len(), "finished calculating batch");

    if let Some(path) = &args.output {
        let file = File::create(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to create output file {}", path.display()))?;
        write_records(&records, args.format, BufWriter::new(file))
    } else {
        write_records(&records, args.format, io::stdout().lock())
    }
}

// ---------------------------------------------------------------------------------------------------------------------

#[derive(Debug, Diagnostic, Error)]
pub enum BatchError {
    #[diagnostic(help("check that every quoted field is closed again"))]
    #[error("failed to read the batch as CSV")]
    Csv(#[from] csv::Error),

    #[diagnostic(help("separate each sequence from its charge with a comma or a tab, like `PEPTIDE,2`"))]
    #[error("line {line}: expected a sequence and a charge, but found {text:?}")]
    MissingCharge { line: u64, text: String },

    #[diagnostic(help("charges are whole numbers, like 1, 2 or 3"))]
    #[error("line {line}: the charge {charge:?} is not a whole number")]
    UnparseableCharge { line: u64, charge: String },

    #[error("line {line}: failed to calculate the mass of {sequence:?}")]
    Calculation {
        line: u64,
        sequence: String,
        #[source]
        #[diagnostic_source]
        source: Box<PeptideMassError>,
    },
}

#[derive(Clone, Eq, PartialEq, Debug)]
struct Row {
    line: u64,
    sequence: String,
    charge: i64,
}

#[derive(Clone, PartialEq, Debug, Serialize)]
struct Record {
    sequence: String,
    #[serde(flatten)]
    result: MassResult,
}

// NOTE: `csv` can't serialize flattened fields, and masses are written as exact decimals rather than floats
#[derive(Serialize)]
struct CsvRecord<'a> {
    sequence: &'a str,
    charge: Charge,
    peptide_mass: Decimal,
    mz: Decimal,
}

/// Input is tab-separated if its first row has a tab but no comma
fn delimiter(input: &str) -> u8 {
    let first_row = input
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'));
    match first_row {
        Some(row) if row.contains('\t') && !row.contains(',') => b'\t',
        _ => b',',
    }
}

fn read_rows(input: &str) -> Result<Vec<Row>, BatchError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(Trim::All)
        .delimiter(delimiter(input))
        .from_reader(input.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record
            .position()
            .map_or(0, |position| record_line(input, position));
        rows.extend(parse_record(line, &record)?);
    }
    Ok(rows)
}

// NOTE: A record's position is where reading it began, which can be before the blank and comment lines it skipped
fn record_line(input: &str, position: &Position) -> u64 {
    let start = usize::try_from(position.byte()).unwrap_or(usize::MAX);
    let skipped = input
        .get(start..)
        .unwrap_or_default()
        .lines()
        .take_while(|line| line.is_empty() || line.starts_with('#'))
        .count();
    position.line() + skipped as u64
}

// NOTE: Columns past the charge are ignored, so earlier results can be fed back in
fn parse_record(line: u64, record: &StringRecord) -> Result<Option<Row>, BatchError> {
    let (sequence, charge) = match (record.get(0), record.get(1)) {
        (None | Some(""), None) => return Ok(None),
        (Some(text), None) => {
            return Err(BatchError::MissingCharge {
                line,
                text: text.to_owned(),
            });
        }
        (sequence, Some(charge)) => (sequence.unwrap_or_default(), charge),
    };

    if sequence.eq_ignore_ascii_case("sequence") && charge.eq_ignore_ascii_case("charge") {
        debug!(line, "skipping header");
        return Ok(None);
    }

    let charge = charge
        .parse()
        .map_err(|_| BatchError::UnparseableCharge {
            line,
            charge: charge.to_owned(),
        })?;

    Ok(Some(Row {
        line,
        sequence: sequence.to_owned(),
        charge,
    }))
}

fn calculate_rows(calculator: &MassCalculator, input: &str) -> Result<Vec<Record>, BatchError> {
    let rows = read_rows(input)?;

    // NOTE: Results are collected before checking for errors, so the error reported is always the earliest one
    let results: Vec<_> = rows
        .into_par_iter()
        .map(|Row { line, sequence, charge }| match calculator.calculate(&sequence, charge) {
            Ok(result) => Ok(Record { sequence, result }),
            Err(source) => Err(BatchError::Calculation {
                line,
                sequence,
                source,
            }),
        })
        .collect();

    results.into_iter().collect()
}

fn write_records(records: &[Record], format: Format, mut out: impl Write) -> Result<()> {
    match format {
        Format::Csv => {
            let mut writer = csv::Writer::from_writer(out);
            for Record { sequence, result } in records {
                writer
                    .serialize(CsvRecord {
                        sequence,
                        charge: result.charge,
                        peptide_mass: result.peptide_mass,
                        mz: result.mz,
                    })
                    .into_diagnostic()?;
            }
            writer.flush().into_diagnostic()
        }
        Format::Json => {
            for record in records {
                serde_json::to_writer(&mut out, record).into_diagnostic()?;
                writeln!(out).into_diagnostic()?;
            }
            out.flush().into_diagnostic()
        }
    }
}
