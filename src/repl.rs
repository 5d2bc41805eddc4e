use miette::{Diagnostic, GraphicalReportHandler, GraphicalTheme, IntoDiagnostic, Result};
use peptide_mass::MassCalculator;
use rustyline::DefaultEditor;
use thiserror::Error;

use crate::peptide_info;

pub fn run(calculator: &MassCalculator) -> Result<()> {
    let mut rl = DefaultEditor::new().into_diagnostic()?;
    while let Ok(line) = rl.readline("Peptide: ") {
        if line.trim().is_empty() {
            continue;
        }
        rl.add_history_entry(&line).into_diagnostic()?;
        println!("{}", respond(calculator, &line));
    }
    Ok(())
}

fn respond(calculator: &MassCalculator, line: &str) -> String {
    let info = parse_query(line).map_err(|e| render_error(&e)).and_then(|(sequence, charge)| {
        peptide_info(calculator, sequence, charge).map_err(|e| render_error(&*e))
    });
    info.unwrap_or_else(|report| report)
}

#[derive(Clone, Eq, PartialEq, Debug, Diagnostic, Error)]
enum QueryError {
    #[diagnostic(help("queries look like `PEPTIDE 2`, and the charge can be left out to default to 1"))]
    #[error("expected the charge to be a whole number, but got {0:?}")]
    UnparseableCharge(String),

    #[diagnostic(help("there should only be a sequence and an optional charge, separated by whitespace"))]
    #[error("expected at most two values, but got {0}")]
    TooManyValues(usize),
}

/// Query = Sequence , [ whitespace , Charge ] ;
fn parse_query(line: &str) -> Result<(&str, i64), QueryError> {
    let values: Vec<_> = line.split_whitespace().collect();
    match values[..] {
        [sequence] => Ok((sequence, 1)),
        [sequence, charge] => charge
            .parse()
            .map(|charge| (sequence, charge))
            .map_err(|_| QueryError::UnparseableCharge(charge.to_owned())),
        _ => Err(QueryError::TooManyValues(values.len())),
    }
}

fn render_error(diagnostic: &dyn Diagnostic) -> String {
    render_error_with_theme(diagnostic, GraphicalTheme::unicode())
}

fn render_error_with_theme(diagnostic: &dyn Diagnostic, theme: GraphicalTheme) -> String {
    let mut buf = String::new();
    // NOTE: Rendering into a `String` can't fail
    let _ = GraphicalReportHandler::new_themed(theme)
        .with_width(80)
        .render_report(&mut buf, diagnostic);
    buf
}
