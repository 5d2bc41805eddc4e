//! Monoisotopic masses and m/z values for `UniMod`-annotated peptides, from the command line

mod batch;
mod repl;
mod tables;

use std::{io, path::PathBuf};

use clap::{ArgAction, Parser, Subcommand};
use itertools::Itertools;
use miette::Result;
use peptide_mass::{Charge, MassCalculator, MassDatabase, Strictness};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// A KDL mass database to use instead of the built-in residue and modification tables
    #[arg(short, long, global = true, value_name = "FILE")]
    database: Option<PathBuf>,

    /// Report unknown residues, unknown modifications and malformed annotations as errors, instead of ignoring them
    #[arg(short, long, global = true)]
    strict: bool,

    /// Log more about what's happening (-v, -vv, -vvv). `RUST_LOG` takes precedence when set
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Calculate the mass and m/z of a single peptide
    Calc {
        /// An annotated peptide sequence, like `M(UniMod:35)PEPTIDE`
        sequence: String,
        /// The number of protons attached to the peptide
        #[arg(allow_negative_numbers = true)]
        charge: i64,
    },
    /// Calculate masses for a whole file of `sequence,charge` lines
    Batch(batch::BatchArgs),
    /// Print the residue and modification tables as CSV
    Tables,
    /// Interactively calculate masses, one peptide at a time (the default)
    Repl,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let db = match &cli.database {
        Some(path) => MassDatabase::from_file(path)?,
        None => MassDatabase::default(),
    };
    let strictness = if cli.strict {
        Strictness::Strict
    } else {
        Strictness::Lenient
    };
    let calculator = MassCalculator::new(&db).strictness(strictness);

    match cli.command.unwrap_or(Command::Repl) {
        Command::Calc { sequence, charge } => {
            print!("{}", peptide_info(&calculator, &sequence, charge)?);
            Ok(())
        }
        Command::Batch(args) => batch::run(&calculator, &args),
        Command::Tables => tables::write_tables(&db, io::stdout().lock()),
        Command::Repl => repl::run(&calculator),
    }
}

fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .init();
}

fn peptide_info(
    calculator: &MassCalculator,
    sequence: &str,
    charge: i64,
) -> peptide_mass::Result<String> {
    let charge = Charge::new(charge)?;
    let tokens = calculator.tokenize(sequence)?;
    let result = calculator.calculate_tokens(&tokens, charge);
    let tokens = tokens.iter().join("");

    Ok(format!(
        "Understood As: {tokens}\n\
         Monoisotopic Mass: {:.6}\n\
         Charge: {}\n\
         Monoisotopic m/z: {:.6}\n",
        result.peptide_mass, result.charge, result.mz
    ))
}
