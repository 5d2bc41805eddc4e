//! Monoisotopic masses and m/z values for peptides written as `UniMod`-annotated sequences, like
//! `AC(UniMod:4)EFAGFQC(UniMod:4)QIQFGPHNEQK`

pub mod calculator;
mod charge;
pub mod errors;
pub mod mass_database;
mod mass_result;
pub mod parsers;
#[cfg(test)]
mod testing_tools;
mod token;

use std::num::NonZeroU32;

// External Crate Imports
use derive_more::{Display, From, Into};
use rust_decimal::Decimal;
use serde::Serialize;

pub use calculator::{MassCalculator, calculate_mz};
pub use errors::{LookupError, PeptideMassError, Result};
pub use mass_database::MassDatabase;

// ---------------------------------------------------------------------------------------------------------------------

/// A validated charge state: the number of protons attached during ionization, which is always at least one
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, Serialize)]
#[serde(transparent)]
pub struct Charge(NonZeroU32);

/// The accession number of a `UniMod` modification, as written in a `(UniMod:<id>)` annotation
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, From, Into, Serialize)]
#[display("UniMod:{_0}")]
pub struct ModificationId(u32);

/// A single meaningful piece of an annotated peptide sequence
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Token {
    /// A one-letter amino acid code
    Residue(char),
    /// A `(UniMod:<id>)` annotation
    Modification(ModificationId),
}

/// How the calculator treats parts of a sequence that it doesn't recognise
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub enum Strictness {
    /// Unknown residues, unknown modifications and malformed annotations contribute no mass
    #[default]
    Lenient,
    /// Anything that would otherwise be ignored is reported as an error
    Strict,
}

/// The mass and m/z of a single (charged) peptide
#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize)]
pub struct MassResult {
    #[serde(with = "rust_decimal::serde::float")]
    pub mz: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub peptide_mass: Decimal,
    pub charge: Charge,
}

// =====================================================================================================================

pub trait Massive {
    fn monoisotopic_mass(&self) -> Decimal;
}

macro_rules! massive_ref_impls {
    ($($ref_type:ty),+ $(,)?) => {
        $(
            impl<T: Massive> Massive for $ref_type {
                fn monoisotopic_mass(&self) -> Decimal {
                    (**self).monoisotopic_mass()
                }
            }
        )+
    };
}

massive_ref_impls!(&T, &mut T, Box<T>);
