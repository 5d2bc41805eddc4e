use miette::Diagnostic;
use nom_miette::LabeledError;
use thiserror::Error;

use crate::{ModificationId, parsers::errors::PeptideErrorKind};

pub type Result<T, E = Box<PeptideMassError>> = std::result::Result<T, E>;

pub type SequenceError = LabeledError<PeptideErrorKind>;

#[derive(Debug, Diagnostic, Clone, Eq, PartialEq, Error)]
pub enum PeptideMassError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Sequence {
        #[from]
        error: SequenceError,
    },

    #[diagnostic(help(
        "the charge state counts the protons attached during ionization, so it must be 1 or more"
    ))]
    #[error("the charge state {charge} is invalid, expected a positive integer")]
    InvalidCharge { charge: i64 },
}

impl PeptideMassError {
    pub(crate) const fn invalid_charge(charge: i64) -> Self {
        Self::InvalidCharge { charge }
    }
}

// NOTE: Public so that callers can inspect the lookup failures wrapped by strict-mode `PeptideErrorKind`s
#[derive(Debug, Diagnostic, Clone, Eq, PartialEq, Error)]
pub enum LookupError {
    #[diagnostic(help(
        "double-check for typos, or add a new entry to the residues section of the mass database"
    ))]
    #[error("the residue {0:?} could not be found in the supplied mass database")]
    Residue(char),

    #[diagnostic(help(
        "double-check the accession number, or add a new entry to the modifications section of the mass database"
    ))]
    #[error("the modification {0} could not be found in the supplied mass database")]
    Modification(ModificationId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages() {
        assert_eq!(
            PeptideMassError::invalid_charge(0).to_string(),
            "the charge state 0 is invalid, expected a positive integer"
        );
        assert_eq!(
            LookupError::Residue('X').to_string(),
            "the residue 'X' could not be found in the supplied mass database"
        );
        assert_eq!(
            LookupError::Modification(ModificationId::from(9999)).to_string(),
            "the modification UniMod:9999 could not be found in the supplied mass database"
        );
    }
}
