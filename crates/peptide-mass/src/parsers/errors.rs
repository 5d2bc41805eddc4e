use miette::Diagnostic;
use nom::{IResult, error::ErrorKind};
use nom_miette::{FromExternalError, LabeledErrorKind, LabeledParseError};
use thiserror::Error;

use crate::errors::LookupError;

pub type ParseResult<'a, O> = IResult<&'a str, O, LabeledParseError<'a, PeptideErrorKind>>;

#[derive(Clone, Eq, PartialEq, Debug, Diagnostic, Error)]
pub enum PeptideErrorKind {
    #[error("expected an uppercase ASCII letter")]
    ExpectedUppercase,

    #[error("expected '(UniMod:' to open a modification annotation")]
    ExpectedAnnotationStart,

    #[diagnostic(help(
        "modification annotations look like (UniMod:35), where the number is a UniMod accession"
    ))]
    #[error("expected a UniMod accession number")]
    ExpectedModificationId,

    #[diagnostic(help("you've probably forgotten to close an earlier '(UniMod:' annotation"))]
    #[error("expected ')' to close the modification annotation")]
    ExpectedAnnotationEnd,

    #[diagnostic(transparent)]
    #[error(transparent)]
    LookupError(Box<LookupError>),

    #[diagnostic(help(
        "this is an internal error that you shouldn't ever see! If you have gotten this error, \
        then please report it as a bug!"
    ))]
    #[error("internal `nom` error: {0:?}")]
    NomError(ErrorKind),

    #[diagnostic(help(
        "peptides are written as uppercase one-letter residue codes, optionally followed by \
        (UniMod:<id>) annotations. Check the unparsed region for lowercase letters, digits or other symbols"
    ))]
    #[error("could not interpret the full input as a valid peptide sequence")]
    Incomplete,
}

impl LabeledErrorKind for PeptideErrorKind {
    fn label(&self) -> Option<&'static str> {
        Some(match self {
            Self::LookupError(e) => match **e {
                LookupError::Residue(..) => "unknown residue",
                LookupError::Modification(..) => "unknown modification",
            },
            Self::ExpectedUppercase => "expected uppercase",
            Self::ExpectedAnnotationStart => "expected '(UniMod:'",
            Self::ExpectedModificationId => "expected a UniMod accession",
            Self::ExpectedAnnotationEnd => "expected ')'",
            Self::Incomplete => "input was valid up until this point",
            Self::NomError(_) => "the region that triggered this bug!",
        })
    }
}

impl FromExternalError<LookupError> for PeptideErrorKind {
    const FATAL: bool = true;

    fn from_external_error(error: LookupError) -> Self {
        Self::LookupError(Box::new(error))
    }
}

impl From<ErrorKind> for PeptideErrorKind {
    fn from(value: ErrorKind) -> Self {
        match value {
            ErrorKind::Eof => Self::Incomplete,
            kind => Self::NomError(kind),
        }
    }
}
