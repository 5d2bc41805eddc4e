//! Span-labelled `nom` errors that can be rendered as `miette` diagnostics
//!
//! Parsers are written against [`LabeledParseError`], which remembers where in the input each failure happened and
//! what the parser was expecting there. Once parsing finishes, [`final_parser`] converts the borrowed error into an
//! owned [`LabeledError`] that carries the full input as its source code, so `miette` can point at the offending text.

use std::{fmt, mem};

use miette::{Diagnostic, LabeledSpan, SourceCode, SourceSpan};
use nom::{
    Finish, IResult, Parser,
    combinator::{all_consuming, complete},
    error::{ErrorKind, ParseError},
};
use thiserror::Error;

// Public API ==========================================================================================================

/// A category of parse error, supplied by the crate using these combinators
pub trait LabeledErrorKind: Diagnostic + Clone + Eq + From<ErrorKind> {
    /// A short label to show underneath the offending region of input
    fn label(&self) -> Option<&'static str> {
        None
    }
}

/// Lifts errors from outside of `nom` (like failed database lookups) into a [`LabeledErrorKind`]
pub trait FromExternalError<E>: Sized {
    /// When `true`, the error is a `nom::Err::Failure` and stops any surrounding `alt` from backtracking
    const FATAL: bool = false;

    fn from_external_error(error: E) -> Self;
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("{kind}")]
pub struct LabeledError<E: LabeledErrorKind> {
    source_code: String,
    labels: Vec<LabeledSpan>,
    kind: E,
    cause: Option<Box<LabeledError<E>>>,
}

impl<E: LabeledErrorKind> LabeledError<E> {
    #[must_use]
    pub const fn kind(&self) -> &E {
        &self.kind
    }

    #[must_use]
    pub fn cause(&self) -> Option<&Self> {
        self.cause.as_deref()
    }
}

impl<E: LabeledErrorKind> Diagnostic for LabeledError<E> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.kind.code()
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.kind.help()
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        Some(&self.source_code)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        Some(Box::new(self.labels.iter().cloned()))
    }

    fn diagnostic_source(&self) -> Option<&dyn Diagnostic> {
        self.cause.as_deref().map(|e| e as &dyn Diagnostic)
    }
}

// ---------------------------------------------------------------------------------------------------------------------

/// The error type threaded through parsers while they still borrow the input
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LabeledParseError<'a, E> {
    input: &'a str,
    length: usize,
    kind: E,
    cause: Option<Box<LabeledParseError<'a, E>>>,
}

impl<'a, E: LabeledErrorKind> LabeledParseError<'a, E> {
    pub const fn new(input: &'a str, kind: E) -> Self {
        Self {
            input,
            length: 0,
            kind,
            cause: None,
        }
    }

    #[must_use]
    pub fn with_length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }

    #[must_use]
    pub fn caused_by(mut self, cause: Self) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub const fn kind(&self) -> &E {
        &self.kind
    }

    fn finalize(self, full_input: &str) -> LabeledError<E> {
        let mut cause = self.cause.map(|e| Box::new(e.finalize(full_input)));

        // NOTE: `nom` always hands parsers a suffix of the full input, so the offset is just the difference in lengths
        let offset = full_input.len() - self.input.len();
        let span = SourceSpan::from(offset..offset + self.length);

        let labels = match self.kind.label() {
            Some(label) => vec![LabeledSpan::new_with_span(Some(label.to_owned()), span)],
            // Unlabelled wrappers take over the labels of their cause, so the outermost report still points somewhere
            None => cause
                .as_mut()
                .map(|c| mem::take(&mut c.labels))
                .unwrap_or_default(),
        };

        LabeledError {
            // NOTE: The trailing space gives labels somewhere to point when input ends unexpectedly
            source_code: format!("{full_input} "),
            labels,
            kind: self.kind,
            cause,
        }
    }
}

impl<'a, E: LabeledErrorKind> ParseError<&'a str> for LabeledParseError<'a, E> {
    fn from_error_kind(input: &'a str, kind: ErrorKind) -> Self {
        Self::new(input, kind.into())
    }

    fn append(_input: &'a str, _kind: ErrorKind, other: Self) -> Self {
        other
    }

    // NOTE: Of two failed alternatives, report the one that made it furthest into the input
    fn or(self, other: Self) -> Self {
        if other.input.len() < self.input.len() {
            other
        } else {
            self
        }
    }
}

// Combinators =========================================================================================================

/// Runs `parser` over the whole of the input, converting any error into an owned, renderable [`LabeledError`]
pub fn final_parser<'a, O, E, P>(parser: P) -> impl FnMut(&'a str) -> Result<O, LabeledError<E>>
where
    E: LabeledErrorKind,
    P: Parser<&'a str, O, LabeledParseError<'a, E>>,
{
    let mut parser = all_consuming(complete(parser));
    move |input| {
        parser
            .parse(input)
            .finish()
            .map(|(_, output)| output)
            .map_err(|e| e.finalize(input))
    }
}

/// Like `nom::combinator::map_res`, but the error from `f` is kept and labelled across everything `parser` consumed
pub fn map_res<'a, O1, O2, X, E, P, F>(
    mut parser: P,
    mut f: F,
) -> impl FnMut(&'a str) -> IResult<&'a str, O2, LabeledParseError<'a, E>>
where
    E: LabeledErrorKind + FromExternalError<X>,
    P: Parser<&'a str, O1, LabeledParseError<'a, E>>,
    F: FnMut(O1) -> Result<O2, X>,
{
    move |input| {
        let (rest, output) = parser.parse(input)?;
        let length = input.len() - rest.len();
        match f(output) {
            Ok(output) => Ok((rest, output)),
            Err(error) => {
                let error =
                    LabeledParseError::new(input, E::from_external_error(error)).with_length(length);
                Err(if E::FATAL {
                    nom::Err::Failure(error)
                } else {
                    nom::Err::Error(error)
                })
            }
        }
    }
}

/// Wraps any error from `parser` in a new error of `kind`, keeping the original as its cause
pub fn wrap_err<'a, O, E, P>(
    mut parser: P,
    kind: E,
) -> impl FnMut(&'a str) -> IResult<&'a str, O, LabeledParseError<'a, E>>
where
    E: LabeledErrorKind,
    P: Parser<&'a str, O, LabeledParseError<'a, E>>,
{
    move |input| {
        parser
            .parse(input)
            .map_err(|e| e.map(|cause| LabeledParseError::new(input, kind.clone()).caused_by(cause)))
    }
}

/// Replaces any error from `parser` with a new error of `kind`, discarding the original
pub fn expect<'a, O, E, P>(
    mut parser: P,
    kind: E,
) -> impl FnMut(&'a str) -> IResult<&'a str, O, LabeledParseError<'a, E>>
where
    E: LabeledErrorKind,
    P: Parser<&'a str, O, LabeledParseError<'a, E>>,
{
    move |input| {
        parser
            .parse(input)
            .map_err(|e| e.map(|_| LabeledParseError::new(input, kind.clone())))
    }
}

// Module Tests ========================================================================================================
