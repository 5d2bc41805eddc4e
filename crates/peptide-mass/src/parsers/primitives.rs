use nom::{
    bytes::complete::tag,
    character::complete::{char, satisfy, u32},
    combinator::map,
};
use nom_miette::expect;

use crate::ModificationId;

use super::errors::{ParseResult, PeptideErrorKind};

/// uppercase
///   = "A" | "B" | "C" | "D" | "E" | "F" | "G"
///   | "H" | "I" | "J" | "K" | "L" | "M" | "N"
///   | "O" | "P" | "Q" | "R" | "S" | "T" | "U"
///   | "V" | "W" | "X" | "Y" | "Z"
///   ;
pub fn uppercase(i: &str) -> ParseResult<char> {
    let parser = satisfy(|c| c.is_ascii_uppercase());
    expect(parser, PeptideErrorKind::ExpectedUppercase)(i)
}

/// Annotation Start = "(UniMod:" ;
pub fn annotation_start(i: &str) -> ParseResult<&str> {
    expect(tag("(UniMod:"), PeptideErrorKind::ExpectedAnnotationStart)(i)
}

/// Modification Id = digit , { digit } ;
pub fn modification_id(i: &str) -> ParseResult<ModificationId> {
    let parser = map(u32, ModificationId::from);
    expect(parser, PeptideErrorKind::ExpectedModificationId)(i)
}

/// Annotation End = ")" ;
pub fn annotation_end(i: &str) -> ParseResult<char> {
    expect(char(')'), PeptideErrorKind::ExpectedAnnotationEnd)(i)
}
