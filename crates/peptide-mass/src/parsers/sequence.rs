use nom::{
    branch::alt,
    character::complete::{anychar, digit1},
    combinator::{cut, map, recognize},
    multi::{fold_many0, many0},
    sequence::{delimited, preceded, terminated},
};
use nom_miette::map_res;
use tracing::debug;

use crate::{MassDatabase, ModificationId, Token};

use super::{
    errors::ParseResult,
    primitives::{annotation_end, annotation_start, modification_id, uppercase},
};

/// Annotation = Annotation Start , Modification Id , Annotation End ;
pub fn annotation(i: &str) -> ParseResult<ModificationId> {
    delimited(annotation_start, modification_id, annotation_end)(i)
}

/// Lenient Peptide = { Annotation | uppercase | Modification Id | Skipped } ;
///
/// Never fails. Outside of well-formed annotations, uppercase letters are still read as residues and runs of digits
/// as modification ids, so a malformed annotation like `(UniMod:abc)` contributes its `U` and `M`. Everything else is
/// skipped a character at a time.
pub fn lenient_peptide(i: &str) -> ParseResult<Vec<Token>> {
    let token = alt((
        map(annotation, |id| Some(Token::Modification(id))),
        map(uppercase, |c| Some(Token::Residue(c))),
        map(modification_id, |id| Some(Token::Modification(id))),
        map(skipped, |skipped| {
            debug!(skipped, "ignoring unrecognised sequence input");
            None
        }),
    ));
    fold_many0(token, Vec::new, |mut tokens, token| {
        tokens.extend(token);
        tokens
    })(i)
}

/// Strict Peptide = { Annotation | uppercase } ;
///
/// Unlike [`lenient_peptide`], every residue and modification must exist in `db`, and annotations that have been
/// opened must be completed
pub fn strict_peptide<'a, 'd>(
    db: &'d MassDatabase,
) -> impl FnMut(&'a str) -> ParseResult<'a, Vec<Token>> {
    many0(alt((known_modification(db), known_residue(db))))
}

// ---------------------------------------------------------------------------------------------------------------------

/// Skipped = digit , { digit } | any ;
// NOTE: Digit runs only end up here when they overflow a `u32`, and are then dropped as a whole
fn skipped(i: &str) -> ParseResult<&str> {
    alt((digit1, recognize(anychar)))(i)
}

fn known_residue<'a, 'd>(db: &'d MassDatabase) -> impl FnMut(&'a str) -> ParseResult<'a, Token> {
    map_res(uppercase, |code| db.residue(code).map(|_| Token::Residue(code)))
}

fn known_modification<'a, 'd>(
    db: &'d MassDatabase,
) -> impl FnMut(&'a str) -> ParseResult<'a, Token> {
    // NOTE: Once "(UniMod:" has been seen, we're committed to an annotation
    let annotation = preceded(annotation_start, cut(terminated(modification_id, annotation_end)));
    map_res(annotation, |id| {
        db.modification(id).map(|_| Token::Modification(id))
    })
}
