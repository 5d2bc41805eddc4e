// Standard Library Imports
use std::{collections::hash_map::Entry, fs, ops::Deref, path::Path};

// External Crate Imports
use ahash::{HashMap, HashMapExt};
use itertools::Itertools;
use knuffel::{
    Decode, DecodeScalar,
    ast::{self, Integer, Literal, Radix, TypeName},
    decode::{Context, Kind},
    errors::{DecodeError, ExpectedType},
    span::{Span, Spanned},
    traits::ErrorSpan,
};
use miette::{Diagnostic, IntoDiagnostic, LabeledSpan, NamedSource, Result, WrapErr};
use rust_decimal::Decimal;
use serde::Serialize;
use static_assertions::assert_impl_all;
use thiserror::Error;
use tracing::info;

// Local Crate Imports
use crate::{LookupError, Massive, ModificationId};

pub const DEFAULT_KDL: &str = include_str!("../data/mass_database.kdl");

// Public API ==========================================================================================================

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct MassDatabase {
    proton_mass: Decimal,
    residues: Residues,
    modifications: Modifications,
}

assert_impl_all!(MassDatabase: Send, Sync);

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct ResidueDescription {
    pub name: String,
    pub mass: Decimal,
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct ModificationDescription {
    pub name: String,
    pub mass_delta: Decimal,
}

impl MassDatabase {
    /// Decodes and validates a KDL mass database
    ///
    /// # Errors
    ///
    /// Returns a diagnostic pointing into `kdl_text` if the KDL is malformed, if it doesn't follow the mass database
    /// schema, or if any of its entries are invalid (duplicated residues, non-positive masses, and so on)
    pub fn new(file_name: impl AsRef<str>, kdl_text: impl AsRef<str>) -> Result<Self> {
        let parsed_db: MassDatabaseKdl = knuffel::parse(file_name.as_ref(), kdl_text.as_ref())?;
        let db = parsed_db
            .validate()
            .map_err(|e| e.finalize(&file_name, kdl_text))?;

        info!(
            residues = db.residues.len(),
            modifications = db.modifications.len(),
            "loaded mass database from {}",
            file_name.as_ref()
        );
        Ok(db)
    }

    /// Reads a KDL mass database from disk
    ///
    /// # Errors
    ///
    /// Returns a diagnostic if the file can't be read, or for any of the reasons listed under [`MassDatabase::new`]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let kdl_text = fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to read the mass database at {}", path.display()))?;
        Self::new(path.display().to_string(), kdl_text)
    }

    #[must_use]
    pub const fn proton_mass(&self) -> Decimal {
        self.proton_mass
    }

    /// Looks up a residue by its one-letter code
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::Residue`] if the database has no entry for `code`
    pub fn residue(&self, code: char) -> Result<&ResidueDescription, LookupError> {
        self.residues.get(&code).ok_or(LookupError::Residue(code))
    }

    /// Looks up a modification by its `UniMod` accession
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::Modification`] if the database has no entry for `id`
    pub fn modification(
        &self,
        id: ModificationId,
    ) -> Result<&ModificationDescription, LookupError> {
        self.modifications
            .get(&id)
            .ok_or(LookupError::Modification(id))
    }

    /// All residues, sorted by their one-letter codes
    pub fn residues(&self) -> impl Iterator<Item = (char, &ResidueDescription)> {
        self.residues
            .iter()
            .map(|(&code, residue)| (code, residue))
            .sorted_unstable_by_key(|&(code, _)| code)
    }

    /// All modifications, sorted by their `UniMod` accessions
    pub fn modifications(&self) -> impl Iterator<Item = (ModificationId, &ModificationDescription)> {
        self.modifications
            .iter()
            .map(|(&id, modification)| (id, modification))
            .sorted_unstable_by_key(|&(id, _)| id)
    }
}

impl Default for MassDatabase {
    fn default() -> Self {
        // NOTE: The embedded database is checked by this module's tests, so failing here is a bug in the crate itself
        Self::new("mass_database.kdl", DEFAULT_KDL).expect("the embedded mass database should always be valid")
    }
}

impl Massive for ResidueDescription {
    fn monoisotopic_mass(&self) -> Decimal {
        self.mass
    }
}

impl Massive for ModificationDescription {
    fn monoisotopic_mass(&self) -> Decimal {
        self.mass_delta
    }
}

// Private Types =======================================================================================================

type Residues = HashMap<char, ResidueDescription>;
type Modifications = HashMap<ModificationId, ModificationDescription>;

// KDL File Schema =====================================================================================================

#[derive(Debug, Decode)]
#[knuffel(span_type=Span)]
struct MassDatabaseKdl {
    #[knuffel(child, unwrap(argument))]
    proton: Spanned<DecimalKdl, Span>,
    #[knuffel(child)]
    residues: ResiduesKdl,
    #[knuffel(child)]
    modifications: ModificationsKdl,
}

#[derive(Debug, Decode)]
#[knuffel(span_type=Span)]
struct ResiduesKdl {
    #[knuffel(children)]
    residues: Vec<ResidueKdl>,
}

#[derive(Debug, Decode)]
#[knuffel(span_type=Span)]
struct ModificationsKdl {
    #[knuffel(children(name = "unimod"))]
    modifications: Vec<ModificationKdl>,
}

// ---------------------------------------------------------------------------------------------------------------------

#[derive(Debug, Decode)]
#[knuffel(span_type=Span)]
struct ResidueKdl {
    #[knuffel(span)]
    span: Span,
    #[knuffel(node_name)]
    code: String,
    #[knuffel(argument)]
    name: String,
    #[knuffel(argument)]
    mass: DecimalKdl,
}

#[derive(Debug, Decode)]
#[knuffel(span_type=Span)]
struct ModificationKdl {
    #[knuffel(span)]
    span: Span,
    #[knuffel(argument)]
    id: u32,
    #[knuffel(argument)]
    name: String,
    #[knuffel(argument)]
    mass_delta: DecimalKdl,
}

// Lossless Parsing of KDL Numbers to Decimal ==========================================================================

#[derive(Copy, Clone, Debug, Default)]
struct DecimalKdl(Decimal);

impl<S: ErrorSpan> DecodeScalar<S> for DecimalKdl {
    fn type_check(type_name: &Option<Spanned<TypeName, S>>, ctx: &mut Context<S>) {
        if let Some(t) = type_name {
            ctx.emit_error(DecodeError::TypeName {
                span: t.span().clone(),
                found: Some(t.deref().clone()),
                expected: ExpectedType::no_type(),
                rust_type: "Decimal",
            });
        }
    }

    fn raw_decode(
        value: &Spanned<Literal, S>,
        ctx: &mut Context<S>,
    ) -> std::result::Result<Self, DecodeError<S>> {
        match &**value {
            Literal::Decimal(ast::Decimal(s)) | Literal::Int(Integer(Radix::Dec, s)) => {
                let res = if s.contains(['e', 'E']) {
                    Decimal::from_scientific(s)
                } else {
                    Decimal::from_str_exact(s)
                };
                res.map(Self).or_else(|e| {
                    ctx.emit_error(DecodeError::conversion(value, Box::new(e)));
                    Ok(Self::default())
                })
            }
            unsupported => {
                ctx.emit_error(DecodeError::unsupported(
                    value,
                    format!("expected a decimal number, found {}", Kind::from(unsupported)),
                ));
                Ok(Self::default())
            }
        }
    }
}

// Contextual Validation ===============================================================================================

type DbResult<T> = std::result::Result<T, DatabaseErrorKind>;

impl MassDatabaseKdl {
    fn validate(self) -> DbResult<MassDatabase> {
        let DecimalKdl(proton_mass) = *self.proton;
        if proton_mass <= Decimal::ZERO {
            return Err(DatabaseErrorKind::NonPositiveProtonMass(
                *self.proton.span(),
                proton_mass,
            ));
        }

        Ok(MassDatabase {
            proton_mass,
            residues: self.residues.validate()?,
            modifications: self.modifications.validate()?,
        })
    }
}

impl ResiduesKdl {
    fn validate(self) -> DbResult<Residues> {
        let mut residues = HashMap::with_capacity(self.residues.len());
        let mut first_defined_at = HashMap::new();

        for ResidueKdl {
            span,
            code,
            name,
            mass: DecimalKdl(mass),
        } in self.residues
        {
            let valid_code = code.chars().exactly_one().ok().filter(char::is_ascii_uppercase);
            let Some(code) = valid_code else {
                return Err(DatabaseErrorKind::InvalidResidueCode(span, code));
            };

            if mass <= Decimal::ZERO {
                return Err(DatabaseErrorKind::NonPositiveResidueMass(span, code, mass));
            }

            match first_defined_at.entry(code) {
                Entry::Occupied(e) => {
                    return Err(DatabaseErrorKind::DuplicateResidue(*e.get(), span, code));
                }
                Entry::Vacant(e) => e.insert(span),
            };

            residues.insert(code, ResidueDescription { name, mass });
        }

        Ok(residues)
    }
}

impl ModificationsKdl {
    fn validate(self) -> DbResult<Modifications> {
        let mut modifications = HashMap::with_capacity(self.modifications.len());
        let mut first_defined_at = HashMap::new();

        for ModificationKdl {
            span,
            id,
            name,
            mass_delta: DecimalKdl(mass_delta),
        } in self.modifications
        {
            if id == 0 {
                return Err(DatabaseErrorKind::ZeroModificationId(span));
            }
            let id = ModificationId::from(id);

            match first_defined_at.entry(id) {
                Entry::Occupied(e) => {
                    return Err(DatabaseErrorKind::DuplicateModification(*e.get(), span, id));
                }
                Entry::Vacant(e) => e.insert(span),
            };

            modifications.insert(id, ModificationDescription { name, mass_delta });
        }

        Ok(modifications)
    }
}

// Validation Error Types and Trait Implementations  ===================================================================

#[derive(Debug, Error)]
#[error("failed to validate mass database file")]
struct DatabaseError {
    kdl: NamedSource<String>,
    #[source]
    kind: DatabaseErrorKind,
}

// NOTE: This is manually implemented because the list of labels is dynamic and needs to be extracted from `self.kind`
impl Diagnostic for DatabaseError {
    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.kdl)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        Some(Box::new(self.kind.labels().into_iter().map(|(s, l)| {
            LabeledSpan::new_with_span(Some(l.to_owned()), *s)
        })))
    }

    fn diagnostic_source(&self) -> Option<&dyn Diagnostic> {
        Some(&self.kind)
    }
}

#[derive(Clone, Debug, Diagnostic, Error)]
enum DatabaseErrorKind {
    #[error("the proton mass must be positive, but was set to {1}")]
    #[diagnostic(help("the proton mass is added once per charge, and is usually 1.0078 Da"))]
    NonPositiveProtonMass(Span, Decimal),

    #[error("expected a residue code to be a single uppercase ASCII letter, got {1:?}")]
    #[diagnostic(help("residues are named by their one-letter amino acid codes, like K or R"))]
    InvalidResidueCode(Span, String),

    #[error("the residue {1:?} must have a positive mass, but was given {2}")]
    #[diagnostic(help("double-check for typos, residue masses are given in Daltons"))]
    NonPositiveResidueMass(Span, char, Decimal),

    #[error("the residue {2:?} has already been defined")]
    #[diagnostic(help("double-check for typos, or remove the duplicate residue"))]
    DuplicateResidue(Span, Span, char),

    #[error("modifications must have a UniMod accession of 1 or more")]
    #[diagnostic(help("UniMod doesn't assign the accession 0, so it can never be referenced by a sequence"))]
    ZeroModificationId(Span),

    #[error("the modification {2} has already been defined")]
    #[diagnostic(help("double-check the accession number, or remove the duplicate modification"))]
    DuplicateModification(Span, Span, ModificationId),
}

impl DatabaseErrorKind {
    fn labels(&self) -> Vec<(&Span, &'static str)> {
        match self {
            Self::DuplicateResidue(s1, s2, _) | Self::DuplicateModification(s1, s2, _) => {
                vec![(s1, "first defined here"), (s2, "then again here")]
            }
            Self::NonPositiveProtonMass(s, _) => vec![(s, "non-positive mass")],
            Self::NonPositiveResidueMass(s, _, _) => vec![(s, "non-positive mass")],
            Self::InvalidResidueCode(s, _) => vec![(s, "invalid residue code")],
            Self::ZeroModificationId(s) => vec![(s, "invalid accession")],
        }
    }

    fn finalize(self, file_name: impl AsRef<str>, kdl: impl AsRef<str>) -> DatabaseError {
        let kdl = NamedSource::new(file_name, kdl.as_ref().to_owned());
        DatabaseError { kdl, kind: self }
    }
}

// Module Tests ========================================================================================================
