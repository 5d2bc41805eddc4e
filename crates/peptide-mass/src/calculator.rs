use nom_miette::final_parser;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use static_assertions::assert_impl_all;
use tracing::debug;

use crate::{
    Charge, MassDatabase, MassResult, Massive, Result, Strictness, Token,
    parsers::{lenient_peptide, strict_peptide},
};

static DEFAULT_DB: Lazy<MassDatabase> = Lazy::new(MassDatabase::default);

/// Calculates the monoisotopic mass and m/z of `sequence` at the given `charge`, using the built-in mass tables
///
/// Unknown residues, unknown modifications, and anything else that can't be understood are ignored, contributing no
/// mass. Use a [`MassCalculator`] with [`Strictness::Strict`] to report them as errors instead.
///
/// # Errors
///
/// Returns [`PeptideMassError::InvalidCharge`](crate::PeptideMassError::InvalidCharge) if `charge` is less than 1
pub fn calculate_mz(sequence: &str, charge: i64) -> Result<MassResult> {
    MassCalculator::new(&DEFAULT_DB).calculate(sequence, charge)
}

#[derive(Copy, Clone, Debug)]
pub struct MassCalculator<'d> {
    db: &'d MassDatabase,
    strictness: Strictness,
}

assert_impl_all!(MassCalculator<'static>: Send, Sync);

impl<'d> MassCalculator<'d> {
    #[must_use]
    pub const fn new(db: &'d MassDatabase) -> Self {
        Self {
            db,
            strictness: Strictness::Lenient,
        }
    }

    #[must_use]
    pub const fn strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self
    }

    /// Splits `sequence` into residues and modifications
    ///
    /// # Errors
    ///
    /// In strict mode, returns a labelled sequence error for unknown residues or modifications, malformed
    /// annotations, and any other input that isn't part of a peptide. Lenient tokenization never fails.
    pub fn tokenize(&self, sequence: &str) -> Result<Vec<Token>> {
        let tokens = match self.strictness {
            Strictness::Lenient => final_parser(lenient_peptide)(sequence),
            Strictness::Strict => final_parser(strict_peptide(self.db))(sequence),
        };
        tokens.map_err(|e| Box::new(e.into()))
    }

    /// Calculates the mass and m/z of `sequence` with `charge` protons attached
    ///
    /// # Errors
    ///
    /// Returns [`PeptideMassError::InvalidCharge`](crate::PeptideMassError::InvalidCharge) if `charge` is less than
    /// 1, or any of the errors listed under [`MassCalculator::tokenize`]
    pub fn calculate(&self, sequence: &str, charge: i64) -> Result<MassResult> {
        let charge = Charge::new(charge)?;
        let tokens = self.tokenize(sequence)?;
        debug!(sequence, "tokenized peptide");

        Ok(self.calculate_tokens(&tokens, charge))
    }

    /// Calculates the mass and m/z of already-tokenized residues and modifications with `charge` protons attached
    ///
    /// Tokens missing from the database contribute no mass, whatever the [`Strictness`].
    #[must_use]
    pub fn calculate_tokens(&self, tokens: &[Token], charge: Charge) -> MassResult {
        let peptide_mass = self.token_mass(tokens) + Decimal::from(charge) * self.db.proton_mass();
        debug!(%charge, %peptide_mass, "calculated peptide mass");
        MassResult::new(peptide_mass, charge)
    }

    // NOTE: Strict tokenization checks every lookup, but tokens passed to `calculate_tokens` may still miss
    fn token_mass(&self, tokens: &[Token]) -> Decimal {
        tokens
            .iter()
            .filter_map(|&token| {
                let mass = match token {
                    Token::Residue(code) => self.db.residue(code).map(Massive::monoisotopic_mass),
                    Token::Modification(id) => {
                        self.db.modification(id).map(Massive::monoisotopic_mass)
                    }
                };
                mass.inspect_err(|error| debug!(%error, "ignoring token {token}")).ok()
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use itertools::Itertools;
    use rust_decimal_macros::dec;

    use crate::{
        ModificationId, PeptideMassError, errors::LookupError, parsers::errors::PeptideErrorKind,
        testing_tools::diagnostic_labels,
    };

    use super::*;

    const PROTON: Decimal = dec!(1.0078);

    fn mass(sequence: &str, charge: i64) -> Decimal {
        calculate_mz(sequence, charge).unwrap().peptide_mass
    }

    #[test]
    fn reference_peptide() {
        let result = calculate_mz("AC(UniMod:4)EFAGFQC(UniMod:4)QIQFGPHNEQK", 2).unwrap();
        assert_eq!(result.peptide_mass, dec!(2379.05147));
        assert_eq!(result.mz, dec!(1189.525735));
        assert_eq!(result.charge, Charge::new(2).unwrap());

        let base_mass = mass("ACEFAGFQCQIQFGPHNEQK", 1) - PROTON;
        assert_eq!(base_mass, dec!(2262.99387));
    }

    #[test]
    fn more_peptides() {
        let peptide = calculate_mz("PEPTIDE", 1).unwrap();
        assert_eq!(peptide.peptide_mass, dec!(782.35718));
        assert_eq!(peptide.mz, peptide.peptide_mass);

        let phosphorylated = calculate_mz("PEPT(UniMod:21)IDE", 3).unwrap();
        assert_eq!(phosphorylated.peptide_mass, dec!(864.33878));
        assert!((phosphorylated.mz - dec!(288.112926)).abs() < dec!(0.000001));

        let modified = calculate_mz("M(UniMod:35)PEPTIDE(UniMod:1)", 2).unwrap();
        assert_eq!(modified.peptide_mass, dec!(972.41147));
        assert_eq!(modified.mz, dec!(486.205735));
    }

    #[test]
    fn single_residues() {
        let db = MassDatabase::default();
        for (code, residue) in db.residues() {
            let result = calculate_mz(&code.to_string(), 1).unwrap();
            assert_eq!(result.peptide_mass, residue.mass + PROTON);
            assert_eq!(result.mz, result.peptide_mass);
        }
    }

    #[test]
    fn modification_order_is_irrelevant() {
        let forwards = mass("M(UniMod:35)(UniMod:1)C(UniMod:4)K", 2);
        let backwards = mass("M(UniMod:1)(UniMod:35)C(UniMod:4)K", 2);
        let moved = mass("(UniMod:4)(UniMod:1)MCK(UniMod:35)", 2);
        assert_eq!(forwards, backwards);
        assert_eq!(forwards, moved);
    }

    #[test]
    fn mz_times_charge_is_mass() {
        for charge in 1..=10 {
            let result = calculate_mz("AC(UniMod:4)EFAGFQC(UniMod:4)QIQFGPHNEQK", charge).unwrap();
            let error = result.mz * Decimal::from(charge) - result.peptide_mass;
            assert!(error.abs() < dec!(0.000001), "charge {charge}: off by {error}");
        }
    }

    #[test]
    fn ignored_input() {
        // Unknown residues
        assert_eq!(mass("X", 1), PROTON);
        assert_eq!(mass("BJOUXZ", 1), PROTON);
        // Unknown modifications
        assert_eq!(mass("A(UniMod:9999)", 1), mass("A", 1));
        assert_eq!(mass("A(UniMod:0)", 1), mass("A", 1));
        // Malformed annotations lose their punctuation and any non-numeric id, but the `M` of `UniMod` still counts
        assert_eq!(mass("A(UniMod:abc)", 1), dec!(203.08540));
        assert_eq!(mass("A(UniMod:4", 1), mass("AM", 1) + dec!(57.021));
        // Bare digit runs are modification ids
        assert_eq!(mass("A4", 1), dec!(129.06591));
        assert_eq!(mass("C 4", 2), mass("C(UniMod:4)", 2));
        // Everything else
        assert_eq!(mass("a c-e 123", 1), PROTON);
    }

    #[test]
    fn empty_sequence() {
        let result = calculate_mz("", 1).unwrap();
        assert_eq!(result.peptide_mass, PROTON);
        assert_eq!(result.mz, PROTON);

        let result = calculate_mz("", 3).unwrap();
        assert_eq!(result.peptide_mass, dec!(3.0234));
        assert_eq!(result.mz, PROTON);
    }

    #[test]
    fn invalid_charges() {
        for charge in [0, -1, -2] {
            let error = calculate_mz("PEPTIDE", charge).unwrap_err();
            assert_eq!(*error, PeptideMassError::InvalidCharge { charge });
        }
        // The charge is checked before the sequence
        let strict = MassCalculator::new(&DEFAULT_DB).strictness(Strictness::Strict);
        let error = strict.calculate("pepXide", 0).unwrap_err();
        assert_eq!(*error, PeptideMassError::InvalidCharge { charge: 0 });
    }

    #[test]
    fn strict_calculations() {
        let strict = MassCalculator::new(&DEFAULT_DB).strictness(Strictness::Strict);
        let lenient = MassCalculator::new(&DEFAULT_DB);
        let sequence = "AC(UniMod:4)EFAGFQC(UniMod:4)QIQFGPHNEQK";
        assert_eq!(
            strict.calculate(sequence, 2).unwrap(),
            lenient.calculate(sequence, 2).unwrap()
        );

        for (sequence, kind) in [
            (
                "X",
                PeptideErrorKind::LookupError(Box::new(LookupError::Residue('X'))),
            ),
            (
                "A(UniMod:9999)",
                PeptideErrorKind::LookupError(Box::new(LookupError::Modification(ModificationId::from(9999)))),
            ),
            ("A(UniMod:abc)", PeptideErrorKind::ExpectedModificationId),
            ("A(UniMod:4", PeptideErrorKind::ExpectedAnnotationEnd),
            ("pep", PeptideErrorKind::Incomplete),
        ] {
            assert!(lenient.calculate(sequence, 1).is_ok());
            let PeptideMassError::Sequence { error } = *strict.calculate(sequence, 1).unwrap_err()
            else {
                panic!("expected a sequence error for {sequence:?}");
            };
            assert_eq!(error.kind(), &kind);
        }
    }

    #[test]
    fn strict_errors_point_into_the_sequence() {
        let strict = MassCalculator::new(&DEFAULT_DB).strictness(Strictness::Strict);
        let error = strict.calculate("MPEPXIDE", 1).unwrap_err();
        assert_eq!(
            diagnostic_labels(&*error),
            vec![("unknown residue".to_owned(), 4, 1)]
        );
    }

    #[test]
    fn tokenize() {
        let lenient = MassCalculator::new(&DEFAULT_DB);
        let tokens = lenient.tokenize("pM(UniMod:35)X").unwrap();
        assert_eq!(tokens.iter().join(""), "M(UniMod:35)X");

        let strict = lenient.strictness(Strictness::Strict);
        assert!(strict.tokenize("pM(UniMod:35)X").is_err());
        assert_eq!(strict.tokenize("M(UniMod:35)").unwrap().len(), 2);
    }

    #[test]
    fn calculating_from_tokens() {
        let strict = MassCalculator::new(&DEFAULT_DB).strictness(Strictness::Strict);
        for calculator in [MassCalculator::new(&DEFAULT_DB), strict] {
            for (sequence, charge) in [
                ("AC(UniMod:4)EFAGFQC(UniMod:4)QIQFGPHNEQK", 2),
                ("PEPT(UniMod:21)IDE", 3),
                ("", 1),
            ] {
                let tokens = calculator.tokenize(sequence).unwrap();
                assert_eq!(
                    calculator.calculate_tokens(&tokens, Charge::new(charge).unwrap()),
                    calculator.calculate(sequence, charge).unwrap()
                );
            }
        }

        // Unknown tokens are skipped even by a strict calculator, since they weren't checked when tokenizing
        let tokens = MassCalculator::new(&DEFAULT_DB).tokenize("X(UniMod:9999)K").unwrap();
        let charge = Charge::new(1).unwrap();
        assert_eq!(
            strict.calculate_tokens(&tokens, charge).peptide_mass,
            mass("K", 1)
        );
    }

    #[test]
    fn custom_database() {
        let kdl = indoc! {r#"
            proton 1
            residues {
                A "Alanine" 71
                U "Selenocysteine" 150.95
            }
            modifications {
                unimod 1 "Acetyl" 42
            }
        "#};
        let db = MassDatabase::new("custom.kdl", kdl).unwrap();
        let calculator = MassCalculator::new(&db);
        let result = calculator.calculate("(UniMod:1)AUC", 2).unwrap();
        assert_eq!(result.peptide_mass, dec!(265.95));
        assert_eq!(result.mz, dec!(132.975));

        let strict = calculator.strictness(Strictness::Strict);
        assert!(strict.calculate("AUC", 1).is_err());
        assert!(strict.calculate("AU", 1).is_ok());
    }
}
