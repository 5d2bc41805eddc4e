use rust_decimal::Decimal;

use crate::{Charge, MassResult};

impl MassResult {
    // NOTE: `Charge` is never zero, so this division can't fail
    pub(crate) fn new(peptide_mass: Decimal, charge: Charge) -> Self {
        let mz = peptide_mass / Decimal::from(charge);
        Self {
            mz,
            peptide_mass,
            charge,
        }
    }
}
