use std::num::NonZeroU32;

use rust_decimal::Decimal;

use crate::{Charge, PeptideMassError, Result};

impl Charge {
    /// Validates a raw charge state, rejecting zero and negative charges
    ///
    /// # Errors
    ///
    /// Returns [`PeptideMassError::InvalidCharge`] if `charge` is less than 1 (or too large to fit in a `u32`)
    pub fn new(charge: i64) -> Result<Self> {
        u32::try_from(charge)
            .ok()
            .and_then(NonZeroU32::new)
            .map(Self)
            .ok_or_else(|| Box::new(PeptideMassError::invalid_charge(charge)))
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl TryFrom<i64> for Charge {
    type Error = Box<PeptideMassError>;

    fn try_from(value: i64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Charge> for Decimal {
    fn from(value: Charge) -> Self {
        Self::from(value.get())
    }
}

impl From<Charge> for i64 {
    fn from(value: Charge) -> Self {
        Self::from(value.get())
    }
}
