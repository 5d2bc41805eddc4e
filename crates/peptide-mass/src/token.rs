use std::fmt::{self, Display, Formatter};

use crate::Token;

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Residue(code) => write!(f, "{code}"),
            Self::Modification(id) => write!(f, "({id})"),
        }
    }
}
