pub mod errors;
pub mod primitives;
pub(crate) mod sequence;

// Re-exports
pub use sequence::{annotation, lenient_peptide, strict_peptide};
