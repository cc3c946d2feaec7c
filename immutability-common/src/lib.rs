//! Shared types for the immutability engine: the mode enumeration, the
//! three engine-maintained snapshot labels, subvolume-pair parsing, and
//! name validation. No persisted configuration of its own — every
//! input arrives on the command line (see the engine crate's
//! dispatcher).

mod label;
mod mode;
mod pair;
mod validate;

pub use label::{Label, SENTINEL_FILE};
pub use mode::Mode;
pub use pair::SubvolumePair;
pub use validate::{validate_name, ValidationError, ValidationResult};
