//! spi-core: shared foundation for the solar performance insight crates.
//!
//! Contains:
//! - units (convertible unit families backed by uom)
//! - variables (canonical data columns with their units and display names)
//! - numeric (tolerances, float helpers, numeric-looking text)
//! - error (shared error types)

pub mod error;
pub mod numeric;
pub mod units;
pub mod variables;

pub use error::{CoreError, CoreResult};
pub use numeric::*;
pub use units::{Converter, UnitFamily, convert, unit_options};
pub use variables::{CanonicalVariable, VARIABLES, canonical_units, display_name};
