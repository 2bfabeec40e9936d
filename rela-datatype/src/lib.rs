pub mod atom;
pub mod error;

pub use atom::*;
pub use error::{Error, Result};
