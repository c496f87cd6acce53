//! Domain models for clinic visit tracking.

mod department;
mod form;
mod visit;

pub use department::*;
pub use form::*;
pub use visit::*;
