pub mod error;
pub mod locator;
pub mod protocol;

pub use error::HealError;
pub use locator::LocatorKind;
