pub mod consultant;
pub mod error;
pub mod support;

pub use consultant::*;
pub use support::*;
