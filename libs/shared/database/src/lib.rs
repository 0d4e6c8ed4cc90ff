pub mod seed;
pub mod store;

pub use seed::DirectorySeed;
pub use store::{StoreState, SupportStore, WaitStats};
