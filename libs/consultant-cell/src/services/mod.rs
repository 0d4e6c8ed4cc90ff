pub mod directory;
pub mod matching;

pub use directory::ConsultantDirectory;
pub use matching::MatchingEngine;
