pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{
    ConsultantMatch, ConsultantView, DirectoryError, DirectorySnapshot, FavoriteRequest,
    MatchingWeights, PreferenceView,
};
pub use services::{ConsultantDirectory, MatchingEngine};
