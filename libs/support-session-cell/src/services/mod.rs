pub mod claim;
pub mod housekeeping;
pub mod lifecycle;
pub mod queue;
pub mod websocket;

pub use claim::ClaimController;
pub use housekeeping::HousekeepingService;
pub use lifecycle::SupportSessionService;
pub use queue::{estimated_wait, QueueManager, WaitBaselines};
pub use websocket::{websocket_handler, SupportNotifier};
