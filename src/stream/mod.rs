pub mod controller;
pub mod milestone;
pub mod state;

pub use controller::{LiveStreamController, ScrollObserver};
pub use milestone::{check_milestone, Milestone, MilestoneRule, MilestoneTier};
pub use state::{
    Celebration, CelebrationEffect, StreamEffect, StreamMessage, StreamSettings, StreamState,
    StreamStatus, StreamView,
};
