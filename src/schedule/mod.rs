pub mod controller;
pub mod state;

pub use controller::{Clock, ScheduleController};
pub use state::{compute_schedule, EventStatus, ScheduleSnapshot, TimelineEventState};
