mod event;
mod post;

pub use event::ScheduleEvent;
pub use post::{LivePost, PostKind};
