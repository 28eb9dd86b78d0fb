pub mod config;
pub mod live_day;
pub mod models;
pub mod mosaic;
pub mod schedule;
pub mod source;
pub mod stream;
pub mod utils;

pub use config::LiveConfig;
pub use live_day::LiveDay;
pub use models::{LivePost, PostKind, ScheduleEvent};
pub use mosaic::{MosaicController, MosaicView, TileFill};
pub use schedule::{compute_schedule, EventStatus, ScheduleController, ScheduleSnapshot};
pub use source::{PostChannel, PostSource, ScheduleSource, Subscription};
pub use stream::{LiveStreamController, StreamView};
pub use utils::init_logging;
