//! Contracts for the collaborators that own the data: the moderated post
//! store, its push channel, and the content service that serves the schedule.
//! Nothing in this crate writes back through them.

pub mod memory;

use std::future::Future;
use std::sync::Mutex;

use anyhow::Result;

use crate::models::{LivePost, ScheduleEvent};

pub use memory::{LocalChannel, MemoryPostSource, StaticSchedule};

/// Bulk fetch of already-approved posts.
pub trait PostSource: Send + Sync {
    /// Most recent posts, newest first, at most `limit` of them. Must be
    /// idempotent and side-effect free.
    fn fetch_recent_posts(&self, limit: usize) -> impl Future<Output = Result<Vec<LivePost>>> + Send;
}

/// One delivery from the push channel. Errors come from the channel itself
/// (decode failures, transport hiccups) and are never fatal to a consumer.
pub type Delivery = Result<LivePost>;

pub type PostCallback = Box<dyn Fn(Delivery) + Send + Sync + 'static>;

/// Push channel of newly approved posts. Delivery order is not guaranteed to
/// match creation order.
pub trait PostChannel: Send + Sync {
    fn subscribe(&self, on_post: PostCallback) -> Subscription;
}

pub trait ScheduleSource: Send + Sync {
    fn fetch_schedule_events(&self) -> impl Future<Output = Result<Vec<ScheduleEvent>>> + Send;
}

/// Handle returned by [`PostChannel::subscribe`]. Unsubscribing runs the
/// channel's teardown exactly once; dropping the handle unsubscribes too.
pub struct Subscription {
    teardown: Mutex<Option<Box<dyn FnOnce() + Send + 'static>>>,
}

impl Subscription {
    pub fn new(teardown: impl FnOnce() + Send + 'static) -> Self {
        Self {
            teardown: Mutex::new(Some(Box::new(teardown))),
        }
    }

    pub fn unsubscribe(&self) {
        let teardown = match self.teardown.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(teardown) = teardown {
            teardown();
        }
    }

    pub fn is_active(&self) -> bool {
        match self.teardown.lock() {
            Ok(guard) => guard.is_some(),
            Err(poisoned) => poisoned.into_inner().is_some(),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
