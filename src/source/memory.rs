//! In-process collaborators. They back the demo binary and the tests, and are
//! a reasonable stand-in wherever the real backend is not reachable.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{anyhow, bail, Result};

use crate::models::{LivePost, ScheduleEvent};

use super::{PostCallback, PostChannel, PostSource, ScheduleSource, Subscription};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Newest-first post store with switchable failure.
#[derive(Clone, Default)]
pub struct MemoryPostSource {
    posts: Arc<Mutex<Vec<LivePost>>>,
    failing: Arc<AtomicBool>,
    fetches: Arc<AtomicUsize>,
}

impl MemoryPostSource {
    /// `posts` are taken as given, newest first.
    pub fn new(posts: Vec<LivePost>) -> Self {
        Self {
            posts: Arc::new(Mutex::new(posts)),
            ..Self::default()
        }
    }

    pub fn push(&self, post: LivePost) {
        lock(&self.posts).insert(0, post);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl PostSource for MemoryPostSource {
    async fn fetch_recent_posts(&self, limit: usize) -> Result<Vec<LivePost>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            bail!("post store unavailable");
        }
        Ok(lock(&self.posts).iter().take(limit).cloned().collect())
    }
}

#[derive(Default)]
struct ChannelInner {
    next_id: u64,
    subscribers: HashMap<u64, Arc<PostCallback>>,
}

/// Fan-out push channel. Callbacks run on the publishing thread, outside the
/// subscriber lock, so a callback may unsubscribe itself.
#[derive(Clone, Default)]
pub struct LocalChannel {
    inner: Arc<Mutex<ChannelInner>>,
}

impl LocalChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, post: &LivePost) {
        for callback in self.snapshot() {
            callback(Ok(post.clone()));
        }
    }

    /// Deliver a channel-level failure to every subscriber.
    pub fn publish_error(&self, message: &str) {
        for callback in self.snapshot() {
            callback(Err(anyhow!("{message}")));
        }
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner).subscribers.len()
    }

    fn snapshot(&self) -> Vec<Arc<PostCallback>> {
        lock(&self.inner).subscribers.values().cloned().collect()
    }
}

impl PostChannel for LocalChannel {
    fn subscribe(&self, on_post: PostCallback) -> Subscription {
        let id = {
            let mut inner = lock(&self.inner);
            let id = inner.next_id;
            inner.next_id += 1;
            inner.subscribers.insert(id, Arc::new(on_post));
            id
        };

        let inner = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = inner.upgrade() {
                lock(&inner).subscribers.remove(&id);
            }
        })
    }
}

/// Fixed schedule, as a content service would serve it.
#[derive(Clone, Default)]
pub struct StaticSchedule {
    events: Vec<ScheduleEvent>,
    failing: bool,
}

impl StaticSchedule {
    pub fn new(events: Vec<ScheduleEvent>) -> Self {
        Self {
            events,
            failing: false,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            events: Vec::new(),
            failing: true,
        }
    }
}

impl ScheduleSource for StaticSchedule {
    async fn fetch_schedule_events(&self) -> Result<Vec<ScheduleEvent>> {
        if self.failing {
            bail!("content service unavailable");
        }
        Ok(self.events.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn unsubscribed_callback_stops_receiving() {
        let channel = LocalChannel::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let subscription = channel.subscribe(Box::new(move |_: crate::source::Delivery| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let post = LivePost::text("p1", "Ana", Utc::now());
        channel.publish(&post);
        subscription.unsubscribe();
        channel.publish(&post);

        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(channel.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn fetch_respects_limit_and_failure() {
        let now = Utc::now();
        let source = MemoryPostSource::new(vec![
            LivePost::text("p2", "Bo", now),
            LivePost::text("p1", "Ana", now),
        ]);

        let posts = source.fetch_recent_posts(1).await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].id, "p2");

        source.set_failing(true);
        assert!(source.fetch_recent_posts(10).await.is_err());
        assert_eq!(source.fetch_count(), 2);
    }
}
