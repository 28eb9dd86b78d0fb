use std::{collections::HashSet, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{config::LiveConfig, models::LivePost};

use super::milestone::{check_milestone, MilestoneRule, MilestoneTier};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum StreamStatus {
    Idle,
    Loading,
    Live,
    Stopped,
}

impl Default for StreamStatus {
    fn default() -> Self {
        StreamStatus::Idle
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CelebrationEffect {
    /// Confetti over the whole page.
    FullScreen,
    /// A small acknowledgment near the stream header.
    Toast,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Celebration {
    pub id: u64,
    pub count: usize,
    pub tier: MilestoneTier,
    pub message: String,
    pub effect: CelebrationEffect,
}

/// Input to the stream reducer. Everything that changes the stream arrives
/// as one of these, one at a time.
#[derive(Debug, Clone)]
pub enum StreamMessage {
    Loaded(Vec<LivePost>),
    Delivered(LivePost),
    Scrolled { offset_px: f64 },
    Reloaded(Vec<LivePost>),
    ReloadFailed,
    CelebrationExpired(u64),
    HighlightExpired(String),
    Stopped,
}

/// Deferred work the reducer asks its driver to schedule.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEffect {
    ExpireCelebration { id: u64, after: Duration },
    ExpireHighlight { post_id: String, after: Duration },
}

impl StreamEffect {
    pub fn delay(&self) -> Duration {
        match self {
            StreamEffect::ExpireCelebration { after, .. }
            | StreamEffect::ExpireHighlight { after, .. } => *after,
        }
    }

    /// The message to feed back once the delay has elapsed.
    pub fn into_message(self) -> StreamMessage {
        match self {
            StreamEffect::ExpireCelebration { id, .. } => StreamMessage::CelebrationExpired(id),
            StreamEffect::ExpireHighlight { post_id, .. } => StreamMessage::HighlightExpired(post_id),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StreamSettings {
    pub milestones: Vec<MilestoneRule>,
    pub celebration_duration: Duration,
    pub highlight_duration: Duration,
    pub scroll_threshold_px: f64,
}

impl From<&LiveConfig> for StreamSettings {
    fn from(config: &LiveConfig) -> Self {
        Self {
            milestones: config.milestones.clone(),
            celebration_duration: config.celebration_duration(),
            highlight_duration: config.highlight_duration(),
            scroll_threshold_px: config.scroll_threshold_px,
        }
    }
}

/// What a renderer sees.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct StreamView {
    pub status: StreamStatus,
    /// Newest first, by arrival.
    pub posts: Vec<LivePost>,
    pub new_posts_available: bool,
    pub pending_count: usize,
    pub celebration: Option<Celebration>,
    pub just_arrived: Option<String>,
}

impl StreamView {
    pub fn loading() -> Self {
        Self {
            status: StreamStatus::Loading,
            ..Self::default()
        }
    }

    /// The "no messages yet" state: loaded, nothing to show.
    pub fn is_empty(&self) -> bool {
        self.status == StreamStatus::Live && self.posts.is_empty() && self.pending_count == 0
    }
}

/// The live stream's state machine. Pure: no clocks, no I/O; timed behaviour
/// is requested through the returned [`StreamEffect`]s.
#[derive(Debug, Clone)]
pub struct StreamState {
    settings: StreamSettings,
    status: StreamStatus,
    posts: Vec<LivePost>,
    pending: Vec<LivePost>,
    seen: HashSet<String>,
    /// Posts known to exist, visible or not. Never shrinks on reload so a
    /// milestone cannot fire twice for the same count.
    known_total: usize,
    scrolled_away: bool,
    new_posts_available: bool,
    celebration: Option<Celebration>,
    just_arrived: Option<String>,
    next_celebration_id: u64,
}

impl StreamState {
    pub fn new(settings: StreamSettings) -> Self {
        Self {
            settings,
            status: StreamStatus::Loading,
            posts: Vec::new(),
            pending: Vec::new(),
            seen: HashSet::new(),
            known_total: 0,
            scrolled_away: false,
            new_posts_available: false,
            celebration: None,
            just_arrived: None,
            next_celebration_id: 1,
        }
    }

    pub fn apply(&mut self, message: StreamMessage) -> Vec<StreamEffect> {
        if self.status == StreamStatus::Stopped {
            return Vec::new();
        }

        match message {
            StreamMessage::Loaded(posts) => {
                self.replace_posts(posts);
                self.known_total = self.posts.len();
                self.status = StreamStatus::Live;
                Vec::new()
            }
            StreamMessage::Delivered(post) => self.deliver(post),
            StreamMessage::Scrolled { offset_px } => {
                self.scrolled_away = offset_px > self.settings.scroll_threshold_px;
                Vec::new()
            }
            StreamMessage::Reloaded(posts) => {
                let pending = std::mem::take(&mut self.pending);
                self.replace_posts(posts);
                let missing: Vec<LivePost> = pending
                    .into_iter()
                    .filter(|post| !self.seen.contains(&post.id))
                    .collect();
                self.splice_front(missing);
                self.returned_to_top();
                Vec::new()
            }
            StreamMessage::ReloadFailed => {
                let pending = std::mem::take(&mut self.pending);
                self.splice_front(pending);
                self.returned_to_top();
                Vec::new()
            }
            StreamMessage::CelebrationExpired(id) => {
                if self.celebration.as_ref().map(|c| c.id) == Some(id) {
                    self.celebration = None;
                }
                Vec::new()
            }
            StreamMessage::HighlightExpired(post_id) => {
                if self.just_arrived.as_deref() == Some(post_id.as_str()) {
                    self.just_arrived = None;
                }
                Vec::new()
            }
            StreamMessage::Stopped => {
                self.status = StreamStatus::Stopped;
                self.celebration = None;
                self.just_arrived = None;
                Vec::new()
            }
        }
    }

    pub fn view(&self) -> StreamView {
        StreamView {
            status: self.status,
            posts: self.posts.clone(),
            new_posts_available: self.new_posts_available,
            pending_count: self.pending.len(),
            celebration: self.celebration.clone(),
            just_arrived: self.just_arrived.clone(),
        }
    }

    pub fn status(&self) -> StreamStatus {
        self.status
    }

    pub fn visible_len(&self) -> usize {
        self.posts.len()
    }

    fn deliver(&mut self, post: LivePost) -> Vec<StreamEffect> {
        if self.seen.contains(&post.id) {
            return Vec::new();
        }

        let mut effects = Vec::new();
        let prospective = self.known_total + 1;
        self.known_total = prospective;

        if let Some(milestone) = check_milestone(prospective, &self.settings.milestones) {
            let id = self.next_celebration_id;
            self.next_celebration_id += 1;
            self.celebration = Some(Celebration {
                id,
                count: milestone.count,
                tier: milestone.tier,
                message: milestone.message(),
                effect: if milestone.tier.is_full_screen() {
                    CelebrationEffect::FullScreen
                } else {
                    CelebrationEffect::Toast
                },
            });
            effects.push(StreamEffect::ExpireCelebration {
                id,
                after: self.settings.celebration_duration,
            });
        }

        self.seen.insert(post.id.clone());
        if self.scrolled_away {
            self.pending.insert(0, post);
            self.new_posts_available = true;
        } else {
            // Buffered posts arrived before this one; they go in first so the
            // list stays newest-first by arrival.
            if !self.pending.is_empty() {
                let pending = std::mem::take(&mut self.pending);
                self.splice_front(pending);
                self.new_posts_available = false;
            }
            self.just_arrived = Some(post.id.clone());
            effects.push(StreamEffect::ExpireHighlight {
                post_id: post.id.clone(),
                after: self.settings.highlight_duration,
            });
            self.posts.insert(0, post);
        }

        effects
    }

    fn replace_posts(&mut self, posts: Vec<LivePost>) {
        self.seen.clear();
        self.posts = Vec::with_capacity(posts.len());
        for post in posts {
            if self.seen.insert(post.id.clone()) {
                self.posts.push(post);
            }
        }
    }

    /// `front` is newest first and goes ahead of the current list.
    fn splice_front(&mut self, front: Vec<LivePost>) {
        if front.is_empty() {
            return;
        }
        for post in &front {
            self.seen.insert(post.id.clone());
        }
        let rest = std::mem::take(&mut self.posts);
        self.posts = front;
        self.posts.extend(rest);
    }

    fn returned_to_top(&mut self) {
        self.known_total = self.known_total.max(self.posts.len());
        self.new_posts_available = false;
        self.scrolled_away = false;
        self.just_arrived = None;
    }
}
