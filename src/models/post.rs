//! Guest-submitted posts, produced by the moderation backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PostKind {
    Text,
    Image,
}

impl Default for PostKind {
    fn default() -> Self {
        PostKind::Text
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LivePost {
    pub id: String,
    pub author_name: String,
    #[serde(default)]
    pub kind: PostKind,
    #[serde(default)]
    pub media_urls: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl LivePost {
    pub fn text(id: impl Into<String>, author_name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            author_name: author_name.into(),
            kind: PostKind::Text,
            media_urls: Vec::new(),
            created_at,
        }
    }

    pub fn image(
        id: impl Into<String>,
        author_name: impl Into<String>,
        url: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            author_name: author_name.into(),
            kind: PostKind::Image,
            media_urls: vec![url.into()],
            created_at,
        }
    }

    /// First media URL of an image post. Text posts and image posts that
    /// arrived without media have none.
    pub fn primary_photo(&self) -> Option<&str> {
        match self.kind {
            PostKind::Image => self.media_urls.first().map(String::as_str),
            PostKind::Text => None,
        }
    }
}
