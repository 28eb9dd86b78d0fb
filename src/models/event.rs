//! Schedule data as delivered by the content service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One time-boxed block of the day ("Ceremony", "Dinner", ...).
///
/// Loaded once per page view and never mutated locally. `end_time` is
/// optional; an event without one runs until the next event starts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEvent {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub photo_count: u32,
}

impl ScheduleEvent {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            start_time,
            end_time,
            photo_count: 0,
        }
    }
}
