use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ScheduleEvent;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum EventStatus {
    Upcoming,
    Current,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEventState {
    pub event: ScheduleEvent,
    pub status: EventStatus,
    /// Only set for the current event when its end is resolvable.
    pub time_remaining_minutes: Option<i64>,
    pub progress_percentage: Option<f64>,
}

/// Everything the schedule view needs for one tick.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSnapshot {
    pub current_event: Option<TimelineEventState>,
    pub upcoming_events: Vec<TimelineEventState>,
    pub completed_events: Vec<TimelineEventState>,
    pub overall_progress: f64,
    /// All events in start order, each with its status.
    pub timeline: Vec<TimelineEventState>,
    pub next_event: Option<ScheduleEvent>,
    pub minutes_until_next: Option<i64>,
}

impl ScheduleSnapshot {
    pub fn is_empty(&self) -> bool {
        self.timeline.is_empty()
    }
}

/// Classify every event against `now`.
///
/// Events are taken in start order; an event without an explicit end runs
/// until the next event starts, and the last one is open-ended. When
/// intervals overlap the earliest start is current and later overlapping
/// starts that have already begun count as completed.
pub fn compute_schedule(events: &[ScheduleEvent], now: DateTime<Utc>) -> ScheduleSnapshot {
    if events.is_empty() {
        return ScheduleSnapshot::default();
    }

    let mut ordered: Vec<&ScheduleEvent> = events.iter().collect();
    ordered.sort_by_key(|event| event.start_time);

    let resolved_ends: Vec<Option<DateTime<Utc>>> = ordered
        .iter()
        .enumerate()
        .map(|(idx, event)| {
            event
                .end_time
                .or_else(|| ordered.get(idx + 1).map(|next| next.start_time))
        })
        .collect();

    let current_idx = ordered.iter().zip(&resolved_ends).position(|(event, end)| {
        event.start_time <= now && end.map_or(true, |end| now < end)
    });

    let mut snapshot = ScheduleSnapshot::default();
    let mut completed = 0usize;
    let mut current_credit = 0.0;

    for (idx, event) in ordered.iter().enumerate() {
        let state = if Some(idx) == current_idx {
            let end = resolved_ends[idx];
            let progress = end.map(|end| progress_between(event.start_time, end, now));
            current_credit = progress.unwrap_or(0.0) / 100.0;
            TimelineEventState {
                event: (*event).clone(),
                status: EventStatus::Current,
                time_remaining_minutes: end.map(|end| ceil_minutes(end - now)),
                progress_percentage: progress,
            }
        } else if event.start_time > now {
            TimelineEventState {
                event: (*event).clone(),
                status: EventStatus::Upcoming,
                time_remaining_minutes: None,
                progress_percentage: None,
            }
        } else {
            completed += 1;
            TimelineEventState {
                event: (*event).clone(),
                status: EventStatus::Completed,
                time_remaining_minutes: None,
                progress_percentage: None,
            }
        };

        match state.status {
            EventStatus::Current => snapshot.current_event = Some(state.clone()),
            EventStatus::Upcoming => snapshot.upcoming_events.push(state.clone()),
            EventStatus::Completed => snapshot.completed_events.push(state.clone()),
        }
        snapshot.timeline.push(state);
    }

    snapshot.overall_progress =
        ((completed as f64 + current_credit) / ordered.len() as f64 * 100.0).clamp(0.0, 100.0);

    if let Some(next) = snapshot.upcoming_events.first() {
        snapshot.minutes_until_next = Some(ceil_minutes(next.event.start_time - now));
        snapshot.next_event = Some(next.event.clone());
    }

    snapshot
}

fn progress_between(start: DateTime<Utc>, end: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let total = (end - start).num_milliseconds();
    if total <= 0 {
        return 100.0;
    }
    let elapsed = (now - start).num_milliseconds();
    (elapsed as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
}

fn ceil_minutes(delta: chrono::Duration) -> i64 {
    let millis = delta.num_milliseconds().max(0);
    (millis + 59_999) / 60_000
}
