//! Replays a compressed event day against in-memory collaborators and logs
//! what each live view would show.
//!
//! Usage: `live-day [config.json] [seconds]`

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use chrono::{Duration as ChronoDuration, Utc};
use log::{info, warn};
use rand::Rng;
use uuid::Uuid;

use eventday_live::{
    init_logging,
    source::{LocalChannel, MemoryPostSource, StaticSchedule},
    LiveConfig, LiveDay, LivePost, ScheduleEvent, TileFill,
};

const GUESTS: [&str; 6] = ["Ana", "Bruno", "Chiara", "Dev", "Elif", "Femi"];

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_logging();

    let mut args = std::env::args().skip(1);
    let config_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("eventday.json"));
    let seconds: u64 = match args.next() {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("invalid duration '{raw}'"))?,
        None => 30,
    };

    let config = LiveConfig::load(&config_path)?.with_env_overrides();
    info!(
        "loaded config from {} (reduced motion: {})",
        config_path.display(),
        config.reduced_motion
    );

    let now = Utc::now();
    let schedule = StaticSchedule::new(vec![
        ScheduleEvent::new("arrival", "Guest arrival", now - ChronoDuration::minutes(30), Some(now)),
        ScheduleEvent::new("ceremony", "Ceremony", now, Some(now + ChronoDuration::minutes(45))),
        ScheduleEvent::new("photos", "Group photos", now + ChronoDuration::minutes(45), None),
        ScheduleEvent::new("dinner", "Dinner", now + ChronoDuration::hours(2), None),
    ]);
    let posts = MemoryPostSource::new(Vec::new());
    let channel = LocalChannel::new();

    let day = LiveDay::new(&config)?;
    day.start(&posts, &channel, &schedule).await?;

    let scroll = day.stream.scroll_observer();
    let mut rng = rand::thread_rng();

    for tick in 0..seconds {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let post = simulated_post(&mut rng);
        posts.push(post.clone());
        channel.publish(&post);
        if tick % 7 == 6 {
            // Channels replay; the stream must shrug it off.
            channel.publish(&post);
        }

        if tick == seconds / 3 {
            info!("guest scrolls down the stream");
            scroll.report(420.0);
        }
        if tick == 2 * seconds / 3 {
            match day.stream.return_to_top(&posts).await {
                Ok(view) => info!("guest taps 'new posts': {} posts visible", view.posts.len()),
                Err(err) => warn!("reload failed: {err:#}"),
            }
        }

        report(&day);
    }

    day.stop().await;
    Ok(())
}

fn simulated_post(rng: &mut impl Rng) -> LivePost {
    let id = Uuid::new_v4().to_string();
    let author = GUESTS[rng.gen_range(0..GUESTS.len())];
    if rng.gen_bool(0.6) {
        LivePost::image(&id, author, format!("https://photos.example/{id}.jpg"), Utc::now())
    } else {
        LivePost::text(&id, author, Utc::now())
    }
}

fn report(day: &LiveDay) {
    let schedule = day.schedule.snapshot();
    let stream = day.stream.view();
    let mosaic = day.mosaic.view();

    let current = schedule
        .current_event
        .as_ref()
        .map(|state| state.event.title.as_str())
        .unwrap_or("nothing scheduled");
    let with_photo = mosaic
        .tiles
        .iter()
        .filter(|tile| matches!(tile.fill, TileFill::Photo { .. }))
        .count();

    info!(
        "now: {current} ({:.0}% of day) | stream: {} posts, new={} | mosaic: {}/{} tiles with photos",
        schedule.overall_progress,
        stream.posts.len(),
        stream.new_posts_available,
        with_photo,
        mosaic.tiles.len()
    );
    if let Some(celebration) = &stream.celebration {
        info!("celebration ({:?}): {}", celebration.effect, celebration.message);
    }
}
