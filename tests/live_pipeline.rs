use std::time::Duration;

use chrono::{TimeZone, Utc};

use eventday_live::{
    compute_schedule,
    source::{LocalChannel, MemoryPostSource, StaticSchedule},
    stream::MilestoneTier,
    LiveConfig, LiveDay, LivePost, ScheduleEvent, TileFill,
};

fn text_post(n: usize) -> LivePost {
    LivePost::text(format!("post-{n}"), "Guest", Utc::now())
}

fn photo_post(n: usize) -> LivePost {
    LivePost::image(
        format!("photo-{n}"),
        "Guest",
        format!("https://img.example/{n}.jpg"),
        Utc::now(),
    )
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

#[test]
fn arrival_scenario() {
    let day = |h, m| Utc.with_ymd_and_hms(2025, 6, 14, h, m, 0).unwrap();
    let events = vec![
        ScheduleEvent::new("1", "Arrival", day(10, 30), Some(day(11, 0))),
        ScheduleEvent::new("2", "Ceremony", day(11, 0), Some(day(12, 0))),
    ];

    let snapshot = compute_schedule(&events, day(10, 45));
    let current = snapshot.current_event.unwrap();
    assert_eq!(current.event.title, "Arrival");
    assert_eq!(current.progress_percentage, Some(50.0));
    let upcoming: Vec<&str> = snapshot
        .upcoming_events
        .iter()
        .map(|state| state.event.title.as_str())
        .collect();
    assert_eq!(upcoming, vec!["Ceremony"]);
}

#[tokio::test(start_paused = true)]
async fn live_day_end_to_end() {
    let seed: Vec<LivePost> = (0..24)
        .rev()
        .map(|n| if n % 8 == 0 { photo_post(n) } else { text_post(n) })
        .collect();
    let posts = MemoryPostSource::new(seed);
    let channel = LocalChannel::new();
    let schedule = StaticSchedule::new(vec![ScheduleEvent::new(
        "party",
        "Party",
        Utc::now() - chrono::Duration::hours(1),
        None,
    )]);

    let config = LiveConfig {
        reduced_motion: true,
        ..LiveConfig::default()
    };
    let day = LiveDay::new(&config).unwrap();
    day.start(&posts, &channel, &schedule).await.unwrap();
    assert_eq!(channel.subscriber_count(), 2);
    assert_eq!(day.schedule.snapshot().current_event.unwrap().event.id, "party");

    // Three seeded photos cover every mosaic tile.
    let mosaic = day.mosaic.view();
    assert_eq!(mosaic.pool_size, 3);
    assert!(mosaic
        .tiles
        .iter()
        .all(|tile| matches!(tile.fill, TileFill::Photo { .. })));
    let tile_count = mosaic.tiles.len();

    // The 25th post lands at the top with a medium celebration.
    let arrival = photo_post(24);
    posts.push(arrival.clone());
    channel.publish(&arrival);
    channel.publish(&arrival);
    settle().await;

    let stream = day.stream.view();
    assert_eq!(stream.posts.len(), 25);
    assert!(!stream.new_posts_available);
    let celebration = stream.celebration.unwrap();
    assert!(celebration.message.contains("25"));
    assert_eq!(celebration.tier, MilestoneTier::Medium);

    let mosaic = day.mosaic.view();
    assert_eq!(mosaic.tiles.len(), tile_count);
    assert_eq!(mosaic.pool_size, 4);

    // Scrolled away: arrivals are held back until the guest returns.
    day.stream.scroll_observer().report(300.0);
    settle().await;
    for n in 25..28 {
        let post = text_post(n);
        posts.push(post.clone());
        channel.publish(&post);
    }
    settle().await;
    let stream = day.stream.view();
    assert_eq!(stream.posts.len(), 25);
    assert!(stream.new_posts_available);
    assert_eq!(stream.pending_count, 3);

    let stream = day.stream.return_to_top(&posts).await.unwrap();
    assert_eq!(stream.posts.len(), 28);
    assert!(!stream.new_posts_available);

    day.stop().await;
    day.stop().await;
    assert_eq!(channel.subscriber_count(), 0);

    channel.publish(&text_post(99));
    settle().await;
    assert_eq!(day.stream.view().posts.len(), 28);
}

#[tokio::test(start_paused = true)]
async fn collaborator_outages_degrade_to_empty() {
    let posts = MemoryPostSource::default();
    posts.set_failing(true);
    let channel = LocalChannel::new();

    let day = LiveDay::new(&LiveConfig::default()).unwrap();
    day.start(&posts, &channel, &StaticSchedule::unavailable())
        .await
        .unwrap();

    assert!(day.stream.view().is_empty());
    assert!(day.schedule.snapshot().current_event.is_none());
    assert!(day
        .mosaic
        .view()
        .tiles
        .iter()
        .all(|tile| matches!(tile.fill, TileFill::Fallback { .. })));

    channel.publish_error("socket closed");
    settle().await;
    assert!(day.stream.view().is_empty());

    day.stop().await;
}
