use std::collections::VecDeque;

use rand::{rngs::StdRng, Rng};
use serde::{Deserialize, Serialize};

use crate::models::LivePost;

use super::glyph::{GlyphLayout, MosaicTile};

/// Flat colours for tiles that have no photo yet.
pub const FALLBACK_PALETTE: [&str; 6] = [
    "#f3e1d6", "#e9c9b8", "#d8e2dc", "#cdb4db", "#fbe7c6", "#b8d8d8",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MosaicPhoto {
    pub post_id: String,
    pub author_name: String,
    pub url: String,
}

impl MosaicPhoto {
    /// Image posts with at least one media URL become photos; everything
    /// else is filtered out.
    pub fn from_post(post: &LivePost) -> Option<Self> {
        post.primary_photo().map(|url| Self {
            post_id: post.id.clone(),
            author_name: post.author_name.clone(),
            url: url.to_string(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum TileFill {
    Photo { photo: MosaicPhoto },
    Fallback { color: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TileView {
    pub tile: MosaicTile,
    pub fill: TileFill,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct MosaicView {
    pub rows: usize,
    pub columns: usize,
    pub tiles: Vec<TileView>,
    pub pool_size: usize,
}

#[derive(Debug, Clone)]
pub enum MosaicMessage {
    /// Initial bulk fetch, newest first.
    Seeded(Vec<LivePost>),
    Arrived(LivePost),
    Reshuffle,
}

/// Tile assignments over a fixed glyph layout and a bounded, newest-first
/// photo pool. Randomness comes from the injected rng so runs can be
/// replayed from a seed.
#[derive(Debug, Clone)]
pub struct MosaicState {
    layout: GlyphLayout,
    assignments: Vec<Option<MosaicPhoto>>,
    pool: VecDeque<MosaicPhoto>,
    capacity: usize,
    filled: bool,
    rng: StdRng,
}

impl MosaicState {
    pub fn new(layout: GlyphLayout, capacity: usize, rng: StdRng) -> Self {
        let assignments = vec![None; layout.len()];
        Self {
            layout,
            assignments,
            pool: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            filled: false,
            rng,
        }
    }

    /// Returns whether any tile or the pool changed.
    pub fn apply(&mut self, message: MosaicMessage) -> bool {
        match message {
            MosaicMessage::Seeded(posts) => {
                let before = self.pool.len();
                for photo in posts.iter().filter_map(MosaicPhoto::from_post) {
                    if self.pool.len() >= self.capacity {
                        break;
                    }
                    if !self.contains(&photo.post_id) {
                        self.pool.push_back(photo);
                    }
                }
                self.fill_if_needed();
                self.pool.len() != before
            }
            MosaicMessage::Arrived(post) => {
                let Some(photo) = MosaicPhoto::from_post(&post) else {
                    return false;
                };
                if self.contains(&photo.post_id) {
                    return false;
                }

                self.pool.push_front(photo.clone());
                self.pool.truncate(self.capacity);

                if self.filled {
                    if !self.assignments.is_empty() {
                        let tile = self.rng.gen_range(0..self.assignments.len());
                        self.assignments[tile] = Some(photo);
                    }
                } else {
                    self.fill_if_needed();
                }
                true
            }
            MosaicMessage::Reshuffle => {
                if self.pool.is_empty() || self.assignments.is_empty() {
                    return false;
                }
                let tile = self.rng.gen_range(0..self.assignments.len());
                let pick = self.rng.gen_range(0..self.pool.len());
                self.assignments[tile] = Some(self.pool[pick].clone());
                true
            }
        }
    }

    pub fn tile_count(&self) -> usize {
        self.assignments.len()
    }

    pub fn pool_len(&self) -> usize {
        self.pool.len()
    }

    pub fn assignment(&self, tile_id: usize) -> Option<&MosaicPhoto> {
        self.assignments.get(tile_id).and_then(Option::as_ref)
    }

    /// Photo if assigned, otherwise the tile's palette colour.
    pub fn fill(&self, tile_id: usize) -> TileFill {
        match self.assignment(tile_id) {
            Some(photo) => TileFill::Photo {
                photo: photo.clone(),
            },
            None => TileFill::Fallback {
                color: fallback_color(tile_id).to_string(),
            },
        }
    }

    pub fn view(&self) -> MosaicView {
        MosaicView {
            rows: self.layout.rows,
            columns: self.layout.columns,
            tiles: self
                .layout
                .tiles
                .iter()
                .map(|tile| TileView {
                    tile: *tile,
                    fill: self.fill(tile.id),
                })
                .collect(),
            pool_size: self.pool.len(),
        }
    }

    fn contains(&self, post_id: &str) -> bool {
        self.pool.iter().any(|photo| photo.post_id == post_id)
    }

    fn fill_if_needed(&mut self) {
        if self.filled || self.pool.is_empty() {
            return;
        }
        let pool_len = self.pool.len();
        for (idx, slot) in self.assignments.iter_mut().enumerate() {
            *slot = Some(self.pool[idx % pool_len].clone());
        }
        self.filled = true;
    }
}

pub fn fallback_color(tile_id: usize) -> &'static str {
    FALLBACK_PALETTE[tile_id % FALLBACK_PALETTE.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mosaic::glyph::{layout_digits, GlyphLayout, MosaicTile};
    use chrono::Utc;
    use rand::SeedableRng;

    fn strip(len: usize) -> GlyphLayout {
        GlyphLayout {
            tiles: (0..len)
                .map(|id| MosaicTile {
                    id,
                    row: 0,
                    column: id,
                })
                .collect(),
            rows: 1,
            columns: len,
        }
    }

    fn photo_post(n: usize) -> LivePost {
        LivePost::image(
            format!("photo-{n}"),
            "Guest",
            format!("https://img.example/{n}.jpg"),
            Utc::now(),
        )
    }

    fn state(tiles: usize, capacity: usize) -> MosaicState {
        MosaicState::new(strip(tiles), capacity, StdRng::seed_from_u64(7))
    }

    #[test]
    fn three_photos_cover_twenty_tiles_round_robin() {
        let mut mosaic = state(20, 120);
        mosaic.apply(MosaicMessage::Seeded((0..3).map(photo_post).collect()));

        for tile in 0..20 {
            let photo = mosaic.assignment(tile).expect("every tile has a photo");
            assert_eq!(photo.post_id, format!("photo-{}", tile % 3));
        }
    }

    #[test]
    fn empty_pool_renders_fallback_colours() {
        let mosaic = state(8, 120);
        for tile in 0..8 {
            match mosaic.fill(tile) {
                TileFill::Fallback { color } => assert_eq!(color, fallback_color(tile)),
                TileFill::Photo { .. } => panic!("no photos yet"),
            }
        }
        assert_eq!(fallback_color(0), fallback_color(FALLBACK_PALETTE.len()));
    }

    #[test]
    fn first_arrival_fills_every_tile() {
        let mut mosaic = state(5, 120);
        assert!(mosaic.apply(MosaicMessage::Arrived(photo_post(1))));
        for tile in 0..5 {
            assert_eq!(mosaic.assignment(tile).unwrap().post_id, "photo-1");
        }
    }

    #[test]
    fn arrival_replaces_exactly_one_tile() {
        let mut mosaic = state(30, 120);
        mosaic.apply(MosaicMessage::Seeded(vec![photo_post(0)]));
        mosaic.apply(MosaicMessage::Arrived(photo_post(1)));

        let replaced = (0..30)
            .filter(|tile| mosaic.assignment(*tile).unwrap().post_id == "photo-1")
            .count();
        assert_eq!(replaced, 1);
        assert_eq!(mosaic.tile_count(), 30);
    }

    #[test]
    fn text_posts_and_duplicates_are_ignored() {
        let mut mosaic = state(4, 120);
        assert!(!mosaic.apply(MosaicMessage::Arrived(LivePost::text("t1", "Guest", Utc::now()))));
        assert!(mosaic.apply(MosaicMessage::Arrived(photo_post(1))));
        assert!(!mosaic.apply(MosaicMessage::Arrived(photo_post(1))));
        assert_eq!(mosaic.pool_len(), 1);
    }

    #[test]
    fn pool_evicts_oldest_but_keeps_tile_references() {
        let mut mosaic = state(3, 4);
        mosaic.apply(MosaicMessage::Seeded(vec![photo_post(0)]));
        for n in 1..10 {
            mosaic.apply(MosaicMessage::Arrived(photo_post(n)));
        }
        assert_eq!(mosaic.pool_len(), 4);
        assert_eq!(mosaic.view().pool_size, 4);
        assert_eq!(mosaic.tile_count(), 3);
        assert!((0..3).all(|tile| mosaic.assignment(tile).is_some()));
    }

    #[test]
    fn reshuffle_needs_a_pool() {
        let mut mosaic = state(6, 120);
        assert!(!mosaic.apply(MosaicMessage::Reshuffle));

        mosaic.apply(MosaicMessage::Seeded((0..4).map(photo_post).collect()));
        for _ in 0..50 {
            assert!(mosaic.apply(MosaicMessage::Reshuffle));
            assert_eq!(mosaic.tile_count(), 6);
            assert!((0..6).all(|tile| mosaic.assignment(tile).is_some()));
        }
    }

    #[test]
    fn view_covers_every_glyph_tile() {
        let layout = layout_digits("2025", 1).unwrap();
        let tiles = layout.len();
        let mut mosaic = MosaicState::new(layout, 120, StdRng::seed_from_u64(1));
        mosaic.apply(MosaicMessage::Seeded(vec![photo_post(0)]));

        let view = mosaic.view();
        assert_eq!(view.tiles.len(), tiles);
        assert!(view
            .tiles
            .iter()
            .all(|tile| matches!(tile.fill, TileFill::Photo { .. })));
    }
}
