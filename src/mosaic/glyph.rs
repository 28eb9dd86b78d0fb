use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

pub const GLYPH_ROWS: usize = 7;
pub const GLYPH_COLUMNS: usize = 5;

/// 7×5 bitmaps for the digits, `#` marks a tile.
const DIGITS: [[&str; GLYPH_ROWS]; 10] = [
    [" ### ", "#   #", "#  ##", "# # #", "##  #", "#   #", " ### "],
    ["  #  ", " ##  ", "  #  ", "  #  ", "  #  ", "  #  ", " ### "],
    [" ### ", "#   #", "    #", "   # ", "  #  ", " #   ", "#####"],
    ["#####", "   # ", "  #  ", "   # ", "    #", "#   #", " ### "],
    ["   # ", "  ## ", " # # ", "#  # ", "#####", "   # ", "   # "],
    ["#####", "#    ", "#### ", "    #", "    #", "#   #", " ### "],
    ["  ## ", " #   ", "#    ", "#### ", "#   #", "#   #", " ### "],
    ["#####", "    #", "   # ", "  #  ", " #   ", " #   ", " #   "],
    [" ### ", "#   #", "#   #", " ### ", "#   #", "#   #", " ### "],
    [" ### ", "#   #", "#   #", " ####", "    #", "   # ", " ##  "],
];

/// One fixed cell of the mosaic. `id` is the tile's index in layout order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct MosaicTile {
    pub id: usize,
    pub row: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GlyphLayout {
    pub tiles: Vec<MosaicTile>,
    pub rows: usize,
    pub columns: usize,
}

impl GlyphLayout {
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

/// Lay `digits` out left to right with `gap` empty columns between glyphs.
/// Tiles are ordered digit by digit, then row-major within a digit.
pub fn layout_digits(digits: &str, gap: usize) -> Result<GlyphLayout> {
    let mut tiles = Vec::new();
    let mut glyph_count = 0;

    for (position, ch) in digits.chars().enumerate() {
        let Some(digit) = ch.to_digit(10) else {
            bail!("mosaic glyphs only cover digits, got {ch:?}");
        };
        let origin = position * (GLYPH_COLUMNS + gap);

        for (row, line) in DIGITS[digit as usize].iter().enumerate() {
            for (column, cell) in line.chars().enumerate() {
                if cell == '#' {
                    tiles.push(MosaicTile {
                        id: tiles.len(),
                        row,
                        column: origin + column,
                    });
                }
            }
        }
        glyph_count += 1;
    }

    let columns = if glyph_count == 0 {
        0
    } else {
        glyph_count * GLYPH_COLUMNS + (glyph_count - 1) * gap
    };

    Ok(GlyphLayout {
        tiles,
        rows: if glyph_count == 0 { 0 } else { GLYPH_ROWS },
        columns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn on_cells(digit: usize) -> usize {
        DIGITS[digit]
            .iter()
            .map(|line| line.chars().filter(|cell| *cell == '#').count())
            .sum()
    }

    #[test]
    fn bitmaps_are_well_formed() {
        for glyph in DIGITS.iter() {
            for line in glyph.iter() {
                assert_eq!(line.chars().count(), GLYPH_COLUMNS);
            }
        }
    }

    #[test]
    fn year_layout_counts_every_on_cell() {
        let layout = layout_digits("2025", 1).unwrap();
        let expected = on_cells(2) + on_cells(0) + on_cells(2) + on_cells(5);
        assert_eq!(layout.len(), expected);
        assert_eq!(layout.rows, GLYPH_ROWS);
        assert_eq!(layout.columns, 4 * GLYPH_COLUMNS + 3);

        let positions: HashSet<(usize, usize)> =
            layout.tiles.iter().map(|tile| (tile.row, tile.column)).collect();
        assert_eq!(positions.len(), layout.len());
        for (idx, tile) in layout.tiles.iter().enumerate() {
            assert_eq!(tile.id, idx);
            assert!(tile.column < layout.columns);
        }
    }

    #[test]
    fn gap_columns_stay_empty() {
        let layout = layout_digits("88", 2).unwrap();
        assert!(layout
            .tiles
            .iter()
            .all(|tile| tile.column != GLYPH_COLUMNS && tile.column != GLYPH_COLUMNS + 1));
        assert!(layout.tiles.iter().any(|tile| tile.column >= GLYPH_COLUMNS + 2));
    }

    #[test]
    fn layout_is_stable() {
        assert_eq!(layout_digits("14", 1).unwrap(), layout_digits("14", 1).unwrap());
    }

    #[test]
    fn non_digits_are_rejected() {
        assert!(layout_digits("20x5", 1).is_err());
        assert!(layout_digits("", 1).unwrap().is_empty());
    }
}
