//! Block palette and nearest-color lookup.

use std::path::Path;

use indexmap::IndexMap;

use crate::error::{ProjectError, ProjectResult};

/// A named block and its representative color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteEntry {
    /// Block identifier, e.g. `minecraft:stone`.
    pub id: String,
    /// Representative color.
    pub rgb: [u8; 3],
}

/// Ordered table of block colors.
///
/// Entry order is the source order and decides ties in [`Palette::closest`].
#[derive(Debug, Clone)]
pub struct Palette {
    entries: Vec<PaletteEntry>,
}

impl Palette {
    /// Build a palette from entries in tie-break order.
    pub fn new(entries: Vec<PaletteEntry>) -> ProjectResult<Self> {
        if entries.is_empty() {
            return Err(ProjectError::config("palette has no entries"));
        }
        Ok(Self { entries })
    }

    /// Parse a JSON object mapping block identifiers to `[r, g, b]`.
    pub fn from_json_str(json: &str) -> ProjectResult<Self> {
        let map: IndexMap<String, [u8; 3]> = serde_json::from_str(json)?;
        let entries = map
            .into_iter()
            .map(|(id, rgb)| PaletteEntry { id, rgb })
            .collect();
        Self::new(entries)
    }

    /// Read and parse a palette file.
    pub fn load(path: impl AsRef<Path>) -> ProjectResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let palette = Self::from_json_str(&json)?;
        tracing::info!(
            "Loaded palette: {} entries from {}",
            palette.len(),
            path.display()
        );
        Ok(palette)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; an empty palette cannot be constructed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in tie-break order.
    #[must_use]
    pub fn entries(&self) -> &[PaletteEntry] {
        &self.entries
    }

    /// Entry closest to `rgb` by squared Euclidean distance, with the distance.
    ///
    /// The first entry with the minimal distance wins.
    #[must_use]
    pub fn closest_entry(&self, rgb: [u8; 3]) -> (&PaletteEntry, u32) {
        let mut best = &self.entries[0];
        let mut best_distance = distance_sq(rgb, best.rgb);
        for entry in &self.entries[1..] {
            let distance = distance_sq(rgb, entry.rgb);
            if distance < best_distance {
                best = entry;
                best_distance = distance;
            }
        }
        (best, best_distance)
    }

    /// Identifier of the entry closest to `rgb`.
    #[must_use]
    pub fn closest(&self, rgb: [u8; 3]) -> &str {
        &self.closest_entry(rgb).0.id
    }
}

fn distance_sq(a: [u8; 3], b: [u8; 3]) -> u32 {
    a.iter()
        .zip(b)
        .map(|(&x, y)| {
            let d = u32::from(x.abs_diff(y));
            d * d
        })
        .sum()
}
