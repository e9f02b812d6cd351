//! Glyph-run cache: maps a shaped glyph run to its place in the atlas.
//!
//! Entries are append-only within one atlas generation. The presenter starts
//! a new generation (and the cache empties) when the packer runs out of room
//! or the font changes.

use hashbrown::HashMap;
use hashbrown::hash_map::EntryRef;

use crate::font::FaceIdx;

/// Identity of a shaped glyph run: a face plus its ordered glyph indices.
///
/// Compared and hashed by value, so two placements of the same run share one
/// cache entry regardless of where their keys were built.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GlyphKey {
    pub face: FaceIdx,
    pub glyphs: Box<[u16]>,
}

impl GlyphKey {
    pub fn new(face: FaceIdx, glyphs: impl Into<Box<[u16]>>) -> Self {
        Self {
            face,
            glyphs: glyphs.into(),
        }
    }

    /// Key for a run of exactly one glyph.
    pub fn single(face: FaceIdx, glyph: u16) -> Self {
        Self::new(face, [glyph])
    }
}

// Lets `entry_ref` clone the key only when a slot is actually reserved.
impl From<&GlyphKey> for GlyphKey {
    fn from(key: &GlyphKey) -> Self {
        key.clone()
    }
}

/// Where a rasterized run lives in the atlas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheEntry {
    /// Top-left corner in atlas pixels.
    pub uv: [f32; 2],
    /// Ink size in pixels.
    pub size: [f32; 2],
    /// Offset from the pen position on the baseline to the ink's top-left
    /// corner, in device pixels. Measured from the rasterized ink rather
    /// than the font's baseline metric, so overhanging and descending ink
    /// lands where the rasterizer drew it.
    pub baseline_offset: [f32; 2],
}

/// Append-only map from [`GlyphKey`] to [`CacheEntry`].
#[derive(Debug, Default)]
pub struct GlyphCache {
    entries: HashMap<GlyphKey, Option<CacheEntry>>,
    generation: u64,
}

impl GlyphCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-pass get-or-create.
    ///
    /// Returns the slot for `key` and whether it still has to be populated.
    /// A freshly reserved slot is `None` until the caller writes the entry.
    /// A slot that was reserved but never populated (the frame failed midway)
    /// reports `true` again so the caller retries.
    pub fn find_or_reserve(&mut self, key: &GlyphKey) -> (&mut Option<CacheEntry>, bool) {
        let slot = match self.entries.entry_ref(key) {
            EntryRef::Occupied(o) => o.into_mut(),
            EntryRef::Vacant(v) => v.insert(None),
        };
        let needs_fill = slot.is_none();
        (slot, needs_fill)
    }

    /// Drop a reservation that could not be filled (blank or skipped glyph),
    /// so a later identical key rasterizes again.
    pub fn abandon(&mut self, key: &GlyphKey) {
        if let Some(None) = self.entries.get(key) {
            self.entries.remove(key);
        }
    }

    pub fn get(&self, key: &GlyphKey) -> Option<&CacheEntry> {
        self.entries.get(key).and_then(Option::as_ref)
    }

    /// Number of populated entries.
    pub fn len(&self) -> usize {
        self.entries.values().filter(|e| e.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Atlas generation the entries belong to.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Drop every entry and start a new atlas generation.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(x: f32) -> CacheEntry {
        CacheEntry {
            uv: [x, 0.0],
            size: [8.0, 16.0],
            baseline_offset: [0.0, -12.0],
        }
    }

    #[test]
    fn reserve_then_hit() {
        let mut cache = GlyphCache::new();
        let key = GlyphKey::new(FaceIdx(0), vec![36u16, 37]);

        let (slot, fresh) = cache.find_or_reserve(&key);
        assert!(fresh);
        *slot = Some(entry(4.0));

        let (slot, fresh) = cache.find_or_reserve(&key);
        assert!(!fresh);
        assert_eq!(*slot, Some(entry(4.0)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn keys_compare_by_value() {
        let mut cache = GlyphCache::new();
        let a = GlyphKey::new(FaceIdx(1), vec![10u16, 11, 12]);
        let b = GlyphKey::new(FaceIdx(1), [10u16, 11, 12]);
        *cache.find_or_reserve(&a).0 = Some(entry(1.0));
        assert_eq!(cache.get(&b), Some(&entry(1.0)));

        // Same glyphs from another face are a different run.
        let c = GlyphKey::new(FaceIdx(2), vec![10u16, 11, 12]);
        assert!(cache.get(&c).is_none());
        // Order matters.
        let d = GlyphKey::new(FaceIdx(1), vec![12u16, 11, 10]);
        assert!(cache.get(&d).is_none());
    }

    #[test]
    fn unfilled_reservation_is_retried() {
        let mut cache = GlyphCache::new();
        let key = GlyphKey::single(FaceIdx(0), 3);
        assert!(cache.find_or_reserve(&key).1);
        assert!(cache.find_or_reserve(&key).1);
        assert!(cache.is_empty());
    }

    #[test]
    fn abandon_only_drops_reservations() {
        let mut cache = GlyphCache::new();
        let blank = GlyphKey::single(FaceIdx(0), 1);
        let inked = GlyphKey::single(FaceIdx(0), 2);
        cache.find_or_reserve(&blank);
        *cache.find_or_reserve(&inked).0 = Some(entry(2.0));

        cache.abandon(&blank);
        cache.abandon(&inked);
        assert!(cache.get(&inked).is_some());
        assert_eq!(cache.len(), 1);
        assert!(cache.find_or_reserve(&blank).1);
    }

    #[test]
    fn clear_starts_new_generation() {
        let mut cache = GlyphCache::new();
        let key = GlyphKey::single(FaceIdx(0), 9);
        *cache.find_or_reserve(&key).0 = Some(entry(0.0));
        assert_eq!(cache.generation(), 0);

        cache.clear();
        assert_eq!(cache.generation(), 1);
        assert!(cache.get(&key).is_none());
    }
}
