/// One kept horizontal region of the composite, in composite pixels.
///
/// The band always spans the full canvas width, so only the vertical extent
/// is stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub top: f32,
    pub bottom: f32,
}

impl Band {
    pub fn new(top: f32, bottom: f32) -> Self {
        Self { top, bottom }
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    /// Edge-inclusive containment, matching pointer hit-testing.
    pub fn contains(&self, y: f32) -> bool {
        self.top <= y && y <= self.bottom
    }

    pub fn overlaps(&self, other: &Band) -> bool {
        self.top < other.bottom && other.top < self.bottom
    }

    /// Whole pixel rows covered by the band, truncating both edges.
    pub fn rows(&self) -> Option<(u32, u32)> {
        let top = self.top.max(0.0) as u32;
        let bottom = self.bottom.max(0.0) as u32;
        (bottom > top).then_some((top, bottom))
    }
}

/// Ordered collection of kept bands.
///
/// Between gestures the set is sorted by `top` and no two bands overlap.
/// Bands may touch (`a.bottom == b.top`) and still stay separate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BandSet {
    bands: Vec<Band>,
}

impl BandSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn full(height: f32) -> Self {
        let mut set = Self::new();
        set.reset_to_full(height);
        set
    }

    pub fn from_bands(bands: Vec<Band>) -> Self {
        Self { bands }
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Band> {
        self.bands.get(index).copied()
    }

    pub fn total_height(&self) -> f32 {
        self.bands.iter().map(Band::height).sum()
    }

    /// Sorts by `top` and coalesces bands whose next `top` lies strictly
    /// above the running `bottom`. Exactly touching bands are not merged.
    pub fn merge(&mut self) {
        if self.bands.len() < 2 {
            return;
        }
        self.bands.sort_by(|a, b| a.top.total_cmp(&b.top));

        let mut merged = Vec::with_capacity(self.bands.len());
        let mut curr = self.bands[0];
        for next in &self.bands[1..] {
            if next.top < curr.bottom {
                curr.bottom = curr.bottom.max(next.bottom);
            } else {
                merged.push(curr);
                curr = *next;
            }
        }
        merged.push(curr);
        self.bands = merged;
    }

    /// Returns a merged copy, leaving `self` untouched.
    pub fn merged(&self) -> BandSet {
        let mut copy = self.clone();
        copy.merge();
        copy
    }

    pub fn remove_tiny_bands(&mut self, min_height: f32) {
        self.bands.retain(|b| b.height() > min_height);
    }

    pub fn reset_to_full(&mut self, height: f32) {
        self.bands.clear();
        if height > 0.0 {
            self.bands.push(Band::new(0.0, height));
        }
    }

    pub fn clear(&mut self) {
        self.bands.clear();
    }

    pub fn remove_at(&mut self, index: usize) -> Option<Band> {
        (index < self.bands.len()).then(|| self.bands.remove(index))
    }

    /// Appends `band` and returns its index. Call [`merge`](Self::merge)
    /// afterwards to restore ordering.
    pub fn insert_band(&mut self, band: Band) -> usize {
        self.bands.push(band);
        self.bands.len() - 1
    }

    pub fn replace_at(&mut self, index: usize, band: Band) -> bool {
        match self.bands.get_mut(index) {
            Some(slot) => {
                *slot = band;
                true
            }
            None => false,
        }
    }

    /// Removes the first band containing `y`.
    pub fn delete_overlapping(&mut self, y: f32) -> Option<Band> {
        let index = self.bands.iter().position(|b| b.contains(y))?;
        self.remove_at(index)
    }

    /// True when sorted ascending and pairwise non-overlapping.
    pub fn is_disjoint(&self) -> bool {
        self.bands
            .windows(2)
            .all(|w| w[0].top <= w[1].top && w[0].bottom <= w[1].top)
    }

    pub fn assert_disjoint(&self) {
        debug_assert!(self.is_disjoint(), "band set not merged: {:?}", self.bands);
    }
}
