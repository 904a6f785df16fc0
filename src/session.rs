use std::path::{Path, PathBuf};
use std::time::SystemTime;

use image::RgbImage;
use tracing::{info, warn};

use crate::bands::BandSet;
use crate::composite;
use crate::config::Limits;
use crate::editor::{CanvasPoint, HoverHint, PointerButton, SelectionEditor};
use crate::export::{self, ExportError, ExportReport, ExportTarget};
use crate::minimap::MinimapLayout;
use crate::planner::{SlicePlan, SliceStats};

/// Everything one editing session owns: the ordered sources, the composite
/// built from them, and the bands kept on that composite.
pub struct Session {
    limits: Limits,
    sources: Vec<PathBuf>,
    composite: Option<RgbImage>,
    /// Bumped whenever `composite` is replaced.
    generation: u64,
    editor: SelectionEditor,
    plan: SlicePlan,
    stats: SliceStats,
}

impl Session {
    pub fn new(limits: Limits) -> Self {
        let plan = SlicePlan::default();
        let stats = SliceStats::from_plan(&plan, limits.max_slice_height, limits.max_images);
        Self {
            limits,
            sources: Vec::new(),
            composite: None,
            generation: 0,
            editor: SelectionEditor::new(limits),
            plan,
            stats,
        }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    pub fn composite(&self) -> Option<&RgbImage> {
        self.composite.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn bands(&self) -> &BandSet {
        self.editor.bands()
    }

    /// Bands as they would look merged; differs from [`bands`](Self::bands)
    /// only mid-gesture.
    pub fn display_bands(&self) -> BandSet {
        self.editor.preview()
    }

    pub fn plan(&self) -> &SlicePlan {
        &self.plan
    }

    pub fn stats(&self) -> &SliceStats {
        &self.stats
    }

    /// Adds supported, not yet listed files. Returns how many were added.
    pub fn add_sources<I>(&mut self, paths: I) -> usize
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut added = 0;
        for path in paths {
            if !composite::is_supported_image(&path) || self.sources.contains(&path) {
                continue;
            }
            self.sources.push(path);
            added += 1;
        }
        if added > 0 {
            self.rebuild();
        }
        added
    }

    pub fn remove_sources(&mut self, indices: &[usize]) {
        let before = self.sources.len();
        let mut index = 0;
        self.sources.retain(|_| {
            let keep = !indices.contains(&index);
            index += 1;
            keep
        });
        if self.sources.len() != before {
            self.rebuild();
        }
    }

    /// Swaps the source at `index` with its neighbour above (`-1`) or below (`1`).
    pub fn move_source(&mut self, index: usize, offset: isize) {
        let Some(target) = index.checked_add_signed(offset) else {
            return;
        };
        if index >= self.sources.len() || target >= self.sources.len() || target == index {
            return;
        }
        self.sources.swap(index, target);
        self.rebuild();
    }

    /// Sorts by file name, ignoring case.
    pub fn sort_by_name(&mut self) {
        if self.sources.is_empty() {
            return;
        }
        self.sources.sort_by_key(|p| file_name_key(p));
        self.rebuild();
    }

    /// Sorts oldest first by modification time; files that no longer exist
    /// are dropped from the list.
    pub fn sort_by_modified(&mut self) {
        if self.sources.is_empty() {
            return;
        }
        let mut dated: Vec<(PathBuf, SystemTime)> = self
            .sources
            .drain(..)
            .filter_map(|p| {
                let modified = std::fs::metadata(&p).and_then(|m| m.modified()).ok()?;
                Some((p, modified))
            })
            .collect();
        dated.sort_by_key(|(_, t)| *t);
        self.sources = dated.into_iter().map(|(p, _)| p).collect();
        self.rebuild();
    }

    pub fn clear(&mut self) {
        self.sources.clear();
        self.rebuild();
    }

    /// Rebuilds the composite from the current list and resets the bands to
    /// the full height.
    pub fn rebuild(&mut self) {
        let composite = composite::build_composite(&self.sources, self.limits.canvas_width);
        if self.composite.is_none() && composite.is_none() {
            self.editor.clear();
            self.recompute();
            return;
        }
        match &composite {
            Some(img) => info!(
                sources = self.sources.len(),
                height = img.height(),
                "composite rebuilt"
            ),
            None if !self.sources.is_empty() => warn!("no readable sources; composite cleared"),
            None => {}
        }
        self.set_composite(composite);
    }

    pub(crate) fn set_composite(&mut self, composite: Option<RgbImage>) {
        match &composite {
            Some(img) => self.editor.reset(img.height() as f32),
            None => self.editor.clear(),
        }
        self.composite = composite;
        self.generation += 1;
        self.recompute();
    }

    pub fn reset_selection(&mut self) {
        self.editor.reset_to_full();
        self.recompute();
    }

    fn recompute(&mut self) {
        self.plan = SlicePlan::compute(&self.editor.preview(), self.limits.max_slice_height);
        self.stats = SliceStats::from_plan(
            &self.plan,
            self.limits.max_slice_height,
            self.limits.max_images,
        );
    }

    pub fn pointer_down(&mut self, button: PointerButton, point: CanvasPoint) {
        if self.editor.pointer_down(button, point) {
            self.recompute();
        }
    }

    pub fn pointer_move(&mut self, point: CanvasPoint) {
        if self.editor.pointer_move(point) {
            self.recompute();
        }
    }

    pub fn pointer_up(&mut self, point: CanvasPoint) {
        if self.editor.pointer_up(point) {
            self.recompute();
        }
    }

    pub fn cancel_gesture(&mut self) {
        if self.editor.cancel() {
            self.recompute();
        }
    }

    pub fn gesture_active(&self) -> bool {
        self.editor.is_active()
    }

    pub fn hover_hint(&self, point: CanvasPoint) -> HoverHint {
        self.editor.hover_hint(point)
    }

    pub fn minimap(&self, view_height: f32) -> MinimapLayout {
        let height = self.composite.as_ref().map_or(0, |c| c.height());
        MinimapLayout::project(
            height,
            self.limits.canvas_width,
            &self.display_bands(),
            view_height,
            self.limits.thumb_width,
            self.limits.minimap_column_gap,
        )
    }

    pub fn export_resliced(&self, dir: &Path, prefix: &str) -> Result<ExportReport, ExportError> {
        let composite = self.composite.as_ref().ok_or(ExportError::NoComposite)?;
        let snapshot = self.editor.bands().clone();
        if snapshot.is_empty() {
            return Err(ExportError::EmptySelection);
        }
        if self.stats.is_over_budget() {
            return Err(ExportError::OverBudget {
                count: self.stats.output_count,
                max: self.limits.max_images,
            });
        }
        let target = ExportTarget::new(
            dir,
            prefix,
            crate::config::DEFAULT_DESC_PREFIX,
            self.limits.jpeg_quality,
        );
        export::export_resliced(composite, &snapshot, self.limits.max_slice_height, &target)
    }

    pub fn export_per_band(&self, dir: &Path, prefix: &str) -> Result<ExportReport, ExportError> {
        let composite = self.composite.as_ref().ok_or(ExportError::NoComposite)?;
        let snapshot = self.editor.bands().clone();
        let target = ExportTarget::new(
            dir,
            prefix,
            crate::config::DEFAULT_MAIN_PREFIX,
            self.limits.jpeg_quality,
        );
        export::export_per_band(composite, &snapshot, &target)
    }
}

fn file_name_key(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}
