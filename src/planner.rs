use crate::bands::BandSet;

/// Contiguous run of composite rows that lands in output slice `output`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourcePiece {
    pub output: usize,
    pub top: f32,
    pub bottom: f32,
}

/// How the kept bands map onto output slices of at most `max_slice_height`.
///
/// Always derived from a merged band set; never edited directly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlicePlan {
    pub pieces: Vec<SourcePiece>,
    /// Composite y of every cut that falls strictly inside a band.
    pub boundaries: Vec<f32>,
    pub total_kept_height: f32,
    pub output_count: usize,
}

impl SlicePlan {
    /// Walks the whole pixel rows of each band (see [`Band::rows`]), the
    /// same rows the export cuts, so counts here match the files written.
    ///
    /// [`Band::rows`]: crate::bands::Band::rows
    pub fn compute(bands: &BandSet, max_slice_height: u32) -> Self {
        bands.assert_disjoint();
        let max = max_slice_height.max(1);

        let mut plan = SlicePlan::default();
        let mut accumulated = 0u64;
        let mut kept = 0u64;
        for (top, bottom) in bands.bands().iter().filter_map(|b| b.rows()) {
            let mut y = top;
            while y < bottom {
                let output = (accumulated / max as u64) as usize;
                let space_left = max - (accumulated % max as u64) as u32;
                let end = bottom.min(y + space_left);
                plan.pieces.push(SourcePiece {
                    output,
                    top: y as f32,
                    bottom: end as f32,
                });
                if end < bottom {
                    plan.boundaries.push(end as f32);
                }
                accumulated += (end - y) as u64;
                y = end;
            }
            kept += (bottom - top) as u64;
        }
        plan.total_kept_height = kept as f32;
        plan.output_count = projected_output_count(plan.total_kept_height, max_slice_height);
        plan
    }

    /// Pieces grouped per output slice, in output order.
    pub fn outputs(&self) -> Vec<Vec<SourcePiece>> {
        let mut grouped: Vec<Vec<SourcePiece>> = Vec::new();
        for piece in &self.pieces {
            if grouped.len() <= piece.output {
                grouped.resize_with(piece.output + 1, Vec::new);
            }
            grouped[piece.output].push(*piece);
        }
        grouped
    }
}

pub fn projected_output_count(total_kept_height: f32, max_slice_height: u32) -> usize {
    if total_kept_height <= 0.0 {
        return 0;
    }
    (total_kept_height / max_slice_height.max(1) as f32).ceil() as usize
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BudgetStatus {
    Within,
    OverBudget { excess_pixels: f32 },
}

/// Numbers shown next to the canvas after every edit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliceStats {
    pub total_kept_height: f32,
    pub output_count: usize,
    pub max_images: usize,
    pub budget: BudgetStatus,
}

impl SliceStats {
    pub fn from_plan(plan: &SlicePlan, max_slice_height: u32, max_images: usize) -> Self {
        let budget = if plan.output_count > max_images {
            let allowed = (max_images as u64 * max_slice_height as u64) as f32;
            BudgetStatus::OverBudget {
                excess_pixels: plan.total_kept_height - allowed,
            }
        } else {
            BudgetStatus::Within
        };
        Self {
            total_kept_height: plan.total_kept_height,
            output_count: plan.output_count,
            max_images,
            budget,
        }
    }

    pub fn is_over_budget(&self) -> bool {
        matches!(self.budget, BudgetStatus::OverBudget { .. })
    }

    /// Resliced export needs something selected and must fit the budget.
    pub fn export_enabled(&self) -> bool {
        self.output_count > 0 && !self.is_over_budget()
    }

    pub fn summary(&self) -> String {
        format!(
            "Kept height: {} px\nOutput images: {}",
            self.total_kept_height as u64, self.output_count
        )
    }

    pub fn warning(&self) -> Option<String> {
        match self.budget {
            BudgetStatus::Within => None,
            BudgetStatus::OverBudget { excess_pixels } => Some(format!(
                "Over {} images! Trim about {} px",
                self.max_images,
                excess_pixels as u64
            )),
        }
    }
}
