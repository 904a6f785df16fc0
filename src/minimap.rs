use image::imageops::FilterType;
use image::RgbImage;

use crate::bands::BandSet;
use crate::composite::resize_to_width;

/// Left padding before the first column, in screen pixels.
pub const MINIMAP_PADDING: f32 = 10.0;
/// Views shorter than this are laid out as if they were this tall.
const MIN_VIEW_HEIGHT: f32 = 100.0;

/// Part of a column covered by a kept band, in column-local pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Highlight {
    pub y: f32,
    pub height: f32,
}

/// One column of the minimap: a vertical run of the scaled composite.
#[derive(Debug, Clone, PartialEq)]
pub struct MinimapColumn {
    pub x: f32,
    /// Rows of the scaled composite shown in this column.
    pub source_top: f32,
    pub source_bottom: f32,
    pub highlights: Vec<Highlight>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MinimapLayout {
    pub thumb_width: f32,
    pub scaled_height: f32,
    pub columns: Vec<MinimapColumn>,
}

impl MinimapLayout {
    /// Lays the composite out in as many columns of `view_height` as it
    /// needs, highlighting the kept bands in each.
    pub fn project(
        composite_height: u32,
        canvas_width: u32,
        bands: &BandSet,
        view_height: f32,
        thumb_width: u32,
        column_gap: f32,
    ) -> Self {
        if composite_height == 0 || canvas_width == 0 || thumb_width == 0 {
            return Self::default();
        }
        let view_height = view_height.max(MIN_VIEW_HEIGHT);
        let scale = thumb_width as f32 / canvas_width as f32;
        let scaled_height = (composite_height as f32 * scale).floor();
        let count = (scaled_height / view_height).ceil() as usize;

        let columns = (0..count)
            .map(|col| {
                let source_top = col as f32 * view_height;
                let source_bottom = ((col + 1) as f32 * view_height).min(scaled_height);
                let highlights = bands
                    .bands()
                    .iter()
                    .filter_map(|band| {
                        let top = (band.top * scale).max(source_top);
                        let bottom = (band.bottom * scale).min(source_bottom);
                        (bottom > top).then(|| Highlight {
                            y: top - source_top,
                            height: bottom - top,
                        })
                    })
                    .collect();
                MinimapColumn {
                    x: MINIMAP_PADDING + col as f32 * (thumb_width as f32 + column_gap),
                    source_top,
                    source_bottom,
                    highlights,
                }
            })
            .collect();

        Self {
            thumb_width: thumb_width as f32,
            scaled_height,
            columns,
        }
    }

    /// Width the minimap panel should request to show every column.
    pub fn ideal_width(&self, column_gap: f32) -> f32 {
        if self.columns.is_empty() {
            return 150.0;
        }
        self.columns.len() as f32 * (self.thumb_width + column_gap) + 2.0 * MINIMAP_PADDING
    }
}

/// Downscaled copy of the composite backing the minimap columns.
pub fn thumbnail(composite: &RgbImage, thumb_width: u32) -> RgbImage {
    resize_to_width(composite, thumb_width, FilterType::Triangle)
}
