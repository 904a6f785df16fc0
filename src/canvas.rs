use image::RgbImage;

use crate::bands::BandSet;
use crate::editor::{CanvasPoint, HoverHint, PointerButton};
use crate::minimap;
use crate::session::Session;

/// Rows per uploaded texture; tall composites exceed GPU texture limits.
const TILE_ROWS: u32 = 2048;

const OVERLAY: egui::Color32 = egui::Color32::from_black_alpha(180);
const BAND_BORDER: egui::Color32 = egui::Color32::from_rgb(0, 188, 212);
const SPLIT_LINE: egui::Color32 = egui::Color32::from_rgb(255, 82, 82);
const MINIMAP_HIGHLIGHT: egui::Color32 = egui::Color32::from_rgba_premultiplied(91, 12, 39, 100);

struct Tile {
    texture: egui::TextureHandle,
    top: u32,
    rows: u32,
}

/// An image uploaded as a stack of horizontal texture tiles.
struct TiledTexture {
    width: u32,
    height: u32,
    tiles: Vec<Tile>,
}

impl TiledTexture {
    fn upload(ctx: &egui::Context, name: &str, img: &RgbImage) -> Self {
        let (width, height) = img.dimensions();
        let mut tiles = Vec::new();
        let mut top = 0;
        while top < height {
            let rows = TILE_ROWS.min(height - top);
            let part = image::imageops::crop_imm(img, 0, top, width, rows).to_image();
            let color = egui::ColorImage::from_rgb([width as usize, rows as usize], part.as_raw());
            let texture = ctx.load_texture(
                format!("{}_{}", name, top),
                color,
                egui::TextureOptions::LINEAR,
            );
            tiles.push(Tile { texture, top, rows });
            top += rows;
        }
        Self {
            width,
            height,
            tiles,
        }
    }

    /// Paints image rows `src_top..src_bottom` stretched into `dest`.
    fn paint_rows(&self, painter: &egui::Painter, src_top: f32, src_bottom: f32, dest: egui::Rect) {
        let src_bottom = src_bottom.min(self.height as f32);
        if src_bottom <= src_top {
            return;
        }
        let scale_y = dest.height() / (src_bottom - src_top);
        for tile in &self.tiles {
            let tile_top = tile.top as f32;
            let tile_bottom = (tile.top + tile.rows) as f32;
            let top = src_top.max(tile_top);
            let bottom = src_bottom.min(tile_bottom);
            if bottom <= top {
                continue;
            }
            let uv = egui::Rect::from_min_max(
                egui::pos2(0.0, (top - tile_top) / tile.rows as f32),
                egui::pos2(1.0, (bottom - tile_top) / tile.rows as f32),
            );
            let rect = egui::Rect::from_min_max(
                egui::pos2(dest.left(), dest.top() + (top - src_top) * scale_y),
                egui::pos2(dest.right(), dest.top() + (bottom - src_top) * scale_y),
            );
            painter.image(tile.texture.id(), rect, uv, egui::Color32::WHITE);
        }
    }
}

/// Screen-side state for the editing canvas and minimap.
pub struct CanvasView {
    generation: Option<u64>,
    composite: Option<TiledTexture>,
    thumbnail: Option<TiledTexture>,
}

impl CanvasView {
    pub fn new() -> Self {
        Self {
            generation: None,
            composite: None,
            thumbnail: None,
        }
    }

    /// Re-uploads textures when the session replaced its composite.
    pub fn sync(&mut self, ctx: &egui::Context, session: &Session) {
        if self.generation == Some(session.generation()) {
            return;
        }
        self.generation = Some(session.generation());
        match session.composite() {
            Some(img) => {
                let thumb = minimap::thumbnail(img, session.limits().thumb_width);
                self.composite = Some(TiledTexture::upload(ctx, "composite", img));
                self.thumbnail = Some(TiledTexture::upload(ctx, "minimap", &thumb));
            }
            None => {
                self.composite = None;
                self.thumbnail = None;
            }
        }
    }

    pub fn show_canvas(&mut self, ui: &mut egui::Ui, session: &mut Session) {
        let Some(texture) = &self.composite else {
            ui.centered_and_justified(|ui| {
                ui.label("Add images or drop them here");
            });
            return;
        };

        egui::ScrollArea::vertical()
            .id_salt("canvas_scroll")
            .auto_shrink([false, false])
            .drag_to_scroll(false)
            .show(ui, |ui| {
                let scale = (ui.available_width() / texture.width as f32).min(1.0);
                let size = egui::vec2(
                    texture.width as f32 * scale,
                    texture.height as f32 * scale,
                );
                let (rect, response) = ui.allocate_exact_size(size, egui::Sense::click_and_drag());
                let painter = ui.painter_at(rect);
                texture.paint_rows(&painter, 0.0, texture.height as f32, rect);

                handle_pointer(ui, &response, rect, scale, session);

                let bands = session.display_bands();
                paint_overlays(&painter, rect, scale, &bands, texture.height as f32);
                paint_split_lines(&painter, rect, scale, &session.plan().boundaries);
            });
    }

    pub fn minimap_width(&self, session: &Session, view_height: f32) -> f32 {
        session
            .minimap(view_height)
            .ideal_width(session.limits().minimap_column_gap)
    }

    pub fn show_minimap(&self, ui: &mut egui::Ui, session: &Session) {
        let Some(thumb) = &self.thumbnail else {
            return;
        };
        let view_height = ui.available_height();
        let layout = session.minimap(view_height);
        let gap = session.limits().minimap_column_gap;
        let (rect, _) = ui.allocate_exact_size(
            egui::vec2(layout.ideal_width(gap), view_height),
            egui::Sense::hover(),
        );
        let painter = ui.painter_at(rect);
        for column in &layout.columns {
            let dest = egui::Rect::from_min_size(
                rect.min + egui::vec2(column.x, 0.0),
                egui::vec2(layout.thumb_width, column.source_bottom - column.source_top),
            );
            thumb.paint_rows(&painter, column.source_top, column.source_bottom, dest);
            for highlight in &column.highlights {
                let r = egui::Rect::from_min_size(
                    dest.min + egui::vec2(0.0, highlight.y),
                    egui::vec2(layout.thumb_width, highlight.height),
                );
                painter.rect_filled(r, 0.0, MINIMAP_HIGHLIGHT);
            }
        }
    }
}

fn handle_pointer(
    ui: &egui::Ui,
    response: &egui::Response,
    rect: egui::Rect,
    scale: f32,
    session: &mut Session,
) {
    let to_canvas = |pos: egui::Pos2| {
        CanvasPoint::new((pos.x - rect.min.x) / scale, (pos.y - rect.min.y) / scale)
    };
    let (primary_down, secondary_down, primary_up, escape, pos) = ui.input(|i| {
        (
            i.pointer.button_pressed(egui::PointerButton::Primary),
            i.pointer.button_pressed(egui::PointerButton::Secondary),
            i.pointer.button_released(egui::PointerButton::Primary),
            i.key_pressed(egui::Key::Escape),
            i.pointer.interact_pos(),
        )
    });

    if response.hovered() {
        if let Some(pos) = pos {
            if primary_down {
                session.pointer_down(PointerButton::Primary, to_canvas(pos));
            } else if secondary_down {
                session.pointer_down(PointerButton::Secondary, to_canvas(pos));
            }
        }
    }

    if session.gesture_active() {
        if escape {
            session.cancel_gesture();
        } else if let Some(pos) = pos {
            session.pointer_move(to_canvas(pos));
            if primary_up {
                session.pointer_up(to_canvas(pos));
            }
        } else if primary_up {
            // pointer left the window mid-drag
            session.cancel_gesture();
        }
    }

    if let Some(pos) = response.hover_pos() {
        let icon = match session.hover_hint(to_canvas(pos)) {
            HoverHint::ResizeEdge => egui::CursorIcon::ResizeVertical,
            HoverHint::MoveBand => egui::CursorIcon::Move,
            HoverHint::Default => egui::CursorIcon::Default,
        };
        ui.ctx().set_cursor_icon(icon);
    }
}

fn paint_overlays(painter: &egui::Painter, rect: egui::Rect, scale: f32, bands: &BandSet, height: f32) {
    let screen_y = |y: f32| rect.top() + y * scale;
    let shade = |from: f32, to: f32| {
        if to > from {
            painter.rect_filled(
                egui::Rect::from_x_y_ranges(rect.x_range(), screen_y(from)..=screen_y(to)),
                0.0,
                OVERLAY,
            );
        }
    };

    let mut covered = 0.0_f32;
    for band in bands.bands() {
        shade(covered, band.top);
        covered = covered.max(band.bottom);
    }
    shade(covered, height);

    let stroke = egui::Stroke::new(3.0, BAND_BORDER);
    for band in bands.bands() {
        let top = screen_y(band.top);
        let bottom = screen_y(band.bottom);
        let outline = [
            egui::pos2(rect.left(), top),
            egui::pos2(rect.right(), top),
            egui::pos2(rect.right(), bottom),
            egui::pos2(rect.left(), bottom),
            egui::pos2(rect.left(), top),
        ];
        painter.extend(egui::Shape::dashed_line(&outline, stroke, 10.0, 6.0));
    }
}

fn paint_split_lines(painter: &egui::Painter, rect: egui::Rect, scale: f32, boundaries: &[f32]) {
    for &y in boundaries {
        let y = rect.top() + y * scale;
        let line = [egui::pos2(rect.left(), y), egui::pos2(rect.right(), y)];
        painter.extend(egui::Shape::dotted_line(&line, SPLIT_LINE, 6.0, 1.5));
    }
}
