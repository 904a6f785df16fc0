use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::canvas::CanvasView;
use crate::composite::SUPPORTED_IMAGE_EXTS;
use crate::config::AppConfig;
use crate::export::{ExportError, ExportReport};
use crate::session::Session;

const SOURCE_PANEL_WIDTH: f32 = 280.0;

#[derive(Clone, Copy, PartialEq, Eq)]
enum ExportKind {
    Resliced,
    PerBand,
}

impl ExportKind {
    fn label(self) -> &'static str {
        match self {
            ExportKind::Resliced => "Export Description Images",
            ExportKind::PerBand => "Export Main Images",
        }
    }
}

pub struct StripCutApp {
    session: Session,
    canvas: CanvasView,
    selected: Vec<usize>,
    desc_prefix: String,
    main_prefix: String,
    status: String,
    config: AppConfig,
}

impl StripCutApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: AppConfig) -> Self {
        let session = Session::new(config.limits());
        Self {
            session,
            canvas: CanvasView::new(),
            selected: Vec::new(),
            desc_prefix: config.desc_prefix(),
            main_prefix: config.main_prefix(),
            status: String::new(),
            config,
        }
    }

    fn add_paths(&mut self, paths: Vec<PathBuf>) {
        let offered = paths.len();
        let added = self.session.add_sources(paths);
        self.selected.clear();
        if added < offered {
            self.status = format!(
                "Added {} of {} file(s); others were unsupported or duplicates",
                added, offered
            );
        } else if added > 0 {
            self.status = format!("Added {} file(s)", added);
        }
    }

    fn pick_sources(&mut self) {
        let mut dialog = rfd::FileDialog::new().add_filter("Images", SUPPORTED_IMAGE_EXTS);
        if let Some(dir) = &self.config.last_open_dir {
            dialog = dialog.set_directory(dir);
        }
        let Some(paths) = dialog.pick_files() else {
            return;
        };
        if let Some(parent) = paths.first().and_then(|p| p.parent()) {
            self.config.last_open_dir = Some(parent.to_path_buf());
        }
        self.add_paths(paths);
    }

    fn pick_export_dir(&mut self) -> Option<PathBuf> {
        let start = self
            .config
            .last_export_dir
            .clone()
            .unwrap_or_else(default_export_dir);
        let dir = rfd::FileDialog::new().set_directory(start).pick_folder()?;
        self.config.last_export_dir = Some(dir.clone());
        Some(dir)
    }

    fn run_export(&mut self, kind: ExportKind) {
        let Some(dir) = self.pick_export_dir() else {
            return;
        };
        let result = match kind {
            ExportKind::Resliced => self.session.export_resliced(&dir, &self.desc_prefix),
            ExportKind::PerBand => self.session.export_per_band(&dir, &self.main_prefix),
        };
        self.status = export_status(&dir, &result);
        match &result {
            Ok(report) => info!(files = report.files.len(), dir = %dir.display(), "export finished"),
            Err(err) => warn!(error = %err, "export failed"),
        }
    }

    fn remove_selected(&mut self) {
        self.session.remove_sources(&self.selected);
        self.selected.clear();
    }

    fn toggle_selected(&mut self, index: usize) {
        if let Some(pos) = self.selected.iter().position(|&i| i == index) {
            self.selected.remove(pos);
        } else {
            self.selected.push(index);
        }
    }

    fn show_menu(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("Add Images").clicked() {
                self.pick_sources();
            }
            if ui
                .add_enabled(!self.selected.is_empty(), egui::Button::new("Remove Selected"))
                .clicked()
            {
                self.remove_selected();
            }
            let has_sources = !self.session.sources().is_empty();
            if ui.add_enabled(has_sources, egui::Button::new("Sort by Name")).clicked() {
                self.session.sort_by_name();
                self.selected.clear();
            }
            if ui.add_enabled(has_sources, egui::Button::new("Sort by Date")).clicked() {
                self.session.sort_by_modified();
                self.selected.clear();
            }
            if ui.add_enabled(has_sources, egui::Button::new("Clear")).clicked() {
                self.session.clear();
                self.selected.clear();
                self.status.clear();
            }
            ui.separator();
            let has_composite = self.session.composite().is_some();
            if ui
                .add_enabled(has_composite, egui::Button::new("Reset Selection"))
                .clicked()
            {
                self.session.reset_selection();
            }
        });
    }

    fn show_sources(&mut self, ui: &mut egui::Ui) {
        ui.heading("Images");
        let mut toggled = None;
        let mut moved = None;
        let count = self.session.sources().len();
        egui::ScrollArea::vertical()
            .id_salt("source_list")
            .max_height(ui.available_height() * 0.5)
            .show(ui, |ui| {
                for (index, path) in self.session.sources().iter().enumerate() {
                    ui.horizontal(|ui| {
                        if ui.add_enabled(index > 0, egui::Button::new("⏶")).clicked() {
                            moved = Some((index, -1));
                        }
                        if ui.add_enabled(index + 1 < count, egui::Button::new("⏷")).clicked() {
                            moved = Some((index, 1));
                        }
                        let selected = self.selected.contains(&index);
                        if ui
                            .selectable_label(selected, source_label(index, path))
                            .on_hover_text(path.display().to_string())
                            .clicked()
                        {
                            toggled = Some(index);
                        }
                    });
                }
            });
        if let Some(index) = toggled {
            self.toggle_selected(index);
        }
        if let Some((index, offset)) = moved {
            self.session.move_source(index, offset);
            self.selected.clear();
        }
    }

    fn show_export(&mut self, ui: &mut egui::Ui) {
        let stats = *self.session.stats();
        ui.heading("Export");
        ui.label(stats.summary());
        if let Some(warning) = stats.warning() {
            ui.colored_label(egui::Color32::from_rgb(220, 50, 50), warning);
        }

        ui.add_space(8.0);
        ui.horizontal(|ui| {
            ui.label("Description prefix");
            ui.text_edit_singleline(&mut self.desc_prefix);
        });
        if ui
            .add_enabled(
                stats.export_enabled(),
                egui::Button::new(ExportKind::Resliced.label()),
            )
            .clicked()
        {
            self.run_export(ExportKind::Resliced);
        }

        ui.add_space(8.0);
        ui.horizontal(|ui| {
            ui.label("Main prefix");
            ui.text_edit_singleline(&mut self.main_prefix);
        });
        if ui
            .add_enabled(
                !self.session.bands().is_empty(),
                egui::Button::new(ExportKind::PerBand.label()),
            )
            .clicked()
        {
            self.run_export(ExportKind::PerBand);
        }

        if !self.status.is_empty() {
            ui.separator();
            ui.label(&self.status);
        }
    }
}

impl eframe::App for StripCutApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Track window size for saving on exit
        if let Some(rect) = ctx.input(|i| i.viewport().inner_rect) {
            self.config.window_width = Some(rect.width());
            self.config.window_height = Some(rect.height());
        }

        let dropped: Vec<PathBuf> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|f| f.path.clone())
                .collect()
        });
        if !dropped.is_empty() {
            self.add_paths(dropped);
        }

        self.canvas.sync(ctx, &self.session);

        egui::TopBottomPanel::top("main_menu").show(ctx, |ui| {
            self.show_menu(ui);
        });

        egui::SidePanel::left("sources")
            .default_width(SOURCE_PANEL_WIDTH)
            .show(ctx, |ui| {
                self.show_sources(ui);
                ui.separator();
                self.show_export(ui);
            });

        let view_height = ctx.available_rect().height();
        let minimap_width = self.canvas.minimap_width(&self.session, view_height);
        egui::SidePanel::right("minimap")
            .exact_width(minimap_width)
            .resizable(false)
            .show(ctx, |ui| {
                self.canvas.show_minimap(ui, &self.session);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.canvas.show_canvas(ui, &mut self.session);
        });
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.config.desc_prefix = non_blank(&self.desc_prefix);
        self.config.main_prefix = non_blank(&self.main_prefix);
        self.config.save();
    }
}

fn default_export_dir() -> PathBuf {
    dirs::picture_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn non_blank(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn source_label(index: usize, path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    format!("{:>2}. {}", index + 1, name)
}

fn export_status(dir: &Path, result: &Result<ExportReport, ExportError>) -> String {
    match result {
        Ok(report) => format!("Saved {} image(s) to {}", report.files.len(), dir.display()),
        Err(err) => format!("Export failed: {}", err),
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::{export_status, source_label};
    use crate::export::{ExportError, ExportReport, ExportedFile};

    #[test]
    fn source_label_numbers_from_one() {
        assert_eq!(source_label(0, Path::new("/a/b/long.png")), " 1. long.png");
        assert_eq!(source_label(11, Path::new("x.jpg")), "12. x.jpg");
    }

    #[test]
    fn export_status_reports_count_and_folder() {
        let report = ExportReport {
            files: vec![
                ExportedFile {
                    path: PathBuf::from("/out/Shopee_01.jpg"),
                    sources: vec![(0, 1600)],
                },
                ExportedFile {
                    path: PathBuf::from("/out/Shopee_02.jpg"),
                    sources: vec![(1600, 2000)],
                },
            ],
        };
        assert_eq!(
            export_status(Path::new("/out"), &Ok(report)),
            "Saved 2 image(s) to /out"
        );
    }

    #[test]
    fn export_status_surfaces_errors() {
        let status = export_status(Path::new("/out"), &Err(ExportError::EmptySelection));
        assert_eq!(status, "Export failed: no region selected");
    }
}
