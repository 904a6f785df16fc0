mod app;
mod bands;
mod canvas;
mod composite;
mod config;
mod editor;
mod export;
mod minimap;
mod planner;
mod session;

use app::StripCutApp;
use config::AppConfig;

const DEFAULT_WINDOW_SIZE: [f32; 2] = [1400.0, 900.0];

fn window_size(config: &AppConfig) -> [f32; 2] {
    let width = config
        .window_width
        .filter(|w| *w > 0.0)
        .unwrap_or(DEFAULT_WINDOW_SIZE[0]);
    let height = config
        .window_height
        .filter(|h| *h > 0.0)
        .unwrap_or(DEFAULT_WINDOW_SIZE[1]);
    [width, height]
}

fn main() -> eframe::Result {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = AppConfig::load();
    let limits = config.limits();
    tracing::info!(
        max_slice_height = limits.max_slice_height,
        max_images = limits.max_images,
        "starting stripcut"
    );

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("stripcut")
            .with_app_id("stripcut")
            .with_drag_and_drop(true)
            .with_inner_size(window_size(&config)),
        ..Default::default()
    };

    eframe::run_native(
        "stripcut",
        native_options,
        Box::new(|cc| Ok(Box::new(StripCutApp::new(cc, config)))),
    )
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_WINDOW_SIZE, window_size};
    use crate::config::AppConfig;

    #[test]
    fn window_size_uses_saved_dimensions() {
        let config = AppConfig {
            window_width: Some(1000.0),
            window_height: Some(700.0),
            ..Default::default()
        };
        assert_eq!(window_size(&config), [1000.0, 700.0]);
    }

    #[test]
    fn window_size_falls_back_for_missing_or_bogus_values() {
        assert_eq!(window_size(&AppConfig::default()), DEFAULT_WINDOW_SIZE);
        let config = AppConfig {
            window_width: Some(0.0),
            window_height: Some(-5.0),
            ..Default::default()
        };
        assert_eq!(window_size(&config), DEFAULT_WINDOW_SIZE);
    }
}
