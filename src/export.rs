use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbImage};
use thiserror::Error;
use tracing::info;

use crate::bands::BandSet;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no region selected")]
    EmptySelection,
    #[error("no composite image loaded")]
    NoComposite,
    #[error("selection needs {count} images, only {max} allowed")]
    OverBudget { count: usize, max: usize },
    #[error("cannot create {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {} after {written} file(s): {source}", .path.display())]
    Write {
        path: PathBuf,
        written: usize,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode {} after {written} file(s): {source}", .path.display())]
    Encode {
        path: PathBuf,
        written: usize,
        #[source]
        source: image::ImageError,
    },
}

/// Where and how output files are written.
#[derive(Debug, Clone)]
pub struct ExportTarget {
    pub dir: PathBuf,
    pub prefix: String,
    pub quality: u8,
}

impl ExportTarget {
    /// Trims `prefix`, falling back to `default_prefix` when it is blank.
    pub fn new(dir: impl Into<PathBuf>, prefix: &str, default_prefix: &str, quality: u8) -> Self {
        let prefix = prefix.trim();
        Self {
            dir: dir.into(),
            prefix: if prefix.is_empty() {
                default_prefix.to_string()
            } else {
                prefix.to_string()
            },
            quality: quality.clamp(1, 100),
        }
    }

    fn file_name(&self, index: usize) -> String {
        format!("{}_{:02}.jpg", self.prefix, index)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportedFile {
    pub path: PathBuf,
    /// Composite row ranges that ended up in this file, top to bottom.
    pub sources: Vec<(u32, u32)>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportReport {
    pub files: Vec<ExportedFile>,
}

/// First free path for `filename` in `dir`: `name.ext`, then `name_1.ext`,
/// `name_2.ext`, and so on.
pub fn unique_path(dir: &Path, filename: &str) -> PathBuf {
    let candidate = dir.join(filename);
    if !candidate.exists() {
        return candidate;
    }
    let (stem, ext) = match filename.rfind('.') {
        Some(dot) if dot > 0 => (&filename[..dot], &filename[dot..]),
        _ => (filename, ""),
    };
    let mut counter = 1usize;
    loop {
        let candidate = dir.join(format!("{}_{}{}", stem, counter, ext));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Pixel row ranges of `bands`, skipping bands thinner than one row.
pub fn band_rows(bands: &BandSet) -> Vec<(u32, u32)> {
    bands.bands().iter().filter_map(|b| b.rows()).collect()
}

/// Concatenates `rows` into one strip and cuts it every `max` rows.
///
/// Each entry lists the source row ranges making up one output image.
pub fn strip_partition(rows: &[(u32, u32)], max: u32) -> Vec<Vec<(u32, u32)>> {
    let max = max.max(1);
    let mut chunks: Vec<Vec<(u32, u32)>> = Vec::new();
    let mut filled = max;
    for &(top, bottom) in rows {
        let mut y = top;
        while y < bottom {
            if filled == max {
                chunks.push(Vec::new());
                filled = 0;
            }
            let take = (max - filled).min(bottom - y);
            if let Some(chunk) = chunks.last_mut() {
                chunk.push((y, y + take));
            }
            filled += take;
            y += take;
        }
    }
    chunks
}

fn build_strip(composite: &RgbImage, rows: &[(u32, u32)]) -> RgbImage {
    let width = composite.width();
    let total: u32 = rows.iter().map(|(t, b)| b - t).sum();
    let mut strip = RgbImage::new(width, total);
    let mut y = 0i64;
    for &(top, bottom) in rows {
        let piece = image::imageops::crop_imm(composite, 0, top, width, bottom - top).to_image();
        image::imageops::replace(&mut strip, &piece, 0, y);
        y += (bottom - top) as i64;
    }
    strip
}

fn clamp_rows(rows: Vec<(u32, u32)>, height: u32) -> Vec<(u32, u32)> {
    rows.into_iter()
        .map(|(t, b)| (t.min(height), b.min(height)))
        .filter(|(t, b)| b > t)
        .collect()
}

fn ensure_dir(dir: &Path) -> Result<(), ExportError> {
    std::fs::create_dir_all(dir).map_err(|source| ExportError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })
}

fn write_jpeg(
    img: RgbImage,
    path: &Path,
    quality: u8,
    written: usize,
) -> Result<(), ExportError> {
    let file = std::fs::File::create(path).map_err(|source| ExportError::Write {
        path: path.to_path_buf(),
        written,
        source,
    })?;
    let writer = std::io::BufWriter::new(file);
    let encoder = JpegEncoder::new_with_quality(writer, quality);
    DynamicImage::ImageRgb8(img)
        .write_with_encoder(encoder)
        .map_err(|source| ExportError::Encode {
            path: path.to_path_buf(),
            written,
            source,
        })
}

/// Joins all bands into one strip and writes it as consecutive slices of at
/// most `max_slice_height` rows, named `{prefix}_01.jpg`, `{prefix}_02.jpg`...
///
/// `bands` should be a snapshot taken by the caller. Files written before a
/// failure stay on disk.
pub fn export_resliced(
    composite: &RgbImage,
    bands: &BandSet,
    max_slice_height: u32,
    target: &ExportTarget,
) -> Result<ExportReport, ExportError> {
    let rows = clamp_rows(band_rows(bands), composite.height());
    if rows.is_empty() {
        return Err(ExportError::EmptySelection);
    }
    ensure_dir(&target.dir)?;

    let strip = build_strip(composite, &rows);
    let partition = strip_partition(&rows, max_slice_height);
    let max = max_slice_height.max(1);

    let mut report = ExportReport::default();
    let mut y = 0u32;
    for (i, sources) in partition.into_iter().enumerate() {
        let h = max.min(strip.height() - y);
        let piece = image::imageops::crop_imm(&strip, 0, y, strip.width(), h).to_image();
        let path = unique_path(&target.dir, &target.file_name(i + 1));
        write_jpeg(piece, &path, target.quality, report.files.len())?;
        report.files.push(ExportedFile { path, sources });
        y += h;
    }
    info!(
        files = report.files.len(),
        dir = %target.dir.display(),
        "resliced export finished"
    );
    Ok(report)
}

/// Writes every band as its own image without reslicing.
pub fn export_per_band(
    composite: &RgbImage,
    bands: &BandSet,
    target: &ExportTarget,
) -> Result<ExportReport, ExportError> {
    let rows = clamp_rows(band_rows(bands), composite.height());
    if rows.is_empty() {
        return Err(ExportError::EmptySelection);
    }
    ensure_dir(&target.dir)?;

    let mut report = ExportReport::default();
    for (i, &(top, bottom)) in rows.iter().enumerate() {
        let piece =
            image::imageops::crop_imm(composite, 0, top, composite.width(), bottom - top)
                .to_image();
        let path = unique_path(&target.dir, &target.file_name(i + 1));
        write_jpeg(piece, &path, target.quality, report.files.len())?;
        report.files.push(ExportedFile {
            path,
            sources: vec![(top, bottom)],
        });
    }
    info!(
        files = report.files.len(),
        dir = %target.dir.display(),
        "per-band export finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};

    use super::*;
    use crate::bands::Band;

    fn gradient(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |_, y| Rgb([(y % 256) as u8, 0, 0]))
    }

    fn bands(pairs: &[(f32, f32)]) -> BandSet {
        BandSet::from_bands(pairs.iter().map(|&(t, b)| Band::new(t, b)).collect())
    }

    fn target(dir: &Path, prefix: &str) -> ExportTarget {
        ExportTarget::new(dir, prefix, "Shopee", 95)
    }

    fn file_names(report: &ExportReport) -> Vec<String> {
        report
            .files
            .iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn strip_partition_cuts_across_bands() {
        let parts = strip_partition(&[(0, 100), (200, 350)], 120);
        assert_eq!(
            parts,
            vec![
                vec![(0, 100), (200, 220)],
                vec![(220, 340)],
                vec![(340, 350)],
            ]
        );
        assert!(strip_partition(&[], 120).is_empty());
    }

    #[test]
    fn unique_path_appends_increasing_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let first = unique_path(dir.path(), "Main_01.jpg");
        assert_eq!(first, dir.path().join("Main_01.jpg"));
        std::fs::write(&first, b"x").unwrap();
        let second = unique_path(dir.path(), "Main_01.jpg");
        assert_eq!(second, dir.path().join("Main_01_1.jpg"));
        std::fs::write(&second, b"x").unwrap();
        assert_eq!(
            unique_path(dir.path(), "Main_01.jpg"),
            dir.path().join("Main_01_2.jpg")
        );
        assert_eq!(unique_path(dir.path(), "README"), dir.path().join("README"));
    }

    #[test]
    fn blank_prefix_uses_default() {
        let t = ExportTarget::new("/tmp", "   ", "Main", 200);
        assert_eq!(t.prefix, "Main");
        assert_eq!(t.quality, 100);
        assert_eq!(t.file_name(3), "Main_03.jpg");
    }

    #[test]
    fn resliced_export_writes_bounded_slices() {
        let dir = tempfile::tempdir().unwrap();
        let img = gradient(8, 500);
        let report =
            export_resliced(&img, &bands(&[(0.0, 100.0), (200.0, 350.0)]), 120, &target(dir.path(), "Item"))
                .unwrap();
        assert_eq!(file_names(&report), vec!["Item_01.jpg", "Item_02.jpg", "Item_03.jpg"]);
        let heights: Vec<u32> = report
            .files
            .iter()
            .map(|f| image::open(&f.path).unwrap().height())
            .collect();
        assert_eq!(heights, vec![120, 120, 10]);
        assert_eq!(report.files[0].sources, vec![(0, 100), (200, 220)]);
    }

    #[test]
    fn per_band_export_writes_one_file_per_band() {
        let dir = tempfile::tempdir().unwrap();
        let img = gradient(8, 500);
        let report = export_per_band(
            &img,
            &bands(&[(10.5, 60.9), (300.0, 500.0)]),
            &target(dir.path(), "Main"),
        )
        .unwrap();
        assert_eq!(file_names(&report), vec!["Main_01.jpg", "Main_02.jpg"]);
        assert_eq!(report.files[0].sources, vec![(10, 60)]);
        let first = image::open(&report.files[0].path).unwrap();
        assert_eq!((first.width(), first.height()), (8, 50));
    }

    #[test]
    fn empty_selection_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let img = gradient(8, 100);
        let err = export_resliced(&img, &BandSet::new(), 50, &target(&out, "x")).unwrap_err();
        assert!(matches!(err, ExportError::EmptySelection));
        assert_eq!(err.to_string(), "no region selected");
        let err = export_per_band(&img, &bands(&[(3.2, 3.9)]), &target(&out, "x")).unwrap_err();
        assert!(matches!(err, ExportError::EmptySelection));
        assert!(!out.exists());
    }

    #[test]
    fn repeated_export_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let img = gradient(8, 300);
        let set = bands(&[(0.0, 300.0)]);
        let t = target(dir.path(), "Shopee");
        let first = export_resliced(&img, &set, 200, &t).unwrap();
        let second = export_resliced(&img, &set, 200, &t).unwrap();
        let third = export_resliced(&img, &set, 200, &t).unwrap();
        assert_eq!(file_names(&first), vec!["Shopee_01.jpg", "Shopee_02.jpg"]);
        assert_eq!(file_names(&second), vec!["Shopee_01_1.jpg", "Shopee_02_1.jpg"]);
        assert_eq!(file_names(&third), vec!["Shopee_01_2.jpg", "Shopee_02_2.jpg"]);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 6);
    }

    #[test]
    fn unwritable_directory_reports_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let img = gradient(8, 100);
        let err = export_per_band(&img, &bands(&[(0.0, 50.0)]), &target(&blocker, "x"))
            .unwrap_err();
        assert!(matches!(err, ExportError::CreateDir { .. }));
    }
}
