//! File-level tests for the bookmarkgen building blocks

use bookmark::{Bookmark, BookmarkSettings, Rgb};
use bookmarkgen::{
    inspect_stl, load_raster, load_settings, write_outputs, OutputFormat, OutputOptions,
};
use image::RgbImage;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::Read;
use std::path::Path;

const RED: [u8; 3] = [200, 10, 10];

fn small_settings() -> BookmarkSettings {
    BookmarkSettings {
        width_mm: 10.0,
        height_mm: 30.0,
        ..Default::default()
    }
}

/// 8x24 image, top third red, rest white
fn write_source_image(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("source.png");
    let image = RgbImage::from_fn(8, 24, |_, y| {
        if y < 8 {
            image::Rgb(RED)
        } else {
            image::Rgb([255, 255, 255])
        }
    });
    image.save(&path).unwrap();
    path
}

fn options(dir: &Path, format: OutputFormat) -> OutputOptions {
    OutputOptions {
        out_dir: dir.join("out"),
        format,
        name: "bookmark".to_string(),
        thumbnail: None,
        write_preview: false,
    }
}

#[test]
fn test_load_settings_fills_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bookmark.toml");
    std::fs::write(&path, "width_mm = 30.0\nflat = true\n").unwrap();

    let settings = load_settings(Some(&path)).unwrap();
    assert_eq!(settings.width_mm, 30.0);
    assert!(settings.flat);
    assert_eq!(settings.height_mm, BookmarkSettings::default().height_mm);

    assert_eq!(load_settings(None).unwrap(), BookmarkSettings::default());
    assert!(load_settings(Some(&dir.path().join("missing.toml"))).is_err());
}

#[test]
fn test_load_raster_resamples_to_canvas() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_source_image(dir.path());
    let settings = small_settings();

    let raster = load_raster(&source, &settings).unwrap();
    assert_eq!((raster.width(), raster.height()), settings.canvas_size());
    assert_eq!((raster.width(), raster.height()), (40, 120));
    assert_eq!(raster.get(0, 0), Rgb::from(RED));
    assert_eq!(raster.get(39, 119), Rgb::WHITE);
}

#[test]
fn test_stl_outputs_and_inspect() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_source_image(dir.path());
    let settings = small_settings();

    let raster = load_raster(&source, &settings).unwrap();
    let bookmark = Bookmark::from_raster(&raster, &mut StdRng::seed_from_u64(7));
    assert_eq!(bookmark.palette().colors[0], Rgb::WHITE);
    assert_eq!(bookmark.palette().colors[1], Rgb::from(RED));

    let written = write_outputs(&bookmark, &settings, &options(dir.path(), OutputFormat::Stl))
        .unwrap();
    let names: Vec<String> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["Base.stl", "Color_2.stl"]);

    let base = inspect_stl(&written[0]).unwrap();
    assert!(base.triangles > 0);
    assert_eq!(base.triangles % 12, 0);
    assert_eq!(base.min, [0.0, 0.0, 0.0]);
    assert_eq!(base.max[0], settings.width_mm);
    assert_eq!(base.max[1], settings.height_mm);

    // Red covers the top third of the bookmark
    let red = inspect_stl(&written[1]).unwrap();
    assert_eq!(red.min[1], 20.0);
    assert_eq!(red.max[1], 30.0);
    assert_eq!(red.min[2], settings.base_thickness_mm);
}

#[test]
fn test_3mf_output_embeds_preview_thumbnail() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_source_image(dir.path());
    let settings = small_settings();

    let raster = load_raster(&source, &settings).unwrap();
    let bookmark = Bookmark::from_raster(&raster, &mut StdRng::seed_from_u64(7));

    let mut options = options(dir.path(), OutputFormat::ThreeMf);
    options.write_preview = true;
    let written = write_outputs(&bookmark, &settings, &options).unwrap();
    assert_eq!(written.len(), 2);
    assert!(written[0].ends_with("bookmark.3mf"));
    assert!(written[1].ends_with("bookmark_preview.png"));

    let file = std::fs::File::open(&written[0]).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    let mut thumbnail = Vec::new();
    archive
        .by_name("Metadata/thumbnail.png")
        .unwrap()
        .read_to_end(&mut thumbnail)
        .unwrap();

    let decoded = image::load_from_memory(&thumbnail).unwrap().to_rgb8();
    assert_eq!(decoded.dimensions(), (40, 120));
    assert_eq!(decoded.get_pixel(0, 0).0, RED);

    let preview = std::fs::read(&written[1]).unwrap();
    assert_eq!(preview, thumbnail);
}

#[test]
fn test_inspect_rejects_truncated_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.stl");
    std::fs::write(&path, [0u8; 40]).unwrap();
    assert!(inspect_stl(&path).is_err());
}
