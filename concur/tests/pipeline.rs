use concur::icon::container::ContainerKind;
use concur::icon::inputs::decode::ImageDecoder;
use concur::icon::inputs::{DeclaredKind, SourceCatalog};
use concur::icon::meta::{BuildPlan, BuildStep, SourceDeclaration};
use concur::icon::targets::EntryEncoding;
use concur::icon::{Assembly, Diagnostic, IconProcessor};
use std::io::Cursor;
use std::path::{Path, PathBuf};

fn write_source(dir: &Path, name: &str, size: u32, color: [u8; 4]) -> PathBuf {
    let path = dir.join(name);
    image::RgbaImage::from_pixel(size, size, image::Rgba(color))
        .save(&path)
        .unwrap();
    path
}

fn source(file: PathBuf, kind: DeclaredKind) -> BuildStep {
    BuildStep::Source(SourceDeclaration { file, kind })
}

async fn assemble(steps: Vec<BuildStep>) -> Assembly {
    let plan = BuildPlan::from_steps(steps).unwrap();
    let catalog = SourceCatalog::load(&plan.sources, &ImageDecoder)
        .await
        .unwrap();

    IconProcessor::new(catalog, plan.requests)
        .process()
        .await
        .unwrap()
}

fn read_back(data: &[u8]) -> ico::IconDir {
    ico::IconDir::read(Cursor::new(data)).unwrap()
}

#[tokio::test]
async fn presets_from_a_png_source() {
    let dir = tempfile::tempdir().unwrap();
    let big = write_source(dir.path(), "big.png", 256, [30, 60, 90, 255]);

    let assembly = assemble(vec![source(big, DeclaredKind::Png), BuildStep::Presets]).await;
    assert!(assembly.diagnostics.is_empty());
    assert_eq!(assembly.container.kind(), ContainerKind::Icon);

    // Header: reserved, icon, five entries
    assert_eq!(&assembly.data[..6], &[0, 0, 1, 0, 5, 0]);

    // 256 is stored as 0 in the last directory record
    let last_record = 6 + 4 * 16;
    assert_eq!(assembly.data[last_record], 0);
    assert_eq!(assembly.data[last_record + 1], 0);

    let icon_dir = read_back(&assembly.data);
    assert_eq!(icon_dir.resource_type(), ico::ResourceType::Icon);

    let widths: Vec<_> = icon_dir.entries().iter().map(|e| e.width()).collect();
    assert_eq!(widths, [16, 24, 32, 48, 256]);
    assert!(icon_dir.entries().iter().all(|e| e.is_png()));

    let image = icon_dir.entries()[0].decode().unwrap();
    assert_eq!(image.width(), 16);
    assert_eq!(&image.rgba_data()[..4], &[30, 60, 90, 255]);
}

#[tokio::test]
async fn unsatisfiable_sizes_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let medium = write_source(dir.path(), "medium.png", 64, [255, 0, 0, 255]);

    let assembly = assemble(vec![
        source(medium, DeclaredKind::Bitmap),
        BuildStep::Size(16),
        BuildStep::Size(128),
    ])
    .await;

    assert_eq!(assembly.diagnostics.len(), 1);
    assert!(matches!(
        &assembly.diagnostics[0],
        Diagnostic::SizeUnsatisfiable(size) if size.get() == 128
    ));

    let icon_dir = read_back(&assembly.data);
    assert_eq!(icon_dir.entries().len(), 1);

    let entry = &icon_dir.entries()[0];
    assert_eq!(entry.width(), 16);
    assert!(!entry.is_png());
    assert_eq!(entry.bits_per_pixel(), 32);

    let image = entry.decode().unwrap();
    assert!(image
        .rgba_data()
        .chunks_exact(4)
        .all(|pixel| pixel == [255, 0, 0, 255]));
}

#[tokio::test]
async fn hotspots_make_a_cursor() {
    let dir = tempfile::tempdir().unwrap();
    let arrow = write_source(dir.path(), "arrow.bmp", 32, [0, 0, 0, 255]);

    let assembly = assemble(vec![
        source(arrow, DeclaredKind::Automatic),
        BuildStep::HotspotX(0.5),
        BuildStep::HotspotY(0.5),
        BuildStep::Size(16),
    ])
    .await;

    assert_eq!(assembly.container.kind(), ContainerKind::Cursor);
    assert_eq!(&assembly.data[..6], &[0, 0, 2, 0, 1, 0]);

    // Planes and bit count carry the hotspot in cursors
    assert_eq!(&assembly.data[10..14], &[8, 0, 8, 0]);

    let icon_dir = read_back(&assembly.data);
    assert_eq!(icon_dir.resource_type(), ico::ResourceType::Cursor);
    assert_eq!(icon_dir.entries()[0].cursor_hotspot(), Some((8, 8)));

    // A non-PNG source declared automatically is stored as a bitmap
    assert_eq!(assembly.container.entries()[0].encoding, EntryEncoding::Bitmap);
}

#[tokio::test]
async fn the_smallest_sufficient_source_wins() {
    let dir = tempfile::tempdir().unwrap();
    let small = write_source(dir.path(), "small.png", 16, [0, 255, 0, 255]);
    let large = write_source(dir.path(), "large.png", 48, [0, 0, 255, 255]);

    let assembly = assemble(vec![
        source(large, DeclaredKind::Automatic),
        source(small, DeclaredKind::Bitmap),
        BuildStep::Size(16),
        BuildStep::Size(32),
    ])
    .await;

    let entries = assembly.container.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].encoding, EntryEncoding::Bitmap);
    assert_eq!(entries[1].encoding, EntryEncoding::Png);

    let icon_dir = read_back(&assembly.data);
    let small_image = icon_dir.entries()[0].decode().unwrap();
    let large_image = icon_dir.entries()[1].decode().unwrap();
    assert_eq!(&small_image.rgba_data()[..4], &[0, 255, 0, 255]);
    assert_eq!(&large_image.rgba_data()[..4], &[0, 0, 255, 255]);
}

#[tokio::test]
async fn assembling_twice_gives_identical_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let big = write_source(dir.path(), "big.png", 100, [10, 20, 30, 128]);
    let steps = || {
        vec![
            source(big.clone(), DeclaredKind::Automatic),
            BuildStep::Presets,
        ]
    };

    let first = assemble(steps()).await;
    let second = assemble(steps()).await;
    assert_eq!(first.data, second.data);

    // 256 cannot be served from a 100x100 source
    assert_eq!(first.container.entries().len(), 4);
}
