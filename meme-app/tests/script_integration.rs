//! Script Integration Tests
//!
//! Replays scripts end to end against the raster capture and a temporary
//! directory library.

use std::path::Path;

use meme_app::{AppConfig, DirectoryLibrary, RasterCapture, Script, ScriptError, ScriptRunner};
use meme_core::{EditorConfig, ExportError, ExportOutcome};

fn runner(dir: &Path) -> ScriptRunner<RasterCapture, DirectoryLibrary> {
    let capture = RasterCapture::new(64, 64, "#FFFFFF").expect("valid colour");
    ScriptRunner::new(EditorConfig::default(), capture, DirectoryLibrary::new(dir))
}

fn script(json: &str) -> Script {
    Script::from_json(json).expect("script should parse")
}

// ============================================================================
// Editing Flow
// ============================================================================

#[tokio::test]
async fn test_duplicate_then_undo() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let mut runner = runner(dir.path());

    runner
        .run(&script(
            r#"{ "steps": [
                { "op": "add_text", "id": "1", "text": "A", "x": 50, "y": 50 },
                { "op": "select_text", "id": "1" },
                { "op": "duplicate_selected" }
            ] }"#,
        ))
        .await
        .expect("should run");

    let texts = runner.editor().text_elements();
    assert_eq!(texts.len(), 2);
    assert_eq!((texts[1].x, texts[1].y), (Some(70.0), Some(70.0)));
    assert_eq!(runner.editor().selection().selected_text_id(), Some(&texts[1].id));

    runner
        .run(&script(r#"{ "steps": [ { "op": "undo" } ] }"#))
        .await
        .expect("should run");
    assert_eq!(runner.editor().text_elements().len(), 1);
    assert!(runner.editor().selection().is_empty());
}

#[tokio::test]
async fn test_move_is_single_undo_step() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let mut runner = runner(dir.path());

    runner
        .run(&script(
            r#"{ "steps": [
                { "op": "add_text", "id": "t", "text": "A", "x": 0, "y": 0 },
                { "op": "wait", "ms": 2000 },
                { "op": "move", "target": { "layer": "text", "id": "t" }, "dx": 30, "dy": 40, "frames": 20 },
                { "op": "undo" },
                { "op": "undo" }
            ] }"#,
        ))
        .await
        .expect("should run");

    let text = &runner.editor().text_elements()[0];
    assert_eq!((text.x, text.y), (Some(0.0), Some(0.0)));
}

#[tokio::test]
async fn test_unknown_element_stops_run() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let mut runner = runner(dir.path());

    let result = runner
        .run(&script(
            r#"{ "steps": [
                { "op": "add_text", "id": "t", "text": "A" },
                { "op": "opacity_image", "id": "ghost", "opacity": 0.5 }
            ] }"#,
        ))
        .await;

    assert!(result.is_err());
    assert_eq!(runner.editor().text_elements().len(), 1);
}

#[tokio::test]
async fn test_duplicate_id_stops_run() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let mut runner = runner(dir.path());

    let result = runner
        .run(&script(
            r#"{ "steps": [
                { "op": "add_text", "id": "t", "text": "A" },
                { "op": "add_text", "id": "t", "text": "B" }
            ] }"#,
        ))
        .await;

    assert!(matches!(
        result,
        Err(ScriptError::DuplicateElement { step: 1, ref id }) if id == "t"
    ));
    let texts = runner.editor().text_elements();
    assert_eq!(texts.len(), 1);
    assert_eq!(texts[0].text, "A");
    assert_eq!(runner.editor().history().undo_len(), 1);
}

// ============================================================================
// Export Flow
// ============================================================================

#[tokio::test]
async fn test_export_writes_png_and_restores_selection() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let mut runner = runner(dir.path());

    runner
        .run(&script(
            r#"{ "steps": [
                { "op": "add_image", "id": "i", "uri": "cat.png", "width": 160, "height": 160, "x": 8, "y": 8 },
                { "op": "select_image", "id": "i" },
                { "op": "zoom_in" },
                { "op": "export" }
            ] }"#,
        ))
        .await
        .expect("should run");

    assert_eq!(runner.editor().selection().selected_image_id(), Some(&"i".into()));

    let report = runner.into_report();
    assert_eq!(report.steps, 4);
    let ExportOutcome::Saved(asset) = &report.exports[0] else {
        panic!("export should succeed: {:?}", report.exports[0]);
    };
    let bytes = std::fs::read(&asset.id).expect("exported file should exist");
    assert_eq!(&bytes[..4], &[0x89, b'P', b'N', b'G']);
    assert!(Path::new(&asset.id).starts_with(dir.path().join("MemeGene")));
}

#[tokio::test]
async fn test_export_denied_when_library_unavailable() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let blocker = dir.path().join("file");
    std::fs::write(&blocker, b"x").expect("should write");
    let mut runner = runner(&blocker.join("photos"));

    runner
        .run(&script(
            r#"{ "steps": [
                { "op": "add_text", "id": "t", "text": "A" },
                { "op": "select_text", "id": "t" },
                { "op": "export" }
            ] }"#,
        ))
        .await
        .expect("should run");

    assert!(runner.editor().selection().selected_text_id().is_some());
    let report = runner.into_report();
    assert_eq!(
        report.exports,
        vec![ExportOutcome::Failed(ExportError::PermissionDenied)]
    );
}

#[tokio::test]
async fn test_run_from_files() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let script_path = dir.path().join("script.json");
    std::fs::write(
        &script_path,
        r#"{ "steps": [ { "op": "add_text", "text": "hello" }, { "op": "wait", "ms": 6000 } ] }"#,
    )
    .expect("should write script");
    let config_path = dir.path().join("config.json");
    std::fs::write(&config_path, r#"{ "history": { "max_entries": 3 } }"#)
        .expect("should write config");

    let config = AppConfig {
        script: script_path,
        config_path: Some(config_path),
        output_dir: dir.path().join("library"),
        width: 32,
        height: 32,
        background: "black".into(),
        export_on_finish: true,
    };
    let report = meme_app::run(&config).await.expect("should run");

    assert_eq!(report.steps, 2);
    assert_eq!(report.elements.text_elements.len(), 1);
    // add_text recorded the empty canvas; the idle save recorded the text.
    assert_eq!(report.undo_depth, 2);
    assert!(report.exports[0].is_saved());
}

#[tokio::test]
async fn test_run_rejects_inverted_zoom_bounds() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let script_path = dir.path().join("script.json");
    std::fs::write(&script_path, r#"{ "steps": [ { "op": "zoom_in" } ] }"#)
        .expect("should write script");
    let config_path = dir.path().join("config.json");
    std::fs::write(
        &config_path,
        r#"{ "transform": { "min_scale": 4.0, "max_scale": 0.5 } }"#,
    )
    .expect("should write config");

    let config = AppConfig {
        script: script_path,
        config_path: Some(config_path),
        output_dir: dir.path().join("library"),
        width: 8,
        height: 8,
        background: "white".into(),
        export_on_finish: false,
    };
    let err = meme_app::run(&config).await.expect_err("should reject config");
    assert!(format!("{err:#}").contains("min_scale"));
}
