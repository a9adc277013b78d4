//! # Meme App
//!
//! Headless host for the meme editor. It stands in for the mobile screen:
//! editor commands come from a JSON script, the canvas is rasterized with
//! the `image` crate, and exports land in a directory acting as the photo
//! library.
//!
//! ## Components
//!
//! - `CliArgs` - Command-line arguments parsed with clap
//! - `AppConfig` - Resolved settings for one run
//! - [`script`] - Script format and the runner that replays it
//! - [`render`] - `RasterCapture`, the rendering surface
//! - [`library`] - `DirectoryLibrary`, the photo library

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod library;
pub mod render;
pub mod script;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use meme_core::EditorConfig;

pub use library::DirectoryLibrary;
pub use render::RasterCapture;
pub use script::{RunReport, Script, ScriptError, ScriptRunner, Step};

/// Command-line arguments for meme-app.
#[derive(Debug, Clone, Parser)]
#[command(name = "meme-app")]
#[command(about = "Replay a meme editor script and export the result")]
#[command(version)]
pub struct CliArgs {
    /// Path to the JSON script of editor steps
    pub script: PathBuf,

    /// Editor configuration file (JSON)
    #[arg(long, env = "MEME_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory used as the photo library
    #[arg(long, env = "MEME_OUTPUT_DIR", default_value = "memes")]
    pub output_dir: PathBuf,

    /// Canvas width in pixels
    #[arg(long, default_value = "1080")]
    pub width: u32,

    /// Canvas height in pixels
    #[arg(long, default_value = "1080")]
    pub height: u32,

    /// Canvas background colour
    #[arg(long, default_value = "#FFFFFF")]
    pub background: String,

    /// Export once more after the last step
    #[arg(long)]
    pub export: bool,
}

/// Settings for one run.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Script to replay.
    pub script: PathBuf,
    /// Editor configuration file, defaults when absent.
    pub config_path: Option<PathBuf>,
    /// Photo library root.
    pub output_dir: PathBuf,
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Canvas background colour.
    pub background: String,
    /// Export after the last step.
    pub export_on_finish: bool,
}

impl From<CliArgs> for AppConfig {
    fn from(args: CliArgs) -> Self {
        Self {
            script: args.script,
            config_path: args.config,
            output_dir: args.output_dir,
            width: args.width,
            height: args.height,
            background: args.background,
            export_on_finish: args.export,
        }
    }
}

impl AppConfig {
    /// Load the editor configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or parsed.
    pub fn editor_config(&self) -> anyhow::Result<EditorConfig> {
        match &self.config_path {
            Some(path) => load_editor_config(path),
            None => Ok(EditorConfig::default()),
        }
    }
}

fn load_editor_config(path: &Path) -> anyhow::Result<EditorConfig> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config = EditorConfig::from_json(&json)
        .with_context(|| format!("Invalid config {}", path.display()))?;
    tracing::info!("Loaded editor config from {}", path.display());
    Ok(config)
}

/// Replay the configured script.
///
/// # Errors
///
/// Returns an error if the configuration or script cannot be loaded, the
/// background colour is invalid, or a step refers to an unknown element.
pub async fn run(config: &AppConfig) -> anyhow::Result<RunReport> {
    let editor_config = config.editor_config()?;
    let script = Script::load(&config.script)
        .with_context(|| format!("Failed to load script {}", config.script.display()))?;

    let capture = RasterCapture::new(config.width, config.height, &config.background)?
        .with_elements(editor_config.elements.clone());
    let library = DirectoryLibrary::new(&config.output_dir);
    let mut runner = ScriptRunner::new(editor_config, capture, library);

    runner.run(&script).await?;
    if config.export_on_finish {
        runner.export().await;
    }
    Ok(runner.into_report())
}
