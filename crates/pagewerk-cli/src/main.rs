// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pagewerk: convert a batch of images into one PDF.
//
// Entry point. Initialises logging, maps flags and an optional JSON settings
// file onto `ConversionConfig`, runs the pipeline and saves the artifact.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use pagewerk_core::human_errors::humanize_error;
use pagewerk_core::{
    ConversionConfig, ConvertError, InputFormat, InputImage, Language, PageSize, PipelineState,
};
use pagewerk_document::{ArtifactSink, ArtifactSummary, DirectorySink, Pipeline};
use serde::Serialize;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Engine {
    /// The `tesseract` command-line tool (all languages, orientation detection).
    Tesseract,
    /// Built-in ocrs engine (Latin-script languages only).
    #[cfg(feature = "ocrs")]
    Ocrs,
}

/// Convert images (jpg, png, bmp, gif, tiff, webp) into a single PDF.
#[derive(Debug, Parser)]
#[command(name = "pagewerk", version, about)]
struct Args {
    /// Input images, in page order.
    #[arg(required = true, value_name = "IMAGE")]
    images: Vec<PathBuf>,

    /// Replace each image with a text page built from OCR output.
    #[arg(long)]
    ocr: bool,

    /// OCR language: eng, spa, fra, deu, chi_sim, ara, hin.
    #[arg(long, value_name = "CODE")]
    lang: Option<String>,

    /// OCR engine.
    #[arg(long, value_enum, default_value_t = Engine::Tesseract)]
    engine: Engine,

    /// Directory holding the ocrs model files.
    #[cfg(feature = "ocrs")]
    #[arg(long, value_name = "DIR")]
    ocrs_models: Option<PathBuf>,

    /// Text stamped on every page.
    #[arg(long, value_name = "TEXT")]
    watermark: Option<String>,

    /// Password protecting the PDF.
    #[arg(long, value_name = "PW", env = "PAGEWERK_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Page size for OCR text pages: a4, letter, legal.
    #[arg(long, value_name = "SIZE")]
    page_size: Option<String>,

    /// Document title stored in the PDF metadata.
    #[arg(long)]
    title: Option<String>,

    /// JSON settings file; flags override its values.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory the PDF is saved into.
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    output: PathBuf,

    /// File name of the PDF.
    #[arg(long, value_name = "FILE")]
    name: Option<String>,

    /// Print a JSON summary on stdout instead of a sentence.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct Report<'a> {
    location: &'a str,
    #[serde(flatten)]
    artifact: ArtifactSummary,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(Failure::Convert(err)) => {
            error!(error = %err, "Conversion failed");
            let human = humanize_error(&err);
            eprintln!("{}\n{}", human.message, human.suggestion);
            ExitCode::FAILURE
        }
        Err(Failure::Delivery(detail)) => {
            error!(%detail, "Saving the PDF failed");
            eprintln!("The PDF was created but couldn't be saved.\n{detail}");
            ExitCode::FAILURE
        }
    }
}

enum Failure {
    Convert(ConvertError),
    Delivery(String),
}

impl From<ConvertError> for Failure {
    fn from(err: ConvertError) -> Self {
        Self::Convert(err)
    }
}

fn run(args: &Args) -> Result<(), Failure> {
    let config = build_config(args)?;
    let inputs = read_inputs(&args.images)?;
    info!(images = inputs.len(), ocr = config.ocr_enabled, "Starting conversion");

    let mut pipeline = pipeline_for(args, config)?
        .with_observer(|state: PipelineState| tracing::debug!(?state, "State changed"));
    let artifact = pipeline.run(&inputs)?;

    let sink = DirectorySink::new(&args.output);
    let delivery = sink
        .deliver(&artifact)
        .map_err(|err| Failure::Delivery(err.to_string()))?;

    if args.json {
        let report = Report {
            location: &delivery.location,
            artifact: artifact.summary(),
        };
        let rendered = serde_json::to_string_pretty(&report).map_err(ConvertError::from)?;
        println!("{rendered}");
    } else {
        println!(
            "Saved {} ({} page{}{}) to {}",
            artifact.file_name,
            artifact.page_count,
            if artifact.page_count == 1 { "" } else { "s" },
            if artifact.encrypted { ", password protected" } else { "" },
            delivery.location
        );
    }
    Ok(())
}

/// Settings file first, then flags on top.
fn build_config(args: &Args) -> Result<ConversionConfig, ConvertError> {
    let mut config = match &args.config {
        Some(path) => ConversionConfig::from_json_file(path)?,
        None => ConversionConfig::default(),
    };

    if args.ocr {
        config.ocr_enabled = true;
    }
    if let Some(code) = &args.lang {
        config.language = code.parse::<Language>()?;
    }
    if let Some(size) = &args.page_size {
        config.page_size = size.parse::<PageSize>()?;
    }
    if let Some(text) = &args.watermark {
        config.watermark_text = Some(text.clone());
    }
    if let Some(password) = &args.password {
        config.password = Some(password.clone());
    }
    if let Some(title) = &args.title {
        config.title = title.clone();
    }
    if let Some(name) = &args.name {
        config.output_file_name = name.clone();
    }

    config.validate()?;
    Ok(config)
}

fn pipeline_for(args: &Args, config: ConversionConfig) -> Result<Pipeline, ConvertError> {
    let pipeline = Pipeline::new(config);
    match args.engine {
        Engine::Tesseract => Ok(pipeline),
        #[cfg(feature = "ocrs")]
        Engine::Ocrs => {
            use pagewerk_document::{NoSkewDetection, OcrsEngine, OcrsModels};
            let models = match &args.ocrs_models {
                Some(dir) => OcrsModels::from_dir(dir),
                None => OcrsModels::default(),
            };
            Ok(pipeline.with_ocr(OcrsEngine::new(models)?, NoSkewDetection))
        }
    }
}

/// Read every input, rejecting unsupported extensions before any file is read.
fn read_inputs(paths: &[PathBuf]) -> Result<Vec<InputImage>, ConvertError> {
    let names: Vec<String> = paths.iter().map(|path| display_name(path)).collect();
    if let Some((index, name)) = names
        .iter()
        .enumerate()
        .find(|(_, name)| InputFormat::from_file_name(name).is_none())
    {
        return Err(ConvertError::UnsupportedFormat {
            index,
            name: name.clone(),
            reason: "file extension is not a supported image type".into(),
        });
    }

    paths
        .iter()
        .zip(names)
        .map(|(path, name)| -> Result<InputImage, ConvertError> {
            Ok(InputImage::new(name, std::fs::read(path)?))
        })
        .collect()
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("pagewerk").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn flags_override_defaults() {
        let args = parse(&[
            "--ocr", "--lang", "deu", "--page-size", "legal", "--watermark", "DRAFT", "--name",
            "scan.pdf", "a.png",
        ]);
        let config = build_config(&args).unwrap();
        assert!(config.ocr_enabled);
        assert_eq!(config.language, Language::Deu);
        assert_eq!(config.page_size, PageSize::Legal);
        assert_eq!(config.watermark(), Some("DRAFT"));
        assert_eq!(config.output_file_name, "scan.pdf");
    }

    #[test]
    fn unknown_language_is_config_error() {
        let args = parse(&["--lang", "xx", "a.png"]);
        assert!(matches!(build_config(&args), Err(ConvertError::Config(_))));
    }

    #[test]
    fn flags_override_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "language": "spa", "watermark_text": "FILE" }"#).unwrap();

        let config_arg = path.to_string_lossy().into_owned();
        let args = parse(&["--config", &config_arg, "--watermark", "FLAG", "a.png"]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.language, Language::Spa);
        assert_eq!(config.watermark(), Some("FLAG"));
    }

    #[test]
    fn unsupported_extension_is_rejected_before_reading() {
        // photo.png does not exist; the extension check must fire first.
        match read_inputs(&[PathBuf::from("photo.png"), PathBuf::from("notes.txt")]) {
            Err(ConvertError::UnsupportedFormat { index, name, .. }) => {
                assert_eq!(index, 1);
                assert_eq!(name, "notes.txt");
            }
            other => panic!("expected UnsupportedFormat, got {other:?}"),
        }
    }

    #[test]
    fn inputs_are_read_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("b.png");
        let second = dir.path().join("a.jpg");
        std::fs::write(&first, b"one").unwrap();
        std::fs::write(&second, b"two").unwrap();

        let inputs = read_inputs(&[first, second]).unwrap();
        assert_eq!(inputs[0], InputImage::new("b.png", b"one".to_vec()));
        assert_eq!(inputs[1], InputImage::new("a.jpg", b"two".to_vec()));
    }
}
