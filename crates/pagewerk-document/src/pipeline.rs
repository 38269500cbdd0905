// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Conversion pipeline: decode, [normalize, recognize], synthesize each image,
// assemble, post-process, and hand back an artifact.
//
// Runs sequentially on the calling thread. The first failure aborts the run
// and no partial artifact is produced.

use pagewerk_core::config::ConversionConfig;
use pagewerk_core::error::ConvertError;
use pagewerk_core::types::{InputImage, PipelineState};
use tracing::{debug, info, instrument};

use crate::artifact::Artifact;
use crate::image::decode_batch;
use crate::image::preprocess::normalize;
use crate::ocr::{SkewDetector, TesseractCli, TextRecognizer, extract};
use crate::pdf::{PageSynthesizer, assemble};
use crate::postprocess::StagePlan;

/// Receives every state transition of a run as it happens.
pub trait ConversionObserver {
    fn on_state(&mut self, state: PipelineState);
}

impl<F: FnMut(PipelineState)> ConversionObserver for F {
    fn on_state(&mut self, state: PipelineState) {
        self(state)
    }
}

/// A recognizer paired with the detector used to straighten its input.
struct OcrBackend {
    recognizer: Box<dyn TextRecognizer>,
    skew: Box<dyn SkewDetector>,
}

impl OcrBackend {
    fn tesseract() -> Self {
        let cli = TesseractCli::new();
        Self {
            recognizer: Box::new(cli.clone()),
            skew: Box::new(cli),
        }
    }
}

/// Drives one or more conversions with a fixed configuration.
pub struct Pipeline {
    config: ConversionConfig,
    ocr: Option<OcrBackend>,
    observer: Option<Box<dyn ConversionObserver>>,
}

impl Pipeline {
    /// With OCR enabled and no engine set, the Tesseract CLI is used for both
    /// recognition and orientation detection.
    pub fn new(config: ConversionConfig) -> Self {
        Self {
            config,
            ocr: None,
            observer: None,
        }
    }

    /// Use `recognizer` for OCR and `skew` for orientation detection.
    pub fn with_ocr(
        mut self,
        recognizer: impl TextRecognizer + 'static,
        skew: impl SkewDetector + 'static,
    ) -> Self {
        self.ocr = Some(OcrBackend {
            recognizer: Box::new(recognizer),
            skew: Box::new(skew),
        });
        self
    }

    pub fn with_observer(mut self, observer: impl ConversionObserver + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Convert `inputs`, in order, into one PDF artifact.
    #[instrument(skip_all, fields(inputs = inputs.len(), ocr = self.config.ocr_enabled))]
    pub fn run(&mut self, inputs: &[InputImage]) -> Result<Artifact, ConvertError> {
        self.config.validate()?;
        if inputs.is_empty() {
            return Err(ConvertError::EmptyInput);
        }
        if self.config.ocr_enabled && self.ocr.is_none() {
            self.ocr = Some(OcrBackend::tesseract());
        }

        let config = &self.config;
        let ocr = if config.ocr_enabled { self.ocr.as_ref() } else { None };
        let mut trace = StateTrace::new(self.observer.as_mut());
        trace.enter(PipelineState::Idle);

        // Configuration and engine problems surface before any image work.
        if let Some(backend) = ocr {
            backend.recognizer.ensure_ready(config.language)?;
        }
        let images = decode_batch(inputs)?;

        let synthesizer = PageSynthesizer::new(config.page_size).with_title(&config.title);
        let mut pages = Vec::with_capacity(images.len());

        for (index, image) in images.iter().enumerate() {
            let extracted = match ocr {
                Some(backend) => {
                    trace.enter(PipelineState::Preprocessing { index });
                    let normalized = normalize(image, backend.skew.as_ref());
                    Some(extract(
                        backend.recognizer.as_ref(),
                        &normalized,
                        config.language,
                    )?)
                }
                None => None,
            };

            trace.enter(PipelineState::Synthesizing { index });
            let page = synthesizer.synthesize(image, extracted.as_ref());
            debug!(index, kind = ?page.kind, bytes = page.pdf.len(), "Page synthesized");
            pages.push(page);
        }

        let document = assemble(&pages, &config.title)?;
        drop(pages);
        trace.enter(PipelineState::Assembled);

        let plan = StagePlan::from_config(config);
        let mut document = plan.run(document, |state| trace.enter(state))?;

        let bytes = document.to_bytes()?;
        trace.enter(PipelineState::Ready);

        let artifact = Artifact::new(
            config.output_file_name.clone(),
            bytes,
            document.page_count(),
            document.is_encrypted(),
            trace.into_states(),
        );
        info!(
            id = %artifact.id,
            pages = artifact.page_count,
            encrypted = artifact.encrypted,
            bytes = artifact.bytes.len(),
            sha256 = %artifact.sha256,
            "Conversion complete"
        );
        Ok(artifact)
    }
}

/// Convert with the default engines and no observer.
pub fn convert(inputs: &[InputImage], config: ConversionConfig) -> Result<Artifact, ConvertError> {
    Pipeline::new(config).run(inputs)
}

/// Records states in order and forwards them to the observer.
struct StateTrace<'o> {
    states: Vec<PipelineState>,
    observer: Option<&'o mut Box<dyn ConversionObserver>>,
}

impl<'o> StateTrace<'o> {
    fn new(observer: Option<&'o mut Box<dyn ConversionObserver>>) -> Self {
        Self {
            states: Vec::new(),
            observer,
        }
    }

    fn enter(&mut self, state: PipelineState) {
        debug!(?state, "Pipeline state");
        if let Some(observer) = self.observer.as_mut() {
            observer.on_state(state);
        }
        self.states.push(state);
    }

    fn into_states(self) -> Vec<PipelineState> {
        self.states
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::NoSkewDetection;
    use crate::pdf::PdfInspector;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use pagewerk_core::types::Language;
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::rc::Rc;

    /// Returns canned text per call and counts invocations.
    #[derive(Clone)]
    struct ScriptedOcr {
        outputs: Vec<&'static str>,
        calls: Rc<RefCell<Vec<Language>>>,
        ready: Result<(), &'static str>,
    }

    impl ScriptedOcr {
        fn new(outputs: Vec<&'static str>) -> Self {
            Self {
                outputs,
                calls: Rc::new(RefCell::new(Vec::new())),
                ready: Ok(()),
            }
        }
    }

    impl TextRecognizer for ScriptedOcr {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn ensure_ready(&self, _language: Language) -> Result<(), ConvertError> {
            self.ready.map_err(|msg| ConvertError::Config(msg.to_string()))
        }

        fn recognize(
            &self,
            _image: &DynamicImage,
            language: Language,
        ) -> Result<String, ConvertError> {
            let mut calls = self.calls.borrow_mut();
            let text = self.outputs.get(calls.len()).copied().unwrap_or_default();
            calls.push(language);
            Ok(format!("{text}\n\u{c}"))
        }
    }

    fn png(width: u32, height: u32, shade: u8) -> InputImage {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([shade; 3])));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
        InputImage::new(format!("{width}x{height}.png"), bytes)
    }

    fn recorder() -> (Rc<RefCell<Vec<PipelineState>>>, impl FnMut(PipelineState)) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        (seen, move |state| sink.borrow_mut().push(state))
    }

    #[test]
    fn three_images_become_three_pages_in_order() {
        let ocr = ScriptedOcr::new(vec!["never"]);
        let calls = Rc::clone(&ocr.calls);
        let inputs = vec![png(10, 20, 0), png(30, 15, 80), png(7, 7, 160)];

        let artifact = Pipeline::new(ConversionConfig::default())
            .with_ocr(ocr, NoSkewDetection)
            .run(&inputs)
            .unwrap();

        assert!(calls.borrow().is_empty(), "OCR must not run when disabled");
        assert_eq!(artifact.page_count, 3);
        assert!(!artifact.encrypted);
        assert_eq!(artifact.file_name, "converted.pdf");

        let inspector = PdfInspector::from_bytes(&artifact.bytes).unwrap();
        assert_eq!(inspector.page_image_sizes(1).unwrap(), vec![(10, 20)]);
        assert_eq!(inspector.page_image_sizes(2).unwrap(), vec![(30, 15)]);
        assert_eq!(inspector.page_image_sizes(3).unwrap(), vec![(7, 7)]);

        assert_eq!(
            artifact.states,
            vec![
                PipelineState::Idle,
                PipelineState::Synthesizing { index: 0 },
                PipelineState::Synthesizing { index: 1 },
                PipelineState::Synthesizing { index: 2 },
                PipelineState::Assembled,
                PipelineState::Ready,
            ]
        );
    }

    #[test]
    fn ocr_mode_produces_text_only_pages() {
        let ocr = ScriptedOcr::new(vec!["Quarterly report", ""]);
        let calls = Rc::clone(&ocr.calls);
        let config = ConversionConfig {
            ocr_enabled: true,
            language: Language::Eng,
            ..Default::default()
        };

        let artifact = Pipeline::new(config)
            .with_ocr(ocr, NoSkewDetection)
            .run(&[png(40, 40, 30), png(40, 40, 255)])
            .unwrap();

        assert_eq!(*calls.borrow(), vec![Language::Eng, Language::Eng]);

        let inspector = PdfInspector::from_bytes(&artifact.bytes).unwrap();
        assert_eq!(inspector.page_count(), 2);
        for page in 1..=2 {
            assert!(inspector.page_image_sizes(page).unwrap().is_empty());
        }
        assert!(inspector.page_text(1).unwrap().contains("Quarterly report"));
        assert!(inspector.page_text_runs(2).unwrap().is_empty());

        assert_eq!(
            &artifact.states[..5],
            &[
                PipelineState::Idle,
                PipelineState::Preprocessing { index: 0 },
                PipelineState::Synthesizing { index: 0 },
                PipelineState::Preprocessing { index: 1 },
                PipelineState::Synthesizing { index: 1 },
            ]
        );
    }

    #[test]
    fn watermark_then_encryption_end_to_end() {
        let config = ConversionConfig {
            watermark_text: Some("DRAFT".into()),
            password: Some("pw123".into()),
            ..Default::default()
        };
        let (seen, observer) = recorder();

        let artifact = Pipeline::new(config)
            .with_observer(observer)
            .run(&[png(25, 35, 90)])
            .unwrap();

        assert!(artifact.encrypted);
        assert_eq!(
            &artifact.states[artifact.states.len() - 4..],
            &[
                PipelineState::Assembled,
                PipelineState::Watermarked,
                PipelineState::Encrypted,
                PipelineState::Ready,
            ]
        );
        assert_eq!(*seen.borrow(), artifact.states);

        assert!(PdfInspector::from_bytes_with_password(&artifact.bytes, "nope").is_err());
        let opened = PdfInspector::from_bytes_with_password(&artifact.bytes, "pw123").unwrap();
        assert_eq!(opened.page_count(), 1);
        assert_eq!(opened.page_image_sizes(1).unwrap(), vec![(25, 35)]);
        assert!(opened.page_text(1).unwrap().contains("DRAFT"));
    }

    #[test]
    fn empty_watermark_and_password_skip_both_stages() {
        let config = ConversionConfig {
            watermark_text: Some(String::new()),
            password: Some(String::new()),
            ..Default::default()
        };
        let artifact = Pipeline::new(config).run(&[png(5, 5, 0)]).unwrap();

        assert!(!artifact.encrypted);
        assert!(!artifact.states.contains(&PipelineState::Watermarked));
        assert!(!artifact.states.contains(&PipelineState::Encrypted));
        let inspector = PdfInspector::from_bytes(&artifact.bytes).unwrap();
        assert!(!inspector.is_encrypted());
        assert!(inspector.page_text_runs(1).unwrap().is_empty());
    }

    #[test]
    fn unsupported_input_aborts_before_any_page() {
        let (seen, observer) = recorder();
        let inputs = vec![
            png(4, 4, 0),
            InputImage::new("notes.txt", b"plain text".to_vec()),
        ];

        let result = Pipeline::new(ConversionConfig::default())
            .with_observer(observer)
            .run(&inputs);

        match result {
            Err(ConvertError::UnsupportedFormat { index, name, .. }) => {
                assert_eq!(index, 1);
                assert_eq!(name, "notes.txt");
            }
            other => panic!("expected UnsupportedFormat, got {other:?}"),
        }
        assert_eq!(*seen.borrow(), vec![PipelineState::Idle]);
    }

    #[test]
    fn empty_batch_is_empty_input() {
        let result = Pipeline::new(ConversionConfig::default()).run(&[]);
        assert!(matches!(result, Err(ConvertError::EmptyInput)));
    }

    #[test]
    fn missing_language_pack_fails_before_recognition() {
        let mut ocr = ScriptedOcr::new(vec!["text"]);
        ocr.ready = Err("language pack 'hin' is not installed");
        let calls = Rc::clone(&ocr.calls);
        let config = ConversionConfig {
            ocr_enabled: true,
            language: Language::Hin,
            ..Default::default()
        };

        let result = Pipeline::new(config)
            .with_ocr(ocr, NoSkewDetection)
            .run(&[png(4, 4, 0)]);

        assert!(matches!(result, Err(ConvertError::Config(_))));
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn invalid_output_name_is_rejected_up_front() {
        let config = ConversionConfig {
            output_file_name: "a/b.pdf".into(),
            ..Default::default()
        };
        let result = Pipeline::new(config).run(&[png(4, 4, 0)]);
        assert!(matches!(result, Err(ConvertError::Config(_))));
    }

    #[test]
    fn each_run_returns_its_own_artifact() {
        let mut pipeline = Pipeline::new(ConversionConfig::default());
        let first = pipeline.run(&[png(4, 4, 0)]).unwrap();
        let second = pipeline.run(&[png(6, 6, 0), png(8, 8, 0)]).unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(first.page_count, 1);
        assert_eq!(second.page_count, 2);
    }
}
