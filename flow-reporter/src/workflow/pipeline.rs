//! Flow Pipeline
//!
//! Runs load → normalize → summarize → compose → render once, front to back.
//! A summarizer failure aborts before anything is written; an image failure
//! is recorded and the report is still produced.

use crate::cache::ResponseCache;
use crate::capability::{ImageGenerator, TextGenerator};
use crate::codegen::{ReportDocument, ReportRenderer};
use crate::flow::{digest, FlowDocument};
use crate::normalize::{normalize_with_warnings, StepDecodeWarning};
use crate::synthesis::{FlowContext, FlowSummary, ImageComposer, NarrativeSummarizer};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default location of the response cache
pub fn default_cache_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".flow_reporter").join("cache"))
        .unwrap_or_else(|| PathBuf::from(".flow_reporter/cache"))
}

/// Pipeline configuration, passed in explicitly
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Global cache switch
    pub cache_enabled: bool,
    /// Cache root directory
    pub cache_dir: PathBuf,
    /// Directory receiving the report and the image
    pub output_dir: PathBuf,
    /// Report file name
    pub report_file: String,
    /// Image file name without extension
    pub image_stem: String,
    /// Do not generate an image at all
    pub skip_image: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_dir: default_cache_dir(),
            output_dir: PathBuf::from("."),
            report_file: "flow_summary.md".to_string(),
            image_stem: "social_image".to_string(),
            skip_image: false,
        }
    }
}

/// What a run produced
#[derive(Debug)]
pub struct RunOutcome {
    pub summary: FlowSummary,
    /// Written report
    pub report_path: PathBuf,
    /// Written image, if the image step succeeded
    pub image_path: Option<PathBuf>,
    /// Why there is no image, if the image step was attempted and failed
    pub image_error: Option<crate::Error>,
    /// Steps that were recovered with a fallback description
    pub warnings: Vec<StepDecodeWarning>,
}

impl RunOutcome {
    /// Whether both artifacts were produced (or the image was skipped)
    pub fn is_complete(&self) -> bool {
        self.image_error.is_none()
    }
}

/// Linear flow-to-report pipeline
pub struct FlowPipeline {
    config: PipelineConfig,
    text: Box<dyn TextGenerator>,
    image: Box<dyn ImageGenerator>,
}

impl FlowPipeline {
    /// Create a pipeline with injected capabilities
    pub fn new(
        config: PipelineConfig,
        text: Box<dyn TextGenerator>,
        image: Box<dyn ImageGenerator>,
    ) -> Self {
        Self {
            config,
            text,
            image,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process the flow at `input` and write the report (and image).
    pub fn run(&self, input: &Path) -> crate::Result<RunOutcome> {
        let flow = FlowDocument::load(input)?;
        info!(input = %input.display(), steps = flow.len(), "Processing flow");

        let (steps, warnings) = normalize_with_warnings(&flow.steps);
        for w in &warnings {
            warn!(index = w.index, reason = %w.reason, "Step decode warning");
        }

        let cache = ResponseCache::new(&self.config.cache_dir, self.config.cache_enabled);
        let summarizer = NarrativeSummarizer::new(cache.clone())
            .with_context(FlowContext::from_meta(&flow.meta));
        let summary = summarizer.summarize(&steps, self.text.as_ref())?;

        std::fs::create_dir_all(&self.config.output_dir)?;

        let (image_path, image_error) = if self.config.skip_image {
            debug!("Image generation skipped");
            (None, None)
        } else {
            match self.produce_image(&cache, &summary) {
                Ok(path) => (Some(path), None),
                Err(e) => {
                    warn!(error = %e, "Social image not produced, writing report without it");
                    (None, Some(e))
                }
            }
        };

        // Both artifacts share a directory, so the file name is the relative reference
        let image_ref = image_path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|name| name.to_string_lossy().into_owned());
        let chapters = digest::chapters(&flow);
        let document = ReportDocument {
            summary: &summary,
            image_path: image_ref.as_deref(),
            meta: Some(&flow.meta),
            chapters: &chapters,
        };
        let markdown = ReportRenderer::new().build(&document);

        let report_path = self.config.output_dir.join(&self.config.report_file);
        write_atomic(&report_path, markdown.as_bytes())?;
        info!(path = %report_path.display(), "Report written");

        Ok(RunOutcome {
            summary,
            report_path,
            image_path,
            image_error,
            warnings,
        })
    }

    fn produce_image(&self, cache: &ResponseCache, summary: &FlowSummary) -> crate::Result<PathBuf> {
        let image = ImageComposer::new(cache.clone()).compose(summary, self.image.as_ref())?;
        let path = self
            .config
            .output_dir
            .join(image.file_name(&self.config.image_stem));
        write_atomic(&path, &image.bytes)?;
        info!(path = %path.display(), "Social image written");
        Ok(path)
    }
}

/// Write via a temporary sibling and rename, so `path` is never half written
pub fn write_atomic(path: &Path, contents: &[u8]) -> crate::Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| crate::Error::Config(format!("not a file path: {}", path.display())))?;
    let tmp_path = path.with_file_name(format!(".{}.tmp", file_name));

    std::fs::write(&tmp_path, contents)?;
    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthesis::{ImageFormat, SocialImage};
    use crate::{Capability, Error};
    use tempfile::TempDir;

    struct FixedText;

    impl TextGenerator for FixedText {
        fn model_id(&self) -> &str {
            "fixed-text"
        }

        fn generate(&self, _prompt: &str) -> crate::Result<String> {
            Ok(r#"{"title": "Shoe run", "narrative": "Shopping.", "steps": []}"#.to_string())
        }
    }

    struct FixedImage {
        fail: bool,
    }

    impl ImageGenerator for FixedImage {
        fn model_id(&self) -> &str {
            "fixed-image"
        }

        fn generate_image(&self, _prompt: &str) -> crate::Result<SocialImage> {
            if self.fail {
                return Err(Error::external(Capability::ImageGeneration, "quota exceeded"));
            }
            Ok(SocialImage {
                bytes: vec![0x89, b'P', b'N', b'G'],
                format: ImageFormat::Png,
            })
        }
    }

    fn setup(temp_dir: &TempDir, fail_image: bool, skip_image: bool) -> (FlowPipeline, PathBuf) {
        let input = temp_dir.path().join("flow.json");
        std::fs::write(
            &input,
            r#"{"name": "Shoe shop", "steps": [
                {"type": "CHAPTER", "title": "Intro", "metadata": {}},
                {"type": "IMAGE", "metadata": {"query": "blue shoes"}}
            ]}"#,
        )
        .unwrap();

        let config = PipelineConfig {
            cache_enabled: false,
            cache_dir: temp_dir.path().join("cache"),
            output_dir: temp_dir.path().join("out"),
            skip_image,
            ..PipelineConfig::default()
        };
        let pipeline = FlowPipeline::new(config, Box::new(FixedText), Box::new(FixedImage { fail: fail_image }));
        (pipeline, input)
    }

    #[test]
    fn test_run_writes_report_and_image() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let (pipeline, input) = setup(&temp_dir, false, false);

        let outcome = pipeline.run(&input).unwrap();
        assert!(outcome.is_complete());

        let image_path = outcome.image_path.clone().unwrap();
        assert_eq!(image_path, temp_dir.path().join("out").join("social_image.png"));
        assert_eq!(std::fs::read(&image_path).unwrap(), vec![0x89, b'P', b'N', b'G']);

        let report = std::fs::read_to_string(&outcome.report_path).unwrap();
        assert!(report.starts_with("# Shoe run\n"));
        assert!(report.contains("![Shoe run](social_image.png)"));
        assert!(report.contains("1. Started the \"Intro\" chapter\n2. Searched for blue shoes\n"));
        assert!(report.contains("- **Intro**"));
        assert!(report.contains("- **Name:** Shoe shop"));
    }

    #[test]
    fn test_image_failure_still_writes_report() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let (pipeline, input) = setup(&temp_dir, true, false);

        let outcome = pipeline.run(&input).unwrap();
        assert!(!outcome.is_complete());
        assert!(outcome.image_path.is_none());
        assert!(outcome.image_error.as_ref().unwrap().is_external_call());

        let report = std::fs::read_to_string(&outcome.report_path).unwrap();
        assert!(!report.contains("!["));
    }

    #[test]
    fn test_skip_image() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let (pipeline, input) = setup(&temp_dir, true, true);

        let outcome = pipeline.run(&input).unwrap();
        assert!(outcome.is_complete());
        assert!(outcome.image_path.is_none());
    }

    #[test]
    fn test_unreadable_input_writes_nothing() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let (pipeline, _) = setup(&temp_dir, false, false);

        let err = pipeline.run(&temp_dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, Error::Input(_)));
        assert!(!temp_dir.path().join("out").exists());
    }

    #[test]
    fn test_write_atomic_replaces_and_cleans_up() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("report.md");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 1);
    }
}
