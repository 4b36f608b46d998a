//! Language analyser for component contexts without a devfile
//!
//! Scans a context, infers its language and framework, and matches a
//! registry stack providing a devfile and Dockerfile. Matches below
//! [`MIN_CONFIDENCE`] are discarded.

pub mod framework;
pub mod language;
pub mod ports;
pub mod registry;
pub mod structure;


use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::error::DetectionError;

pub use framework::{Framework, FrameworkDetector};
pub use language::{Language, LanguageDetector, LanguageMatch};
pub use registry::{StackCatalog, StackMatch};
pub use structure::{ProjectStructure, StructureAnalyzer};

/// Minimum language confidence for a registry match
pub const MIN_CONFIDENCE: f32 = 0.8;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("failed to scan {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

impl From<AnalyzerError> for DetectionError {
    fn from(err: AnalyzerError) -> Self {
        DetectionError::internal(err.to_string()).with_source(err)
    }
}

/// Registry match for a context
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerMatch {
    pub language: Language,
    pub framework: Option<Framework>,
    pub stack: &'static str,
    pub devfile_url: String,
    pub dockerfile_url: String,
    pub ports: Vec<u16>,
}

/// Main project analyzer
pub struct ProjectAnalyzer {
    language_detector: LanguageDetector,
    framework_detector: FrameworkDetector,
    structure_analyzer: StructureAnalyzer,
    catalog: StackCatalog,
}

impl ProjectAnalyzer {
    pub fn new(registry_url: &str) -> Self {
        Self {
            language_detector: LanguageDetector::new(),
            framework_detector: FrameworkDetector::new(),
            structure_analyzer: StructureAnalyzer::new(),
            catalog: StackCatalog::new(registry_url),
        }
    }

    /// Match a registry stack for the context at `path`
    pub fn analyze(&self, path: &Path) -> Result<Option<AnalyzerMatch>, AnalyzerError> {
        let structure = self.scan(path)?;

        let Some(detected) = self.language_detector.detect(&structure) else {
            tracing::debug!("No language detected in {}", path.display());
            return Ok(None);
        };
        if detected.confidence < MIN_CONFIDENCE {
            tracing::debug!(
                "Language {} in {} below confidence threshold ({:.1})",
                detected.language,
                path.display(),
                detected.confidence
            );
            return Ok(None);
        }

        let framework = self
            .framework_detector
            .detect(&structure, &detected.language);

        let Some(stack) = self.catalog.lookup(&detected.language, framework.as_ref()) else {
            tracing::debug!(
                "No registry stack for {} ({:?})",
                detected.language,
                framework
            );
            return Ok(None);
        };

        tracing::debug!(
            "Matched stack {} for {} ({}{})",
            stack.stack,
            path.display(),
            detected.language,
            framework
                .as_ref()
                .map(|f| format!(", {f}"))
                .unwrap_or_default()
        );

        Ok(Some(AnalyzerMatch {
            language: detected.language,
            framework,
            stack: stack.stack,
            devfile_url: stack.devfile_url,
            dockerfile_url: stack.dockerfile_url,
            ports: ports::detect_ports(&structure),
        }))
    }

    /// Ports declared anywhere in the context at `path`
    pub fn detect_ports(&self, path: &Path) -> Result<Vec<u16>, AnalyzerError> {
        Ok(ports::detect_ports(&self.scan(path)?))
    }

    fn scan(&self, path: &Path) -> Result<ProjectStructure, AnalyzerError> {
        self.structure_analyzer
            .analyze(path)
            .map_err(|source| AnalyzerError::Scan {
                path: path.to_path_buf(),
                source,
            })
    }
}
