//! Language detection for component contexts

use std::collections::HashMap;

use super::structure::ProjectStructure;

/// Confidence from a build manifest at the context root
const ROOT_MANIFEST_CONFIDENCE: f32 = 1.0;
/// Confidence from a manifest further down the tree
const NESTED_MANIFEST_CONFIDENCE: f32 = 0.6;
/// Confidence from file extensions alone
const EXTENSION_CONFIDENCE: f32 = 0.4;

/// Languages the stack catalog knows about
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Language {
    Java,
    JavaScript,
    TypeScript,
    Python,
    Go,
    CSharp,
    Php,
    Ruby,
    Rust,
    Other(String),
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::Java => write!(f, "Java"),
            Language::JavaScript => write!(f, "JavaScript"),
            Language::TypeScript => write!(f, "TypeScript"),
            Language::Python => write!(f, "Python"),
            Language::Go => write!(f, "Go"),
            Language::CSharp => write!(f, "C#"),
            Language::Php => write!(f, "PHP"),
            Language::Ruby => write!(f, "Ruby"),
            Language::Rust => write!(f, "Rust"),
            Language::Other(name) => write!(f, "{name}"),
        }
    }
}

/// A detected language and how sure the detector is
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageMatch {
    pub language: Language,
    pub confidence: f32,
}

/// Language detector
pub struct LanguageDetector {
    build_file_patterns: HashMap<&'static str, Language>,
    extension_patterns: HashMap<&'static str, Language>,
}

impl LanguageDetector {
    pub fn new() -> Self {
        let mut build_file_patterns = HashMap::new();
        build_file_patterns.insert("pom.xml", Language::Java);
        build_file_patterns.insert("build.gradle", Language::Java);
        build_file_patterns.insert("build.gradle.kts", Language::Java);
        build_file_patterns.insert("package.json", Language::JavaScript);
        build_file_patterns.insert("requirements.txt", Language::Python);
        build_file_patterns.insert("setup.py", Language::Python);
        build_file_patterns.insert("pyproject.toml", Language::Python);
        build_file_patterns.insert("Pipfile", Language::Python);
        build_file_patterns.insert("go.mod", Language::Go);
        build_file_patterns.insert("composer.json", Language::Php);
        build_file_patterns.insert("Gemfile", Language::Ruby);
        build_file_patterns.insert("Cargo.toml", Language::Rust);

        let mut extension_patterns = HashMap::new();
        extension_patterns.insert("java", Language::Java);
        extension_patterns.insert("js", Language::JavaScript);
        extension_patterns.insert("mjs", Language::JavaScript);
        extension_patterns.insert("ts", Language::TypeScript);
        extension_patterns.insert("py", Language::Python);
        extension_patterns.insert("go", Language::Go);
        extension_patterns.insert("cs", Language::CSharp);
        extension_patterns.insert("php", Language::Php);
        extension_patterns.insert("rb", Language::Ruby);
        extension_patterns.insert("rs", Language::Rust);

        Self {
            build_file_patterns,
            extension_patterns,
        }
    }

    pub fn detect(&self, structure: &ProjectStructure) -> Option<LanguageMatch> {
        // Priority 1: build manifests, shallowest first
        if let Some(found) = self.detect_from_build_files(structure) {
            return Some(found);
        }

        // Priority 2: file extension frequency
        self.detect_from_extensions(structure)
    }

    fn detect_from_build_files(&self, structure: &ProjectStructure) -> Option<LanguageMatch> {
        let manifest = structure.build_files().min_by_key(|f| f.depth)?;
        let file_name = manifest.file_name();

        let language = if file_name.ends_with(".csproj") {
            Language::CSharp
        } else {
            self.build_file_patterns.get(file_name)?.clone()
        };

        // package.json projects written in TypeScript
        let language = match language {
            Language::JavaScript if structure.config_files.iter().any(|f| f.file_name() == "tsconfig.json") => {
                Language::TypeScript
            }
            other => other,
        };

        let confidence = if manifest.at_root() {
            ROOT_MANIFEST_CONFIDENCE
        } else {
            NESTED_MANIFEST_CONFIDENCE
        };

        Some(LanguageMatch {
            language,
            confidence,
        })
    }

    fn detect_from_extensions(&self, structure: &ProjectStructure) -> Option<LanguageMatch> {
        let (ext, _) = structure
            .extension_counts
            .iter()
            .filter(|(ext, _)| self.extension_patterns.contains_key(ext.as_str()))
            .max_by(|(a_ext, a), (b_ext, b)| a.cmp(b).then_with(|| b_ext.cmp(a_ext)))?;

        Some(LanguageMatch {
            language: self.extension_patterns.get(ext.as_str())?.clone(),
            confidence: EXTENSION_CONFIDENCE,
        })
    }
}

impl Default for LanguageDetector {
    fn default() -> Self {
        Self::new()
    }
}
