//! Project structure scan for a single component context

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::devfile::locator::{file_within, DOCKERFILE_PATHS};

/// Directories never descended into
const SKIPPED_DIRS: &[&str] = &["node_modules", "target", "dist", "build", "out", "vendor", "venv"];

const MAX_DEPTH: usize = 4;

/// Types of manifest files
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigFileType {
    Build,
    Config,
    Runtime,
    Container,
}

/// Manifest or configuration file found in the scan
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub path: PathBuf,
    pub file_type: ConfigFileType,
    /// Directory depth below the scanned root; 0 for files directly in it
    pub depth: usize,
}

impl ConfigFile {
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }

    pub fn at_root(&self) -> bool {
        self.depth == 0
    }
}

/// Project structure information
#[derive(Debug, Clone, Default)]
pub struct ProjectStructure {
    pub root: PathBuf,
    pub config_files: Vec<ConfigFile>,
    /// Source file count per lowercase extension
    pub extension_counts: HashMap<String, usize>,
    /// Files worth scanning for port declarations
    pub port_sources: Vec<PathBuf>,
}

impl ProjectStructure {
    pub fn build_files(&self) -> impl Iterator<Item = &ConfigFile> {
        self.config_files
            .iter()
            .filter(|f| f.file_type == ConfigFileType::Build)
    }
}

/// Structure analyzer
pub struct StructureAnalyzer {
    config_file_patterns: Vec<(&'static str, ConfigFileType)>,
    port_source_extensions: Vec<&'static str>,
}

impl StructureAnalyzer {
    pub fn new() -> Self {
        let config_file_patterns = vec![
            // Build files
            ("pom.xml", ConfigFileType::Build),
            ("build.gradle", ConfigFileType::Build),
            ("build.gradle.kts", ConfigFileType::Build),
            ("package.json", ConfigFileType::Build),
            ("requirements.txt", ConfigFileType::Build),
            ("setup.py", ConfigFileType::Build),
            ("pyproject.toml", ConfigFileType::Build),
            ("Pipfile", ConfigFileType::Build),
            ("go.mod", ConfigFileType::Build),
            ("Cargo.toml", ConfigFileType::Build),
            ("composer.json", ConfigFileType::Build),
            ("Gemfile", ConfigFileType::Build),
            ("tsconfig.json", ConfigFileType::Config),
            // Runtime configuration
            ("application.properties", ConfigFileType::Runtime),
            ("application.yml", ConfigFileType::Runtime),
            ("application.yaml", ConfigFileType::Runtime),
            (".env", ConfigFileType::Runtime),
            // Container recipes
            ("Dockerfile", ConfigFileType::Container),
            ("Containerfile", ConfigFileType::Container),
        ];

        let port_source_extensions = vec!["js", "mjs", "ts", "py", "go", "java", "cs", "rb", "php"];

        Self {
            config_file_patterns,
            port_source_extensions,
        }
    }

    /// Scan `path` up to a fixed depth, skipping hidden and dependency directories
    pub fn analyze(&self, path: &Path) -> Result<ProjectStructure, walkdir::Error> {
        let mut structure = ProjectStructure {
            root: path.to_path_buf(),
            ..Default::default()
        };

        let walker = WalkDir::new(path)
            .max_depth(MAX_DEPTH)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_skipped(e));

        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            self.classify(&entry, &mut structure);
        }

        // Dockerfiles the locator recognises count even below skipped directories
        for rel in DOCKERFILE_PATHS {
            let dockerfile = path.join(rel);
            if structure.port_sources.contains(&dockerfile) || !file_within(path, path, rel) {
                continue;
            }
            structure.port_sources.push(dockerfile.clone());
            structure.config_files.push(ConfigFile {
                path: dockerfile,
                file_type: ConfigFileType::Container,
                depth: Path::new(rel).components().count() - 1,
            });
        }

        Ok(structure)
    }

    fn classify(&self, entry: &DirEntry, structure: &mut ProjectStructure) {
        let name = entry.file_name().to_string_lossy();
        let depth = entry.depth().saturating_sub(1);

        if let Some((_, file_type)) = self
            .config_file_patterns
            .iter()
            .find(|(pattern, _)| name == *pattern)
        {
            if matches!(file_type, ConfigFileType::Runtime | ConfigFileType::Container) {
                structure.port_sources.push(entry.path().to_path_buf());
            }
            structure.config_files.push(ConfigFile {
                path: entry.path().to_path_buf(),
                file_type: file_type.clone(),
                depth,
            });
            return;
        }

        if name.ends_with(".csproj") {
            structure.config_files.push(ConfigFile {
                path: entry.path().to_path_buf(),
                file_type: ConfigFileType::Build,
                depth,
            });
            return;
        }

        if let Some(ext) = entry.path().extension().and_then(|e| e.to_str()) {
            let ext = ext.to_ascii_lowercase();
            if self.port_source_extensions.contains(&ext.as_str()) {
                structure.port_sources.push(entry.path().to_path_buf());
            }
            *structure.extension_counts.entry(ext).or_insert(0) += 1;
        }
    }
}

fn is_skipped(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    if entry.file_type().is_dir() {
        name.starts_with('.') || SKIPPED_DIRS.contains(&&*name)
    } else {
        false
    }
}

impl Default for StructureAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_scan_records_depth_and_skips_dependencies() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("package.json"), "{}").unwrap();
        fs::create_dir_all(root.join("node_modules/express")).unwrap();
        fs::write(root.join("node_modules/express/package.json"), "{}").unwrap();
        fs::create_dir_all(root.join("server")).unwrap();
        fs::write(root.join("server/pom.xml"), "<project/>").unwrap();
        fs::write(root.join("server/app.js"), "").unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join(".git/config"), "").unwrap();

        let structure = StructureAnalyzer::new().analyze(root).unwrap();
        assert_eq!(structure.config_files.len(), 2);
        assert!(structure
            .config_files
            .iter()
            .any(|f| f.at_root() && f.file_name() == "package.json"));
        assert!(!structure
            .config_files
            .iter()
            .any(|f| f.at_root() && f.file_name() == "pom.xml"));
        assert_eq!(structure.extension_counts.get("js"), Some(&1));
        assert_eq!(structure.port_sources.len(), 1);
    }
}
