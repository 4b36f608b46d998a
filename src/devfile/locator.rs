//! Devfile and Dockerfile discovery beneath a repository root

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

use super::schema::Devfile;
use crate::api::cdq::ROOT_CONTEXT;
use crate::error::DetectionError;

/// Well-known devfile locations, in lookup order
pub const DEVFILE_PATHS: &[&str] = &[
    "devfile.yaml",
    ".devfile.yaml",
    ".devfile/devfile.yaml",
    ".devfile/.devfile.yaml",
];

/// Well-known Dockerfile locations, in lookup order
pub const DOCKERFILE_PATHS: &[&str] = &[
    "Dockerfile",
    "Containerfile",
    "docker/Dockerfile",
    "build/Dockerfile",
    ".docker/Dockerfile",
];

#[derive(Debug, Error)]
pub enum LocatorError {
    #[error("context \"{0}\" does not exist in the repository")]
    ContextNotFound(String),

    #[error("context \"{0}\" resolves outside the repository")]
    ContextOutsideRepository(String),

    #[error("devfile {path} is not valid: {detail}")]
    InvalidDevfile { path: String, detail: String },

    #[error("devfile at context \"{0}\" has no kubernetes or openshift component")]
    MissingOuterloop(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<LocatorError> for DetectionError {
    fn from(err: LocatorError) -> Self {
        match err {
            LocatorError::InvalidDevfile { path, detail } => {
                DetectionError::invalid_devfile(format!("{path}: {detail}"))
            }
            LocatorError::MissingOuterloop(context) => DetectionError::invalid_outerloop(&context),
            other => DetectionError::internal(other.to_string()).with_source(other),
        }
    }
}

/// A devfile found in the tree
#[derive(Debug, Clone)]
pub struct LocatedDevfile {
    /// Path relative to the repository root, `/`-separated
    pub path: String,
    pub content: String,
    pub devfile: Devfile,
}

/// Artifacts found beneath a starting context
#[derive(Debug, Clone, Default)]
pub struct LocatedArtifacts {
    /// Contexts inspected, in order; each is a component candidate
    pub candidates: Vec<String>,
    /// Devfiles with an outerloop definition, by context
    pub devfiles: BTreeMap<String, LocatedDevfile>,
    /// Dockerfile reference relative to its context, by context
    pub dockerfiles: BTreeMap<String, String>,
    /// The starting context itself held an artifact
    pub single_component: bool,
}

/// Locate artifacts starting at `context` (already normalised) under `root`.
///
/// If the starting context itself holds a devfile or Dockerfile the
/// repository is a single component there. Otherwise each direct,
/// non-hidden child directory is a candidate.
pub fn locate(root: &Path, context: &str) -> Result<LocatedArtifacts, LocatorError> {
    validate_context(context)?;
    let start = context_dir(root, context);
    if !start.is_dir() {
        return Err(LocatorError::ContextNotFound(context.to_string()));
    }
    if !resolves_within(root, &start) {
        return Err(LocatorError::ContextOutsideRepository(context.to_string()));
    }

    let mut located = LocatedArtifacts::default();

    if has_any(root, &start, DEVFILE_PATHS) || has_any(root, &start, DOCKERFILE_PATHS) {
        tracing::debug!("Context {} holds a component artifact", context);
        located.single_component = true;
        inspect_context(root, context, &mut located)?;
        return Ok(located);
    }

    for child in child_contexts(&start, context)? {
        inspect_context(root, &child, &mut located)?;
    }

    Ok(located)
}

/// Absolute directory for a normalised context
pub fn context_dir(root: &Path, context: &str) -> PathBuf {
    if context == ROOT_CONTEXT {
        root.to_path_buf()
    } else {
        root.join(context)
    }
}

/// Reject contexts that name a parent directory or an absolute path
pub fn validate_context(context: &str) -> Result<(), LocatorError> {
    let escapes = Path::new(context).components().any(|component| {
        matches!(
            component,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes {
        return Err(LocatorError::ContextOutsideRepository(context.to_string()));
    }
    Ok(())
}

/// Whether `path` exists and, with symlinks resolved, stays beneath `root`
pub fn resolves_within(root: &Path, path: &Path) -> bool {
    match (root.canonicalize(), path.canonicalize()) {
        (Ok(root), Ok(path)) => path.starts_with(root),
        _ => false,
    }
}

/// A regular file under `dir` that does not lead out of the repository
pub fn file_within(root: &Path, dir: &Path, rel: &str) -> bool {
    let path = dir.join(rel);
    path.is_file() && resolves_within(root, &path)
}

fn has_any(root: &Path, dir: &Path, candidates: &[&str]) -> bool {
    candidates.iter().any(|rel| file_within(root, dir, rel))
}

fn child_contexts(start: &Path, context: &str) -> Result<Vec<String>, LocatorError> {
    let entries = std::fs::read_dir(start).map_err(|source| LocatorError::Io {
        path: context.to_string(),
        source,
    })?;

    let mut children = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        // Symlinked directories are not followed
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if name.starts_with('.') || !is_dir {
            continue;
        }
        children.push(join_context(context, &name));
    }
    children.sort();
    Ok(children)
}

/// Join a child directory name onto a normalised context
pub fn join_context(context: &str, name: &str) -> String {
    if context == ROOT_CONTEXT {
        name.to_string()
    } else {
        format!("{context}/{name}")
    }
}

fn inspect_context(
    root: &Path,
    context: &str,
    located: &mut LocatedArtifacts,
) -> Result<(), LocatorError> {
    let dir = context_dir(root, context);
    located.candidates.push(context.to_string());

    let dockerfile = DOCKERFILE_PATHS
        .iter()
        .find(|rel| file_within(root, &dir, rel))
        .map(|rel| rel.to_string());

    if let Some(found) = read_devfile(root, context)? {
        if found.devfile.has_outerloop() {
            let declared = found.devfile.dockerfile_uri().map(str::to_string);
            if let Some(reference) = declared.or_else(|| dockerfile.clone()) {
                located.dockerfiles.insert(context.to_string(), reference);
            }
            located.devfiles.insert(context.to_string(), found);
            return Ok(());
        }
        if dockerfile.is_none() {
            return Err(LocatorError::MissingOuterloop(context.to_string()));
        }
        tracing::debug!(
            "Devfile {} has no outerloop; using sibling Dockerfile",
            found.path
        );
    }

    if let Some(reference) = dockerfile {
        located.dockerfiles.insert(context.to_string(), reference);
    }
    Ok(())
}

fn read_devfile(root: &Path, context: &str) -> Result<Option<LocatedDevfile>, LocatorError> {
    let dir = context_dir(root, context);
    let Some(rel) = DEVFILE_PATHS.iter().find(|rel| file_within(root, &dir, rel)) else {
        return Ok(None);
    };

    let path = if context == ROOT_CONTEXT {
        rel.to_string()
    } else {
        format!("{context}/{rel}")
    };
    let bytes = std::fs::read(dir.join(rel)).map_err(|source| LocatorError::Io {
        path: path.clone(),
        source,
    })?;
    let content = String::from_utf8(bytes).map_err(|e| LocatorError::InvalidDevfile {
        path: path.clone(),
        detail: e.to_string(),
    })?;
    let devfile = Devfile::parse(&content).map_err(|e| LocatorError::InvalidDevfile {
        path: path.clone(),
        detail: e.to_string(),
    })?;

    Ok(Some(LocatedDevfile {
        path,
        content,
        devfile,
    }))
}
