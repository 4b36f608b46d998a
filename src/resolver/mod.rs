//! Component resolution
//!
//! Pure merge of locator and analyser results into an [`AnalysisOutput`],
//! the per-context maps that a detection run produces. Descriptor
//! construction from those maps lives in [`components`].

pub mod components;

use std::collections::BTreeMap;

use crate::analyzer::AnalyzerMatch;
use crate::devfile::{Devfile, LocatedArtifacts};
use crate::git::GitHubRepo;

pub use components::{build_components, component_name};

/// Result of one detection run, keyed by context
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisOutput {
    /// Raw content of devfiles found in the repository
    pub devfiles: BTreeMap<String, String>,
    /// Devfile URL per context: raw repository URL or matched registry stack
    pub devfile_urls: BTreeMap<String, String>,
    /// Dockerfile reference per context: path relative to the context or a URL
    pub dockerfiles: BTreeMap<String, String>,
    /// Candidate ports per context, preferred first
    pub ports: BTreeMap<String, Vec<u16>>,
    /// Effective revision the repository was inspected at
    pub revision: String,
}

impl AnalysisOutput {
    /// Contexts that yield a component
    pub fn component_contexts(&self) -> Vec<&str> {
        let mut contexts: Vec<&str> = self
            .devfiles
            .keys()
            .chain(self.devfile_urls.keys())
            .chain(self.dockerfiles.keys())
            .map(String::as_str)
            .collect();
        contexts.sort_unstable();
        contexts.dedup();
        contexts
    }

    pub fn is_empty(&self) -> bool {
        self.component_contexts().is_empty()
    }
}

/// Everything detection learned about a fetched repository
pub struct ResolverInput<'a> {
    pub repo: &'a GitHubRepo,
    pub revision: &'a str,
    pub located: &'a LocatedArtifacts,
    /// Registry matches for contexts without a usable devfile
    pub matches: &'a BTreeMap<String, AnalyzerMatch>,
    /// Ports found in the source of contexts that were not matched
    pub source_ports: &'a BTreeMap<String, Vec<u16>>,
}

/// Merge locator and analyser results.
///
/// A devfile found in the tree always wins over a matched stack; a located
/// Dockerfile wins over the stack's sample Dockerfile.
pub fn resolve(input: &ResolverInput<'_>) -> AnalysisOutput {
    let mut output = AnalysisOutput {
        revision: input.revision.to_string(),
        ..Default::default()
    };

    let mut contexts: Vec<&String> = input
        .located
        .candidates
        .iter()
        .chain(input.matches.keys())
        .collect();
    contexts.sort_unstable();
    contexts.dedup();

    for context in contexts {
        let located_devfile = input.located.devfiles.get(context);
        let matched = input.matches.get(context);

        if let Some(found) = located_devfile {
            output.devfiles.insert(context.clone(), found.content.clone());
            output.devfile_urls.insert(
                context.clone(),
                input.repo.raw_file_url(input.revision, &found.path),
            );
        } else if let Some(matched) = matched {
            output
                .devfile_urls
                .insert(context.clone(), matched.devfile_url.clone());
        }

        if let Some(dockerfile) = input.located.dockerfiles.get(context) {
            output.dockerfiles.insert(context.clone(), dockerfile.clone());
        } else if let Some(matched) = matched {
            output
                .dockerfiles
                .insert(context.clone(), matched.dockerfile_url.clone());
        }

        let mut ports = matched
            .map(|m| m.ports.clone())
            .or_else(|| input.source_ports.get(context).cloned())
            .unwrap_or_default();
        if ports.is_empty() {
            if let Some(found) = located_devfile {
                ports = found.devfile.endpoint_ports();
            }
        }
        let is_component =
            output.devfile_urls.contains_key(context) || output.dockerfiles.contains_key(context);
        if is_component && !ports.is_empty() {
            output.ports.insert(context.clone(), ports);
        }
    }

    output
}

/// Output for an explicit devfile URL: one component at the starting context
pub fn resolve_override(
    context: &str,
    devfile_url: &str,
    content: String,
    devfile: &Devfile,
    revision: &str,
) -> AnalysisOutput {
    let mut output = AnalysisOutput {
        revision: revision.to_string(),
        ..Default::default()
    };

    if let Some(dockerfile) = devfile.dockerfile_uri() {
        output
            .dockerfiles
            .insert(context.to_string(), dockerfile.to_string());
    }
    let ports = devfile.endpoint_ports();
    if !ports.is_empty() {
        output.ports.insert(context.to_string(), ports);
    }
    output
        .devfile_urls
        .insert(context.to_string(), devfile_url.to_string());
    output.devfiles.insert(context.to_string(), content);
    output
}
