//! Component descriptors built from an [`AnalysisOutput`]

use std::collections::BTreeMap;

use super::AnalysisOutput;
use crate::api::cdq::ROOT_CONTEXT;
use crate::api::{ComponentDescriptor, ComponentSource, GitSource};
use crate::devfile::Devfile;
use crate::git::GitHubRepo;

/// Longest component name accepted by the platform
const MAX_NAME_LEN: usize = 63;

/// Build the `componentDetected` map.
///
/// Keys derive from the last context segment, or the repository name for
/// the root; collisions get a numeric suffix.
pub fn build_components(
    output: &AnalysisOutput,
    repo: &GitHubRepo,
) -> BTreeMap<String, ComponentDescriptor> {
    let mut components = BTreeMap::new();

    for context in output.component_contexts() {
        let base = component_name(context, &repo.name);
        let name = unique_name(&base, &components);

        let metadata = output
            .devfiles
            .get(context)
            .and_then(|content| Devfile::parse(content).ok())
            .map(|devfile| devfile.metadata)
            .unwrap_or_default();

        let descriptor = ComponentDescriptor {
            component_name: name.clone(),
            source: ComponentSource {
                git_source: GitSource {
                    url: repo.url.clone(),
                    revision: output.revision.clone(),
                    context: context.to_string(),
                    devfile_url: output.devfile_urls.get(context).cloned(),
                    dockerfile_url: output.dockerfiles.get(context).cloned(),
                },
            },
            devfile_found: output.devfiles.contains_key(context),
            target_port: output
                .ports
                .get(context)
                .and_then(|ports| ports.first().copied())
                .unwrap_or(0),
            language: metadata.language,
            project_type: metadata.project_type,
        };
        components.insert(name, descriptor);
    }

    components
}

/// Slug for a context: its last path segment, or `repo_name` for the root
pub fn component_name(context: &str, repo_name: &str) -> String {
    let segment = if context == ROOT_CONTEXT {
        repo_name
    } else {
        context.rsplit('/').next().unwrap_or(context)
    };
    let slug = slugify(segment);
    if slug.is_empty() {
        "component".to_string()
    } else {
        slug
    }
}

fn slugify(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-');
    slug[..slug.len().min(MAX_NAME_LEN)]
        .trim_end_matches('-')
        .to_string()
}

fn unique_name(base: &str, taken: &BTreeMap<String, ComponentDescriptor>) -> String {
    if !taken.contains_key(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !taken.contains_key(candidate))
        .unwrap_or_else(|| base.to_string())
}
