//! Container port detection from source and configuration files

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

use super::structure::ProjectStructure;

/// Files larger than this are not scanned
const MAX_SCAN_BYTES: u64 = 256 * 1024;

static EXPOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?mi)^\s*EXPOSE\s+(\d+)").expect("valid EXPOSE regex"));

static SERVER_PORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*server\.port\s*[=:]\s*(\d+)").expect("valid server.port regex")
});

static SERVER_PORT_YAML: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^server:\s*\n(?:[ \t]+.*\n)*?[ \t]+port:\s*(\d+)")
        .expect("valid yaml server port regex")
});

static ENV_PORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bPORT\s*(?:=|:|\|\||\?\?)\s*["']?(\d+)"#).expect("valid PORT regex")
});

static LISTEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\blisten(?:AndServe)?\(\s*["']?(?:[\w.\-]*:)?(\d+)"#)
        .expect("valid listen regex")
});

static RUN_PORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\.run\([^)]*\bport\s*=\s*(\d+)").expect("valid run(port=) regex")
});

/// A port declaration pattern and the files it applies to
struct PortRule {
    pattern: &'static Lazy<Regex>,
    applies: fn(&str) -> bool,
}

fn is_container_file(name: &str) -> bool {
    name == "Dockerfile" || name == "Containerfile"
}

fn is_spring_config(name: &str) -> bool {
    name.starts_with("application.")
}

fn is_env_source(name: &str) -> bool {
    name == ".env" || is_container_file(name) || is_source_file(name)
}

fn is_source_file(name: &str) -> bool {
    !is_container_file(name) && !is_spring_config(name) && name != ".env"
}

/// Rules in priority order
static RULES: &[PortRule] = &[
    PortRule {
        pattern: &EXPOSE,
        applies: is_container_file,
    },
    PortRule {
        pattern: &SERVER_PORT,
        applies: is_spring_config,
    },
    PortRule {
        pattern: &SERVER_PORT_YAML,
        applies: is_spring_config,
    },
    PortRule {
        pattern: &ENV_PORT,
        applies: is_env_source,
    },
    PortRule {
        pattern: &LISTEN,
        applies: is_source_file,
    },
    PortRule {
        pattern: &RUN_PORT,
        applies: is_source_file,
    },
];

/// Distinct valid ports declared in the scanned files, highest priority first
pub fn detect_ports(structure: &ProjectStructure) -> Vec<u16> {
    let mut sources = structure.port_sources.clone();
    sources.sort_by_key(|p| (p.components().count(), p.clone()));

    let files: Vec<(String, String)> = sources
        .iter()
        .filter_map(|path| Some((file_name(path)?, read_small(path)?)))
        .collect();

    let mut ports = Vec::new();
    for rule in RULES {
        for (name, content) in &files {
            if !(rule.applies)(name) {
                continue;
            }
            for captures in rule.pattern.captures_iter(content) {
                if let Some(port) = captures.get(1).and_then(|m| parse_port(m.as_str())) {
                    if !ports.contains(&port) {
                        ports.push(port);
                    }
                }
            }
        }
    }
    ports
}

/// Parse a port in 1..=65535
pub fn parse_port(raw: &str) -> Option<u16> {
    raw.parse::<u16>().ok().filter(|p| *p > 0)
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().to_string())
}

fn read_small(path: &Path) -> Option<String> {
    let metadata = std::fs::metadata(path).ok()?;
    if metadata.len() > MAX_SCAN_BYTES {
        tracing::trace!("Skipping large file {} for port detection", path.display());
        return None;
    }
    std::fs::read_to_string(path).ok()
}
