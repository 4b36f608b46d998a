//! Result bridge between the analysis worker and the reconciler
//!
//! A worker publishes its [`AnalysisOutput`] (or a tagged failure) as binary
//! data in a configuration object named after the CDQ. Each map is stored as
//! JSON under a fixed key; the revision is stored as raw bytes.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::error::DetectionError;
use crate::resolver::AnalysisOutput;

pub const DEVFILES_KEY: &str = "devfilesMap";
pub const DEVFILE_URLS_KEY: &str = "devfilesURLMap";
pub const DOCKERFILES_KEY: &str = "dockerfileContextMap";
pub const PORTS_KEY: &str = "componentPortsMap";
pub const REVISION_KEY: &str = "revision";
pub const ERROR_KEY: &str = "errorMap";

/// Binary payload of the configuration object
pub type BinaryData = BTreeMap<String, Vec<u8>>;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("configuration key {key} is not valid JSON: {source}")]
    Decode {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("configuration key {key} could not be encoded: {source}")]
    Encode {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("errorMap must hold exactly one entry, found {0}")]
    MalformedErrorMap(usize),
}

impl From<BridgeError> for DetectionError {
    fn from(err: BridgeError) -> Self {
        DetectionError::internal(err.to_string()).with_source(err)
    }
}

/// What a configuration object currently says about an analysis
#[derive(Debug)]
pub enum WorkerResult {
    /// The worker has not written anything yet
    Pending,
    Succeeded(AnalysisOutput),
    Failed(DetectionError),
}

/// Encode a successful run
pub fn encode_output(output: &AnalysisOutput) -> Result<BinaryData, BridgeError> {
    let mut data = BinaryData::new();
    data.insert(DEVFILES_KEY.to_string(), to_json(DEVFILES_KEY, &output.devfiles)?);
    data.insert(
        DEVFILE_URLS_KEY.to_string(),
        to_json(DEVFILE_URLS_KEY, &output.devfile_urls)?,
    );
    data.insert(
        DOCKERFILES_KEY.to_string(),
        to_json(DOCKERFILES_KEY, &output.dockerfiles)?,
    );
    data.insert(PORTS_KEY.to_string(), to_json(PORTS_KEY, &output.ports)?);
    data.insert(REVISION_KEY.to_string(), output.revision.as_bytes().to_vec());
    Ok(data)
}

/// Encode a failed run as a single-entry `errorMap`
pub fn encode_error(error: &DetectionError) -> Result<BinaryData, BridgeError> {
    let entry = BTreeMap::from([(error.tag().as_str(), error.message())]);
    Ok(BinaryData::from([(
        ERROR_KEY.to_string(),
        to_json(ERROR_KEY, &entry)?,
    )]))
}

/// Decode a configuration object.
///
/// `errorMap` is checked first and short-circuits; unknown keys are ignored.
pub fn decode(data: &BinaryData) -> Result<WorkerResult, BridgeError> {
    if let Some(raw) = data.get(ERROR_KEY) {
        let entries: BTreeMap<String, String> = from_json(ERROR_KEY, raw)?;
        if entries.len() != 1 {
            return Err(BridgeError::MalformedErrorMap(entries.len()));
        }
        if let Some((tag, message)) = entries.into_iter().next() {
            return Ok(WorkerResult::Failed(DetectionError::from_tagged(&tag, message)));
        }
    }

    let known = [DEVFILES_KEY, DEVFILE_URLS_KEY, DOCKERFILES_KEY, PORTS_KEY, REVISION_KEY];
    if !known.iter().any(|key| data.contains_key(*key)) {
        return Ok(WorkerResult::Pending);
    }

    Ok(WorkerResult::Succeeded(AnalysisOutput {
        devfiles: optional_json(data, DEVFILES_KEY)?,
        devfile_urls: optional_json(data, DEVFILE_URLS_KEY)?,
        dockerfiles: optional_json(data, DOCKERFILES_KEY)?,
        ports: optional_json(data, PORTS_KEY)?,
        revision: data
            .get(REVISION_KEY)
            .map(|raw| String::from_utf8_lossy(raw).to_string())
            .unwrap_or_default(),
    }))
}

fn to_json<T: Serialize>(key: &'static str, value: &T) -> Result<Vec<u8>, BridgeError> {
    serde_json::to_vec(value).map_err(|source| BridgeError::Encode { key, source })
}

fn from_json<T: DeserializeOwned>(key: &'static str, raw: &[u8]) -> Result<T, BridgeError> {
    serde_json::from_slice(raw).map_err(|source| BridgeError::Decode { key, source })
}

fn optional_json<T: DeserializeOwned + Default>(
    data: &BinaryData,
    key: &'static str,
) -> Result<T, BridgeError> {
    match data.get(key) {
        Some(raw) if !raw.is_empty() => from_json(key, raw),
        _ => Ok(T::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorTag;

    fn sample_output() -> AnalysisOutput {
        let mut output = AnalysisOutput {
            revision: "main".into(),
            ..Default::default()
        };
        output
            .devfiles
            .insert("nodejs".into(), "schemaVersion: 2.2.0\n".into());
        output
            .devfile_urls
            .insert("nodejs".into(), "https://example.com/devfile.yaml".into());
        output
            .dockerfiles
            .insert("python".into(), "https://example.com/Dockerfile".into());
        output.ports.insert("nodejs".into(), vec![8080, 3000]);
        output
    }

    #[test]
    fn test_output_survives_bridge() {
        let output = sample_output();
        let data = encode_output(&output).unwrap();
        assert_eq!(data[REVISION_KEY], b"main".to_vec());

        match decode(&data).unwrap() {
            WorkerResult::Succeeded(decoded) => assert_eq!(decoded, output),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_wire_format_is_plain_json() {
        let data = encode_output(&sample_output()).unwrap();
        let ports: serde_json::Value = serde_json::from_slice(&data[PORTS_KEY]).unwrap();
        assert_eq!(ports, serde_json::json!({"nodejs": [8080, 3000]}));
    }

    #[test]
    fn test_error_map_short_circuits() {
        let mut data = encode_output(&sample_output()).unwrap();
        let error = DetectionError::authentication_failed();
        data.extend(encode_error(&error).unwrap());

        let raw: serde_json::Value = serde_json::from_slice(&data[ERROR_KEY]).unwrap();
        assert_eq!(raw, serde_json::json!({"AuthenticationFailed": "authentication failed"}));

        match decode(&data).unwrap() {
            WorkerResult::Failed(err) => {
                assert_eq!(err.tag(), ErrorTag::AuthenticationFailed);
                assert_eq!(err.message(), "authentication failed");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_empty_object_is_pending() {
        assert!(matches!(decode(&BinaryData::new()).unwrap(), WorkerResult::Pending));

        let unknown = BinaryData::from([("futureKey".to_string(), b"{}".to_vec())]);
        assert!(matches!(decode(&unknown).unwrap(), WorkerResult::Pending));
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let mut data = encode_output(&sample_output()).unwrap();
        data.insert("futureKey".into(), b"not json".to_vec());
        assert!(matches!(decode(&data).unwrap(), WorkerResult::Succeeded(_)));
    }

    #[test]
    fn test_missing_maps_default_to_empty() {
        let data = BinaryData::from([(REVISION_KEY.to_string(), b"master".to_vec())]);
        match decode(&data).unwrap() {
            WorkerResult::Succeeded(output) => {
                assert!(output.is_empty());
                assert_eq!(output.revision, "master");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_corrupt_map() {
        let data = BinaryData::from([(DEVFILES_KEY.to_string(), b"{".to_vec())]);
        let err = decode(&data).unwrap_err();
        assert!(matches!(err, BridgeError::Decode { key: DEVFILES_KEY, .. }));
    }
}
