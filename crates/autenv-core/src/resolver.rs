//! Per-parameter value resolution.
//!
//! Pure with respect to remote ALM state: resolution reads the build
//! environment and, for `External` parameters, a JSON document through the
//! [`SourceReader`] seam, but never calls the ALM API.

use autenv_schema::{BuildEnv, ParameterDescriptor, ParameterKind};
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// A scoped, per-parameter resolution failure. The batch continues; the
/// parameter is skipped and the reason reported.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("JSON source document '{path}' is not readable: {source}")]
    DocumentUnreadable { path: PathBuf, source: io::Error },
    #[error("JSON source document '{path}' is malformed: {reason}")]
    DocumentMalformed { path: PathBuf, reason: String },
    #[error("no JSON source document configured for external parameter '{name}'")]
    NoDocument { name: String },
    #[error("key '{name}' not found in the JSON source document")]
    KeyNotFound { name: String },
}

/// Filesystem seam for reading the external JSON source. The workflow may
/// run on a build agent whose files are not local to this process.
pub trait SourceReader: Send + Sync {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// Reads from the local filesystem.
pub struct LocalReader;

impl SourceReader for LocalReader {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}

/// The external parameter document, read and parsed at most once per run.
#[derive(Debug)]
pub struct JsonSource {
    fields: serde_json::Map<String, Value>,
}

impl JsonSource {
    pub fn load(path: &Path, reader: &dyn SourceReader) -> Result<Self, ResolveError> {
        let bytes = reader
            .read(path)
            .map_err(|source| ResolveError::DocumentUnreadable {
                path: path.to_path_buf(),
                source,
            })?;
        let value: Value =
            serde_json::from_slice(&bytes).map_err(|e| ResolveError::DocumentMalformed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(ResolveError::DocumentMalformed {
                path: path.to_path_buf(),
                reason: format!("expected a top-level object, got {}", kind_name(&other)),
            }),
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// String form of a scalar JSON value; strings lose their quotes.
fn scalar_repr(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Resolve one parameter descriptor to its final value.
///
/// `UserDefined` and `Environment` never fail: unresolved macros stay
/// literal and a missing environment variable yields an empty string.
/// `External` fails scoped when the document or the key is absent.
pub fn resolve(
    descriptor: &ParameterDescriptor,
    build_env: &BuildEnv,
    json_source: Option<&JsonSource>,
) -> Result<String, ResolveError> {
    match descriptor.kind {
        ParameterKind::UserDefined => Ok(build_env.expand(&descriptor.raw_value)),
        ParameterKind::Environment => Ok(build_env
            .get(&descriptor.raw_value)
            .unwrap_or_default()
            .to_owned()),
        ParameterKind::External => {
            let source = json_source.ok_or_else(|| ResolveError::NoDocument {
                name: descriptor.name.clone(),
            })?;
            let value = source
                .field(&descriptor.name)
                .ok_or_else(|| ResolveError::KeyNotFound {
                    name: descriptor.name.clone(),
                })?;
            Ok(match value {
                Value::Array(items) => {
                    if descriptor.first_value_only {
                        items.first().map(scalar_repr).unwrap_or_default()
                    } else {
                        items
                            .iter()
                            .map(scalar_repr)
                            .collect::<Vec<_>>()
                            .join(", ")
                    }
                }
                other => scalar_repr(other),
            })
        }
        ParameterKind::Undefined => {
            warn!(
                "parameter '{}' has an unknown kind; resolving to empty",
                descriptor.name
            );
            Ok(String::new())
        }
    }
}
