use std::collections::HashMap;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error("no input on stdin")]
    EmptyInput,
    #[error("failed to read run request: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse run request JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to parse run request TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("failed to write CSV output: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to deserialize input section: {0}")]
    Input(serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EnvironmentError>;

/// A single run request: the scenario input, the files the model may read,
/// and where its outputs go.
pub struct Environment<I = ()> {
    input_json: serde_json::Map<String, Value>,
    pub input: Option<I>,
    /// Protocol fields, split out of `input` so they never reach the typed
    /// input or the fingerprint. Deterministic models ignore them.
    pub seed: u64,
    pub replicate: u64,
    /// `model.files` entries. Models that read no files leave this unused.
    pub files: HashMap<String, PathBuf>,
    output: Value,
}

impl Environment {
    pub fn from_json(data: Value) -> Self {
        let mut input_json = data
            .get("input")
            .and_then(|v| v.as_object())
            .cloned()
            .unwrap_or_default();

        let seed = input_json
            .remove("seed")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);

        let replicate = input_json
            .remove("replicate")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);

        let files = data
            .get("model")
            .and_then(|m| m.get("files"))
            .and_then(|f| f.as_object())
            .map(|obj| {
                obj.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), PathBuf::from(s))))
                    .collect()
            })
            .unwrap_or_default();

        let output = data.get("output").cloned().unwrap_or(Value::Null);

        Self {
            input_json,
            input: None,
            seed,
            replicate,
            files,
            output,
        }
    }

    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut raw = String::new();
        reader.read_to_string(&mut raw)?;
        if raw.trim().is_empty() {
            return Err(EnvironmentError::EmptyInput);
        }
        let data: Value = serde_json::from_str(&raw)?;
        Ok(Self::from_json(data))
    }

    pub fn from_stdin() -> Result<Self> {
        Self::from_reader(io::stdin().lock())
    }

    /// Parses a run request written as TOML. The table layout is the same as
    /// the JSON form (`[input]`, `[model.files]`, `[output]`).
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let table: toml::Value = toml::from_str(raw)?;
        let data = serde_json::to_value(table)?;
        Ok(Self::from_json(data))
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn with_input_type<I: DeserializeOwned>(self) -> Result<Environment<I>> {
        let input_value = Value::Object(self.input_json.clone());
        let input = serde_json::from_value(input_value).map_err(EnvironmentError::Input)?;
        Ok(Environment {
            input_json: self.input_json,
            input: Some(input),
            seed: self.seed,
            replicate: self.replicate,
            files: self.files,
            output: self.output,
        })
    }
}

impl<I: DeserializeOwned> Environment<I> {
    pub fn load() -> Result<Self> {
        Environment::from_stdin()?.with_input_type::<I>()
    }
}

impl<I> Environment<I> {
    pub fn input_json(&self) -> &serde_json::Map<String, Value> {
        &self.input_json
    }

    /// SHA-256 of the input section. `serde_json::Map` keeps keys sorted, so
    /// two requests with the same input produce the same digest regardless of
    /// key order.
    pub fn fingerprint(&self) -> String {
        let canonical = Value::Object(self.input_json.clone()).to_string();
        hex::encode(Sha256::digest(canonical.as_bytes()))
    }

    pub fn output_dir(&self) -> Option<PathBuf> {
        let output = &self.output;

        // Check flat output
        if output.get("spec").and_then(|v| v.as_str()) == Some("filesystem") {
            if let Some(dir) = output.get("dir").and_then(|v| v.as_str()) {
                return Some(PathBuf::from(dir));
            }
            return None;
        }

        // Profiled output resolves through the default profile
        if let Some(profiles) = output.get("profile").and_then(|v| v.as_object()) {
            let selected = profiles
                .get("default")
                .or_else(|| profiles.values().next());
            if let Some(profile) = selected
                && profile.get("spec").and_then(|v| v.as_str()) == Some("filesystem")
                && let Some(dir) = profile.get("dir").and_then(|v| v.as_str())
            {
                return Some(PathBuf::from(dir));
            }
        }

        None
    }

    pub fn write(&self, filename: &str, data: &[u8]) -> Result<()> {
        if let Some(dir) = self.output_dir() {
            fs::create_dir_all(&dir)?;
            fs::write(dir.join(filename), data)?;
            debug!(file = filename, bytes = data.len(), "wrote output");
        } else {
            io::stdout().write_all(data)?;
        }
        Ok(())
    }

    pub fn write_json<T: Serialize>(&self, filename: &str, value: &T) -> Result<()> {
        let mut data = serde_json::to_vec_pretty(value)?;
        data.push(b'\n');
        self.write(filename, &data)
    }

    pub fn write_csv(&self, filename: &str, headers: &[&str], rows: &[Vec<String>]) -> Result<()> {
        if let Some(dir) = self.output_dir() {
            fs::create_dir_all(&dir)?;
            let file = fs::File::create(dir.join(filename))?;
            write_records(csv::Writer::from_writer(file), headers, rows)?;
            debug!(file = filename, rows = rows.len(), "wrote output table");
        } else {
            write_records(csv::Writer::from_writer(io::stdout()), headers, rows)?;
        }
        Ok(())
    }
}

fn write_records<W: Write>(
    mut wtr: csv::Writer<W>,
    headers: &[&str],
    rows: &[Vec<String>],
) -> Result<()> {
    wtr.write_record(headers)?;
    for row in rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn test_from_json_basic() {
        let data = json!({
            "input": {
                "seed": 42,
                "replicate": 1,
                "beta": 0.4
            },
            "model": {
                "files": {
                    "capacity": "/tmp/capacity.json"
                }
            },
            "output": {
                "spec": "filesystem",
                "dir": "/tmp/output"
            }
        });
        let ctx = Environment::from_json(data);
        assert_eq!(ctx.seed, 42);
        assert_eq!(ctx.replicate, 1);
        assert_eq!(ctx.input_json().get("beta").unwrap().as_f64().unwrap(), 0.4);
        assert!(!ctx.input_json().contains_key("seed"));
        assert!(!ctx.input_json().contains_key("replicate"));
        assert_eq!(
            ctx.files.get("capacity").unwrap(),
            &PathBuf::from("/tmp/capacity.json")
        );
        assert_eq!(ctx.output_dir(), Some(PathBuf::from("/tmp/output")));
    }

    #[test]
    fn test_with_input_type() {
        #[derive(Deserialize, Debug, PartialEq)]
        struct Rates {
            beta: f64,
            gamma: f64,
        }
        let data = json!({
            "input": {
                "seed": 42,
                "beta": 0.4,
                "gamma": 0.1
            }
        });
        let ctx = Environment::from_json(data)
            .with_input_type::<Rates>()
            .unwrap();
        assert_eq!(
            ctx.input,
            Some(Rates {
                beta: 0.4,
                gamma: 0.1
            })
        );
        assert_eq!(ctx.seed, 42);
    }

    #[test]
    fn test_with_input_type_rejects_bad_input() {
        #[derive(Deserialize, Debug)]
        #[allow(dead_code)]
        struct Rates {
            beta: f64,
        }
        let data = json!({ "input": { "beta": "high" } });
        let err = Environment::from_json(data)
            .with_input_type::<Rates>()
            .err()
            .unwrap();
        assert!(matches!(err, EnvironmentError::Input(_)));
    }

    #[test]
    fn test_from_reader_empty() {
        let err = Environment::from_reader("   \n".as_bytes()).err().unwrap();
        assert!(matches!(err, EnvironmentError::EmptyInput));
    }

    #[test]
    fn test_from_toml_str() {
        let raw = r#"
            [input]
            replicate = 3
            beta = 0.3
            days = 120

            [output]
            spec = "filesystem"
            dir = "/tmp/toml-output"
        "#;
        let ctx = Environment::from_toml_str(raw).unwrap();
        assert_eq!(ctx.replicate, 3);
        assert_eq!(ctx.input_json().get("days").unwrap().as_i64(), Some(120));
        assert_eq!(ctx.output_dir(), Some(PathBuf::from("/tmp/toml-output")));
    }

    #[test]
    fn test_fingerprint_ignores_key_order_and_protocol_fields() {
        let a = Environment::from_json(json!({
            "input": { "seed": 1, "beta": 0.4, "gamma": 0.1 }
        }));
        let b = Environment::from_json(json!({
            "input": { "gamma": 0.1, "beta": 0.4, "seed": 99 }
        }));
        let c = Environment::from_json(json!({
            "input": { "beta": 0.5, "gamma": 0.1 }
        }));
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn test_output_dir_profiled() {
        let data = json!({
            "input": {},
            "output": {
                "profile": {
                    "default": {
                        "spec": "filesystem",
                        "dir": "/tmp/profiled"
                    }
                }
            }
        });
        let ctx = Environment::from_json(data);
        assert_eq!(ctx.output_dir(), Some(PathBuf::from("/tmp/profiled")));
    }

    #[test]
    fn test_output_dir_none() {
        let data = json!({
            "input": {},
            "output": {
                "spec": "stdout"
            }
        });
        let ctx = Environment::from_json(data);
        assert_eq!(ctx.output_dir(), None);
    }

    #[test]
    fn test_write_csv_and_json_to_dir() {
        let dir = tempfile::tempdir().unwrap();
        let data = json!({
            "input": {},
            "output": {
                "spec": "filesystem",
                "dir": dir.path().join("run").to_str().unwrap()
            }
        });
        let ctx = Environment::from_json(data);
        ctx.write_csv(
            "trajectory.csv",
            &["time", "I"],
            &[
                vec!["0".to_string(), "100".to_string()],
                vec!["0.2".to_string(), "104.1".to_string()],
            ],
        )
        .unwrap();
        ctx.write_json("metrics.json", &json!({ "peak": 12.5 }))
            .unwrap();

        let csv = fs::read_to_string(dir.path().join("run/trajectory.csv")).unwrap();
        assert_eq!(csv, "time,I\n0,100\n0.2,104.1\n");
        let metrics: Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("run/metrics.json")).unwrap())
                .unwrap();
        assert_eq!(metrics["peak"].as_f64(), Some(12.5));
    }

    #[test]
    fn test_defaults() {
        let data = json!({});
        let ctx = Environment::from_json(data);
        assert_eq!(ctx.seed, 0);
        assert_eq!(ctx.replicate, 0);
        assert!(ctx.input_json().is_empty());
        assert!(ctx.files.is_empty());
        assert_eq!(ctx.output_dir(), None);
    }
}
