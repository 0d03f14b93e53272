use crate::engine::RunPolicy;
use crate::errors::ScorecardError;
use crate::providers::echo::EchoAnswerer;
use crate::providers::http::HttpAnswerer;
use crate::providers::Answerer;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const SUPPORTED_CONFIG_VERSION: u32 = 1;
pub const DEFAULT_CONFIG_PATH: &str = "scorecard.yaml";
pub const DEFAULT_ANSWERER_ENDPOINT: &str = "http://localhost:8080/answer";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorecardConfig {
    pub version: u32,
    pub db: PathBuf,
    pub log_level: String,
    pub run: RunSettings,
    pub answerer: AnswererConfig,
    pub scorer: ScorerConfig,
}

impl Default for ScorecardConfig {
    fn default() -> Self {
        Self {
            version: SUPPORTED_CONFIG_VERSION,
            db: PathBuf::from(".scorecard/scorecard.db"),
            log_level: "info".to_string(),
            run: RunSettings::default(),
            answerer: AnswererConfig::default(),
            scorer: ScorerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    pub case_timeout_seconds: u64,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            case_timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswererKind {
    #[default]
    Http,
    Echo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswererConfig {
    pub kind: AnswererKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Name of the environment variable holding the bearer token, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

impl Default for AnswererConfig {
    fn default() -> Self {
        Self {
            kind: AnswererKind::Http,
            endpoint: Some(DEFAULT_ANSWERER_ENDPOINT.to_string()),
            api_key_env: None,
        }
    }
}

impl AnswererConfig {
    fn endpoint(&self) -> Result<&str, ScorecardError> {
        self.endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| {
                ScorecardError::Config("answerer.kind 'http' requires answerer.endpoint".into())
            })
    }

    pub fn build(&self) -> Result<Arc<dyn Answerer>, ScorecardError> {
        match self.kind {
            AnswererKind::Echo => Ok(Arc::new(EchoAnswerer)),
            AnswererKind::Http => {
                let endpoint = self.endpoint()?.to_string();
                let api_key = self
                    .api_key_env
                    .as_deref()
                    .and_then(|var| std::env::var(var).ok());
                Ok(Arc::new(HttpAnswerer::new(endpoint, api_key)))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorerKind {
    #[default]
    Exact,
    Contains,
    Judge,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorerConfig {
    pub kind: ScorerKind,
    pub model: String,
    pub api_key_env: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            kind: ScorerKind::Exact,
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: None,
            temperature: 0.0,
            max_tokens: 512,
        }
    }
}

impl ScorecardConfig {
    pub fn run_policy(&self) -> RunPolicy {
        RunPolicy {
            case_timeout: Duration::from_secs(self.run.case_timeout_seconds),
        }
    }

    /// Environment overrides, applied after the file is read. Overrides that
    /// cannot be applied are skipped and returned as warnings.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        if let Some(v) = lookup("SCORECARD_DB") {
            self.db = PathBuf::from(v);
        }
        if let Some(v) = lookup("SCORECARD_LOG") {
            self.log_level = v;
        }
        if let Some(v) = lookup("SCORECARD_ANSWERER_ENDPOINT") {
            self.answerer.endpoint = Some(v);
        }
        if let Some(v) = lookup("SCORECARD_CASE_TIMEOUT_SECONDS") {
            match v.parse() {
                Ok(n) => self.run.case_timeout_seconds = n,
                Err(_) => warnings.push(ConfigWarning::BadEnv {
                    var: "SCORECARD_CASE_TIMEOUT_SECONDS",
                    value: v,
                }),
            }
        }
        warnings
    }

    pub fn validate(&self) -> Result<(), ScorecardError> {
        if self.version != SUPPORTED_CONFIG_VERSION {
            return Err(ScorecardError::Config(format!(
                "unsupported config version {} (supported: {})",
                self.version, SUPPORTED_CONFIG_VERSION
            )));
        }
        if self.run.case_timeout_seconds == 0 {
            return Err(ScorecardError::Config(
                "run.case_timeout_seconds must be greater than zero".into(),
            ));
        }
        if self.answerer.kind == AnswererKind::Http {
            self.answerer.endpoint()?;
        }
        Ok(())
    }
}

/// Something tolerated while loading the config. Loading happens before the
/// log subscriber exists, so callers log these once it is installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    UnknownFields { file: PathBuf, fields: Vec<String> },
    BadEnv { var: &'static str, value: String },
}

impl ConfigWarning {
    pub fn log(&self) {
        match self {
            ConfigWarning::UnknownFields { file, fields } => tracing::warn!(
                event = "scorecard.config.unknown_fields",
                file = %file.display(),
                fields = ?fields,
                "ignored unknown config fields"
            ),
            ConfigWarning::BadEnv { var, value } => tracing::warn!(
                event = "scorecard.config.bad_env",
                var = %var,
                value = %value,
                "ignoring non-numeric override"
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: ScorecardConfig,
    pub warnings: Vec<ConfigWarning>,
}

/// Reads `path` (missing file means defaults), applies environment overrides
/// and validates the result. Unknown keys are tolerated and come back as
/// warnings.
pub fn load_config(path: &Path) -> Result<LoadedConfig, ScorecardError> {
    let (mut config, mut warnings) = if path.exists() {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ScorecardError::Config(format!("failed to read config {}: {}", path.display(), e))
        })?;
        parse_config(&raw, path)?
    } else {
        (ScorecardConfig::default(), Vec::new())
    };

    warnings.extend(config.apply_env(|k| std::env::var(k).ok()));
    config.validate()?;
    Ok(LoadedConfig { config, warnings })
}

fn parse_config(
    raw: &str,
    path: &Path,
) -> Result<(ScorecardConfig, Vec<ConfigWarning>), ScorecardError> {
    let mut ignored = Vec::new();
    let deserializer = serde_yaml::Deserializer::from_str(raw);
    let cfg: ScorecardConfig = serde_ignored::deserialize(deserializer, |p| {
        ignored.push(p.to_string());
    })
    .map_err(|e| ScorecardError::Config(format!("failed to parse YAML: {}", e)))?;

    let mut warnings = Vec::new();
    if !ignored.is_empty() {
        warnings.push(ConfigWarning::UnknownFields {
            file: path.to_path_buf(),
            fields: ignored,
        });
    }
    Ok((cfg, warnings))
}

pub fn write_sample_config(path: &Path) -> Result<(), ScorecardError> {
    std::fs::write(
        path,
        r#"version: 1
db: .scorecard/scorecard.db
log_level: info
run:
  case_timeout_seconds: 60
answerer:
  kind: http
  endpoint: http://localhost:8080/answer
  # api_key_env: ANSWERER_API_KEY
scorer:
  kind: exact          # exact | contains | judge
  model: gpt-4o-mini   # judge only
  api_key_env: OPENAI_API_KEY
"#,
    )
    .map_err(|e| ScorecardError::Config(format!("failed to write sample config: {}", e)))?;
    Ok(())
}
