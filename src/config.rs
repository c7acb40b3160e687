#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Run configuration: an optional YAML file, command line overrides and the
//! environment, resolved once at startup.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::{
    constants::{
        DEFAULT_CONFIG_FILENAME, DEFAULT_GRADES_DIR, DEFAULT_OPENAI_ENDPOINT,
        DEFAULT_OPENAI_MODEL, EXECUTION_TIMEOUT_SECS, MAX_COMPLETION_TOKENS, OPENAI_TIMEOUT_SECS,
    },
    error::GraderError,
    grade::ExtraCreditPolicy,
};

/// `openai:` block of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OpenAiFileConfig {
    /// API key; takes precedence over `.netrc` and the environment.
    pub api_key:              Option<String>,
    /// Chat model for grading.
    pub model:                Option<String>,
    /// Model for image descriptions; defaults to `model`.
    pub vision_model:         Option<String>,
    /// API base URL.
    pub endpoint:             Option<String>,
    /// Completion token cap.
    pub max_tokens:           Option<u32>,
    /// Sampling temperature.
    pub temperature:          Option<f32>,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: Option<u64>,
}

/// The YAML configuration file.
///
/// Relative `rubric_path`, `tests_dir` and `test_data_dir` resolve against
/// `source_path` when set, otherwise against the file's directory, as do
/// `submissions_dir` and `grades_dir`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Directory holding one folder per student.
    pub submissions_dir: Option<PathBuf>,
    /// Base directory for assignment source files.
    pub source_path:     Option<PathBuf>,
    /// Rubric markdown.
    #[serde(alias = "readme_path")]
    pub rubric_path:     Option<PathBuf>,
    /// Shared tests copied into each submission.
    pub tests_dir:       Option<PathBuf>,
    /// Test data copied into each submission.
    pub test_data_dir:   Option<PathBuf>,
    /// Output directory for aggregated grades.
    pub grades_dir:      Option<PathBuf>,
    /// Python interpreter for the test runner.
    pub python:          Option<PathBuf>,
    /// Skip semantic grading and use the fallback heuristic.
    #[serde(alias = "skip_llm")]
    pub skip_semantic:   bool,
    /// Only print previously saved grades.
    #[serde(alias = "only_dashboard")]
    pub only_view:       bool,
    /// Verbose logging.
    pub verbose:         bool,
    /// Test suite timeout in seconds.
    pub timeout_secs:    Option<u64>,
    /// Whether extra credit counts toward the total.
    pub extra_credit:    ExtraCreditPolicy,
    /// Semantic grader settings.
    pub openai:          OpenAiFileConfig,
}

/// Joins `path` onto `base` unless it is absolute.
fn resolve_against(base: &Path, path: Option<PathBuf>) -> Option<PathBuf> {
    path.map(|p| if p.is_absolute() { p } else { base.join(p) })
}

impl FileConfig {
    /// Reads and parses a configuration file, resolving its paths.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Could not read configuration file {}", path.display()))?;
        let config = Self::parse(&text)
            .with_context(|| format!("Could not parse configuration file {}", path.display()))?;

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(config.resolve_paths(dir))
    }

    /// Parses YAML text; an empty document is an empty configuration.
    pub fn parse(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Makes every relative path absolute with respect to `config_dir`.
    pub fn resolve_paths(mut self, config_dir: &Path) -> Self {
        self.source_path = resolve_against(config_dir, self.source_path);
        let source_base = self.source_path.clone().unwrap_or_else(|| config_dir.to_path_buf());

        self.rubric_path = resolve_against(&source_base, self.rubric_path);
        self.tests_dir = resolve_against(&source_base, self.tests_dir);
        self.test_data_dir = resolve_against(&source_base, self.test_data_dir);
        self.submissions_dir = resolve_against(config_dir, self.submissions_dir);
        self.grades_dir = resolve_against(config_dir, self.grades_dir);
        self
    }

    /// Loads `explicit`, or `grader_config.yml` in the working directory if
    /// it exists, or nothing.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILENAME);
                if default.is_file() {
                    Self::load(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

/// Values given on the command line. Each one overrides the file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOverrides {
    /// `--config`
    pub config:        Option<PathBuf>,
    /// `--submissions`
    pub submissions:   Option<PathBuf>,
    /// `--rubric`
    pub rubric:        Option<PathBuf>,
    /// `--tests`
    pub tests:         Option<PathBuf>,
    /// `--test-data`
    pub test_data:     Option<PathBuf>,
    /// `--grades-dir`
    pub grades_dir:    Option<PathBuf>,
    /// `--skip-semantic`
    pub skip_semantic: bool,
    /// `--only-view`
    pub only_view:     bool,
    /// `--timeout`
    pub timeout:       Option<u64>,
    /// `-v`
    pub verbose:       bool,
}

/// Reads a positive number of seconds from `env`.
fn read_timeout_secs(env: &str) -> Option<u64> {
    std::env::var(env)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
}

/// A fully resolved grading run configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct GraderConfig {
    /// Directory holding one folder per student.
    pub submissions_dir: PathBuf,
    /// Rubric markdown.
    pub rubric_path:     PathBuf,
    /// Shared tests, if they exist.
    pub tests_dir:       Option<PathBuf>,
    /// Test data, if it exists.
    pub test_data_dir:   Option<PathBuf>,
    /// Output directory for aggregated grades.
    pub grades_dir:      PathBuf,
    /// Python interpreter override.
    pub python:          Option<PathBuf>,
    /// Skip semantic grading.
    pub skip_semantic:   bool,
    /// Only print saved grades.
    pub only_view:       bool,
    /// Verbose logging.
    pub verbose:         bool,
    /// Test suite timeout in seconds.
    pub timeout_secs:    u64,
    /// Whether extra credit counts toward the total.
    pub extra_credit:    ExtraCreditPolicy,
    /// Semantic grader settings as written in the file.
    pub openai:          OpenAiFileConfig,
}

/// `--grades-dir`, then the file, then `./grades`.
pub fn grades_dir(file: &FileConfig, cli: &CliOverrides) -> PathBuf {
    cli.grades_dir
        .clone()
        .or_else(|| file.grades_dir.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_GRADES_DIR))
}

/// Keeps `dir` only if it exists, warning otherwise.
fn existing_dir(dir: Option<PathBuf>, what: &str) -> Option<PathBuf> {
    let dir = dir?;
    if dir.is_dir() {
        Some(dir)
    } else {
        tracing::warn!("{what} directory not found: {}. Proceeding without it.", dir.display());
        None
    }
}

impl GraderConfig {
    /// Merges the file with the command line and validates paths.
    ///
    /// Missing submissions or rubric are fatal. Missing tests or test data
    /// only produce a warning.
    pub fn resolve(file: FileConfig, cli: &CliOverrides) -> Result<Self, GraderError> {
        let grades_dir = grades_dir(&file, cli);

        let submissions_dir = cli
            .submissions
            .clone()
            .or(file.submissions_dir)
            .ok_or_else(|| {
                GraderError::Config(
                    "--submissions or `submissions_dir` in the config file is required".into(),
                )
            })?;
        let rubric_path = cli.rubric.clone().or(file.rubric_path).ok_or_else(|| {
            GraderError::Config("--rubric or `rubric_path` in the config file is required".into())
        })?;

        if !submissions_dir.is_dir() {
            return Err(GraderError::Config(format!(
                "Submissions directory not found: {}",
                submissions_dir.display()
            )));
        }
        if !rubric_path.is_file() {
            return Err(GraderError::Config(format!(
                "Rubric not found: {}",
                rubric_path.display()
            )));
        }

        let timeout_secs = cli
            .timeout
            .or_else(|| read_timeout_secs("GRADEPOD_TIMEOUT_SECS"))
            .or(file.timeout_secs)
            .unwrap_or(EXECUTION_TIMEOUT_SECS);

        Ok(Self {
            submissions_dir,
            rubric_path,
            tests_dir: existing_dir(cli.tests.clone().or(file.tests_dir), "Tests"),
            test_data_dir: existing_dir(cli.test_data.clone().or(file.test_data_dir), "Test data"),
            grades_dir,
            python: file.python,
            skip_semantic: cli.skip_semantic || file.skip_semantic,
            only_view: cli.only_view || file.only_view,
            verbose: cli.verbose || file.verbose,
            timeout_secs,
            extra_credit: file.extra_credit,
            openai: file.openai,
        })
    }
}

/// Credentials and tuning for the semantic grader.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenAiSettings {
    /// Base URL for the OpenAI-compatible API endpoint.
    api_base:             String,
    /// API key used to authenticate requests.
    api_key:              String,
    /// Chat model for grading.
    model:                String,
    /// Model for image descriptions.
    vision_model:         String,
    /// Completion token cap for grading.
    max_tokens:           u32,
    /// Optional temperature override.
    temperature:          Option<f32>,
    /// Per-request timeout in seconds.
    request_timeout_secs: u64,
}

/// Where an API key was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// `openai.api_key` in the configuration file.
    ConfigFile,
    /// `machine OPENAI` in `.netrc`.
    Netrc,
    /// `OPENAI_API_KEY`.
    Environment,
}

/// Trimmed, non-empty value of `var`.
fn env_value(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Login of `machine` in netrc text.
pub fn netrc_login(text: &str, machine: &str) -> Option<String> {
    let mut tokens = text.split_whitespace();
    let mut in_machine = false;

    while let Some(token) = tokens.next() {
        match token {
            "machine" => in_machine = tokens.next() == Some(machine),
            "default" => in_machine = false,
            "login" | "password" | "account" => {
                let value = tokens.next()?;
                if in_machine && token == "login" {
                    return Some(value.to_string());
                }
            }
            "macdef" => {
                tokens.next();
                in_machine = false;
            }
            _ => {}
        }
    }

    None
}

/// Login of `machine OPENAI` in `$NETRC` or `~/.netrc`.
fn netrc_key() -> Option<String> {
    let path = std::env::var_os("NETRC")
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(".netrc")))?;
    let text = fs::read_to_string(path).ok()?;
    netrc_login(&text, "OPENAI")
}

impl OpenAiSettings {
    /// Resolves credentials in order: configuration file, `.netrc`
    /// (machine `OPENAI`, login field), `OPENAI_API_KEY`. Returns `None`
    /// when no key is found.
    pub fn resolve(file: &OpenAiFileConfig) -> Option<(Self, KeySource)> {
        let (api_key, source) = file
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .map(|k| (k, KeySource::ConfigFile))
            .or_else(|| netrc_key().map(|k| (k, KeySource::Netrc)))
            .or_else(|| env_value("OPENAI_API_KEY").map(|k| (k, KeySource::Environment)))?;

        let model = env_value("OPENAI_MODEL")
            .or_else(|| file.model.clone())
            .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());
        let api_base = env_value("OPENAI_ENDPOINT")
            .or_else(|| file.endpoint.clone())
            .unwrap_or_else(|| DEFAULT_OPENAI_ENDPOINT.to_string());

        Some((
            Self {
                api_base,
                vision_model: file.vision_model.clone().unwrap_or_else(|| model.clone()),
                model,
                api_key: api_key.trim().to_owned(),
                max_tokens: file.max_tokens.unwrap_or(MAX_COMPLETION_TOKENS),
                temperature: file.temperature,
                request_timeout_secs: file.request_timeout_secs.unwrap_or(OPENAI_TIMEOUT_SECS),
            },
            source,
        ))
    }

    /// Returns the API base URL.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Returns the API key.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Returns the grading model.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the image description model.
    pub fn vision_model(&self) -> &str {
        &self.vision_model
    }

    /// Returns the completion token cap.
    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    /// Returns the configured temperature, if any.
    pub fn temperature(&self) -> Option<f32> {
        self.temperature
    }

    /// Returns the per-request timeout in seconds.
    pub fn request_timeout_secs(&self) -> u64 {
        self.request_timeout_secs
    }
}
