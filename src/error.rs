//! Typed errors for parameter handling and pipeline stages.
//!
//! Parameter errors carry the parameter (or flag) they concern so that callers can
//! report them without extra context. Pipeline errors always name the stage and the
//! field or column responsible. Command handlers wrap both in `anyhow` with context.

use std::path::PathBuf;

use thiserror::Error;

use crate::parameters::ParameterType;

#[derive(Debug, Error)]
pub enum ParameterError {
    #[error("parameter '{name}' expects a {expected} value, got {found}")]
    InvalidValueType {
        name: String,
        expected: ParameterType,
        found: &'static str,
    },
    #[error("value '{value}' for parameter '{name}' is not one of: {}", choices.join(", "))]
    InvalidChoice {
        name: String,
        value: String,
        choices: Vec<String>,
    },
    #[error("could not parse '{value}' for parameter '{name}': {reason}")]
    Parse {
        name: String,
        value: String,
        reason: String,
    },
    #[error("unknown flag: {flag}")]
    UnknownFlag { flag: String },
    #[error("missing value for flag: {flag}")]
    MissingValue { flag: String },
    #[error("parameter '{name}' is required")]
    MissingRequired { name: String },
    #[error("invalid default for parameter '{name}'")]
    InvalidDefault {
        name: String,
        #[source]
        source: Box<ParameterError>,
    },
    #[error("cannot write parameter '{name}' into a {target} destination: {reason}")]
    IncompatibleTarget {
        name: String,
        target: &'static str,
        reason: String,
    },
    #[error("could not load {path:?} for parameter '{name}'")]
    FileLoad {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unknown parameter type '{0}'")]
    UnknownType(String),
    #[error("parameter '{0}' is defined more than once")]
    DuplicateParameter(String),
    #[error("invalid parameter document: {0}")]
    InvalidDocument(String),
}

impl ParameterError {
    pub fn parse(name: &str, value: &str, reason: impl Into<String>) -> Self {
        ParameterError::Parse {
            name: name.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Failure reported by a template renderer.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TemplateError {
    pub message: String,
}

impl TemplateError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{stage}: invalid regex '{pattern}' for field '{field}'")]
    InvalidRegex {
        stage: &'static str,
        field: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("{stage}: {message}")]
    InvalidDocument { stage: &'static str, message: String },
    #[error("{stage}: template for column '{column}' failed (template: {template:?})")]
    Template {
        stage: &'static str,
        column: String,
        template: String,
        #[source]
        source: TemplateError,
    },
    #[error("invalid pipeline parameters")]
    Parameters(#[from] ParameterError),
    #[error("invalid setting '{name}': {message}")]
    Settings { name: String, message: String },
}

impl PipelineError {
    pub fn document(stage: &'static str, message: impl Into<String>) -> Self {
        PipelineError::InvalidDocument {
            stage,
            message: message.into(),
        }
    }
}
