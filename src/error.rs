//! Error types for tierctl.
//!
//! Structural errors (unknown tier, bad project name, malformed overrides,
//! exhausted or overlapping address space) abort synthesis immediately.
//! Policy violations are collected exhaustively and surface together as
//! [`Error::PolicyViolations`].

use std::path::PathBuf;
use thiserror::Error;

use crate::policy::PolicyViolation;

/// Result type alias for tierctl operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for tierctl.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Catalog Errors
    // ========================================================================
    /// Tier name is not one of the known environment tiers.
    #[error("Unknown tier '{0}' (expected one of: dev, staging, prod)")]
    UnknownTier(String),

    /// Region is not present in the region catalog.
    #[error("Unknown region '{0}'")]
    UnknownRegion(String),

    // ========================================================================
    // Network Errors
    // ========================================================================
    /// A CIDR string could not be parsed as an IPv4 network.
    #[error("Invalid CIDR '{cidr}': {message}")]
    InvalidCidr {
        /// The offending input
        cidr: String,
        /// Error message
        message: String,
    },

    /// The base block cannot hold the requested partitions.
    #[error("Cannot fit {requested} subnets into {base}: {message}")]
    CidrExhaustion {
        /// Base network block
        base: String,
        /// Number of subnets requested
        requested: usize,
        /// Error message
        message: String,
    },

    /// A block intersects a block already allocated in the same account scope.
    #[error("CIDR {requested} for '{owner}' overlaps {existing} already allocated to '{existing_owner}'")]
    Overlap {
        /// Block being allocated
        requested: String,
        /// Owner asking for the block
        owner: String,
        /// Block already registered
        existing: String,
        /// Owner of the registered block
        existing_owner: String,
    },

    // ========================================================================
    // Override Errors
    // ========================================================================
    /// Override key is not part of the declared schema.
    #[error("Unknown override field '{field}'{}", did_you_mean(.suggestion))]
    UnknownField {
        /// Offending key
        field: String,
        /// Closest known field, if any
        suggestion: Option<String>,
    },

    /// Override value has the wrong type for its field.
    #[error("Override '{field}' expects {expected}, got {actual}")]
    TypeMismatch {
        /// Field name
        field: String,
        /// Expected type
        expected: &'static str,
        /// Actual type or value
        actual: String,
    },

    /// Override value has the right type but is outside the field's domain.
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Error message
        message: String,
    },

    // ========================================================================
    // Naming Errors
    // ========================================================================
    /// Project identifier failed validation.
    #[error("Invalid project name '{name}': {message}")]
    InvalidProjectName {
        /// Rejected project name
        name: String,
        /// Error message
        message: String,
    },

    /// A generated resource name exceeds the provider's limit.
    #[error("Resource name '{name}' is {len} characters, {kind} names are limited to {limit}")]
    NameTooLong {
        /// Generated name
        name: String,
        /// Resource kind
        kind: String,
        /// Actual length
        len: usize,
        /// Provider limit
        limit: usize,
    },

    // ========================================================================
    // Policy Errors
    // ========================================================================
    /// One or more tier policy rules failed.
    #[error("{} policy violation(s): {}", .0.len(), summarize(.0))]
    PolicyViolations(Vec<PolicyViolation>),

    // ========================================================================
    // Manifest Errors
    // ========================================================================
    /// Manifest file is malformed.
    #[error("Invalid manifest '{path}': {message}")]
    Manifest {
        /// Path to manifest
        path: PathBuf,
        /// Error message
        message: String,
    },

    // ========================================================================
    // IO / Serialization Errors
    // ========================================================================
    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error.
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

fn did_you_mean(suggestion: &Option<String>) -> String {
    suggestion
        .as_ref()
        .map(|s| format!(" (did you mean '{s}'?)"))
        .unwrap_or_default()
}

fn summarize(violations: &[PolicyViolation]) -> String {
    violations
        .iter()
        .map(|v| v.rule.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    /// Creates a new invalid CIDR error.
    pub fn invalid_cidr(cidr: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidCidr {
            cidr: cidr.into(),
            message: message.into(),
        }
    }

    /// Creates a new CIDR exhaustion error.
    pub fn cidr_exhaustion(
        base: impl ToString,
        requested: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::CidrExhaustion {
            base: base.to_string(),
            requested,
            message: message.into(),
        }
    }

    /// Creates a new invalid value error.
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a new invalid project name error.
    pub fn invalid_project_name(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidProjectName {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates a new manifest error.
    pub fn manifest(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Manifest {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns true for errors that abort synthesis before policy evaluation.
    pub fn is_structural(&self) -> bool {
        !matches!(self, Error::PolicyViolations(_))
    }

    /// Returns the error code for CLI exit status.
    ///
    /// Policy violations exit with 1, every structural or input error with 2.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::PolicyViolations(_) => 1,
            _ => 2,
        }
    }
}
