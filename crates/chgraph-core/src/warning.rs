//! Build warnings and their stable codes
//!
//! IMPORTANT: Warning codes are part of the public API.
//! NEVER rename or remove codes - add new ones instead.

use serde::{Deserialize, Serialize};

/// Warning code registry (v1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningCode {
    /// A view reads from a relation that was not discovered
    MissingSourceTable,

    /// A view writes into a relation that was not discovered
    MissingTargetTable,

    /// The catalog reports no dependencies for a view
    NoDependencies,

    /// A listed materialized view has no node of its own
    MissingViewNode,
}

impl WarningCode {
    /// Get the warning code as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingSourceTable => "MISSING_SOURCE_TABLE",
            Self::MissingTargetTable => "MISSING_TARGET_TABLE",
            Self::NoDependencies => "NO_DEPENDENCIES",
            Self::MissingViewNode => "MISSING_VIEW_NODE",
        }
    }
}

impl std::fmt::Display for WarningCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A non-fatal problem found while building a graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildWarning {
    /// Stable warning code
    pub code: WarningCode,

    /// Human-readable message
    pub message: String,

    /// FQDN of the materialized view being processed
    pub view: String,

    /// FQDN of the offending dependency, when there is one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependency: Option<String>,
}

impl BuildWarning {
    /// A dependency the view reads from is not a known relation
    pub fn missing_source(view: impl Into<String>, dependency: impl Into<String>) -> Self {
        let view = view.into();
        let dependency = dependency.into();
        Self {
            code: WarningCode::MissingSourceTable,
            message: format!("Source table {} not found for MV {}", dependency, view),
            view,
            dependency: Some(dependency),
        }
    }

    /// A dependency the view writes into is not a known relation
    pub fn missing_target(view: impl Into<String>, dependency: impl Into<String>) -> Self {
        let view = view.into();
        let dependency = dependency.into();
        Self {
            code: WarningCode::MissingTargetTable,
            message: format!("Target table {} not found for MV {}", dependency, view),
            view,
            dependency: Some(dependency),
        }
    }

    /// The catalog returned no dependency rows for the view
    pub fn no_dependencies(view: impl Into<String>) -> Self {
        let view = view.into();
        Self {
            code: WarningCode::NoDependencies,
            message: format!("No dependencies found for MV {}", view),
            view,
            dependency: None,
        }
    }

    /// The view itself was not among the discovered relations
    pub fn missing_view_node(view: impl Into<String>) -> Self {
        let view = view.into();
        Self {
            code: WarningCode::MissingViewNode,
            message: format!("MV node {} not found in nodes", view),
            view,
            dependency: None,
        }
    }
}

impl std::fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}
