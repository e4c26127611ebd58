//! Error taxonomy and per-type diagnostics.
//!
//! Generation never stops the whole run for one type: facet-local failures
//! (a bad schema rule, an unparsable array comment) become warnings attached
//! to that type's descriptor, and only missing type information or an
//! unresolvable name turns into a [`TypeFailure`].
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenError {
    #[error("'{symbol}' is not known")]
    NotFound { symbol: String },
    #[error("'{symbol}' is not of an integral type")]
    NotIntegral { symbol: String },
    #[error("'{symbol}' is not declared before the member using it")]
    NotYetDeclared { symbol: String },
    #[error("'{symbol}' is a private member of a base class")]
    PrivateAccess { symbol: String },
    #[error("'{symbol}' is hidden by '{by}'")]
    Hidden { symbol: String, by: String },
    #[error("cannot resolve '{name}': {reason}")]
    Unresolvable { name: String, reason: String },
    #[error("malformed annotation `{text}`: {reason}")]
    MalformedAnnotation { text: String, reason: String },
    #[error("no type information available for '{name}'")]
    MissingTypeInfo { name: String },
}

impl GenError {
    pub fn unresolvable(name: impl Into<String>, reason: impl Into<String>) -> Self {
        GenError::Unresolvable { name: name.into(), reason: reason.into() }
    }

    pub fn malformed(text: impl Into<String>, reason: impl Into<String>) -> Self {
        GenError::MalformedAnnotation { text: text.into(), reason: reason.into() }
    }

    /// Short stable tag, used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            GenError::NotFound { .. } => "not-found",
            GenError::NotIntegral { .. } => "not-integral",
            GenError::NotYetDeclared { .. } => "not-yet-declared",
            GenError::PrivateAccess { .. } => "private-access",
            GenError::Hidden { .. } => "hidden",
            GenError::Unresolvable { .. } => "unresolvable",
            GenError::MalformedAnnotation { .. } => "malformed-annotation",
            GenError::MissingTypeInfo { .. } => "missing-type-info",
        }
    }
}

/// A warning about one facet of a type. Generation of the type continues.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub type_name: String,
    pub member: Option<String>,
    pub kind: &'static str,
    pub message: String,
    #[serde(skip)]
    pub error: GenError,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.member {
            Some(member) => write!(f, "{}::{}: {}", self.type_name, member, self.message),
            None => write!(f, "{}: {}", self.type_name, self.message),
        }
    }
}

/// Diagnostics collected while generating one type.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    type_name: String,
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn for_type(type_name: impl Into<String>) -> Self {
        Self { type_name: type_name.into(), entries: Vec::new() }
    }

    pub fn warn(&mut self, member: Option<&str>, error: GenError) {
        let diagnostic = Diagnostic {
            type_name: self.type_name.clone(),
            member: member.map(str::to_owned),
            kind: error.kind(),
            message: error.to_string(),
            error,
        };
        tracing::warn!("{diagnostic}");
        self.entries.push(diagnostic);
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

/// A requested type for which nothing could be emitted.
#[derive(Debug, Clone, Error)]
#[error("type #{index} ({name}): {error}")]
pub struct TypeFailure {
    pub index: usize,
    pub name: String,
    pub error: GenError,
}
