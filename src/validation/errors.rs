//! Field-scoped validation errors.

use std::collections::BTreeMap;

use serde::Serialize;

/// Pipeline stage that produced a set of errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Syntax,
    CrossField,
    Business,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Syntax => "syntax",
            Self::CrossField => "cross_field",
            Self::Business => "business",
        }
    }
}

/// Field path -> message. The first message recorded for a path wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` for `path` unless the path already has one.
    pub fn add(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.0.entry(path.into()).or_insert_with(|| message.into());
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.contains_key(path)
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.0.get(path).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }
}

/// Result of running the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Valid,
    /// The first stage that produced errors; later stages did not run.
    Invalid {
        stage: Stage,
        errors: ValidationErrors,
    },
}

impl PipelineOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Valid => None,
            Self::Invalid { errors, .. } => Some(errors),
        }
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Valid => None,
            Self::Invalid { stage, .. } => Some(*stage),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_message_wins() {
        let mut errors = ValidationErrors::new();
        errors.add("email", "is required");
        errors.add("email", "is too long");
        errors.add("phone", "is invalid");

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.get("email"), Some("is required"));
        assert_eq!(serde_json::to_value(&errors).unwrap()["phone"], "is invalid");
    }
}
