//! Configuration-driven classification of remote errors.
//!
//! Providers signal throttling, eventual-consistency races, and missing
//! resources through error codes and message fragments. Rather than
//! scattering string matching across call sites, each operation carries a
//! classifier built from configuration data that maps a `(code, message)`
//! pair to a class the retry machinery acts on.

use serde::{Deserialize, Serialize};

use crate::remote::RemoteError;

/// Class a remote error is mapped to.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorClass {
    /// Retried automatically up to the policy budget.
    Transient,
    /// Never retried; surfaces immediately.
    Permanent,
    /// The resource the call targets does not exist remotely.
    NotFound,
}

/// A single classification rule.
///
/// A rule matches when every present condition holds; a rule with no
/// conditions matches nothing. Rules are evaluated in order and the first
/// match wins.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ClassifierRule {
    /// Error code the rule requires, compared exactly.
    #[serde(default)]
    pub code: Option<String>,
    /// Fragment the error message must contain.
    #[serde(default)]
    pub message_contains: Option<String>,
    /// Class assigned when the rule matches.
    pub class: ErrorClass,
}

impl ClassifierRule {
    fn matches(&self, error: &RemoteError) -> bool {
        if self.code.is_none() && self.message_contains.is_none() {
            return false;
        }
        let code_matches = self.code.as_deref().is_none_or(|code| code == error.code);
        let message_matches = self
            .message_contains
            .as_deref()
            .is_none_or(|needle| error.message.contains(needle));
        code_matches && message_matches
    }
}

/// Ordered rule set mapping remote errors to an [`ErrorClass`].
///
/// The mapping is configuration data: rule sets deserialise from the
/// surrounding configuration and are supplied per operation. Unmatched
/// errors fall back to [`ErrorClass::Permanent`] unless configured
/// otherwise.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ErrorClassifier {
    #[serde(default)]
    rules: Vec<ClassifierRule>,
    #[serde(default = "fallback_class")]
    fallback: ErrorClass,
}

const fn fallback_class() -> ErrorClass {
    ErrorClass::Permanent
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            fallback: fallback_class(),
        }
    }
}

impl ErrorClassifier {
    /// Builds a classifier from an ordered rule list.
    #[must_use]
    pub fn new(rules: Vec<ClassifierRule>) -> Self {
        Self {
            rules,
            fallback: fallback_class(),
        }
    }

    /// Overrides the class assigned to unmatched errors.
    #[must_use]
    pub fn with_fallback(mut self, fallback: ErrorClass) -> Self {
        self.fallback = fallback;
        self
    }

    /// Appends a rule marking the given code transient.
    #[must_use]
    pub fn transient_code(mut self, code: impl Into<String>) -> Self {
        self.rules.push(ClassifierRule {
            code: Some(code.into()),
            message_contains: None,
            class: ErrorClass::Transient,
        });
        self
    }

    /// Appends a rule marking the given code transient only when the message
    /// contains `needle`.
    #[must_use]
    pub fn transient_message(mut self, code: impl Into<String>, needle: impl Into<String>) -> Self {
        self.rules.push(ClassifierRule {
            code: Some(code.into()),
            message_contains: Some(needle.into()),
            class: ErrorClass::Transient,
        });
        self
    }

    /// Appends a rule mapping the given code to not-found.
    #[must_use]
    pub fn not_found_code(mut self, code: impl Into<String>) -> Self {
        self.rules.push(ClassifierRule {
            code: Some(code.into()),
            message_contains: None,
            class: ErrorClass::NotFound,
        });
        self
    }

    /// Classifies a remote error.
    #[must_use]
    pub fn classify(&self, error: &RemoteError) -> ErrorClass {
        self.rules
            .iter()
            .find(|rule| rule.matches(error))
            .map_or(self.fallback, |rule| rule.class)
    }
}

/// Classifier per orchestrator operation.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct OperationClassifiers {
    /// Rules applied to remote create calls.
    pub create: ErrorClassifier,
    /// Rules applied to remote read calls.
    pub read: ErrorClassifier,
    /// Rules applied to remote update calls.
    pub update: ErrorClassifier,
    /// Rules applied to remote delete calls.
    pub delete: ErrorClassifier,
}
