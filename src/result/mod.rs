//! Value objects reporting the outcome of validation and safe-persistence
//! operations. Expected failure modes live here as data, not as errors to
//! catch.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::entity::EntityHandle;

/// Composable validation outcome.
///
/// Merging is associative: validity is the logical AND, and errors/warnings
/// concatenate left operand first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    valid: bool,
    errors: Vec<String>,
    warnings: Vec<String>,
    context: BTreeMap<String, String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            context: BTreeMap::new(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::ok().with_error(message)
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.add_error(message);
        self
    }

    pub fn with_warning(mut self, message: impl Into<String>) -> Self {
        self.add_warning(message);
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(message.into());
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn merge(mut self, other: ValidationResult) -> Self {
        self.valid = self.valid && other.valid;
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self.context.extend(other.context);
        self
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn context(&self) -> &BTreeMap<String, String> {
        &self.context
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::ok()
    }
}

/// Outcome of one safe-persistence operation.
///
/// A failed result always carries both a short message and the detailed
/// error list, so the calling layer chooses how much to surface. The entity
/// slot holds the managed instance the operation settled on.
#[derive(Clone)]
pub struct SafePersistenceResult {
    success: bool,
    message: String,
    errors: Vec<String>,
    warnings: Vec<String>,
    info: Vec<String>,
    entity: Option<EntityHandle>,
}

impl SafePersistenceResult {
    pub fn succeeded(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            errors: Vec::new(),
            warnings: Vec::new(),
            info: Vec::new(),
            entity: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            errors: Vec::new(),
            warnings: Vec::new(),
            info: Vec::new(),
            entity: None,
        }
    }

    pub fn with_entity(mut self, entity: EntityHandle) -> Self {
        self.entity = Some(entity);
        self
    }

    pub fn push_error(mut self, message: impl Into<String>) -> Self {
        self.success = false;
        self.errors.push(message.into());
        self
    }

    pub fn push_warning(mut self, message: impl Into<String>) -> Self {
        self.warnings.push(message.into());
        self
    }

    pub fn push_info(mut self, message: impl Into<String>) -> Self {
        self.info.push(message.into());
        self
    }

    /// Folds a validation outcome in: errors fail the result, warnings
    /// accumulate.
    pub fn absorb(mut self, validation: ValidationResult) -> Self {
        if !validation.is_valid() {
            self.success = false;
        }
        self.errors.extend(validation.errors().iter().cloned());
        self.warnings.extend(validation.warnings().iter().cloned());
        self
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn info(&self) -> &[String] {
        &self.info
    }

    pub fn entity(&self) -> Option<&EntityHandle> {
        self.entity.as_ref()
    }
}

impl std::fmt::Debug for SafePersistenceResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SafePersistenceResult")
            .field("success", &self.success)
            .field("message", &self.message)
            .field("errors", &self.errors)
            .field("warnings", &self.warnings)
            .field("info", &self.info)
            .field("has_entity", &self.entity.is_some())
            .finish()
    }
}
