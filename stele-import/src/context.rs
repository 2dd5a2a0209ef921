//! Per-call import configuration.

/// Configuration for one import call.
///
/// The importer holds process-scoped defaults; each call may pass its own
/// context, which is layered on top functionally — the defaults are never
/// mutated by a call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportContext {
    /// Entity kind override. Takes priority over the kind named in the
    /// record's metadata block.
    pub entity_type: Option<String>,
    /// Constraint names whose violations are ignored during validation.
    pub skipped_constraints: Vec<String>,
}

impl ImportContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the entity kind override.
    #[must_use]
    pub fn with_entity_type(mut self, kind_name: impl Into<String>) -> Self {
        self.entity_type = Some(kind_name.into());
        self
    }

    /// Adds a constraint name to skip during validation.
    #[must_use]
    pub fn with_skipped_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.skipped_constraints.push(constraint.into());
        self
    }

    /// Layers `overrides` on top of `self`: the override's entity type wins
    /// when set, and skip-lists are concatenated.
    #[must_use]
    pub fn merged_with(&self, overrides: &ImportContext) -> ImportContext {
        let mut skipped_constraints = self.skipped_constraints.clone();
        for constraint in &overrides.skipped_constraints {
            if !skipped_constraints.contains(constraint) {
                skipped_constraints.push(constraint.clone());
            }
        }
        ImportContext {
            entity_type: overrides
                .entity_type
                .clone()
                .or_else(|| self.entity_type.clone()),
            skipped_constraints,
        }
    }

    /// True if violations of the named constraint are to be ignored.
    #[must_use]
    pub fn skips_constraint(&self, constraint: &str) -> bool {
        self.skipped_constraints.iter().any(|c| c == constraint)
    }
}
