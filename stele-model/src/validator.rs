use crate::{Entity, EntityKind};

/// One constraint violation found while validating an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintViolation {
    /// Name of the violated constraint, matched against caller skip-lists.
    pub constraint: String,
    /// Human-readable violation message.
    pub message: String,
}

impl ConstraintViolation {
    /// Creates a violation.
    pub fn new(constraint: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            constraint: constraint.into(),
            message: message.into(),
        }
    }
}

/// Seam for constraint checking.
///
/// The synchronization core never executes validation rules itself; it asks
/// the validator for violations and decides from the kind's capability flags
/// whether they block persistence. The default implementation accepts
/// everything.
pub trait EntityValidator: Send + Sync {
    /// Returns all constraint violations for the entity, or an empty list
    /// if the entity is valid.
    fn validate(&self, entity: &Entity, kind: &EntityKind) -> Vec<ConstraintViolation> {
        let _ = (entity, kind);
        Vec::new()
    }
}

/// Validator that accepts every entity.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoValidation;

impl EntityValidator for NoValidation {}
