//! Business-object capabilities
//!
//! A BO is any caller-defined struct. Dirty tracking is an opt-in capability:
//! embed a [`BoState`] and expose it through [`Bo::state`] / [`Bo::state_mut`].

use serde::{Deserialize, Serialize};

use crate::types::SqlValue;

/// Dirty/clean marker plus the checksum observed when the BO was last
/// loaded or persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoState {
    dirty: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    checksum: Option<SqlValue>,
}

impl BoState {
    /// New, never-persisted state (dirty)
    pub fn new() -> Self {
        Self {
            dirty: true,
            checksum: None,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Checksum stored in the database as of the last load/save
    pub fn checksum(&self) -> Option<&SqlValue> {
        self.checksum.as_ref()
    }

    pub fn set_checksum(&mut self, checksum: Option<SqlValue>) {
        self.checksum = checksum;
    }
}

/// Same as [`BoState::new`]: a BO built by a factory has not been persisted
impl Default for BoState {
    fn default() -> Self {
        Self::new()
    }
}

/// Entity capability consumed by the row mapper and DAO
///
/// Both methods default to `None`, meaning the BO does not track
/// dirtiness: `impl Bo for MyBo {}` is enough for plain records.
pub trait Bo {
    fn state(&self) -> Option<&BoState> {
        None
    }

    fn state_mut(&mut self) -> Option<&mut BoState> {
        None
    }

    /// Whether the BO has unsaved local mutations; untracked BOs are always
    /// considered dirty
    fn is_dirty(&self) -> bool {
        self.state().is_none_or(BoState::is_dirty)
    }
}

/// Primary-key values of a BO, in primary-key column order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoId(Vec<SqlValue>);

impl BoId {
    pub fn new(values: Vec<SqlValue>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_values(self) -> Vec<SqlValue> {
        self.0
    }
}

impl From<Vec<SqlValue>> for BoId {
    fn from(values: Vec<SqlValue>) -> Self {
        Self(values)
    }
}

impl From<SqlValue> for BoId {
    fn from(value: SqlValue) -> Self {
        Self(vec![value])
    }
}

impl From<i64> for BoId {
    fn from(value: i64) -> Self {
        Self(vec![SqlValue::BigInt(value)])
    }
}

impl From<&str> for BoId {
    fn from(value: &str) -> Self {
        Self(vec![SqlValue::from(value)])
    }
}

impl From<String> for BoId {
    fn from(value: String) -> Self {
        Self(vec![SqlValue::String(value)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain;
    impl Bo for Plain {}

    #[derive(Default)]
    struct Tracked {
        state: BoState,
    }

    impl Bo for Tracked {
        fn state(&self) -> Option<&BoState> {
            Some(&self.state)
        }

        fn state_mut(&mut self) -> Option<&mut BoState> {
            Some(&mut self.state)
        }
    }

    #[test]
    fn test_new_state_is_dirty() {
        assert!(BoState::new().is_dirty());
        assert_eq!(BoState::default(), BoState::new());
    }

    #[test]
    fn test_factory_built_bo_starts_dirty() {
        let t = Tracked::default();
        assert!(t.is_dirty());
        assert!(t.state().unwrap().checksum().is_none());
    }

    #[test]
    fn test_mark_clean_and_dirty() {
        let mut t = Tracked {
            state: BoState::new(),
        };
        assert!(t.is_dirty());

        t.state_mut().unwrap().mark_clean();
        assert!(!t.is_dirty());

        t.state_mut().unwrap().mark_dirty();
        assert!(t.is_dirty());
    }

    #[test]
    fn test_untracked_is_always_dirty() {
        assert!(Plain.is_dirty());
        assert!(Plain.state().is_none());
    }

    #[test]
    fn test_bo_id_conversions() {
        assert_eq!(BoId::from(7).values(), &[SqlValue::BigInt(7)]);
        assert_eq!(
            BoId::from("abc").values(),
            &[SqlValue::String("abc".to_string())]
        );
        let composite = BoId::from(vec![SqlValue::Int(1), SqlValue::from("x")]);
        assert_eq!(composite.len(), 2);
    }
}
