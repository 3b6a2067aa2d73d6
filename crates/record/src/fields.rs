//! Field name <-> field index mapping

use std::collections::HashMap;

use crate::error::{RecordError, Result};
use crate::record::FieldIndex;

/// Bidirectional mapping between field names and field indices
///
/// Built once from the ordered list of configured field names; the position
/// of a name in that list is its index.
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    names: Vec<String>,
    indices: HashMap<String, FieldIndex>,
}

impl FieldMap {
    /// Build a field map from ordered names
    ///
    /// # Errors
    ///
    /// Fails on an empty or duplicate name.
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut map = Self::default();
        for name in names {
            let name = name.into();
            if name.is_empty() {
                return Err(RecordError::InvalidLayout(
                    "field names cannot be empty".into(),
                ));
            }
            if map.indices.contains_key(&name) {
                return Err(RecordError::DuplicateField(name));
            }
            map.indices.insert(name.clone(), map.names.len());
            map.names.push(name);
        }
        Ok(map)
    }

    /// Index of a named field
    #[inline]
    pub fn index_of(&self, name: &str) -> Option<FieldIndex> {
        self.indices.get(name).copied()
    }

    /// Name of the field at `index`
    #[inline]
    pub fn name_of(&self, index: FieldIndex) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Index of a named field, or `RecordError::UnknownField`
    pub fn resolve(&self, name: &str) -> Result<FieldIndex> {
        self.index_of(name)
            .ok_or_else(|| RecordError::UnknownField(name.to_string()))
    }

    /// Resolve several names at once, preserving order
    pub fn resolve_all<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<FieldIndex>> {
        names.iter().map(|n| self.resolve(n.as_ref())).collect()
    }

    /// Number of named fields
    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no fields are named
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Field names in index order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bidirectional_lookup() {
        let fields = FieldMap::new(["host", "level", "message"]).unwrap();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields.index_of("level"), Some(1));
        assert_eq!(fields.name_of(2), Some("message"));
        assert_eq!(fields.index_of("missing"), None);
        assert_eq!(fields.name_of(3), None);
    }

    #[test]
    fn test_duplicate_rejected() {
        let err = FieldMap::new(["a", "b", "a"]).unwrap_err();
        assert_eq!(err, RecordError::DuplicateField("a".into()));
    }

    #[test]
    fn test_resolve_all() {
        let fields = FieldMap::new(["a", "b", "c"]).unwrap();
        assert_eq!(fields.resolve_all(&["c", "a"]).unwrap(), vec![2, 0]);
        assert!(fields.resolve_all(&["c", "z"]).is_err());
    }
}
