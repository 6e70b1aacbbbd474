//! Field identity across a migration
//!
//! Matching runs in two phases: first by GUID, then by case-insensitive name
//! among the fields still unmatched. The name fallback only applies when one
//! side carries no GUID; two different GUIDs always denote different fields.

use crate::contract::{FieldInfo, SchemaError};
use std::collections::HashSet;

/// Pairing of new fields with old fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMatching {
    new_to_old: Vec<Option<usize>>,
    old_matched: Vec<bool>,
}

impl FieldMatching {
    /// Index of the old field matched to the new field at `new_index`
    pub fn old_for(&self, new_index: usize) -> Option<usize> {
        self.new_to_old.get(new_index).copied().flatten()
    }

    /// Old fields without a counterpart, in old declaration order
    pub fn unmatched_old(&self) -> impl Iterator<Item = usize> + '_ {
        self.old_matched
            .iter()
            .enumerate()
            .filter(|(_, matched)| !**matched)
            .map(|(i, _)| i)
    }
}

fn names_match(old: &FieldInfo, new: &FieldInfo) -> bool {
    (old.guid.is_nil() || new.guid.is_nil()) && old.name.eq_ignore_ascii_case(&new.name)
}

/// Pair every new field with at most one old field
pub fn match_fields(old: &[FieldInfo], new: &[FieldInfo]) -> FieldMatching {
    let mut new_to_old = vec![None; new.len()];
    let mut old_matched = vec![false; old.len()];

    for (n, new_field) in new.iter().enumerate() {
        if new_field.guid.is_nil() {
            continue;
        }
        if let Some(o) =
            (0..old.len()).find(|&o| !old_matched[o] && old[o].guid == new_field.guid)
        {
            new_to_old[n] = Some(o);
            old_matched[o] = true;
        }
    }

    for (n, new_field) in new.iter().enumerate() {
        if new_to_old[n].is_some() {
            continue;
        }
        if let Some(o) =
            (0..old.len()).find(|&o| !old_matched[o] && names_match(&old[o], new_field))
        {
            new_to_old[n] = Some(o);
            old_matched[o] = true;
        }
    }

    FieldMatching {
        new_to_old,
        old_matched,
    }
}

/// Reject definitions where two fields share a name or a GUID
pub fn validate_unique(fields: &[FieldInfo]) -> Result<(), SchemaError> {
    let mut names = HashSet::new();
    let mut guids = HashSet::new();
    for field in fields {
        let fresh_name = names.insert(field.name.to_ascii_lowercase());
        let fresh_guid = field.guid.is_nil() || guids.insert(field.guid);
        if !fresh_name || !fresh_guid {
            return Err(SchemaError::DuplicateField {
                field: field.name.clone(),
            });
        }
    }
    Ok(())
}
