//! Table schema cache, learned from Relation and Type messages.
//!
//! The wire format ships row values by position, so nothing downstream can
//! name a column without the relation definition that arrived earlier on
//! the same session. The registry owns every definition it stores; entries
//! are replaced wholesale when a relation or type is re-announced and only
//! an explicit [`SchemaRegistry::clear`] drops them — a fresh replication
//! session may renumber identifiers, so the transport resets the cache when
//! it reconnects.

use std::collections::HashMap;

use tracing::debug;

use crate::error::DecodeError;
use crate::message::{RelationDef, TypeDef};
use crate::tuple::TupleValue;

/// Result of correlating a tuple with a relation's columns.
#[derive(Debug, Clone, PartialEq)]
pub enum MappedTuple {
    /// Values paired with column names, in column order. Columns with no
    /// corresponding tuple value are absent; surplus tuple values appear
    /// under synthetic `extra_{index}` keys.
    Named(Vec<(String, TupleValue)>),
    /// The relation id was never announced; the tuple is returned as-is.
    Positional(Vec<TupleValue>),
}

/// Mutable cache of relation and type definitions, keyed by identifier.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    relations: HashMap<u32, RelationDef>,
    types: HashMap<u32, TypeDef>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a relation definition, replacing any prior entry for its id.
    pub fn add_relation(&mut self, relation: RelationDef) {
        self.relations.insert(relation.relation_id, relation);
    }

    /// Stores a type definition, replacing any prior entry for its id.
    pub fn add_type(&mut self, ty: TypeDef) {
        self.types.insert(ty.type_id, ty);
    }

    pub fn get_relation(&self, relation_id: u32) -> Option<&RelationDef> {
        self.relations.get(&relation_id)
    }

    pub fn get_type(&self, type_id: u32) -> Option<&TypeDef> {
        self.types.get(&type_id)
    }

    /// `"{namespace}.{name}"` for a known relation id.
    pub fn get_full_table_name(&self, relation_id: u32) -> Option<String> {
        self.relations.get(&relation_id).map(RelationDef::full_name)
    }

    /// Names of the key columns of a relation, in original column order.
    /// Empty when the id is unknown.
    pub fn get_primary_key_columns(&self, relation_id: u32) -> Vec<String> {
        match self.relations.get(&relation_id) {
            Some(rel) => rel
                .columns
                .iter()
                .filter(|c| c.is_key())
                .map(|c| c.name.clone())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Correlates tuple values with column names by position.
    ///
    /// With an unknown relation id this degrades to the raw positional
    /// list; callers must check for that shape. Otherwise values are zipped
    /// with columns: trailing columns the tuple did not cover are omitted
    /// (not null-filled — absence and an explicit null are different things
    /// to consumers), and surplus values get `extra_{index}` keys.
    pub fn map_tuple_to_columns(&self, relation_id: u32, tuple: &[TupleValue]) -> MappedTuple {
        let Some(rel) = self.relations.get(&relation_id) else {
            debug!("{}", DecodeError::UnresolvedRelation { relation_id });
            return MappedTuple::Positional(tuple.to_vec());
        };

        let mut named = Vec::with_capacity(tuple.len());
        for (i, value) in tuple.iter().enumerate() {
            let key = match rel.columns.get(i) {
                Some(col) => col.name.clone(),
                None => format!("extra_{i}"),
            };
            named.push((key, value.clone()));
        }
        MappedTuple::Named(named)
    }

    /// Drops all relation and type entries. Called by the transport when a
    /// fresh decoding session starts against a slot.
    pub fn clear(&mut self) {
        self.relations.clear();
        self.types.clear();
    }

    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty() && self.types.is_empty()
    }
}
