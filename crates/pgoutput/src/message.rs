//! Decoded wire message bodies and table schema definitions.

use serde::Serialize;

use crate::tuple::TupleValue;

/// One decoded change-stream message, before enrichment.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Begin(BeginBody),
    Commit(CommitBody),
    Origin(OriginBody),
    Relation(RelationDef),
    Type(TypeDef),
    Insert(InsertBody),
    Update(UpdateBody),
    Delete(DeleteBody),
    Truncate(TruncateBody),
    /// Tag byte selected no known decoder.
    Unknown { raw_tag: u8 },
}

/// Transaction begin.
#[derive(Debug, Clone, PartialEq)]
pub struct BeginBody {
    pub lsn: u64,
    /// Microseconds since 2000-01-01T00:00:00Z.
    pub timestamp: i64,
    pub xid: u32,
}

/// Transaction commit.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitBody {
    pub flags: u8,
    pub lsn: u64,
    pub end_lsn: u64,
    pub timestamp: i64,
}

/// Replication origin.
#[derive(Debug, Clone, PartialEq)]
pub struct OriginBody {
    pub lsn: u64,
    pub name: String,
}

/// Row insert.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertBody {
    pub relation_id: u32,
    pub tuple: Vec<TupleValue>,
}

/// Row update. `old_tuple` is present only when the relation's replica
/// identity includes old values.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateBody {
    pub relation_id: u32,
    pub old_tuple: Option<Vec<TupleValue>>,
    pub new_tuple: Vec<TupleValue>,
}

/// Row delete.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteBody {
    pub relation_id: u32,
    pub tuple: Vec<TupleValue>,
}

/// Table truncate.
#[derive(Debug, Clone, PartialEq)]
pub struct TruncateBody {
    pub cascade: bool,
    pub restart_identity: bool,
    pub relation_ids: Vec<u32>,
}

/// Per-table replica identity setting, from the one-byte wire code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplicaIdentity {
    Default,
    Nothing,
    Full,
    Index,
    Unknown(u8),
}

impl From<u8> for ReplicaIdentity {
    fn from(code: u8) -> Self {
        match code {
            b'd' => ReplicaIdentity::Default,
            b'n' => ReplicaIdentity::Nothing,
            b'f' => ReplicaIdentity::Full,
            b'i' => ReplicaIdentity::Index,
            other => ReplicaIdentity::Unknown(other),
        }
    }
}

/// A single column of a relation. Order within [`RelationDef::columns`] is
/// significant: it is the only way tuple values are correlated to columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDef {
    pub name: String,
    pub flags: u8,
    pub type_id: u32,
    pub type_modifier: i32,
}

impl ColumnDef {
    /// Whether the column is part of the table's key (flag bit 0).
    pub fn is_key(&self) -> bool {
        self.flags & 1 == 1
    }
}

/// A table definition announced by a Relation message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationDef {
    pub relation_id: u32,
    pub namespace: String,
    pub name: String,
    pub replica_identity: ReplicaIdentity,
    pub columns: Vec<ColumnDef>,
}

impl RelationDef {
    /// `"{namespace}.{name}"`.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }
}

/// A custom type definition announced by a Type message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeDef {
    pub type_id: u32,
    pub namespace: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replica_identity_codes() {
        assert_eq!(ReplicaIdentity::from(b'd'), ReplicaIdentity::Default);
        assert_eq!(ReplicaIdentity::from(b'n'), ReplicaIdentity::Nothing);
        assert_eq!(ReplicaIdentity::from(b'f'), ReplicaIdentity::Full);
        assert_eq!(ReplicaIdentity::from(b'i'), ReplicaIdentity::Index);
        assert_eq!(ReplicaIdentity::from(b'z'), ReplicaIdentity::Unknown(b'z'));
    }

    #[test]
    fn test_column_key_flag() {
        let col = ColumnDef {
            name: "id".into(),
            flags: 1,
            type_id: 23,
            type_modifier: -1,
        };
        assert!(col.is_key());
        assert!(!ColumnDef { flags: 0, ..col }.is_key());
    }
}
