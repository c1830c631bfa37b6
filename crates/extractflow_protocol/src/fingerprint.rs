use crate::types::Schema;
use blake3::Hasher;

const SEP: u8 = 0x1f;

fn hash_parts<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let mut hasher = Hasher::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update(&[SEP]);
    }
    hasher.finalize().to_hex().to_string()
}

/// Stable hash of a schema's ordered (name, type) list.
///
/// Two schemas share a fingerprint exactly when they are structurally equal;
/// the table identity does not participate.
pub fn schema_fingerprint(schema: &Schema) -> String {
    hash_parts(
        schema
            .columns()
            .iter()
            .flat_map(|c| [c.name.as_str(), c.column_type.as_str()]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ColumnDef, ColumnType, TableName};

    fn schema(table: TableName, cols: &[(&str, ColumnType)]) -> Schema {
        Schema::try_new(
            table,
            cols.iter().map(|(n, t)| ColumnDef::new(*n, *t)).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_fingerprint_tracks_structure_only() {
        let a = schema(TableName::default(), &[("id", ColumnType::Integer)]);
        let b = schema(TableName::new("x", "y"), &[("id", ColumnType::Integer)]);
        let c = schema(TableName::default(), &[("id", ColumnType::Text)]);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn test_fingerprint_separator_prevents_concatenation_collisions() {
        let a = schema(
            TableName::default(),
            &[("ab", ColumnType::Text), ("c", ColumnType::Text)],
        );
        let b = schema(
            TableName::default(),
            &[("a", ColumnType::Text), ("bc", ColumnType::Text)],
        );
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
