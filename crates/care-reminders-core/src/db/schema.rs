//! SQLite schema definition.

/// Complete database schema for the document store.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Documents
-- ============================================================================

-- One row per document; `collection` is the full path, e.g. users/{uid}/patients
CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    doc_id TEXT NOT NULL,
    data TEXT NOT NULL DEFAULT '{}' CHECK (json_valid(data) AND json_type(data) = 'object'),
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (collection, doc_id)
);

CREATE INDEX IF NOT EXISTS idx_documents_updated ON documents(collection, updated_at);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_valid() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.execute_batch(SCHEMA);
        assert!(result.is_ok(), "Schema should be valid SQL: {:?}", result);
    }

    #[test]
    fn test_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        assert!(conn.execute_batch(SCHEMA).is_ok());
    }

    #[test]
    fn test_data_must_be_json_object() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        let result = conn.execute(
            "INSERT INTO documents (collection, doc_id, data) VALUES ('c', 'a', 'not json')",
            [],
        );
        assert!(result.is_err());

        let result = conn.execute(
            "INSERT INTO documents (collection, doc_id, data) VALUES ('c', 'b', '[1, 2]')",
            [],
        );
        assert!(result.is_err());

        let result = conn.execute(
            r#"INSERT INTO documents (collection, doc_id, data) VALUES ('c', 'c', '{"name": "Max"}')"#,
            [],
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_doc_id_unique_per_collection() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        conn.execute(
            "INSERT INTO documents (collection, doc_id) VALUES ('users/a/patients', 'p1')",
            [],
        )
        .unwrap();

        // Same ID in another collection is fine
        let result = conn.execute(
            "INSERT INTO documents (collection, doc_id) VALUES ('users/b/patients', 'p1')",
            [],
        );
        assert!(result.is_ok());

        let result = conn.execute(
            "INSERT INTO documents (collection, doc_id) VALUES ('users/a/patients', 'p1')",
            [],
        );
        assert!(result.is_err());
    }
}
