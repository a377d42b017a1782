//! Document database operations.

use rusqlite::{params, OptionalExtension};
use serde_json::{Map, Value};

use super::{Database, DbError, DbResult};
use crate::models::Document;

impl Database {
    /// Insert a new document. Fails if the ID is taken in that collection.
    pub fn insert_document(
        &self,
        collection: &str,
        doc_id: &str,
        data: &Map<String, Value>,
    ) -> DbResult<()> {
        let data_json = serde_json::to_string(data)?;

        self.conn
            .execute(
                "INSERT INTO documents (collection, doc_id, data) VALUES (?1, ?2, ?3)",
                params![collection, doc_id, data_json],
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(err, _)
                    if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    DbError::Constraint(format!("{}/{} already exists", collection, doc_id))
                }
                other => other.into(),
            })?;
        Ok(())
    }

    /// Insert or replace a document's data. Keeps its position in insertion order.
    pub fn upsert_document(
        &self,
        collection: &str,
        doc_id: &str,
        data: &Map<String, Value>,
    ) -> DbResult<()> {
        let data_json = serde_json::to_string(data)?;

        self.conn.execute(
            r#"
            INSERT INTO documents (collection, doc_id, data) VALUES (?1, ?2, ?3)
            ON CONFLICT(collection, doc_id) DO UPDATE SET
                data = excluded.data,
                updated_at = datetime('now')
            "#,
            params![collection, doc_id, data_json],
        )?;
        Ok(())
    }

    /// Shallow-merge `patch` into an existing document.
    pub fn merge_document(
        &self,
        collection: &str,
        doc_id: &str,
        patch: &Map<String, Value>,
    ) -> DbResult<()> {
        let mut doc = self
            .get_document(collection, doc_id)?
            .ok_or_else(|| DbError::NotFound(format!("{}/{}", collection, doc_id)))?;

        for (key, value) in patch {
            doc.data.insert(key.clone(), value.clone());
        }

        let data_json = serde_json::to_string(&doc.data)?;
        self.conn.execute(
            r#"
            UPDATE documents SET
                data = ?3,
                updated_at = datetime('now')
            WHERE collection = ?1 AND doc_id = ?2
            "#,
            params![collection, doc_id, data_json],
        )?;
        Ok(())
    }

    /// Get a document by ID.
    pub fn get_document(&self, collection: &str, doc_id: &str) -> DbResult<Option<Document>> {
        let row: Option<String> = self
            .conn
            .query_row(
                "SELECT data FROM documents WHERE collection = ?1 AND doc_id = ?2",
                params![collection, doc_id],
                |row| row.get(0),
            )
            .optional()?;

        row.map(|data| parse_document(doc_id.to_string(), &data))
            .transpose()
    }

    /// List all documents in a collection, in insertion order.
    pub fn list_documents(&self, collection: &str) -> DbResult<Vec<Document>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT doc_id, data
            FROM documents
            WHERE collection = ?
            ORDER BY rowid
            "#,
        )?;

        let rows = stmt.query_map([collection], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut documents = Vec::new();
        for row in rows {
            let (doc_id, data) = row?;
            documents.push(parse_document(doc_id, &data)?);
        }
        Ok(documents)
    }

    /// Delete a document.
    pub fn delete_document(&self, collection: &str, doc_id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND doc_id = ?2",
            params![collection, doc_id],
        )?;
        Ok(rows_affected > 0)
    }
}

fn parse_document(doc_id: String, data: &str) -> DbResult<Document> {
    let data: Map<String, Value> = serde_json::from_str(data)?;
    Ok(Document::new(doc_id, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PATIENTS: &str = "users/u1/patients";

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn data(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let db = setup_db();

        db.insert_document(PATIENTS, "p1", &data(json!({ "name": "John Doe", "time": "8:00 AM" })))
            .unwrap();

        let doc = db.get_document(PATIENTS, "p1").unwrap().unwrap();
        assert_eq!(doc.id, "p1");
        assert_eq!(doc.data["name"], json!("John Doe"));
        assert_eq!(doc.data["time"], json!("8:00 AM"));

        assert!(db.get_document(PATIENTS, "missing").unwrap().is_none());
        assert!(db.get_document("users/u2/patients", "p1").unwrap().is_none());
    }

    #[test]
    fn test_insert_duplicate_is_constraint() {
        let db = setup_db();
        db.insert_document(PATIENTS, "p1", &Map::new()).unwrap();

        let err = db.insert_document(PATIENTS, "p1", &Map::new()).unwrap_err();
        assert!(matches!(err, DbError::Constraint(_)));
    }

    #[test]
    fn test_merge_document() {
        let db = setup_db();
        db.insert_document(PATIENTS, "p1", &data(json!({ "name": "Jane Smith", "status": "upcoming" })))
            .unwrap();

        db.merge_document(PATIENTS, "p1", &data(json!({ "status": "done" })))
            .unwrap();

        let doc = db.get_document(PATIENTS, "p1").unwrap().unwrap();
        assert_eq!(doc.data["status"], json!("done"));
        assert_eq!(doc.data["name"], json!("Jane Smith"));

        let err = db.merge_document(PATIENTS, "nope", &Map::new()).unwrap_err();
        assert!(matches!(err, DbError::NotFound(_)));
    }

    #[test]
    fn test_list_in_insertion_order() {
        let db = setup_db();
        db.insert_document(PATIENTS, "b", &data(json!({ "name": "Bob" }))).unwrap();
        db.insert_document(PATIENTS, "a", &data(json!({ "name": "Alice" }))).unwrap();
        db.insert_document("users/u2/patients", "c", &Map::new()).unwrap();

        // Upsert keeps the original position
        db.upsert_document(PATIENTS, "b", &data(json!({ "name": "Bobby" }))).unwrap();

        let ids: Vec<_> = db
            .list_documents(PATIENTS)
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_delete_document() {
        let db = setup_db();
        db.insert_document(PATIENTS, "p1", &Map::new()).unwrap();

        assert!(db.delete_document(PATIENTS, "p1").unwrap());
        assert!(!db.delete_document(PATIENTS, "p1").unwrap());
        assert!(db.list_documents(PATIENTS).unwrap().is_empty());
    }
}
