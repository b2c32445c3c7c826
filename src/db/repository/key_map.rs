use std::collections::HashMap;

use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::{ResourceRef, SurrogateId};

pub fn find_key(
    conn: &Connection,
    namespace: &str,
    reference: ResourceRef,
) -> Result<Option<SurrogateId>, DatabaseError> {
    let found = conn
        .query_row(
            "SELECT surrogate_id FROM key_map
             WHERE namespace = ?1 AND resource_type = ?2 AND resource_id = ?3",
            params![namespace, reference.resource_type.as_str(), reference.id.to_string()],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(found.map(SurrogateId::new))
}

/// INSERT OR IGNORE under the unique constraint, then reselect: concurrent
/// callers for the same reference all land on the one surviving row.
pub fn find_or_create_key(
    conn: &Connection,
    namespace: &str,
    reference: ResourceRef,
) -> Result<SurrogateId, DatabaseError> {
    conn.execute(
        "INSERT OR IGNORE INTO key_map (namespace, resource_type, resource_id, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            namespace,
            reference.resource_type.as_str(),
            reference.id.to_string(),
            chrono::Utc::now().to_rfc3339(),
        ],
    )?;
    let id = conn.query_row(
        "SELECT surrogate_id FROM key_map
         WHERE namespace = ?1 AND resource_type = ?2 AND resource_id = ?3",
        params![namespace, reference.resource_type.as_str(), reference.id.to_string()],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(SurrogateId::new(id))
}

pub fn find_keys(
    conn: &Connection,
    namespace: &str,
    references: &[ResourceRef],
) -> Result<HashMap<ResourceRef, SurrogateId>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT surrogate_id FROM key_map
         WHERE namespace = ?1 AND resource_type = ?2 AND resource_id = ?3",
    )?;

    let mut resolved = HashMap::with_capacity(references.len());
    for &reference in references {
        let found = stmt
            .query_row(
                params![namespace, reference.resource_type.as_str(), reference.id.to_string()],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        if let Some(id) = found {
            resolved.insert(reference, SurrogateId::new(id));
        }
    }
    Ok(resolved)
}

pub fn find_or_create_keys(
    conn: &Connection,
    namespace: &str,
    references: &[ResourceRef],
) -> Result<HashMap<ResourceRef, SurrogateId>, DatabaseError> {
    let now = chrono::Utc::now().to_rfc3339();
    let mut insert = conn.prepare(
        "INSERT OR IGNORE INTO key_map (namespace, resource_type, resource_id, created_at)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    let mut select = conn.prepare(
        "SELECT surrogate_id FROM key_map
         WHERE namespace = ?1 AND resource_type = ?2 AND resource_id = ?3",
    )?;

    let mut resolved = HashMap::with_capacity(references.len());
    for &reference in references {
        insert.execute(params![
            namespace,
            reference.resource_type.as_str(),
            reference.id.to_string(),
            now,
        ])?;
        let id = select.query_row(
            params![namespace, reference.resource_type.as_str(), reference.id.to_string()],
            |row| row.get::<_, i64>(0),
        )?;
        resolved.insert(reference, SurrogateId::new(id));
    }
    Ok(resolved)
}
