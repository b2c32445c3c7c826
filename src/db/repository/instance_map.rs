use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{InstanceMapping, ResourceRef};

pub fn find_instance_mapping(
    conn: &Connection,
    namespace: &str,
    reference: ResourceRef,
) -> Result<Option<Uuid>, DatabaseError> {
    let found = conn
        .query_row(
            "SELECT canonical_id FROM instance_map
             WHERE namespace = ?1 AND resource_type = ?2 AND resource_id = ?3",
            params![namespace, reference.resource_type.as_str(), reference.id.to_string()],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    found.map(|raw| parse_uuid("canonical_id", &raw)).transpose()
}

/// The first resource to claim a mapping value becomes the canonical id for
/// it; every later resource with the same value collapses onto that id.
/// Both inserts are OR IGNORE, so a raced call converges on the winner.
pub fn find_or_create_instance_mapping(
    conn: &Connection,
    namespace: &str,
    reference: ResourceRef,
    mapping_value: &str,
) -> Result<InstanceMapping, DatabaseError> {
    let now = chrono::Utc::now().to_rfc3339();

    conn.execute(
        "INSERT OR IGNORE INTO instance_canonical
             (namespace, resource_type, mapping_value, canonical_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            namespace,
            reference.resource_type.as_str(),
            mapping_value,
            reference.id.to_string(),
            now,
        ],
    )?;
    let canonical: String = conn.query_row(
        "SELECT canonical_id FROM instance_canonical
         WHERE namespace = ?1 AND resource_type = ?2 AND mapping_value = ?3",
        params![namespace, reference.resource_type.as_str(), mapping_value],
        |row| row.get(0),
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO instance_map
             (namespace, resource_type, resource_id, canonical_id, mapping_value, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            namespace,
            reference.resource_type.as_str(),
            reference.id.to_string(),
            canonical,
            mapping_value,
            now,
        ],
    )?;
    // Reselect rather than trusting our insert: an earlier mapping row for
    // this resource wins over the one we just tried to write.
    let (mapped, stored_value): (String, Option<String>) = conn.query_row(
        "SELECT canonical_id, mapping_value FROM instance_map
         WHERE namespace = ?1 AND resource_type = ?2 AND resource_id = ?3",
        params![namespace, reference.resource_type.as_str(), reference.id.to_string()],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(InstanceMapping {
        resource_id: reference.id,
        canonical_id: parse_uuid("canonical_id", &mapped)?,
        mapping_value: stored_value,
    })
}

fn parse_uuid(field: &str, raw: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(raw).map_err(|_| DatabaseError::InvalidUuid {
        field: field.to_string(),
        value: raw.to_string(),
    })
}
