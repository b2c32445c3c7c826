use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{ResourceRef, ResourceType};

/// Append one audit row for a resource pulled into a run outside its batch.
pub fn record_extra_resource(
    conn: &Connection,
    namespace: &str,
    run_id: Uuid,
    reference: ResourceRef,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO extra_resources (run_id, namespace, resource_type, resource_id, recorded_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            run_id.to_string(),
            namespace,
            reference.resource_type.as_str(),
            reference.id.to_string(),
            chrono::Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Everything a run pulled in on demand, in insertion order. Operational
/// tooling only — the pipeline itself never reads this back.
pub fn list_extra_resources(
    conn: &Connection,
    run_id: Uuid,
) -> Result<Vec<ResourceRef>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT resource_type, resource_id FROM extra_resources
         WHERE run_id = ?1 ORDER BY rowid",
    )?;
    let rows = stmt.query_map(params![run_id.to_string()], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut references = Vec::new();
    for row in rows {
        let (type_raw, id_raw) = row?;
        let resource_type = ResourceType::from_str(&type_raw)?;
        let id = Uuid::parse_str(&id_raw).map_err(|_| DatabaseError::InvalidUuid {
            field: "resource_id".to_string(),
            value: id_raw,
        })?;
        references.push(ResourceRef::new(resource_type, id));
    }
    Ok(references)
}
