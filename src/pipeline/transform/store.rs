//! SQLite-backed collaborator stores.
//!
//! Bridges the pipeline traits to the repository layer. Each store owns one
//! connection behind a mutex; worker threads that want more parallelism can
//! open one store per thread on the same database file.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use uuid::Uuid;

use super::error::TransformError;
use super::traits::{AuditStore, InstanceMapStore, KeyStore};
use crate::db::{self, repository, DatabaseError};
use crate::models::{InstanceMapping, ResourceRef, SurrogateId};

pub struct SqliteKeyStore {
    conn: Mutex<Connection>,
}

impl SqliteKeyStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn: Mutex::new(conn) }
    }

    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Ok(Self::new(db::open_database(path)?))
    }

    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Ok(Self::new(db::open_memory_database()?))
    }
}

impl KeyStore for SqliteKeyStore {
    fn find(
        &self,
        namespace: &str,
        reference: ResourceRef,
    ) -> Result<Option<SurrogateId>, TransformError> {
        let conn = self.conn.lock().unwrap();
        Ok(repository::find_key(&conn, namespace, reference)?)
    }

    fn find_or_create(
        &self,
        namespace: &str,
        reference: ResourceRef,
    ) -> Result<SurrogateId, TransformError> {
        let conn = self.conn.lock().unwrap();
        Ok(repository::find_or_create_key(&conn, namespace, reference)?)
    }

    fn find_many(
        &self,
        namespace: &str,
        references: &[ResourceRef],
    ) -> Result<std::collections::HashMap<ResourceRef, SurrogateId>, TransformError> {
        let conn = self.conn.lock().unwrap();
        Ok(repository::find_keys(&conn, namespace, references)?)
    }

    fn find_or_create_many(
        &self,
        namespace: &str,
        references: &[ResourceRef],
    ) -> Result<std::collections::HashMap<ResourceRef, SurrogateId>, TransformError> {
        let conn = self.conn.lock().unwrap();
        Ok(repository::find_or_create_keys(&conn, namespace, references)?)
    }
}

pub struct SqliteInstanceMapStore {
    conn: Mutex<Connection>,
}

impl SqliteInstanceMapStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn: Mutex::new(conn) }
    }

    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Ok(Self::new(db::open_database(path)?))
    }

    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Ok(Self::new(db::open_memory_database()?))
    }
}

impl InstanceMapStore for SqliteInstanceMapStore {
    fn find_instance_mapping(
        &self,
        namespace: &str,
        reference: ResourceRef,
    ) -> Result<Option<Uuid>, TransformError> {
        let conn = self.conn.lock().unwrap();
        Ok(repository::find_instance_mapping(&conn, namespace, reference)?)
    }

    fn find_or_create_instance_mapping(
        &self,
        namespace: &str,
        reference: ResourceRef,
        mapping_value: &str,
    ) -> Result<InstanceMapping, TransformError> {
        let conn = self.conn.lock().unwrap();
        Ok(repository::find_or_create_instance_mapping(
            &conn,
            namespace,
            reference,
            mapping_value,
        )?)
    }
}

pub struct SqliteAuditStore {
    conn: Mutex<Connection>,
}

impl SqliteAuditStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn: Mutex::new(conn) }
    }

    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Ok(Self::new(db::open_database(path)?))
    }

    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Ok(Self::new(db::open_memory_database()?))
    }
}

impl AuditStore for SqliteAuditStore {
    fn record_extra_resource(
        &self,
        namespace: &str,
        run_id: Uuid,
        reference: ResourceRef,
    ) -> Result<(), TransformError> {
        let conn = self.conn.lock().unwrap();
        Ok(repository::record_extra_resource(&conn, namespace, run_id, reference)?)
    }
}
