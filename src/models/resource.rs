//! Resource identity and payload types.
//!
//! A resource is a versioned clinical record identified by `(type, uuid)`.
//! Deletion is logical: a deleted resource keeps its identity and may keep
//! its surrogate key, it just carries no content.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::DatabaseError;

// ═══════════════════════════════════════════
// Resource type
// ═══════════════════════════════════════════

/// Generates an enum with `as_str` + `FromStr` over the wire spelling.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }

            pub fn all() -> &'static [$name] {
                &[$(Self::$variant),+]
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }
    };
}

str_enum!(ResourceType {
    Patient => "Patient",
    Organization => "Organization",
    Practitioner => "Practitioner",
    Encounter => "Encounter",
    Observation => "Observation",
    AllergyIntolerance => "AllergyIntolerance",
    Immunization => "Immunization",
    MedicationStatement => "MedicationStatement",
});

// ═══════════════════════════════════════════
// Resource reference
// ═══════════════════════════════════════════

/// Identity of one resource: type plus source UUID.
///
/// Renders as `Type/uuid`, the spelling used in reference fields and in
/// cache keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    pub resource_type: ResourceType,
    pub id: Uuid,
}

impl ResourceRef {
    pub fn new(resource_type: ResourceType, id: Uuid) -> Self {
        Self { resource_type, id }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource_type, self.id)
    }
}

// ═══════════════════════════════════════════
// Resource content + state
// ═══════════════════════════════════════════

/// The current version body of a resource, as stored in the canonical store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceContent {
    body: serde_json::Value,
}

impl ResourceContent {
    pub fn new(body: serde_json::Value) -> Self {
        Self { body }
    }

    pub fn body(&self) -> &serde_json::Value {
        &self.body
    }

    /// Top-level string field, trimmed; `None` for absent or blank values.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        let value = self.body.get(key)?.as_str()?.trim();
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }
}

/// Lifecycle state of one resource version.
///
/// Deletion is a state, not an absence: a `Deleted` entry still names the
/// resource so its output rows can be retracted.
#[derive(Debug, Clone)]
pub enum ResourceState {
    Present(ResourceContent),
    Deleted,
}

impl ResourceState {
    pub fn is_deleted(&self) -> bool {
        matches!(self, Self::Deleted)
    }

    pub fn content(&self) -> Option<&ResourceContent> {
        match self {
            Self::Present(content) => Some(content),
            Self::Deleted => None,
        }
    }
}

// ═══════════════════════════════════════════
// Batch entry
// ═══════════════════════════════════════════

/// One member of a processing batch.
#[derive(Debug, Clone)]
pub struct ResourceEntry {
    pub reference: ResourceRef,
    pub state: ResourceState,
}

impl ResourceEntry {
    pub fn present(resource_type: ResourceType, id: Uuid, body: serde_json::Value) -> Self {
        Self {
            reference: ResourceRef::new(resource_type, id),
            state: ResourceState::Present(ResourceContent::new(body)),
        }
    }

    pub fn deleted(resource_type: ResourceType, id: Uuid) -> Self {
        Self {
            reference: ResourceRef::new(resource_type, id),
            state: ResourceState::Deleted,
        }
    }
}
