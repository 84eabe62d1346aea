use super::error::{FabricError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Globally unique feature key in its braced, upper-case wire form,
/// e.g. `{0F4C5B2A-6E31-4E4B-9D0B-0A6B3C1D2E4F}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GlobalId(String);

impl GlobalId {
    /// All-zero identifier the parcel fabric reads as "create a new feature".
    pub const NIL: &'static str = "{00000000-0000-0000-0000-000000000000}";

    /// Wraps an identifier exactly as the remote store reported it.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn nil() -> Self {
        Self(Self::NIL.to_string())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(format!("{{{}}}", uuid.hyphenated().to_string().to_uppercase()))
    }

    /// Canonicalizes a client-generated unique id: braces are added if missing
    /// and hex digits are upper-cased.
    pub fn from_generated(raw: &str) -> Result<Self> {
        let bare = raw.trim().trim_start_matches('{').trim_end_matches('}');
        if bare.is_empty() {
            return Err(FabricError::InvalidInput(
                "generated unique id is empty".to_string(),
            ));
        }
        Ok(Self(format!("{{{}}}", bare.to_uppercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_nil(&self) -> bool {
        self.0 == Self::NIL
    }
}

impl fmt::Display for GlobalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque edit-session token handed out by the version context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Block of object ids reserved on a layer, starting at `first_object_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectIdReservation {
    pub first_object_id: i64,
    #[serde(default = "default_reservation_count")]
    pub count: u32,
}

fn default_reservation_count() -> u32 {
    1
}

/// A resolved record: the grouping entity every fabric edit is tagged with.
///
/// There is no unresolved state; a name without an id is just a `&str`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    name: String,
    id: GlobalId,
}

impl Record {
    pub fn new(name: impl Into<String>, id: GlobalId) -> Self {
        Self {
            name: name.into(),
            id,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> &GlobalId {
        &self.id
    }
}

/// A feature taking part in an edit, addressed by global id and owning layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParcelFeatureRef {
    pub id: GlobalId,
    pub layer_id: u32,
}

impl ParcelFeatureRef {
    pub fn new(id: GlobalId, layer_id: u32) -> Self {
        Self { id, layer_id }
    }
}

/// Parcel fabric server operations this crate drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FabricOperation {
    AssignFeaturesToRecord,
    CreateSeeds,
    Build,
    CopyLinesToParcelType,
    Merge,
}

impl FabricOperation {
    /// Path segment under the parcel fabric service.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::AssignFeaturesToRecord => "assignFeaturesToRecord",
            Self::CreateSeeds => "createSeeds",
            Self::Build => "build",
            Self::CopyLinesToParcelType => "copyLinesToParcelType",
            Self::Merge => "merge",
        }
    }
}

impl fmt::Display for FabricOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.endpoint())
    }
}

/// Result of an edit the remote store accepted.
///
/// Only built when the service reported `success: true`.
#[derive(Debug, Clone)]
pub struct EditOutcome {
    pub operation: FabricOperation,
    /// `serviceEdits` exactly as returned; not interpreted here.
    pub service_edits: serde_json::Value,
    /// Set when the edit committed but closing the session failed.
    pub release_error: Option<FabricError>,
}

impl EditOutcome {
    /// True when the edit committed and the session was released.
    pub fn is_clean(&self) -> bool {
        self.release_error.is_none()
    }
}
