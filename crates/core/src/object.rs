use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Map identifier.
pub type MapId = i64;

/// Side (faction/team) identifier.
pub type SideId = i64;

/// Geo-object identifier.
pub type ObjectId = i64;

/// Observer identifier.
pub type ObserverId = i64;

/// A geo-tagged object placed on a map.
///
/// The filtering engine only ever reads these; creation, editing and
/// deletion belong to the surrounding CRUD layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoObject {
    pub id: ObjectId,
    pub map_id: MapId,
    /// Owning side. Objects without a side affiliation use `None`.
    pub side_id: Option<SideId>,
    pub name: String,
    /// Soft-delete / draft flag set by the CRUD layer.
    pub active: bool,
    /// Optional hard expiry; expired objects never reach observers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl GeoObject {
    /// Whether the object is currently visible to any observer at all:
    /// active and not past its expiry.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.active && self.expires_at.map(|t| t > now).unwrap_or(true)
    }
}
