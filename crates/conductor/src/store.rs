//! Device metadata store.
//!
//! The controller asks the store for a room's evaluator configuration and its
//! devices. [`InventoryStore`] serves both from a JSON inventory file:
//!
//! ```json
//! {
//!   "rooms": [{
//!     "building": "ITB",
//!     "room": "1101",
//!     "configuration": {"id": "ITB-1101", "evaluators": [{"key": "PowerOnDefault"}]},
//!     "devices": [{"id": "D1", "name": "D1", "address": "d1.local", "roles": ["VideoOut"]}]
//!   }]
//! }
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use roomproto::{Device, RoomConfiguration};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read inventory {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse inventory {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no room {0} in inventory")]
    UnknownRoom(String),
}

/// Read access to room and device metadata.
#[async_trait]
pub trait DeviceStore: Send + Sync {
    async fn room_configuration(
        &self,
        building: &str,
        room: &str,
    ) -> Result<RoomConfiguration, StoreError>;

    async fn devices_in_room(&self, building: &str, room: &str) -> Result<Vec<Device>, StoreError>;
}

/// One room's entry in the inventory file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomInventory {
    pub building: String,
    pub room: String,
    #[serde(default)]
    pub configuration: RoomConfiguration,
    #[serde(default)]
    pub devices: Vec<Device>,
}

#[derive(Debug, Default, Deserialize)]
struct InventoryFile {
    #[serde(default)]
    rooms: Vec<RoomInventory>,
}

/// In-memory store loaded once from an inventory file.
#[derive(Debug, Clone, Default)]
pub struct InventoryStore {
    rooms: Vec<RoomInventory>,
}

impl InventoryStore {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| StoreError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let file: InventoryFile =
            serde_json::from_str(&content).map_err(|source| StoreError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        tracing::info!(path = %path.display(), rooms = file.rooms.len(), "inventory loaded");
        Ok(Self::from_rooms(file.rooms))
    }

    /// Devices inherit their room's building and room when left blank.
    pub fn from_rooms(rooms: Vec<RoomInventory>) -> Self {
        let rooms = rooms
            .into_iter()
            .map(|mut entry| {
                if entry.configuration.id.is_empty() {
                    entry.configuration.id = format!("{}-{}", entry.building, entry.room);
                }
                for device in &mut entry.devices {
                    if device.building.is_empty() {
                        device.building = entry.building.clone();
                    }
                    if device.room.is_empty() {
                        device.room = entry.room.clone();
                    }
                }
                entry
            })
            .collect();
        Self { rooms }
    }

    fn find(&self, building: &str, room: &str) -> Result<&RoomInventory, StoreError> {
        self.rooms
            .iter()
            .find(|r| r.building.eq_ignore_ascii_case(building) && r.room.eq_ignore_ascii_case(room))
            .ok_or_else(|| StoreError::UnknownRoom(format!("{building}-{room}")))
    }

    pub fn rooms(&self) -> &[RoomInventory] {
        &self.rooms
    }
}

#[async_trait]
impl DeviceStore for InventoryStore {
    async fn room_configuration(
        &self,
        building: &str,
        room: &str,
    ) -> Result<RoomConfiguration, StoreError> {
        Ok(self.find(building, room)?.configuration.clone())
    }

    async fn devices_in_room(&self, building: &str, room: &str) -> Result<Vec<Device>, StoreError> {
        Ok(self.find(building, room)?.devices.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const INVENTORY: &str = r#"{
        "rooms": [{
            "building": "ITB",
            "room": "1101",
            "configuration": {"id": "ITB-1101", "evaluators": [{"key": "PowerOnDefault", "priority": 2}]},
            "devices": [
                {"id": "D1", "name": "D1", "address": "d1.local", "roles": ["VideoOut"], "output": true},
                {"id": "laptop", "name": "laptop", "input": true}
            ]
        }]
    }"#;

    #[tokio::test]
    async fn test_load_inventory_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(INVENTORY.as_bytes()).unwrap();

        let store = InventoryStore::load(file.path()).await.unwrap();
        let config = store.room_configuration("ITB", "1101").await.unwrap();
        assert_eq!(config.evaluators[0].priority, Some(2));

        let devices = store.devices_in_room("itb", "1101").await.unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].building, "ITB");
        assert_eq!(devices[1].room, "1101");
    }

    #[tokio::test]
    async fn test_unknown_room() {
        let store = InventoryStore::default();
        let err = store.devices_in_room("ITB", "9999").await.unwrap_err();
        assert!(matches!(err, StoreError::UnknownRoom(id) if id == "ITB-9999"));
    }

    #[tokio::test]
    async fn test_malformed_inventory() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();
        let err = InventoryStore::load(file.path()).await.unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }));
    }

    #[test]
    fn test_configuration_id_defaults_to_room() {
        let store = InventoryStore::from_rooms(vec![RoomInventory {
            building: "ITB".to_string(),
            room: "1101".to_string(),
            ..Default::default()
        }]);
        assert_eq!(store.rooms()[0].configuration.id, "ITB-1101");
    }
}
