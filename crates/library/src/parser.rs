//! Loader for JSON library snapshots.
//!
//! A snapshot is a single JSON document describing users, items, and the
//! expensive per-item data the adapter serves:
//!
//! ```json
//! {
//!   "users": [{ "id": "...", "name": "alice" }],
//!   "items": [{ "id": "...", "kind": "Movie", "name": "Alien" }],
//!   "people": { "<item id>": [{ "name": "Sigourney Weaver", "role": "Actor" }] },
//!   "audioLanguages": { "<item id>": ["eng"] },
//!   "collections": [{ "id": "...", "name": "Alien Collection", "itemIds": ["..."] }],
//!   "userData": [{ "userId": "...", "itemId": "...", "playCount": 2 }]
//! }
//! ```

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::error::{LibraryError, Result};
use crate::index::LibraryIndex;
use crate::types::*;

/// On-disk shape of a library snapshot
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibrarySnapshot {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub items: Vec<MediaItem>,
    #[serde(default)]
    pub people: HashMap<ItemId, Vec<Person>>,
    #[serde(default)]
    pub audio_languages: HashMap<ItemId, Vec<String>>,
    #[serde(default)]
    pub collections: Vec<Collection>,
    #[serde(default)]
    pub user_data: Vec<UserDataEntry>,
}

/// One play-state record in a snapshot
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDataEntry {
    pub user_id: UserId,
    pub item_id: ItemId,
    #[serde(flatten)]
    pub data: UserData,
}

/// Parse a snapshot from a JSON string
pub fn parse_snapshot(json: &str, file: &str) -> Result<LibrarySnapshot> {
    serde_json::from_str(json).map_err(|e| LibraryError::ParseError {
        file: file.to_string(),
        reason: e.to_string(),
    })
}

impl LibraryIndex {
    /// Load a library snapshot file into a fresh index.
    ///
    /// Steps:
    /// 1. Read and parse the JSON document
    /// 2. Insert users and items
    /// 3. Insert people, audio languages and collections
    /// 4. Insert play state, rejecting records for unknown users or items
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(LibraryError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let json = fs::read_to_string(path)?;
        let snapshot = parse_snapshot(&json, &path.display().to_string())?;
        let index = Self::from_snapshot(snapshot)?;

        let (users, items, user_data) = index.counts();
        info!(
            "Loaded library from {:?}: {} users, {} items, {} play-state records",
            path, users, items, user_data
        );
        Ok(index)
    }

    /// Build an index from an already-parsed snapshot
    pub fn from_snapshot(snapshot: LibrarySnapshot) -> Result<Self> {
        let mut index = LibraryIndex::new();

        for user in snapshot.users {
            index.insert_user(user);
        }
        for item in snapshot.items {
            index.insert_item(item);
        }
        for (item_id, people) in snapshot.people {
            index.insert_people(item_id, people);
        }
        for (item_id, languages) in snapshot.audio_languages {
            index.insert_audio_languages(item_id, languages);
        }
        for collection in snapshot.collections {
            index.insert_collection(collection);
        }

        for entry in snapshot.user_data {
            if !index.users.contains_key(&entry.user_id) {
                return Err(LibraryError::MissingReference {
                    entity: "User".to_string(),
                    id: entry.user_id.to_string(),
                });
            }
            if !index.items.contains_key(&entry.item_id) {
                return Err(LibraryError::MissingReference {
                    entity: "Item".to_string(),
                    id: entry.item_id.to_string(),
                });
            }
            index.insert_user_data(entry.user_id, entry.item_id, entry.data);
        }

        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::LibraryAdapter;

    const SNAPSHOT: &str = r#"{
        "users": [{ "id": "8f2d7c1e-0000-4000-8000-000000000001", "name": "alice" }],
        "items": [
            {
                "id": "8f2d7c1e-0000-4000-8000-0000000000a1",
                "kind": "Movie",
                "name": "Alien",
                "productionYear": 1979,
                "genres": ["Horror", "Science Fiction"],
                "runtimeSeconds": 7020,
                "dateCreated": "2023-04-01T12:00:00Z"
            }
        ],
        "people": {
            "8f2d7c1e-0000-4000-8000-0000000000a1": [{ "name": "Sigourney Weaver", "role": "Actor" }]
        },
        "collections": [
            {
                "id": "8f2d7c1e-0000-4000-8000-0000000000c1",
                "name": "Alien Collection",
                "itemIds": ["8f2d7c1e-0000-4000-8000-0000000000a1"]
            }
        ],
        "userData": [
            {
                "userId": "8f2d7c1e-0000-4000-8000-000000000001",
                "itemId": "8f2d7c1e-0000-4000-8000-0000000000a1",
                "playCount": 3,
                "isFavorite": true
            }
        ]
    }"#;

    #[test]
    fn test_snapshot_loads_everything() {
        let snapshot = parse_snapshot(SNAPSHOT, "inline").unwrap();
        let index = LibraryIndex::from_snapshot(snapshot).unwrap();
        assert_eq!(index.counts(), (1, 1, 1));

        let user = index.find_user_by_name("alice").unwrap().clone();
        let item = index.all_items().next().unwrap().clone();
        assert_eq!(item.production_year, Some(1979));
        assert_eq!(item.runtime_minutes(), 117.0);

        let data = index.get_user_data(&user, &item).unwrap().unwrap();
        assert_eq!(data.play_count, 3);
        assert!(data.is_favorite);
        assert_eq!(index.get_people(&item).unwrap()[0].role, PersonRole::Actor);
        assert_eq!(index.get_collections(&item).unwrap(), vec!["Alien Collection"]);
    }

    #[test]
    fn test_user_data_for_unknown_item_is_rejected() {
        let json = r#"{
            "users": [{ "id": "8f2d7c1e-0000-4000-8000-000000000001", "name": "alice" }],
            "userData": [{
                "userId": "8f2d7c1e-0000-4000-8000-000000000001",
                "itemId": "8f2d7c1e-0000-4000-8000-0000000000ff"
            }]
        }"#;
        let snapshot = parse_snapshot(json, "inline").unwrap();
        let err = LibraryIndex::from_snapshot(snapshot).unwrap_err();
        assert!(matches!(err, LibraryError::MissingReference { .. }));
    }

    #[test]
    fn test_malformed_json_reports_file() {
        let err = parse_snapshot("{ not json", "broken.json").unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn test_missing_file() {
        let err = LibraryIndex::load_from_file(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, LibraryError::FileNotFound { .. }));
    }
}
