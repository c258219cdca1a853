//! Resource store: the single remembered fullnode identity.
//!
//! Persisted as `resources.json` under the tmnd config dir. Every write goes
//! through a sibling temp file that is synced and renamed over the record, so
//! a crash leaves either the previous record or the new one.

use crate::domain::models::NodeIdentity;
use crate::services::settings::config_dir;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const RECORD_FILE: &str = "resources.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    Name,
    Net,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::Id, Field::Name, Field::Net];
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
struct Record {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    net: Option<String>,
}

impl Record {
    fn is_empty(&self) -> bool {
        self.id.is_none() && self.name.is_none() && self.net.is_none()
    }

    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Id => &mut self.id,
            Field::Name => &mut self.name,
            Field::Net => &mut self.net,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResourceStore {
    path: PathBuf,
}

impl ResourceStore {
    pub fn open(dir: &Path) -> Self {
        Self {
            path: dir.join(RECORD_FILE),
        }
    }

    pub fn default_location() -> anyhow::Result<Self> {
        Ok(Self::open(&config_dir()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `None` when no fullnode is configured.
    pub fn load(&self) -> anyhow::Result<Option<NodeIdentity>> {
        let record = self.read_record()?;
        match record {
            Record {
                id: Some(id),
                name: Some(name),
                net: Some(net),
            } => Ok(Some(NodeIdentity { id, name, net })),
            r if r.is_empty() => Ok(None),
            _ => {
                warn!(path = %self.path.display(), "incomplete resource record, treating as unconfigured");
                Ok(None)
            }
        }
    }

    pub fn save(&self, identity: &NodeIdentity) -> anyhow::Result<()> {
        let record = Record {
            id: Some(identity.id.clone()),
            name: Some(identity.name.clone()),
            net: Some(identity.net.clone()),
        };
        self.write_record(&record)?;
        debug!(node = %identity.name, "resource record saved");
        Ok(())
    }

    /// Drop the named fields. Clearing every field removes the record.
    pub fn clear(&self, fields: &[Field]) -> anyhow::Result<()> {
        let mut record = self.read_record()?;
        for f in fields {
            *record.slot(*f) = None;
        }
        self.write_record(&record)?;
        debug!(?fields, "resource record fields cleared");
        Ok(())
    }

    fn read_record(&self) -> anyhow::Result<Record> {
        if !self.path.exists() {
            return Ok(Record::default());
        }
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", self.path.display()))
    }

    fn write_record(&self, record: &Record) -> anyhow::Result<()> {
        if record.is_empty() {
            if self.path.exists() {
                std::fs::remove_file(&self.path)
                    .with_context(|| format!("removing {}", self.path.display()))?;
            }
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let body = serde_json::to_string_pretty(record)?;
        {
            let mut f = std::fs::File::create(&tmp)
                .with_context(|| format!("creating {}", tmp.display()))?;
            f.write_all(body.as_bytes())?;
            f.sync_all()?;
        }
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, ResourceStore) {
        let dir = TempDir::new().expect("temp dir");
        let store = ResourceStore::open(&dir.path().join("tmnd"));
        (dir, store)
    }

    #[test]
    fn empty_store_loads_nothing() {
        let (_dir, store) = store();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn save_then_load() {
        let (_dir, store) = store();
        let identity = NodeIdentity::new("test1", "devnet");
        store.save(&identity).unwrap();
        assert_eq!(store.load().unwrap(), Some(identity));
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn save_overwrites_previous_identity() {
        let (_dir, store) = store();
        store.save(&NodeIdentity::new("test1", "devnet")).unwrap();
        store.save(&NodeIdentity::new("other", "mainnet")).unwrap();
        assert_eq!(
            store.load().unwrap(),
            Some(NodeIdentity::new("other", "mainnet"))
        );
    }

    #[test]
    fn clearing_all_fields_reverts_to_empty() {
        let (_dir, store) = store();
        store.save(&NodeIdentity::new("test1", "devnet")).unwrap();
        store.clear(&Field::ALL).unwrap();
        assert_eq!(store.load().unwrap(), None);
        assert!(!store.path().exists());
    }

    #[test]
    fn partial_clear_keeps_remaining_fields_but_is_unconfigured() {
        let (_dir, store) = store();
        store.save(&NodeIdentity::new("test1", "devnet")).unwrap();
        store.clear(&[Field::Id]).unwrap();
        assert_eq!(store.load().unwrap(), None);
        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("test1"));
        assert!(!raw.contains("\"id\""));
    }

    #[test]
    fn leftover_temp_file_does_not_affect_record() {
        let (_dir, store) = store();
        let identity = NodeIdentity::new("test1", "devnet");
        store.save(&identity).unwrap();
        std::fs::write(store.path().with_extension("json.tmp"), "{\"id\": \"tru").unwrap();
        assert_eq!(store.load().unwrap(), Some(identity));
    }

    #[test]
    fn corrupt_record_is_an_error() {
        let (_dir, store) = store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "not json").unwrap();
        assert!(store.load().is_err());
    }
}
