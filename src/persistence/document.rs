//! The persisted petition document.
//!
//! One JSON document holds every petition, keyed by anchor message ID
//! (stringified, since JSON object keys are strings). The document is
//! rewritten in full on every mutation; there is no append log.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{MessageId, Petition};

/// Current schema version. Increment when making breaking changes.
pub const SCHEMA_VERSION: u32 = 1;

/// The full persisted state of the petition system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PetitionDocument {
    /// Schema version for forward-compatible migrations.
    pub schema_version: u32,

    /// When the document was last written.
    pub updated_at: DateTime<Utc>,

    /// All petitions, keyed by anchor message ID.
    pub petitions: HashMap<String, Petition>,
}

impl PetitionDocument {
    /// Creates an empty document at the current schema version.
    pub fn new() -> Self {
        PetitionDocument {
            schema_version: SCHEMA_VERSION,
            updated_at: Utc::now(),
            petitions: HashMap::new(),
        }
    }

    /// Looks up a petition by anchor message ID.
    pub fn get(&self, id: MessageId) -> Option<&Petition> {
        self.petitions.get(&id.to_string())
    }

    /// Mutable lookup by anchor message ID.
    pub fn get_mut(&mut self, id: MessageId) -> Option<&mut Petition> {
        self.petitions.get_mut(&id.to_string())
    }

    /// Inserts or replaces a petition.
    pub fn insert(&mut self, id: MessageId, petition: Petition) {
        self.petitions.insert(id.to_string(), petition);
    }

    /// IDs of all petitions still in the open state, i.e. the working set of
    /// every sweep. Sorted for deterministic iteration order.
    pub fn open_ids(&self) -> Vec<MessageId> {
        let mut ids: Vec<MessageId> = self
            .petitions
            .iter()
            .filter(|(_, p)| p.is_open())
            .filter_map(|(k, _)| k.parse().ok())
            .collect();
        ids.sort();
        ids
    }

    /// Snapshots the invalid petitions with their keys, for the admin report.
    pub fn invalid_entries(&self) -> Vec<(String, Petition)> {
        let mut entries: Vec<(String, Petition)> = self
            .petitions
            .iter()
            .filter(|(_, p)| p.invalid)
            .map(|(k, p)| (k.clone(), p.clone()))
            .collect();
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        entries
    }
}

impl Default for PetitionDocument {
    fn default() -> Self {
        Self::new()
    }
}
