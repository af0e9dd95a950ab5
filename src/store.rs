use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::participant::{resolve_legacy_recipients, NewParticipant, Participant, ParticipantId};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("the email {0} is already registered")]
    DuplicateEmail(String),
    #[error("participant {0} not found")]
    NotFound(ParticipantId),
    #[error("participant store lock was poisoned")]
    Poisoned,
}

/// Owns the roster and keeps the JSON data file in sync with it.
///
/// Every operation runs under one lock and writes the file before the
/// in-memory roster changes, so concurrent requests see whole snapshots only.
pub struct ParticipantStore {
    path: PathBuf,
    roster: Mutex<Vec<Participant>>,
}

impl ParticipantStore {
    /// Loads the roster from `path`; a missing file starts an empty roster
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let mut roster: Vec<Participant> = if path.exists() {
            let data = fs::read_to_string(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            if data.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&data).map_err(|source| StoreError::Json {
                    path: path.clone(),
                    source,
                })?
            }
        } else {
            info!(path = %path.display(), "data file not found, it will be created on first save");
            Vec::new()
        };

        let rewritten = resolve_legacy_recipients(&mut roster);
        if rewritten > 0 {
            warn!(rewritten, "recipient references were not participant ids and have been rewritten");
        }

        info!(path = %path.display(), participants = roster.len(), "roster loaded");
        Ok(Self {
            path,
            roster: Mutex::new(roster),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn list(&self) -> Result<Vec<Participant>, StoreError> {
        Ok(self.lock()?.clone())
    }

    pub fn get(&self, id: &ParticipantId) -> Result<Participant, StoreError> {
        self.lock()?
            .iter()
            .find(|p| &p.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    pub fn create(&self, fields: NewParticipant) -> Result<Participant, StoreError> {
        let mut roster = self.lock()?;
        if roster.iter().any(|p| p.same_email(&fields.email)) {
            return Err(StoreError::DuplicateEmail(fields.email));
        }

        let mut id = ParticipantId::random();
        while roster.iter().any(|p| p.id == id) {
            id = ParticipantId::random();
        }
        let participant = Participant::new(id, fields);

        let mut next = roster.clone();
        next.push(participant.clone());
        self.commit(&mut roster, next)?;

        info!(id = %participant.id, participants = roster.len(), "participant added");
        Ok(participant)
    }

    /// Replaces name, email and wishlist; identity, registration time and
    /// assignment stay as they are
    pub fn update(&self, id: &ParticipantId, fields: NewParticipant) -> Result<Participant, StoreError> {
        let mut roster = self.lock()?;
        let index = roster
            .iter()
            .position(|p| &p.id == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        if roster.iter().any(|p| &p.id != id && p.same_email(&fields.email)) {
            return Err(StoreError::DuplicateEmail(fields.email));
        }

        let mut next = roster.clone();
        let entry = &mut next[index];
        entry.name = fields.name;
        entry.email = fields.email;
        entry.wishlist = fields.wishlist;
        let updated = entry.clone();
        self.commit(&mut roster, next)?;

        info!(id = %id, "participant updated");
        Ok(updated)
    }

    /// Removes a participant and clears every assignment, since the
    /// remaining pairs no longer cover the roster. Returns the removed
    /// participant and the roster as it stands right after the removal.
    pub fn remove(&self, id: &ParticipantId) -> Result<(Participant, Vec<Participant>), StoreError> {
        let mut roster = self.lock()?;
        let index = roster
            .iter()
            .position(|p| &p.id == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        let mut next = roster.clone();
        let removed = next.remove(index);
        let had_draw = next.iter().any(|p| p.assigned_to.is_some());
        for p in &mut next {
            p.assigned_to = None;
        }
        self.commit(&mut roster, next)?;

        info!(id = %id, name = %removed.name, cleared_draw = had_draw, "participant removed");
        Ok((removed, roster.clone()))
    }

    pub fn replace_all(&self, next: Vec<Participant>) -> Result<(), StoreError> {
        let mut roster = self.lock()?;
        self.commit(&mut roster, next)
    }

    /// Computes a new roster from the current one and persists it, holding
    /// the lock throughout so no other write can slip in between
    pub fn redraw<F, E>(&self, f: F) -> Result<Vec<Participant>, E>
    where
        F: FnOnce(&[Participant]) -> Result<Vec<Participant>, E>,
        E: From<StoreError>,
    {
        let mut roster = self.lock()?;
        let next = f(&roster)?;
        self.commit(&mut roster, next.clone())?;
        Ok(next)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<Participant>>, StoreError> {
        self.roster.lock().map_err(|_| StoreError::Poisoned)
    }

    fn commit(&self, roster: &mut Vec<Participant>, next: Vec<Participant>) -> Result<(), StoreError> {
        self.save(&next)?;
        *roster = next;
        Ok(())
    }

    fn save(&self, roster: &[Participant]) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        let data = serde_json::to_string_pretty(roster).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, data).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        debug!(path = %self.path.display(), participants = roster.len(), "roster saved");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn temp_store_path(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("secret-santa-{}-{}.json", tag, ParticipantId::random()))
}
