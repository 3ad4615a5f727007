use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use campuswatch_common::{Incident, IncidentStatus, Location};

/// In-memory reflection of the incident set for one client session.
///
/// Kept newest-first. Only `replace_all` may wholesale-replace the
/// collection (the fetch/refresh path); every other path is a targeted
/// upsert by id. Realtime inserts are at-least-once and unordered relative
/// to the client's own optimistic inserts, so everything de-duplicates by
/// id and the same logical incident is never present twice.
#[derive(Debug, Default)]
pub struct IncidentCache {
    incidents: Vec<Incident>,
    by_id: HashMap<Uuid, usize>,
    /// Temporary ids of speculative local inserts awaiting confirmation.
    optimistic: HashSet<Uuid>,
}

impl IncidentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.incidents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.incidents.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&Incident> {
        self.by_id.get(&id).map(|&i| &self.incidents[i])
    }

    pub fn is_optimistic(&self, id: Uuid) -> bool {
        self.optimistic.contains(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Incident> {
        self.incidents.iter()
    }

    pub fn snapshot(&self) -> Vec<Incident> {
        self.incidents.clone()
    }

    /// Fetch path only: replace the whole collection. Clears any
    /// speculative entries; the authoritative set wins.
    pub fn replace_all(&mut self, incidents: Vec<Incident>) {
        self.incidents = incidents;
        self.optimistic.clear();
        self.resort();
    }

    /// Insert or update by id. Returns true when the incident was new.
    pub fn upsert(&mut self, incident: Incident) -> bool {
        if let Some(&i) = self.by_id.get(&incident.id) {
            self.incidents[i] = incident;
            false
        } else {
            self.incidents.push(incident);
            self.resort();
            true
        }
    }

    /// Speculative local insert under a temporary id, rendered immediately
    /// while the authoritative write is in flight.
    pub fn insert_optimistic(&mut self, incident: Incident) -> Uuid {
        let temp_id = incident.id;
        self.optimistic.insert(temp_id);
        self.upsert(incident);
        temp_id
    }

    /// Merge the authoritative confirmation for a speculative insert. The
    /// temporary entry is dropped; if the realtime feed already delivered
    /// the authoritative row, the upsert de-duplicates by id.
    pub fn confirm(&mut self, temp_id: Uuid, authoritative: Incident) {
        if self.optimistic.remove(&temp_id) {
            if let Some(i) = self.by_id.remove(&temp_id) {
                self.incidents.remove(i);
                self.reindex();
            }
        }
        self.upsert(authoritative);
    }

    pub fn apply_status(&mut self, id: Uuid, status: IncidentStatus) -> bool {
        match self.by_id.get(&id) {
            Some(&i) => {
                self.incidents[i].status = status;
                true
            }
            None => false,
        }
    }

    pub fn filtered(
        &self,
        location: Option<Location>,
        status: Option<IncidentStatus>,
    ) -> Vec<&Incident> {
        self.incidents
            .iter()
            .filter(|i| location.is_none_or(|l| i.location == l))
            .filter(|i| status.is_none_or(|s| i.status == s))
            .collect()
    }

    pub fn recent(&self, limit: usize) -> Vec<&Incident> {
        self.incidents.iter().take(limit).collect()
    }

    fn resort(&mut self) {
        self.incidents
            .sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        self.reindex();
    }

    fn reindex(&mut self) {
        self.by_id = self
            .incidents
            .iter()
            .enumerate()
            .map(|(i, inc)| (inc.id, i))
            .collect();
    }
}
