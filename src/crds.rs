//! This module implements the Cluster Replicated Data Store for
//! asynchronous updates in a distributed network.
//!
//! Data is stored in the CrdsValue type, each type has a specific
//! CrdsValueLabel. Labels are semantically grouped into a single record
//! that is identified by a Pubkey.
//! * 1 Pubkey maps many CrdsValueLabels
//! * 1 CrdsValueLabel maps to 1 CrdsValue
//! The Label, the record Pubkey, and all the record labels can be derived
//! from a single CrdsValue.
//!
//! A value is updated to a new version if the labels match, and the value
//! wallclock is later, or the value hash is greater.
//!
//! Successful inserts are stamped with a monotonically increasing ordinal
//! so the push overlay can stream fresh values with a cursor. Hashes of
//! overwritten and evicted values are parked in `purged` and folded into
//! outgoing pull filters until they age out.

use {
    crate::{
        crds_value::{CrdsValue, CrdsValueLabel},
        legacy_contact_info::LegacyContactInfo,
    },
    bincode::serialize,
    indexmap::map::{Entry, IndexMap},
    solana_sdk::{
        hash::{hash, Hash},
        pubkey::Pubkey,
    },
    std::{
        cmp,
        collections::{BTreeMap, HashMap, HashSet, VecDeque},
    },
};

/// Upper bound on distinct origin pubkeys held in the table.
pub const CRDS_UNIQUE_PUBKEY_CAPACITY: usize = 8192;

#[derive(Clone)]
pub struct Crds {
    /// Stores the map of labels and values
    table: IndexMap<CrdsValueLabel, VersionedCrdsValue>,
    /// Next ordinal handed out to an inserted value
    cursor: u64,
    /// Ordinal => label of values in insertion order, for cursor scans
    entries: BTreeMap<u64, CrdsValueLabel>,
    /// Labels currently stored for each origin pubkey
    records: HashMap<Pubkey, HashSet<CrdsValueLabel>>,
    pub num_inserts: usize,
    /// Hashes of overwritten and evicted values, for pull filters
    pub purged: HashTimeQueue,
}

#[derive(PartialEq, Eq, Debug)]
pub enum CrdsError {
    InsertFailed,
}

/// This structure stores some local metadata associated with the CrdsValue.
/// The implementation of PartialOrd ensures that the "highest" version is
/// always picked to be stored in the Crds.
#[derive(PartialEq, Debug, Clone)]
pub struct VersionedCrdsValue {
    pub value: CrdsValue,
    /// local time when inserted
    pub insert_timestamp: u64,
    /// local time when updated
    pub local_timestamp: u64,
    /// value hash
    pub value_hash: Hash,
    /// table ordinal at insertion, for push scans
    pub ordinal: u64,
}

impl PartialOrd for VersionedCrdsValue {
    fn partial_cmp(&self, other: &VersionedCrdsValue) -> Option<cmp::Ordering> {
        if self.value.label() != other.value.label() {
            None
        } else if self.value.wallclock() == other.value.wallclock() {
            Some(self.value_hash.cmp(&other.value_hash))
        } else {
            Some(self.value.wallclock().cmp(&other.value.wallclock()))
        }
    }
}

impl VersionedCrdsValue {
    fn new(local_timestamp: u64, value: CrdsValue, ordinal: u64) -> Self {
        let value_hash = hash(&serialize(&value).unwrap());
        VersionedCrdsValue {
            value,
            insert_timestamp: local_timestamp,
            local_timestamp,
            value_hash,
            ordinal,
        }
    }
}

/// Index lists returned by `insert_values`.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct InsertResults {
    pub inserted: Vec<usize>,
    pub timeouts: Vec<usize>,
    pub failed: Vec<usize>,
}

impl Default for Crds {
    fn default() -> Self {
        Crds {
            table: IndexMap::new(),
            cursor: 0,
            entries: BTreeMap::new(),
            records: HashMap::new(),
            num_inserts: 0,
            purged: HashTimeQueue::default(),
        }
    }
}

impl Crds {
    /// Inserts the new value, returning the replaced value on success.
    pub fn insert(
        &mut self,
        value: CrdsValue,
        local_timestamp: u64,
    ) -> Result<Option<VersionedCrdsValue>, CrdsError> {
        let label = value.label();
        let pubkey = value.pubkey();
        let ordinal = self.cursor;
        let new_value = VersionedCrdsValue::new(local_timestamp, value, ordinal);
        match self.table.entry(label.clone()) {
            Entry::Vacant(entry) => {
                self.entries.insert(ordinal, label.clone());
                self.records.entry(pubkey).or_default().insert(label);
                entry.insert(new_value);
                self.cursor += 1;
                self.num_inserts += 1;
                Ok(None)
            }
            Entry::Occupied(mut entry) if *entry.get() < new_value => {
                let old = entry.insert(new_value);
                self.entries.remove(&old.ordinal);
                self.entries.insert(ordinal, label);
                self.purged.push(old.value_hash, local_timestamp);
                self.cursor += 1;
                self.num_inserts += 1;
                Ok(Some(old))
            }
            Entry::Occupied(_) => {
                trace!(
                    "INSERT FAILED data: {} new.wallclock: {}",
                    new_value.value.label(),
                    new_value.value.wallclock(),
                );
                Err(CrdsError::InsertFailed)
            }
        }
    }

    /// Bulk insert with a wallclock acceptance window of `±timeout`
    /// around `now`. Values outside the window are recorded as
    /// timeouts when `record_timeouts` is set and skipped otherwise.
    /// When `update_timestamps` is set, the record timestamps of
    /// origins with successful inserts are touched.
    pub fn insert_values(
        &mut self,
        values: &[CrdsValue],
        now: u64,
        timeout: u64,
        record_timeouts: bool,
        update_timestamps: bool,
    ) -> InsertResults {
        let mut results = InsertResults::default();
        for (index, value) in values.iter().enumerate() {
            let wallclock = value.wallclock();
            if wallclock < now.saturating_sub(timeout) || wallclock > now.saturating_add(timeout) {
                if record_timeouts {
                    results.timeouts.push(index);
                }
                continue;
            }
            match self.insert(value.clone(), now) {
                Ok(_) => {
                    if update_timestamps {
                        self.update_record_timestamp(&value.pubkey(), now);
                    }
                    results.inserted.push(index);
                }
                Err(_) => results.failed.push(index),
            }
        }
        results
    }

    pub fn get(&self, label: &CrdsValueLabel) -> Option<&VersionedCrdsValue> {
        self.table.get(label)
    }

    pub fn get_contact_info(&self, pubkey: &Pubkey) -> Option<&LegacyContactInfo> {
        let label = CrdsValueLabel::LegacyContactInfo(*pubkey);
        self.table.get(&label)?.value.contact_info()
    }

    pub fn get_contact_infos(&self) -> impl Iterator<Item = &VersionedCrdsValue> {
        self.table.iter().filter_map(|(label, value)| {
            matches!(label, CrdsValueLabel::LegacyContactInfo(_)).then_some(value)
        })
    }

    /// Values stamped with an ordinal at or past the cursor, oldest
    /// first, at most `max_entries` of them. The cursor is advanced
    /// to one past the last returned value.
    pub fn get_entries_with_cursor(
        &self,
        cursor: &mut u64,
        max_entries: usize,
    ) -> Vec<VersionedCrdsValue> {
        let mut out = Vec::new();
        for (&ordinal, label) in self.entries.range(*cursor..) {
            if out.len() >= max_entries {
                break;
            }
            out.push(self.table[label].clone());
            *cursor = ordinal + 1;
        }
        out
    }

    pub fn values(&self) -> impl Iterator<Item = &VersionedCrdsValue> {
        self.table.values()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    fn update_label_timestamp(&mut self, label: &CrdsValueLabel, now: u64) {
        if let Some(e) = self.table.get_mut(label) {
            e.local_timestamp = cmp::max(e.local_timestamp, now);
        }
    }

    /// Update the timestamps of all the labels that are associated with Pubkey
    pub fn update_record_timestamp(&mut self, pubkey: &Pubkey, now: u64) {
        let labels: Vec<CrdsValueLabel> = match self.records.get(pubkey) {
            Some(labels) => labels.iter().cloned().collect(),
            None => return,
        };
        for label in labels {
            self.update_label_timestamp(&label, now);
        }
    }

    pub fn remove(&mut self, label: &CrdsValueLabel, now: u64) -> Option<VersionedCrdsValue> {
        let value = self.table.swap_remove(label)?;
        self.entries.remove(&value.ordinal);
        let pubkey = value.value.pubkey();
        if let Some(record) = self.records.get_mut(&pubkey) {
            record.remove(label);
            if record.is_empty() {
                self.records.remove(&pubkey);
            }
        }
        self.purged.push(value.value_hash, now);
        Some(value)
    }

    /// Evicts the least recently active origins until at most
    /// `capacity` distinct origins remain. Returns the evicted
    /// origins.
    pub fn attempt_trim(&mut self, capacity: usize, now: u64) -> Vec<Pubkey> {
        if self.records.len() <= capacity {
            return Vec::new();
        }
        let mut origins: Vec<(/*last active:*/ u64, Pubkey)> = self
            .records
            .iter()
            .map(|(&pubkey, labels)| {
                let last_active = labels
                    .iter()
                    .filter_map(|label| self.table.get(label))
                    .map(|value| value.local_timestamp)
                    .max()
                    .unwrap_or_default();
                (last_active, pubkey)
            })
            .collect();
        origins.sort_unstable();
        let num_evicted = self.records.len() - capacity;
        let evicted: Vec<Pubkey> = origins
            .into_iter()
            .take(num_evicted)
            .map(|(_, pubkey)| pubkey)
            .collect();
        for pubkey in &evicted {
            let labels: Vec<CrdsValueLabel> = match self.records.get(pubkey) {
                Some(labels) => labels.iter().cloned().collect(),
                None => continue,
            };
            for label in labels {
                self.remove(&label, now);
            }
        }
        evicted
    }

    /// Drops values which have not been updated within `timeout`.
    /// Returns how many labels were removed.
    pub fn remove_old_labels(&mut self, now: u64, timeout: u64) -> usize {
        let old: Vec<CrdsValueLabel> = self
            .table
            .iter()
            .filter_map(|(label, value)| {
                (value.local_timestamp.saturating_add(timeout) <= now).then(|| label.clone())
            })
            .collect();
        let count = old.len();
        for label in old {
            self.remove(&label, now);
        }
        count
    }
}

/// FIFO of value hashes tagged with their local insertion time.
#[derive(Clone, Debug, Default)]
pub struct HashTimeQueue {
    queue: VecDeque<(Hash, u64)>,
}

impl HashTimeQueue {
    pub fn push(&mut self, hash: Hash, now: u64) {
        self.queue.push_back((hash, now));
    }

    /// Drops entries recorded strictly before `cutoff`.
    pub fn trim(&mut self, cutoff: u64) {
        while let Some(&(_, timestamp)) = self.queue.front() {
            if timestamp >= cutoff {
                break;
            }
            self.queue.pop_front();
        }
    }

    pub fn values(&self) -> Vec<Hash> {
        self.queue.iter().map(|&(hash, _)| hash).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
