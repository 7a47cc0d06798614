use {
    crate::{
        crds::{Crds, CRDS_UNIQUE_PUBKEY_CAPACITY},
        legacy_contact_info::LegacyContactInfo,
    },
    indexmap::map::IndexMap,
    solana_bloom::bloom::Bloom,
    solana_sdk::pubkey::Pubkey,
    std::net::SocketAddr,
};

/// Upper bound on push peers kept in the active set.
pub const NUM_ACTIVE_SET_ENTRIES: usize = 25;

const PRUNE_BLOOM_FALSE_RATE: f64 = 0.1;
const PRUNE_BLOOM_MAX_BITS: usize = 1024 * 8 * 4;

/// The current set of push peers. Each entry tracks a bloom of origin
/// pubkeys the peer has pruned, so pushes of those origins skip it.
#[derive(Clone, Default)]
pub struct PushActiveSet {
    entries: IndexMap<Pubkey, Bloom<Pubkey>>,
}

impl PushActiveSet {
    /// Replaces the set with up to `NUM_ACTIVE_SET_ENTRIES` of the
    /// given peers, each starting with an empty pruned-origin filter.
    pub fn rotate(&mut self, peers: &[LegacyContactInfo]) {
        self.entries = peers
            .iter()
            .take(NUM_ACTIVE_SET_ENTRIES)
            .map(|peer| {
                let bloom = Bloom::random(
                    CRDS_UNIQUE_PUBKEY_CAPACITY,
                    PRUNE_BLOOM_FALSE_RATE,
                    PRUNE_BLOOM_MAX_BITS,
                );
                (peer.id, bloom)
            })
            .collect();
    }

    /// Records that `peer` no longer wants values originating at
    /// `origin`.
    pub fn prune(&mut self, peer: &Pubkey, origin: &Pubkey) {
        if let Some(bloom) = self.entries.get_mut(peer) {
            bloom.add(origin);
        }
    }

    /// Gossip sockets of active peers which have not pruned the origin
    /// and still have a routable contact record in the table.
    pub fn get_fanout_peers(&self, origin: &Pubkey, crds: &Crds) -> Vec<SocketAddr> {
        self.entries
            .iter()
            .filter(|(_, bloom)| !bloom.contains(origin))
            .filter_map(|(peer, _)| {
                let contact_info = crds.get_contact_info(peer)?;
                LegacyContactInfo::is_valid_address(&contact_info.gossip)
                    .then_some(contact_info.gossip)
            })
            .collect()
    }

    pub fn is_pruned(&self, peer: &Pubkey, origin: &Pubkey) -> bool {
        self.entries
            .get(peer)
            .map(|bloom| bloom.contains(origin))
            .unwrap_or_default()
    }

    pub fn peers(&self) -> impl Iterator<Item = &Pubkey> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod test {
    use {
        super::*,
        crate::crds_value::{CrdsData, CrdsValue},
        solana_sdk::timing::timestamp,
    };

    fn make_peers(num: usize) -> Vec<LegacyContactInfo> {
        let mut rng = rand::thread_rng();
        (0..num)
            .map(|_| LegacyContactInfo::new_rand(&mut rng, None))
            .collect()
    }

    #[test]
    fn test_rotate_caps_entries() {
        let mut active_set = PushActiveSet::default();
        active_set.rotate(&make_peers(40));
        assert_eq!(active_set.len(), NUM_ACTIVE_SET_ENTRIES);
        active_set.rotate(&make_peers(3));
        assert_eq!(active_set.len(), 3);
    }

    #[test]
    fn test_prune_removes_peer_from_fanout() {
        let mut crds = Crds::default();
        let peers = make_peers(4);
        let now = timestamp();
        for peer in &peers {
            let value = CrdsValue::new_unsigned(CrdsData::LegacyContactInfo(peer.clone()));
            crds.insert(value, now).unwrap();
        }
        let mut active_set = PushActiveSet::default();
        active_set.rotate(&peers);

        let origin = Pubkey::new_unique();
        assert_eq!(active_set.get_fanout_peers(&origin, &crds).len(), 4);

        active_set.prune(&peers[0].id, &origin);
        assert!(active_set.is_pruned(&peers[0].id, &origin));
        let fanout = active_set.get_fanout_peers(&origin, &crds);
        assert_eq!(fanout.len(), 3);
        assert!(!fanout.contains(&peers[0].gossip));

        // a different origin still fans out to everyone
        assert_eq!(
            active_set
                .get_fanout_peers(&Pubkey::new_unique(), &crds)
                .len(),
            4
        );
    }

    #[test]
    fn test_fanout_skips_unknown_contact_info() {
        let crds = Crds::default();
        let peers = make_peers(2);
        let mut active_set = PushActiveSet::default();
        active_set.rotate(&peers);
        assert!(active_set
            .get_fanout_peers(&Pubkey::new_unique(), &crds)
            .is_empty());
    }
}
