//! Bloom-filter based pull side of the gossip overlay.
//!
//! A node requests the records it is missing by sending a compact
//! representation of everything it already holds: the 64-bit prefix
//! space of value hashes is split across `2^mask_bits` bloom filters,
//! and each pull request carries one of them. The receiving side
//! answers with values that fall in the filter's mask range but are
//! absent from the bloom.

use {
    crate::{crds::Crds, crds_value::CrdsValue},
    rand::{seq::SliceRandom, Rng},
    solana_bloom::bloom::Bloom,
    solana_sdk::{
        hash::Hash,
        sanitize::{Sanitize, SanitizeError},
    },
    std::iter::repeat_with,
};

/// Upper bound on pull requests (hence filters) sent out per round.
pub const MAX_NUM_PULL_REQUESTS: usize = 20;
/// Upper bound on serialized bloom bytes, leaving room in the packet
/// for the caller's contact info.
pub const MAX_BLOOM_SIZE: usize = 928;
/// Max crds values returned for a single pull request.
// TODO: tune with mainnet-sized tables.
pub const MAX_NUM_CRDS_VALUES_PULL_RESPONSE: usize = 100;

const FALSE_RATE: f64 = 0.1;
const NUM_KEYS: f64 = 8.0;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CrdsFilter {
    pub filter: Bloom<Hash>,
    pub mask: u64,
    pub mask_bits: u32,
}

impl Sanitize for CrdsFilter {
    fn sanitize(&self) -> Result<(), SanitizeError> {
        self.filter.sanitize()
    }
}

impl CrdsFilter {
    #[cfg(test)]
    pub(crate) fn new_rand(num_items: usize, max_bytes: usize) -> Self {
        let max_bits = (max_bytes * 8) as f64;
        let max_items = Self::max_items(max_bits, FALSE_RATE, NUM_KEYS);
        let mask_bits = Self::mask_bits(num_items as f64, max_items);
        let filter = Bloom::random(max_items as usize, FALSE_RATE, max_bits as usize);
        let seed: u64 = rand::thread_rng().gen_range(0..2u64.pow(mask_bits));
        let mask = Self::compute_mask(seed, mask_bits);
        CrdsFilter {
            filter,
            mask,
            mask_bits,
        }
    }

    fn compute_mask(seed: u64, mask_bits: u32) -> u64 {
        assert!(seed <= 2u64.pow(mask_bits));
        let seed: u64 = seed.checked_shl(64 - mask_bits).unwrap_or(0x0);
        seed | (!0u64).checked_shr(mask_bits).unwrap_or(!0x0)
    }

    fn max_items(max_bits: f64, false_rate: f64, num_keys: f64) -> f64 {
        let m = max_bits;
        let p = false_rate;
        let k = num_keys;
        (m / (-k / (1f64 - (p.ln() / k).exp()).ln())).ceil()
    }

    fn mask_bits(num_items: f64, max_items: f64) -> u32 {
        // for small ratios this can result in a negative number, ensure it returns 0 instead
        ((num_items / max_items).log2().ceil()).max(0.0) as u32
    }

    pub fn hash_as_u64(item: &Hash) -> u64 {
        let buf: [u8; 8] = item.as_ref()[..8].try_into().unwrap();
        u64::from_le_bytes(buf)
    }

    pub fn test_mask(&self, item: &Hash) -> bool {
        // only consider the highest mask_bits bits from the hash and set the rest to 1.
        let ones = (!0u64).checked_shr(self.mask_bits).unwrap_or(!0u64);
        let bits = Self::hash_as_u64(item) | ones;
        bits == self.mask
    }

    pub fn add(&mut self, item: &Hash) {
        if self.test_mask(item) {
            self.filter.add(item);
        }
    }

    /// Hashes outside the mask range are treated as present, so they
    /// are never requested through this filter.
    pub fn contains(&self, item: &Hash) -> bool {
        if !self.test_mask(item) {
            return true;
        }
        self.filter.contains(item)
    }
}

/// A complete partition of the hash space into `2^mask_bits` blooms.
struct CrdsFilterSet {
    filters: Vec<Bloom<Hash>>,
    mask_bits: u32,
}

impl CrdsFilterSet {
    fn new(num_items: usize, max_bytes: usize) -> Self {
        let max_bits = (max_bytes * 8) as f64;
        let max_items = CrdsFilter::max_items(max_bits, FALSE_RATE, NUM_KEYS);
        let mask_bits = CrdsFilter::mask_bits(num_items as f64, max_items);
        let filters =
            repeat_with(|| Bloom::random(max_items as usize, FALSE_RATE, max_bits as usize))
                .take(1usize << mask_bits)
                .collect();
        Self { filters, mask_bits }
    }

    fn add(&mut self, hash: &Hash) {
        let index = CrdsFilter::hash_as_u64(hash)
            .checked_shr(64 - self.mask_bits)
            .unwrap_or(0);
        self.filters[index as usize].add(hash);
    }
}

impl From<CrdsFilterSet> for Vec<CrdsFilter> {
    fn from(filter_set: CrdsFilterSet) -> Self {
        let mask_bits = filter_set.mask_bits;
        filter_set
            .filters
            .into_iter()
            .enumerate()
            .map(|(seed, filter)| CrdsFilter {
                filter,
                mask: CrdsFilter::compute_mask(seed as u64, mask_bits),
                mask_bits,
            })
            .collect()
    }
}

/// Builds filters over everything this node holds or recently dropped:
/// the table itself, the purged list, and hashes of values which
/// recently failed to insert from pull responses. Returns at most
/// `max_num_filters` of them, sampled randomly when the partition is
/// larger than that.
pub fn build_crds_filters<R: Rng>(
    rng: &mut R,
    crds: &Crds,
    failed_inserts: &[Hash],
    bloom_size: usize,
    max_num_filters: usize,
) -> Vec<CrdsFilter> {
    let num_items = crds.len() + crds.purged.len() + failed_inserts.len();
    let mut filter_set = CrdsFilterSet::new(num_items, bloom_size);
    for entry in crds.values() {
        filter_set.add(&entry.value_hash);
    }
    for hash in crds.purged.values() {
        filter_set.add(&hash);
    }
    for hash in failed_inserts {
        filter_set.add(hash);
    }
    let mut filters = Vec::<CrdsFilter>::from(filter_set);
    if filters.len() > max_num_filters {
        filters.shuffle(rng);
        filters.truncate(max_num_filters);
    }
    filters
}

/// Values the caller is missing: in the filter's mask range, absent
/// from its bloom, and not newer than the caller's own wallclock.
pub fn filter_crds_values(
    crds: &Crds,
    filter: &CrdsFilter,
    caller_wallclock: u64,
    max_values: usize,
) -> Vec<CrdsValue> {
    let mut out = Vec::new();
    for entry in crds.values() {
        if out.len() >= max_values {
            break;
        }
        if filter.contains(&entry.value_hash) {
            continue;
        }
        if entry.value.wallclock() > caller_wallclock {
            continue;
        }
        out.push(entry.value.clone());
    }
    out
}
