use {
    crate::crds_value::{new_rand_timestamp, sanitize_wallclock, MAX_SLOT},
    bv::BitVec,
    rand::Rng,
    solana_sdk::{
        clock::Slot,
        pubkey::Pubkey,
        sanitize::{Sanitize, SanitizeError},
    },
};

const MAX_SLOTS_PER_ENTRY: usize = 2048 * 8;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Uncompressed {
    pub first_slot: Slot,
    pub num: usize,
    pub slots: BitVec<u8>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Flate2 {
    pub first_slot: Slot,
    pub num: usize,
    pub compressed: Vec<u8>,
}

impl Sanitize for Uncompressed {
    fn sanitize(&self) -> Result<(), SanitizeError> {
        if self.num >= MAX_SLOTS_PER_ENTRY {
            return Err(SanitizeError::ValueOutOfBounds);
        }
        if self.first_slot >= MAX_SLOT {
            return Err(SanitizeError::ValueOutOfBounds);
        }
        if self.slots.len() % 8 != 0 {
            return Err(SanitizeError::InvalidValue);
        }
        if self.slots.len() > MAX_SLOTS_PER_ENTRY as u64 {
            return Err(SanitizeError::ValueOutOfBounds);
        }
        Ok(())
    }
}

impl Sanitize for Flate2 {
    fn sanitize(&self) -> Result<(), SanitizeError> {
        if self.num >= MAX_SLOTS_PER_ENTRY {
            return Err(SanitizeError::ValueOutOfBounds);
        }
        if self.first_slot >= MAX_SLOT {
            return Err(SanitizeError::ValueOutOfBounds);
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum CompressedSlots {
    Flate2(Flate2),
    Uncompressed(Uncompressed),
}

impl Sanitize for CompressedSlots {
    fn sanitize(&self) -> Result<(), SanitizeError> {
        match self {
            CompressedSlots::Flate2(flate) => flate.sanitize(),
            CompressedSlots::Uncompressed(slots) => slots.sanitize(),
        }
    }
}

/// Per-epoch record of slots completed by a node, published in
/// compressed windows keyed by an index into the node's record space.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct EpochSlots {
    pub from: Pubkey,
    pub slots: Vec<CompressedSlots>,
    pub wallclock: u64,
}

impl EpochSlots {
    pub fn new(from: Pubkey, now: u64) -> Self {
        Self {
            from,
            slots: Vec::new(),
            wallclock: now,
        }
    }

    /// New random EpochSlots for tests and benchmarks.
    pub(crate) fn new_rand<R: Rng>(rng: &mut R, pubkey: Option<Pubkey>) -> Self {
        let num_bits = 8 * rng.gen_range(1..16);
        let slots = Uncompressed {
            first_slot: rng.gen_range(0..512),
            num: rng.gen_range(0..num_bits as usize),
            slots: BitVec::new_fill(false, num_bits),
        };
        Self {
            from: pubkey.unwrap_or_else(Pubkey::new_unique),
            slots: vec![CompressedSlots::Uncompressed(slots)],
            wallclock: new_rand_timestamp(rng),
        }
    }
}

impl Sanitize for EpochSlots {
    fn sanitize(&self) -> Result<(), SanitizeError> {
        sanitize_wallclock(self.wallclock)?;
        self.from.sanitize()?;
        self.slots.sanitize()
    }
}
