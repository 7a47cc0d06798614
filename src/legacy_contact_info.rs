use {
    crate::crds_value::{new_rand_timestamp, sanitize_wallclock},
    rand::Rng,
    solana_sdk::{
        pubkey::Pubkey,
        sanitize::{Sanitize, SanitizeError},
        timing::timestamp,
    },
    std::net::{IpAddr, Ipv4Addr, SocketAddr},
};

/// Structured socket record advertised by every node over gossip.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LegacyContactInfo {
    pub id: Pubkey,
    /// gossip address
    pub gossip: SocketAddr,
    /// address to connect to for replication
    pub tvu: SocketAddr,
    /// address to forward shreds to
    pub tvu_forwards: SocketAddr,
    /// address to send repair responses to
    pub repair: SocketAddr,
    /// transactions address
    pub tpu: SocketAddr,
    /// address to forward unprocessed transactions to
    pub tpu_forwards: SocketAddr,
    /// address for sending votes
    pub tpu_vote: SocketAddr,
    /// address to which to send JSON-RPC requests
    pub rpc: SocketAddr,
    /// websocket for JSON-RPC push notifications
    pub rpc_pubsub: SocketAddr,
    /// address to send repair requests to
    pub serve_repair: SocketAddr,
    /// latest wallclock picked
    pub wallclock: u64,
    /// node shred version
    pub shred_version: u16,
}

fn socketaddr_any() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
}

impl Default for LegacyContactInfo {
    fn default() -> Self {
        LegacyContactInfo {
            id: Pubkey::default(),
            gossip: socketaddr_any(),
            tvu: socketaddr_any(),
            tvu_forwards: socketaddr_any(),
            repair: socketaddr_any(),
            tpu: socketaddr_any(),
            tpu_forwards: socketaddr_any(),
            tpu_vote: socketaddr_any(),
            rpc: socketaddr_any(),
            rpc_pubsub: socketaddr_any(),
            serve_repair: socketaddr_any(),
            wallclock: 0,
            shred_version: 0,
        }
    }
}

impl Sanitize for LegacyContactInfo {
    fn sanitize(&self) -> Result<(), SanitizeError> {
        sanitize_wallclock(self.wallclock)?;
        self.id.sanitize()
    }
}

impl LegacyContactInfo {
    pub fn new_localhost(id: &Pubkey, now: u64) -> Self {
        let addr = |port| SocketAddr::from((Ipv4Addr::LOCALHOST, port));
        LegacyContactInfo {
            id: *id,
            gossip: addr(1234),
            tvu: addr(1235),
            tvu_forwards: addr(1236),
            repair: addr(1237),
            tpu: addr(1238),
            tpu_forwards: addr(1239),
            tpu_vote: addr(1240),
            rpc: addr(8899),
            rpc_pubsub: addr(8900),
            serve_repair: addr(1241),
            wallclock: now,
            shred_version: 0,
        }
    }

    /// A placeholder contact record for a cluster entrypoint known
    /// only by its gossip address.
    pub fn new_gossip_entry_point(gossip_addr: &SocketAddr) -> Self {
        LegacyContactInfo {
            gossip: *gossip_addr,
            wallclock: timestamp(),
            ..LegacyContactInfo::default()
        }
    }

    /// New random contact info for tests and benchmarks.
    pub fn new_rand<R: Rng>(rng: &mut R, pubkey: Option<Pubkey>) -> Self {
        let pubkey = pubkey.unwrap_or_else(Pubkey::new_unique);
        let mut node = LegacyContactInfo::new_localhost(&pubkey, new_rand_timestamp(rng));
        node.gossip.set_port(rng.gen_range(1024..u16::MAX));
        node
    }

    fn is_valid_ip(addr: IpAddr) -> bool {
        !(addr.is_unspecified() || addr.is_multicast())
    }

    /// Sockets must not be unspecified or multicast, and must carry a
    /// port, before the engine will route datagrams to them.
    pub fn is_valid_address(addr: &SocketAddr) -> bool {
        addr.port() != 0u16 && Self::is_valid_ip(addr.ip())
    }
}
