use {
    crate::{
        crds_gossip_pull::CrdsFilter,
        crds_value::{sanitize_wallclock, CrdsValue},
        ping_pong::{Ping, Pong},
    },
    bincode::serialized_size,
    serde::Serialize,
    solana_sdk::{
        packet::PACKET_DATA_SIZE,
        pubkey::Pubkey,
        sanitize::{Sanitize, SanitizeError},
        signature::{Keypair, Signable, Signature, Signer},
    },
    static_assertions::const_assert,
    std::{borrow::Cow, fmt::Debug},
};

/// Maximum number of prune targets carried by a single prune message.
pub const MAX_PRUNE_DATA_NODES: usize = 32;

/// Payload budget for crds values in a single push message; the
/// 44-byte slack covers the variant tag, sender pubkey and the
/// vector-length prefix of the envelope.
pub const PUSH_MESSAGE_MAX_PAYLOAD_SIZE: usize = PACKET_DATA_SIZE - 44;
/// Pull responses carry the same envelope as push messages.
pub const PULL_RESPONSE_MAX_PAYLOAD_SIZE: usize = PUSH_MESSAGE_MAX_PAYLOAD_SIZE;
const_assert!(PUSH_MESSAGE_MAX_PAYLOAD_SIZE < PACKET_DATA_SIZE);

/// Gossip wire format. One encoded message per UDP datagram.
#[allow(clippy::large_enum_variant)]
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Protocol {
    /// A bloom filter of the caller's records, plus its contact info.
    PullRequest(CrdsFilter, CrdsValue),
    PullResponse(Pubkey, Vec<CrdsValue>),
    PushMessage(Pubkey, Vec<CrdsValue>),
    PruneMessage(Pubkey, PruneData),
    PingMessage(Ping),
    PongMessage(Pong),
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PruneData {
    /// Pubkey of the node that sent this prune data
    pub pubkey: Pubkey,
    /// Pubkeys of origins that should no longer be forwarded
    pub prunes: Vec<Pubkey>,
    /// Signature of this Prune Message
    pub signature: Signature,
    /// The Pubkey of the intended node/destination for this message
    pub destination: Pubkey,
    /// Wallclock of the node that generated this message
    pub wallclock: u64,
}

impl PruneData {
    pub fn new(keypair: &Keypair, prunes: Vec<Pubkey>, destination: Pubkey, wallclock: u64) -> Self {
        let mut prune_data = PruneData {
            pubkey: keypair.pubkey(),
            prunes,
            signature: Signature::default(),
            destination,
            wallclock,
        };
        prune_data.sign(keypair);
        prune_data
    }
}

impl Sanitize for PruneData {
    fn sanitize(&self) -> Result<(), SanitizeError> {
        sanitize_wallclock(self.wallclock)?;
        if self.prunes.is_empty() {
            return Err(SanitizeError::InvalidValue);
        }
        self.pubkey.sanitize()?;
        self.destination.sanitize()?;
        self.signature.sanitize()
    }
}

impl Signable for PruneData {
    fn pubkey(&self) -> Pubkey {
        self.pubkey
    }

    fn signable_data(&self) -> Cow<[u8]> {
        #[derive(Serialize)]
        struct SignData<'a> {
            pubkey: &'a Pubkey,
            prunes: &'a [Pubkey],
            destination: &'a Pubkey,
            wallclock: u64,
        }
        let data = SignData {
            pubkey: &self.pubkey,
            prunes: &self.prunes,
            destination: &self.destination,
            wallclock: self.wallclock,
        };
        Cow::Owned(bincode::serialize(&data).expect("failed to serialize PruneData"))
    }

    fn get_signature(&self) -> Signature {
        self.signature
    }

    fn set_signature(&mut self, signature: Signature) {
        self.signature = signature
    }
}

impl Sanitize for Protocol {
    fn sanitize(&self) -> Result<(), SanitizeError> {
        match self {
            Protocol::PullRequest(filter, val) => {
                filter.sanitize()?;
                val.sanitize()
            }
            Protocol::PullResponse(_, val) => val.sanitize(),
            Protocol::PushMessage(_, val) => val.sanitize(),
            Protocol::PruneMessage(from, val) => {
                from.sanitize()?;
                val.sanitize()
            }
            Protocol::PingMessage(ping) => ping.sanitize(),
            Protocol::PongMessage(pong) => pong.sanitize(),
        }
    }
}

impl Protocol {
    /// Message level signature check; a message is either fully
    /// trusted or dropped.
    pub(crate) fn verify(&self) -> bool {
        match self {
            Protocol::PullRequest(_, caller) => caller.verify(),
            Protocol::PullResponse(_, values) | Protocol::PushMessage(_, values) => {
                values.iter().all(|value| value.verify())
            }
            Protocol::PruneMessage(from, data) => *from == data.pubkey && data.verify(),
            Protocol::PingMessage(ping) => ping.verify(),
            Protocol::PongMessage(pong) => pong.verify(),
        }
    }
}

/// Splits an ordered stream of values into chunks whose total encoded
/// size stays within `max_chunk_size`: flushes when the next value
/// would overflow the budget, and once more at end of input. A single
/// value larger than the budget cannot be sent at all and is dropped.
pub(crate) fn split_gossip_messages<I, T>(
    max_chunk_size: usize,
    data_feed: I,
) -> impl Iterator<Item = Vec<T>>
where
    T: Serialize + Debug,
    I: IntoIterator<Item = T>,
{
    let mut data_feed = data_feed.into_iter().fuse();
    let mut buffer = vec![];
    let mut buffer_size = 0; // Serialized size of buffered values.
    std::iter::from_fn(move || loop {
        match data_feed.next() {
            None => {
                return if buffer.is_empty() {
                    None
                } else {
                    Some(std::mem::take(&mut buffer))
                };
            }
            Some(data) => {
                let data_size = match serialized_size(&data) {
                    Ok(size) => size as usize,
                    Err(err) => {
                        error!("serialized_size failed: {:?}", err);
                        continue;
                    }
                };
                if buffer_size + data_size <= max_chunk_size {
                    buffer_size += data_size;
                    buffer.push(data);
                } else if data_size <= max_chunk_size {
                    buffer_size = data_size;
                    return Some(std::mem::replace(&mut buffer, vec![data]));
                } else {
                    error!(
                        "dropping data larger than the maximum chunk size {:?}",
                        data
                    );
                }
            }
        }
    })
}

#[cfg(test)]
mod test {
    use {
        super::*,
        crate::{crds_value::CrdsData, legacy_contact_info::LegacyContactInfo, packet::Packet},
        rand::Rng,
        solana_sdk::timing::timestamp,
        std::net::SocketAddr,
    };

    fn rand_values(num: usize) -> Vec<CrdsValue> {
        let mut rng = rand::thread_rng();
        std::iter::repeat_with(|| CrdsValue::new_rand(&mut rng, None))
            .take(num)
            .collect()
    }

    #[test]
    fn test_push_message_payload_slack() {
        let envelope =
            serialized_size(&Protocol::PushMessage(Pubkey::default(), vec![])).unwrap() as usize;
        assert_eq!(PUSH_MESSAGE_MAX_PAYLOAD_SIZE, PACKET_DATA_SIZE - envelope);
        let envelope =
            serialized_size(&Protocol::PullResponse(Pubkey::default(), vec![])).unwrap() as usize;
        assert_eq!(PULL_RESPONSE_MAX_PAYLOAD_SIZE, PACKET_DATA_SIZE - envelope);
    }

    #[test]
    fn test_split_gossip_messages_fits_packets() {
        let addr: SocketAddr = "127.0.0.1:1234".parse().unwrap();
        let values = rand_values(128);
        let mut num_values = 0;
        for chunk in split_gossip_messages(PUSH_MESSAGE_MAX_PAYLOAD_SIZE, values.clone()) {
            assert!(!chunk.is_empty());
            num_values += chunk.len();
            let message = Protocol::PushMessage(Pubkey::default(), chunk);
            let packet = Packet::from_data(addr, &message).unwrap();
            assert!(packet.len() <= PACKET_DATA_SIZE);
        }
        assert_eq!(num_values, values.len());
    }

    #[test]
    fn test_split_gossip_messages_preserves_order() {
        let values = rand_values(64);
        let chunked: Vec<CrdsValue> =
            split_gossip_messages(PUSH_MESSAGE_MAX_PAYLOAD_SIZE, values.clone())
                .flatten()
                .collect();
        assert_eq!(chunked, values);
    }

    #[test]
    fn test_prune_data_sign_verify() {
        let mut rng = rand::thread_rng();
        let keypair = Keypair::new();
        let prunes: Vec<Pubkey> = std::iter::repeat_with(Pubkey::new_unique)
            .take(rng.gen_range(1..MAX_PRUNE_DATA_NODES))
            .collect();
        let prune_data = PruneData::new(&keypair, prunes, Pubkey::new_unique(), timestamp());
        assert!(prune_data.verify());
        assert_eq!(prune_data.sanitize(), Ok(()));

        let mut tampered = prune_data.clone();
        tampered.wallclock += 1;
        assert!(!tampered.verify());

        let mut empty = prune_data;
        empty.prunes = vec![];
        assert_eq!(empty.sanitize(), Err(SanitizeError::InvalidValue));
    }

    #[test]
    fn test_protocol_verify() {
        let keypair = Keypair::new();
        let wrong_keypair = Keypair::new();
        let node = LegacyContactInfo::new_localhost(&keypair.pubkey(), timestamp());
        let value = CrdsValue::new_signed(CrdsData::LegacyContactInfo(node.clone()), &keypair);
        assert!(Protocol::PushMessage(keypair.pubkey(), vec![value.clone()]).verify());
        assert!(Protocol::PullResponse(keypair.pubkey(), vec![value.clone()]).verify());

        let forged = CrdsValue::new_signed(CrdsData::LegacyContactInfo(node), &wrong_keypair);
        assert!(!Protocol::PushMessage(keypair.pubkey(), vec![value.clone(), forged]).verify());

        let prune_data =
            PruneData::new(&keypair, vec![Pubkey::new_unique()], Pubkey::new_unique(), 0);
        assert!(Protocol::PruneMessage(keypair.pubkey(), prune_data.clone()).verify());
        // the envelope sender must match the signed pubkey
        assert!(!Protocol::PruneMessage(wrong_keypair.pubkey(), prune_data).verify());

        let mut rng = rand::thread_rng();
        let ping = Ping::new_rand(&mut rng, &keypair);
        assert!(Protocol::PingMessage(ping.clone()).verify());
        assert!(Protocol::PongMessage(Pong::new(&ping, &keypair)).verify());
    }

    #[test]
    fn test_pull_request_round_trip() {
        let keypair = Keypair::new();
        let node = LegacyContactInfo::new_localhost(&keypair.pubkey(), timestamp());
        let caller = CrdsValue::new_signed(CrdsData::LegacyContactInfo(node), &keypair);
        let filter = CrdsFilter::new_rand(128, crate::crds_gossip_pull::MAX_BLOOM_SIZE);
        let request = Protocol::PullRequest(filter, caller);
        let bytes = bincode::serialize(&request).unwrap();
        assert!(bytes.len() <= PACKET_DATA_SIZE);
        let decoded: Protocol = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, request);
        assert!(decoded.verify());
    }
}
