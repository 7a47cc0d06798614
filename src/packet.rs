use {crate::gossip_error::GossipError, serde::Serialize, std::net::SocketAddr};

pub use solana_sdk::packet::PACKET_DATA_SIZE;

/// A single UDP datagram, either read off or destined for the gossip
/// socket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    pub addr: SocketAddr,
    pub data: Vec<u8>,
}

impl Packet {
    /// Encodes `data` and wraps it with the destination address.
    /// Fails if the encoding does not fit in a single datagram.
    pub fn from_data<T: Serialize>(addr: SocketAddr, data: &T) -> Result<Self, GossipError> {
        let data = bincode::serialize(data)?;
        if data.len() > PACKET_DATA_SIZE {
            return Err(GossipError::Serialize(Box::new(
                bincode::ErrorKind::SizeLimit,
            )));
        }
        Ok(Self { addr, data })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
