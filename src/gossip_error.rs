use thiserror::Error;

#[derive(Debug, Error)]
pub enum GossipError {
    #[error("gossip address failed sanitization")]
    BadGossipAddress,
    #[error("prune message destined for another node")]
    BadPruneDestination,
    #[error("no qualified gossip peers")]
    NoPeers,
    #[error("prune message wallclock is too old")]
    PruneMessageTimeout,
    #[error(transparent)]
    Serialize(#[from] bincode::Error),
    #[error("no contact info in the table for the destination")]
    UnknownContactInfo,
}
