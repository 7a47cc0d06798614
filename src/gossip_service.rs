//! The `gossip_service` module wires the gossip workers over bounded
//! queues and manages their lifetime.

use {
    crate::{cluster_info::ClusterInfo, streamer},
    crossbeam_channel::bounded,
    std::{
        net::UdpSocket,
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
        thread::{self, JoinHandle},
    },
};

/// Capacity of the ingress, verified and egress queues.
pub const GOSSIP_CHANNEL_CAPACITY: usize = 10_000;

pub struct GossipService {
    exit: Arc<AtomicBool>,
    thread_hdls: Vec<JoinHandle<()>>,
}

impl GossipService {
    pub fn new(
        cluster_info: &Arc<ClusterInfo>,
        gossip_socket: UdpSocket,
        exit: &Arc<AtomicBool>,
    ) -> Self {
        let (packet_sender, packet_receiver) = bounded(GOSSIP_CHANNEL_CAPACITY);
        let (verified_sender, verified_receiver) = bounded(GOSSIP_CHANNEL_CAPACITY);
        let (response_sender, response_receiver) = bounded(GOSSIP_CHANNEL_CAPACITY);
        let gossip_socket = Arc::new(gossip_socket);
        trace!(
            "GossipService: id: {}, listening on: {:?}",
            cluster_info.id(),
            gossip_socket.local_addr()
        );
        let t_receiver = streamer::receiver(gossip_socket.clone(), exit.clone(), packet_sender);
        let t_socket_consume = ClusterInfo::socket_consume(
            cluster_info.clone(),
            packet_receiver,
            verified_sender,
            exit.clone(),
        );
        let t_listen = ClusterInfo::listen(
            cluster_info.clone(),
            verified_receiver,
            response_sender.clone(),
            exit.clone(),
        );
        let t_gossip = ClusterInfo::gossip(cluster_info.clone(), response_sender, exit.clone());
        let t_responder = streamer::responder("gossip", gossip_socket, response_receiver, exit.clone());
        let thread_hdls = vec![t_receiver, t_socket_consume, t_listen, t_gossip, t_responder];
        Self {
            exit: exit.clone(),
            thread_hdls,
        }
    }

    /// Joins all workers. The exit flag is raised again after every
    /// join, so the unexpected death of any single worker winds down
    /// the rest of the engine.
    pub fn join(self) -> thread::Result<()> {
        for thread_hdl in self.thread_hdls {
            let result = thread_hdl.join();
            self.exit.store(true, Ordering::Relaxed);
            result?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use {
        super::*,
        crate::legacy_contact_info::LegacyContactInfo,
        solana_sdk::{
            signature::{Keypair, Signer},
            timing::timestamp,
        },
    };

    #[test]
    fn test_exit() {
        let exit = Arc::new(AtomicBool::new(false));
        let keypair = Arc::new(Keypair::new());
        let node = LegacyContactInfo::new_localhost(&keypair.pubkey(), timestamp());
        let cluster_info = Arc::new(ClusterInfo::new(node, keypair));
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        let service = GossipService::new(&cluster_info, socket, &exit);
        exit.store(true, Ordering::Relaxed);
        service.join().unwrap();
    }
}
