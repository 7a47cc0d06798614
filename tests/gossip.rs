//! Cross-worker tests driving the engine over real channels and
//! sockets.

use {
    cluster_gossip::{
        cluster_info::ClusterInfo,
        crds_value::{CrdsData, CrdsValue, MAX_EPOCH_SLOTS},
        epoch_slots::EpochSlots,
        gossip_service::{GossipService, GOSSIP_CHANNEL_CAPACITY},
        legacy_contact_info::LegacyContactInfo,
        packet::Packet,
        ping_pong::Ping,
        protocol::Protocol,
    },
    crossbeam_channel::bounded,
    solana_sdk::{
        signature::{Keypair, Signer},
        timing::timestamp,
    },
    std::{
        net::{SocketAddr, UdpSocket},
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
        thread::sleep,
        time::{Duration, Instant},
    },
};

fn new_cluster_info() -> Arc<ClusterInfo> {
    let keypair = Arc::new(Keypair::new());
    let node = LegacyContactInfo::new_localhost(&keypair.pubkey(), timestamp());
    Arc::new(ClusterInfo::new(node, keypair))
}

fn signed_contact_info(keypair: &Keypair) -> CrdsValue {
    let node = LegacyContactInfo::new_localhost(&keypair.pubkey(), timestamp());
    CrdsValue::new_signed(CrdsData::LegacyContactInfo(node), keypair)
}

#[test]
fn test_verifier_end_to_end() {
    solana_logger::setup();
    let cluster_info = new_cluster_info();
    let exit = Arc::new(AtomicBool::new(false));
    let (packet_sender, packet_receiver) = bounded(GOSSIP_CHANNEL_CAPACITY);
    let (verified_sender, verified_receiver) = bounded(GOSSIP_CHANNEL_CAPACITY);
    let t_consume = ClusterInfo::socket_consume(
        cluster_info.clone(),
        packet_receiver,
        verified_sender,
        exit.clone(),
    );

    let from_addr: SocketAddr = "127.0.0.1:1234".parse().unwrap();
    let sender_keypair = Keypair::new();
    let good = Packet::from_data(
        from_addr,
        &Protocol::PushMessage(
            sender_keypair.pubkey(),
            vec![signed_contact_info(&sender_keypair)],
        ),
    )
    .unwrap();

    // an epoch slots record at the index bound fails sanitization
    let bad_sanitize_value = CrdsValue::new_signed(
        CrdsData::EpochSlots(
            MAX_EPOCH_SLOTS,
            EpochSlots::new(sender_keypair.pubkey(), timestamp()),
        ),
        &sender_keypair,
    );
    let bad_sanitize = Packet::from_data(
        from_addr,
        &Protocol::PushMessage(sender_keypair.pubkey(), vec![bad_sanitize_value]),
    )
    .unwrap();

    // a value claiming one pubkey but signed by another
    let forger = Keypair::new();
    let node = LegacyContactInfo::new_localhost(&sender_keypair.pubkey(), timestamp());
    let forged_value = CrdsValue::new_signed(CrdsData::LegacyContactInfo(node), &forger);
    let bad_signature = Packet::from_data(
        from_addr,
        &Protocol::PushMessage(sender_keypair.pubkey(), vec![forged_value]),
    )
    .unwrap();

    for _ in 0..3 {
        packet_sender.send(good.clone()).unwrap();
    }
    packet_sender.send(bad_sanitize).unwrap();
    packet_sender.send(bad_signature).unwrap();

    let mut verified = Vec::new();
    let deadline = Instant::now() + Duration::from_secs(5);
    while verified.len() < 3 && Instant::now() < deadline {
        if let Ok(message) = verified_receiver.recv_timeout(Duration::from_millis(100)) {
            verified.push(message);
        }
    }
    assert_eq!(verified.len(), 3);
    for (addr, message) in &verified {
        assert_eq!(addr, &from_addr);
        match message {
            Protocol::PushMessage(from, values) => {
                assert_eq!(from, &sender_keypair.pubkey());
                assert_eq!(values[0].pubkey(), sender_keypair.pubkey());
            }
            _ => panic!("unexpected message: {:?}", message),
        }
    }
    // the two bad packets were dropped, and ingress has drained
    assert!(verified_receiver
        .recv_timeout(Duration::from_millis(200))
        .is_err());
    assert!(packet_sender.is_empty());

    exit.store(true, Ordering::Relaxed);
    t_consume.join().unwrap();
}

#[test]
fn test_listener_inserts_and_pongs() {
    solana_logger::setup();
    let cluster_info = new_cluster_info();
    let exit = Arc::new(AtomicBool::new(false));
    let (verified_sender, verified_receiver) = bounded(GOSSIP_CHANNEL_CAPACITY);
    let (response_sender, response_receiver) = bounded(GOSSIP_CHANNEL_CAPACITY);
    let t_listen = ClusterInfo::listen(
        cluster_info.clone(),
        verified_receiver,
        response_sender,
        exit.clone(),
    );

    let from_addr: SocketAddr = "127.0.0.1:4567".parse().unwrap();
    let peer_keypair = Keypair::new();
    let push = Protocol::PushMessage(
        peer_keypair.pubkey(),
        vec![signed_contact_info(&peer_keypair)],
    );
    verified_sender.send((from_addr, push)).unwrap();
    let mut rng = rand::thread_rng();
    let ping = Ping::new_rand(&mut rng, &peer_keypair);
    verified_sender
        .send((from_addr, Protocol::PingMessage(ping)))
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while (cluster_info.gossip_peers().len() != 1 || response_receiver.len() != 1)
        && Instant::now() < deadline
    {
        sleep(Duration::from_millis(10));
    }
    assert_eq!(cluster_info.gossip_peers().len(), 1);
    assert!(cluster_info
        .lookup_contact_info(&peer_keypair.pubkey())
        .is_some());
    assert_eq!(response_receiver.len(), 1);
    let packet = response_receiver.recv().unwrap();
    assert_eq!(packet.addr, from_addr);
    let message: Protocol = bincode::deserialize(&packet.data).unwrap();
    match message {
        Protocol::PongMessage(pong) => {
            assert_eq!(pong.from(), &cluster_info.id());
            assert!(pong.verify());
        }
        _ => panic!("expected a pong, got: {:?}", message),
    }

    exit.store(true, Ordering::Relaxed);
    t_listen.join().unwrap();
}

#[test]
fn test_two_node_convergence() {
    solana_logger::setup();
    let socket_a = UdpSocket::bind("127.0.0.1:0").unwrap();
    let socket_b = UdpSocket::bind("127.0.0.1:0").unwrap();
    let addr_a = socket_a.local_addr().unwrap();
    let addr_b = socket_b.local_addr().unwrap();

    let keypair_a = Arc::new(Keypair::new());
    let keypair_b = Arc::new(Keypair::new());
    let mut node_a = LegacyContactInfo::new_localhost(&keypair_a.pubkey(), timestamp());
    node_a.gossip = addr_a;
    let mut node_b = LegacyContactInfo::new_localhost(&keypair_b.pubkey(), timestamp());
    node_b.gossip = addr_b;

    let cluster_info_a = Arc::new(ClusterInfo::new(node_a, keypair_a.clone()));
    let cluster_info_b = Arc::new(ClusterInfo::new(node_b, keypair_b.clone()));
    // node a only knows where to reach b
    cluster_info_a.set_entrypoint(LegacyContactInfo::new_gossip_entry_point(&addr_b));

    let exit = Arc::new(AtomicBool::new(false));
    let service_a = GossipService::new(&cluster_info_a, socket_a, &exit);
    let service_b = GossipService::new(&cluster_info_b, socket_b, &exit);

    let deadline = Instant::now() + Duration::from_secs(30);
    loop {
        let a_knows_b = cluster_info_a
            .lookup_contact_info(&keypair_b.pubkey())
            .is_some();
        let b_knows_a = cluster_info_b
            .lookup_contact_info(&keypair_a.pubkey())
            .is_some();
        if a_knows_b && b_knows_a {
            break;
        }
        assert!(Instant::now() < deadline, "nodes failed to converge");
        sleep(Duration::from_millis(200));
    }

    exit.store(true, Ordering::Relaxed);
    service_a.join().unwrap();
    service_b.join().unwrap();
}
