//! The engine coordinating the gossip workers around the shared
//! cluster state.
//!
//! Three workers talk to each other exclusively through bounded
//! queues: the verifier drains raw packets, decodes, sanitizes and
//! signature-checks them; the listener dispatches verified messages
//! and mutates the crds table; the builder periodically constructs
//! push and pull traffic, rotates the active set and garbage-collects
//! the table. Socket facing receive/respond loops live in
//! `streamer`. Shared state is held under short critical sections;
//! no lock is ever held across a queue send.

use {
    crate::{
        crds::{Crds, HashTimeQueue, CRDS_UNIQUE_PUBKEY_CAPACITY},
        crds_gossip_pull::{
            build_crds_filters, filter_crds_values, CrdsFilter, MAX_BLOOM_SIZE,
            MAX_NUM_CRDS_VALUES_PULL_RESPONSE, MAX_NUM_PULL_REQUESTS,
        },
        crds_value::{CrdsData, CrdsValue},
        gossip_error::GossipError,
        legacy_contact_info::LegacyContactInfo,
        packet::{Packet, PACKET_DATA_SIZE},
        ping_pong::{Ping, Pong},
        protocol::{split_gossip_messages, Protocol, PruneData, MAX_PRUNE_DATA_NODES,
            PULL_RESPONSE_MAX_PAYLOAD_SIZE, PUSH_MESSAGE_MAX_PAYLOAD_SIZE,
        },
        push_active_set::{PushActiveSet, NUM_ACTIVE_SET_ENTRIES},
    },
    bincode::{serialize, serialized_size, Options},
    crossbeam_channel::{Receiver, Sender},
    rand::{Rng, SeedableRng},
    rand_chacha::ChaChaRng,
    rayon::iter::{IntoParallelIterator, ParallelIterator},
    solana_sdk::{
        hash::hash,
        pubkey::Pubkey,
        sanitize::Sanitize,
        signature::{Keypair, Signer},
        timing::timestamp,
    },
    std::{
        collections::{HashMap, HashSet},
        net::SocketAddr,
        sync::{
            atomic::{AtomicBool, AtomicU64, Ordering},
            Arc, Mutex, RwLock,
        },
        thread::{sleep, Builder, JoinHandle},
        time::{Duration, Instant},
    },
};

pub const CRDS_GOSSIP_PULL_CRDS_TIMEOUT_MS: u64 = 15_000;
pub const CRDS_GOSSIP_PUSH_MSG_TIMEOUT_MS: u64 = 30_000;
pub const CRDS_GOSSIP_PRUNE_MSG_TIMEOUT_MS: u64 = 500;
pub const FAILED_INSERTS_RETENTION_MS: u64 = 20_000;
/// Contact records inserted longer ago than this are not gossip peers.
pub const GOSSIP_ACTIVE_TIMEOUT: u64 = 60_000;
/// Target period of the builder loop.
pub const GOSSIP_SLEEP_MILLIS: u64 = 1_000;
/// Max number of packets sent per push round.
pub const MAX_PACKETS_PER_PUSH: usize = 64;
pub const MAX_BYTES_PER_PUSH: u64 = PACKET_DATA_SIZE as u64 * MAX_PACKETS_PER_PUSH as u64;
/// Max crds values scanned past the cursor per push round.
const MAX_NUM_PUSH_VALUES: usize = 512;

const STATS_REPORT_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Default)]
struct GossipStats {
    packets_received: AtomicU64,
    packets_verified: AtomicU64,
    push_messages: AtomicU64,
    pull_requests: AtomicU64,
    pull_responses: AtomicU64,
    prune_messages: AtomicU64,
    ping_messages: AtomicU64,
    pong_messages: AtomicU64,
}

impl GossipStats {
    fn report(&self, table_size: usize) {
        debug!(
            "gossip: table: {}, received: {}, verified: {}, push: {}, \
             pull requests: {}, pull responses: {}, prune: {}, ping: {}, pong: {}",
            table_size,
            self.packets_received.swap(0, Ordering::Relaxed),
            self.packets_verified.swap(0, Ordering::Relaxed),
            self.push_messages.swap(0, Ordering::Relaxed),
            self.pull_requests.swap(0, Ordering::Relaxed),
            self.pull_responses.swap(0, Ordering::Relaxed),
            self.prune_messages.swap(0, Ordering::Relaxed),
            self.ping_messages.swap(0, Ordering::Relaxed),
            self.pong_messages.swap(0, Ordering::Relaxed),
        );
    }
}

pub struct ClusterInfo {
    id: Pubkey,
    pub keypair: Arc<Keypair>,
    my_contact_info: RwLock<LegacyContactInfo>,
    crds: RwLock<Crds>,
    active_set: RwLock<PushActiveSet>,
    /// Values queued to enter the table and the push overlay.
    push_queue: Mutex<Vec<CrdsValue>>,
    /// Hashes of values which recently failed to insert from pull
    /// responses; folded into outgoing pull filters.
    failed_inserts: Mutex<HashTimeQueue>,
    stats: GossipStats,
}

impl ClusterInfo {
    pub fn new(contact_info: LegacyContactInfo, keypair: Arc<Keypair>) -> Self {
        Self {
            id: keypair.pubkey(),
            keypair,
            my_contact_info: RwLock::new(contact_info),
            crds: RwLock::new(Crds::default()),
            active_set: RwLock::new(PushActiveSet::default()),
            push_queue: Mutex::new(Vec::new()),
            failed_inserts: Mutex::new(HashTimeQueue::default()),
            stats: GossipStats::default(),
        }
    }

    pub fn id(&self) -> Pubkey {
        self.id
    }

    pub fn my_contact_info(&self) -> LegacyContactInfo {
        self.my_contact_info.read().unwrap().clone()
    }

    pub fn my_shred_version(&self) -> u16 {
        self.my_contact_info.read().unwrap().shred_version
    }

    /// Our own contact info restamped to `now` and re-signed.
    fn my_contact_info_value(&self, now: u64) -> CrdsValue {
        let contact_info = {
            let mut contact_info = self.my_contact_info.write().unwrap();
            contact_info.wallclock = now;
            contact_info.clone()
        };
        CrdsValue::new_signed(CrdsData::LegacyContactInfo(contact_info), &self.keypair)
    }

    /// Seeds a locally trusted contact record, e.g. a cluster
    /// entrypoint known out of band.
    pub fn insert_info(&self, contact_info: LegacyContactInfo) {
        let value = CrdsValue::new_unsigned(CrdsData::LegacyContactInfo(contact_info));
        let mut crds = self.crds.write().unwrap();
        let _ = crds.insert(value, timestamp());
    }

    pub fn set_entrypoint(&self, entrypoint: LegacyContactInfo) {
        self.insert_info(entrypoint);
    }

    pub fn lookup_contact_info(&self, pubkey: &Pubkey) -> Option<LegacyContactInfo> {
        self.crds.read().unwrap().get_contact_info(pubkey).cloned()
    }

    /// All contact records in the table other than our own.
    pub fn gossip_peers(&self) -> Vec<LegacyContactInfo> {
        self.crds
            .read()
            .unwrap()
            .get_contact_infos()
            .filter_map(|entry| entry.value.contact_info())
            .filter(|node| node.id != self.id)
            .cloned()
            .collect()
    }

    // ------------------------------------------------------------------
    // Verifier
    // ------------------------------------------------------------------

    fn verify_packet(packet: &Packet) -> Option<(SocketAddr, Protocol)> {
        let message: Protocol = match bincode::options()
            .with_limit(PACKET_DATA_SIZE as u64)
            .with_fixint_encoding()
            .allow_trailing_bytes()
            .deserialize(&packet.data)
        {
            Ok(message) => message,
            Err(err) => {
                debug!("packet from {} failed to decode: {:?}", packet.addr, err);
                return None;
            }
        };
        if let Err(err) = message.sanitize() {
            debug!("packet from {} failed sanitize: {:?}", packet.addr, err);
            return None;
        }
        if !message.verify() {
            debug!("packet from {} failed signature verification", packet.addr);
            return None;
        }
        Some((packet.addr, message))
    }

    fn run_socket_consume(
        &self,
        packet_receiver: &Receiver<Packet>,
        verified_sender: &Sender<(SocketAddr, Protocol)>,
        exit: &AtomicBool,
    ) {
        while !exit.load(Ordering::Relaxed) {
            let packets: Vec<Packet> = packet_receiver.try_iter().collect();
            if packets.is_empty() {
                sleep(Duration::from_millis(1));
                continue;
            }
            self.stats
                .packets_received
                .fetch_add(packets.len() as u64, Ordering::Relaxed);
            let verified: Vec<(SocketAddr, Protocol)> = packets
                .into_par_iter()
                .filter_map(|packet| Self::verify_packet(&packet))
                .collect();
            self.stats
                .packets_verified
                .fetch_add(verified.len() as u64, Ordering::Relaxed);
            for message in verified {
                if verified_sender.send(message).is_err() {
                    return;
                }
            }
        }
    }

    pub fn socket_consume(
        me: Arc<Self>,
        packet_receiver: Receiver<Packet>,
        verified_sender: Sender<(SocketAddr, Protocol)>,
        exit: Arc<AtomicBool>,
    ) -> JoinHandle<()> {
        Builder::new()
            .name("gossip-consume".to_string())
            .spawn(move || me.run_socket_consume(&packet_receiver, &verified_sender, &exit))
            .unwrap()
    }

    // ------------------------------------------------------------------
    // Listener (message dispatch)
    // ------------------------------------------------------------------

    fn handle_protocol_message(
        &self,
        from_addr: SocketAddr,
        message: Protocol,
        response_sender: &Sender<Packet>,
    ) {
        let now = timestamp();
        match message {
            Protocol::PushMessage(from, values) => {
                self.stats.push_messages.fetch_add(1, Ordering::Relaxed);
                match self.handle_push_message(&from, &values, now) {
                    Ok(packets) => send_packets(response_sender, packets),
                    Err(err) => error!("handle_push_message from {}: {:?}", from, err),
                }
            }
            Protocol::PullRequest(filter, caller) => {
                self.stats.pull_requests.fetch_add(1, Ordering::Relaxed);
                match self.handle_pull_request(from_addr, filter, caller, now) {
                    Ok(packets) => send_packets(response_sender, packets),
                    Err(err) => error!("handle_pull_request from {}: {:?}", from_addr, err),
                }
            }
            Protocol::PullResponse(from, values) => {
                self.stats.pull_responses.fetch_add(1, Ordering::Relaxed);
                self.handle_pull_response(&from, &values, now);
            }
            Protocol::PruneMessage(from, prune_data) => {
                self.stats.prune_messages.fetch_add(1, Ordering::Relaxed);
                if let Err(err) = self.handle_prune_message(&prune_data, now) {
                    error!("handle_prune_message from {}: {:?}", from, err);
                }
            }
            Protocol::PingMessage(ping) => {
                self.stats.ping_messages.fetch_add(1, Ordering::Relaxed);
                match self.handle_ping_message(from_addr, &ping) {
                    Ok(packet) => send_packets(response_sender, vec![packet]),
                    Err(err) => error!("handle_ping_message from {}: {:?}", from_addr, err),
                }
            }
            Protocol::PongMessage(pong) => {
                self.stats.pong_messages.fetch_add(1, Ordering::Relaxed);
                trace!("pong from {} at {}", pong.from(), from_addr);
            }
        }
        let evicted = self
            .crds
            .write()
            .unwrap()
            .attempt_trim(CRDS_UNIQUE_PUBKEY_CAPACITY, now);
        if !evicted.is_empty() {
            debug!("crds table over capacity: evicted {} origins", evicted.len());
        }
    }

    /// Inserts pushed values; returns prune messages for the sender if
    /// any values failed to insert.
    pub fn handle_push_message(
        &self,
        from: &Pubkey,
        values: &[CrdsValue],
        now: u64,
    ) -> Result<Vec<Packet>, GossipError> {
        let results = self.crds.write().unwrap().insert_values(
            values,
            now,
            CRDS_GOSSIP_PUSH_MSG_TIMEOUT_MS,
            /*record_timeouts:*/ false,
            /*update_timestamps:*/ false,
        );
        let failed_origins: HashSet<Pubkey> = results
            .failed
            .iter()
            .map(|&index| values[index].pubkey())
            .collect();
        if failed_origins.is_empty() {
            return Ok(Vec::new());
        }
        self.build_prune_messages(&failed_origins, from, now)
    }

    /// Signed prune messages telling `destination` to stop forwarding
    /// the given origins to us, in chunks of `MAX_PRUNE_DATA_NODES`.
    pub fn build_prune_messages(
        &self,
        origins: &HashSet<Pubkey>,
        destination: &Pubkey,
        now: u64,
    ) -> Result<Vec<Packet>, GossipError> {
        let gossip_addr = {
            let crds = self.crds.read().unwrap();
            let contact_info = crds
                .get_contact_info(destination)
                .ok_or(GossipError::UnknownContactInfo)?;
            if !LegacyContactInfo::is_valid_address(&contact_info.gossip) {
                return Err(GossipError::BadGossipAddress);
            }
            contact_info.gossip
        };
        let origins: Vec<Pubkey> = origins
            .iter()
            .filter(|&&origin| origin != self.id)
            .copied()
            .collect();
        let mut packets = Vec::new();
        for chunk in origins.chunks(MAX_PRUNE_DATA_NODES) {
            let prune_data = PruneData::new(&self.keypair, chunk.to_vec(), *destination, now);
            let message = Protocol::PruneMessage(self.id, prune_data);
            packets.push(Packet::from_data(gossip_addr, &message)?);
        }
        Ok(packets)
    }

    /// Answers a pull request with values the caller is missing,
    /// chunked into packets addressed to the request's source socket.
    pub fn handle_pull_request(
        &self,
        from_addr: SocketAddr,
        filter: CrdsFilter,
        caller: CrdsValue,
        now: u64,
    ) -> Result<Vec<Packet>, GossipError> {
        // TODO: once a ping cache is wired in, require a verified pong
        // from the caller before serving the request.
        let caller_pubkey = caller.pubkey();
        let caller_wallclock = caller.wallclock();
        {
            let mut crds = self.crds.write().unwrap();
            let _ = crds.insert(caller, now);
            crds.update_record_timestamp(&caller_pubkey, now);
        }
        let values = {
            let crds = self.crds.read().unwrap();
            filter_crds_values(
                &crds,
                &filter,
                caller_wallclock,
                MAX_NUM_CRDS_VALUES_PULL_RESPONSE,
            )
        };
        let mut packets = Vec::new();
        for chunk in split_gossip_messages(PULL_RESPONSE_MAX_PAYLOAD_SIZE, values) {
            let response = Protocol::PullResponse(self.id, chunk);
            packets.push(Packet::from_data(from_addr, &response)?);
        }
        Ok(packets)
    }

    /// Folds a pull response into the table. Returns the number of
    /// values inserted.
    pub fn handle_pull_response(&self, from: &Pubkey, values: &[CrdsValue], now: u64) -> usize {
        let results = {
            let mut crds = self.crds.write().unwrap();
            let results = crds.insert_values(
                values,
                now,
                CRDS_GOSSIP_PULL_CRDS_TIMEOUT_MS,
                /*record_timeouts:*/ true,
                /*update_timestamps:*/ true,
            );
            // a timed out value may still carry the freshest version
            // of a record we already hold
            for &index in &results.timeouts {
                let _ = crds.insert(values[index].clone(), now);
            }
            results
        };
        if !results.failed.is_empty() {
            let mut failed_inserts = self.failed_inserts.lock().unwrap();
            failed_inserts.trim(now.saturating_sub(FAILED_INSERTS_RETENTION_MS));
            for &index in &results.failed {
                match serialize(&values[index]) {
                    Ok(bytes) => failed_inserts.push(hash(&bytes), now),
                    Err(err) => error!("failed to serialize crds value: {:?}", err),
                }
            }
        }
        trace!(
            "pull response from {}: {} inserted, {} timeouts, {} failed",
            from,
            results.inserted.len(),
            results.timeouts.len(),
            results.failed.len(),
        );
        results.inserted.len()
    }

    /// Applies a prune message to the active set.
    pub fn handle_prune_message(
        &self,
        prune_data: &PruneData,
        now: u64,
    ) -> Result<(), GossipError> {
        if prune_data.wallclock < now.saturating_sub(CRDS_GOSSIP_PRUNE_MSG_TIMEOUT_MS) {
            return Err(GossipError::PruneMessageTimeout);
        }
        if prune_data.destination != self.id {
            return Err(GossipError::BadPruneDestination);
        }
        let mut active_set = self.active_set.write().unwrap();
        for origin in &prune_data.prunes {
            if *origin != self.id {
                active_set.prune(&prune_data.pubkey, origin);
            }
        }
        Ok(())
    }

    pub fn handle_ping_message(
        &self,
        from_addr: SocketAddr,
        ping: &Ping,
    ) -> Result<Packet, GossipError> {
        let pong = Pong::new(ping, &self.keypair);
        Packet::from_data(from_addr, &Protocol::PongMessage(pong))
    }

    fn run_listen(
        &self,
        verified_receiver: &Receiver<(SocketAddr, Protocol)>,
        response_sender: &Sender<Packet>,
        exit: &AtomicBool,
    ) {
        while !exit.load(Ordering::Relaxed) {
            let messages: Vec<(SocketAddr, Protocol)> = verified_receiver.try_iter().collect();
            if messages.is_empty() {
                sleep(Duration::from_millis(1));
                continue;
            }
            for (from_addr, message) in messages {
                self.handle_protocol_message(from_addr, message, response_sender);
            }
        }
    }

    pub fn listen(
        me: Arc<Self>,
        verified_receiver: Receiver<(SocketAddr, Protocol)>,
        response_sender: Sender<Packet>,
        exit: Arc<AtomicBool>,
    ) -> JoinHandle<()> {
        Builder::new()
            .name("gossip-listen".to_string())
            .spawn(move || me.run_listen(&verified_receiver, &response_sender, &exit))
            .unwrap()
    }

    // ------------------------------------------------------------------
    // Builder (periodic loop)
    // ------------------------------------------------------------------

    fn push_self(&self, now: u64) {
        let value = self.my_contact_info_value(now);
        self.push_queue.lock().unwrap().push(value);
    }

    fn drain_push_queue_to_crds_table(&self, now: u64) {
        // lock order: push queue, then crds
        let mut push_queue = self.push_queue.lock().unwrap();
        let mut crds = self.crds.write().unwrap();
        for value in push_queue.drain(..) {
            let _ = crds.insert(value, now);
        }
    }

    /// Streams fresh table values past the cursor to the fanout peers
    /// of their origins, within the per-round byte budget.
    fn build_push_messages(
        &self,
        push_cursor: &mut u64,
        now: u64,
    ) -> Result<Vec<Packet>, GossipError> {
        let entries = {
            let crds = self.crds.read().unwrap();
            crds.get_entries_with_cursor(push_cursor, MAX_NUM_PUSH_VALUES)
        };
        let num_returned = entries.len();
        let mut num_considered = 0usize;
        let mut total_byte_size = 0u64;
        let mut push_messages: HashMap<SocketAddr, Vec<CrdsValue>> = HashMap::new();
        for entry in &entries {
            if entry.insert_timestamp.abs_diff(now) > CRDS_GOSSIP_PUSH_MSG_TIMEOUT_MS {
                // too old to propagate; skipped for good
                num_considered += 1;
                continue;
            }
            let size = serialized_size(&entry.value)?;
            if total_byte_size + size > MAX_BYTES_PER_PUSH {
                break;
            }
            total_byte_size += size;
            let origin = entry.value.pubkey();
            let peers = {
                let active_set = self.active_set.read().unwrap();
                let crds = self.crds.read().unwrap();
                active_set.get_fanout_peers(&origin, &crds)
            };
            for peer in peers {
                push_messages
                    .entry(peer)
                    .or_default()
                    .push(entry.value.clone());
            }
            num_considered += 1;
        }
        // rewind past the values cut off by the byte budget so the
        // next round picks them up again
        *push_cursor -= (num_returned - num_considered) as u64;
        let mut packets = Vec::new();
        for (peer, values) in push_messages {
            for chunk in split_gossip_messages(PUSH_MESSAGE_MAX_PAYLOAD_SIZE, values) {
                let message = Protocol::PushMessage(self.id, chunk);
                packets.push(Packet::from_data(peer, &message)?);
            }
        }
        Ok(packets)
    }

    /// One pull request per filter, each to a random qualified peer.
    fn build_pull_requests(&self, now: u64) -> Result<Vec<Packet>, GossipError> {
        let failed_inserts = self.failed_inserts.lock().unwrap().values();
        let mut rng = ChaChaRng::seed_from_u64(now);
        let filters = {
            let crds = self.crds.read().unwrap();
            build_crds_filters(
                &mut rng,
                &crds,
                &failed_inserts,
                MAX_BLOOM_SIZE,
                MAX_NUM_PULL_REQUESTS,
            )
        };
        let peers = self.get_gossip_nodes(now, MAX_NUM_PULL_REQUESTS);
        if peers.is_empty() {
            return Err(GossipError::NoPeers);
        }
        let self_value = self.my_contact_info_value(now);
        let mut packets = Vec::new();
        for filter in filters {
            let peer = &peers[rng.gen_range(0..peers.len())];
            let request = Protocol::PullRequest(filter, self_value.clone());
            packets.push(Packet::from_data(peer.gossip, &request)?);
        }
        Ok(packets)
    }

    /// Contact records usable as gossip peers: recently inserted, not
    /// us, matching shred version, with a routable gossip socket.
    fn get_gossip_nodes(&self, now: u64, max_nodes: usize) -> Vec<LegacyContactInfo> {
        let self_shred_version = self.my_shred_version();
        let crds = self.crds.read().unwrap();
        crds.get_contact_infos()
            .filter(|entry| {
                entry.insert_timestamp >= now.saturating_sub(GOSSIP_ACTIVE_TIMEOUT)
            })
            .filter_map(|entry| entry.value.contact_info())
            .filter(|node| node.id != self.id)
            .filter(|node| self_shred_version == 0 || node.shred_version == self_shred_version)
            .filter(|node| LegacyContactInfo::is_valid_address(&node.gossip))
            .take(max_nodes)
            .cloned()
            .collect()
    }

    fn rotate_active_set(&self, now: u64) {
        let peers = self.get_gossip_nodes(now, NUM_ACTIVE_SET_ENTRIES);
        self.active_set.write().unwrap().rotate(&peers);
    }

    fn trim_memory(&self, now: u64) {
        {
            let mut crds = self.crds.write().unwrap();
            crds.purged
                .trim(now.saturating_sub(5 * CRDS_GOSSIP_PULL_CRDS_TIMEOUT_MS));
            let evicted = crds.attempt_trim(CRDS_UNIQUE_PUBKEY_CAPACITY, now);
            if !evicted.is_empty() {
                debug!("crds table over capacity: evicted {} origins", evicted.len());
            }
            crds.remove_old_labels(now, CRDS_GOSSIP_PULL_CRDS_TIMEOUT_MS);
        }
        self.failed_inserts
            .lock()
            .unwrap()
            .trim(now.saturating_sub(FAILED_INSERTS_RETENTION_MS));
    }

    fn run_gossip(&self, response_sender: &Sender<Packet>, exit: &AtomicBool) {
        let mut push_cursor: u64 = 0;
        let mut should_send_pull_requests = true;
        let mut last_self_push = 0u64;
        let mut last_stats_report = Instant::now();
        while !exit.load(Ordering::Relaxed) {
            let start = Instant::now();
            let now = timestamp();
            if should_send_pull_requests {
                match self.build_pull_requests(now) {
                    Ok(packets) => send_packets(response_sender, packets),
                    Err(GossipError::NoPeers) => {
                        warn!("no qualified peers for pull requests");
                    }
                    Err(err) => error!("build_pull_requests: {:?}", err),
                }
            }
            should_send_pull_requests = !should_send_pull_requests;
            self.drain_push_queue_to_crds_table(now);
            match self.build_push_messages(&mut push_cursor, now) {
                Ok(packets) => send_packets(response_sender, packets),
                Err(err) => error!("build_push_messages: {:?}", err),
            }
            self.trim_memory(now);
            if now.saturating_sub(last_self_push) > CRDS_GOSSIP_PULL_CRDS_TIMEOUT_MS / 2 {
                self.push_self(now);
                self.rotate_active_set(now);
                last_self_push = now;
            }
            if last_stats_report.elapsed() >= STATS_REPORT_INTERVAL {
                self.stats.report(self.crds.read().unwrap().len());
                last_stats_report = Instant::now();
            }
            let elapsed = start.elapsed().as_millis() as u64;
            sleep(Duration::from_millis(GOSSIP_SLEEP_MILLIS.saturating_sub(elapsed)));
        }
    }

    pub fn gossip(
        me: Arc<Self>,
        response_sender: Sender<Packet>,
        exit: Arc<AtomicBool>,
    ) -> JoinHandle<()> {
        Builder::new()
            .name("gossip".to_string())
            .spawn(move || me.run_gossip(&response_sender, &exit))
            .unwrap()
    }
}

fn send_packets(sender: &Sender<Packet>, packets: Vec<Packet>) {
    for packet in packets {
        if sender.send(packet).is_err() {
            break;
        }
    }
}
