//! A command-line executable for running a gossip node and monitoring
//! a cluster's gossip plane.

use {
    clap::{crate_description, crate_name, value_t, App, AppSettings, Arg, SubCommand},
    cluster_gossip::{
        cluster_info::{ClusterInfo, GOSSIP_SLEEP_MILLIS},
        gossip_service::GossipService,
        legacy_contact_info::LegacyContactInfo,
    },
    itertools::Itertools,
    log::info,
    solana_sdk::{
        signature::{Keypair, Signer},
        timing::timestamp,
    },
    std::{
        error,
        net::{SocketAddr, UdpSocket},
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
        thread::sleep,
        time::{Duration, Instant},
    },
};

fn main() -> Result<(), Box<dyn error::Error>> {
    solana_logger::setup_with_default("info");

    let matches = App::new(crate_name!())
        .about(crate_description!())
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(
            SubCommand::with_name("spy")
                .about("Run a node and monitor the gossip plane")
                .arg(
                    Arg::with_name("entrypoint")
                        .short("n")
                        .long("entrypoint")
                        .value_name("HOST:PORT")
                        .takes_value(true)
                        .help("Rendezvous with the cluster at this gossip entrypoint"),
                )
                .arg(
                    Arg::with_name("gossip_port")
                        .long("gossip-port")
                        .value_name("PORT")
                        .takes_value(true)
                        .help("Gossip port number for the node [default: pick an open port]"),
                )
                .arg(
                    Arg::with_name("num_nodes")
                        .short("N")
                        .long("num-nodes")
                        .value_name("NUM")
                        .takes_value(true)
                        .help("Wait for at least NUM nodes to be visible"),
                )
                .arg(
                    Arg::with_name("timeout")
                        .long("timeout")
                        .value_name("SECONDS")
                        .takes_value(true)
                        .help("Maximum time to wait in seconds [default: wait forever]"),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        ("spy", Some(matches)) => {
            let entrypoint = matches
                .value_of("entrypoint")
                .map(|addr| addr.parse::<SocketAddr>())
                .transpose()?;
            let gossip_port = value_t!(matches, "gossip_port", u16).unwrap_or(0);
            let num_nodes = value_t!(matches, "num_nodes", usize).ok();
            let timeout = value_t!(matches, "timeout", u64).ok();
            run_spy(entrypoint, gossip_port, num_nodes, timeout)?;
        }
        _ => unreachable!(),
    }
    Ok(())
}

fn run_spy(
    entrypoint: Option<SocketAddr>,
    gossip_port: u16,
    num_nodes: Option<usize>,
    timeout: Option<u64>,
) -> Result<(), Box<dyn error::Error>> {
    let keypair = Arc::new(Keypair::new());
    let gossip_socket = UdpSocket::bind(SocketAddr::from(([0, 0, 0, 0], gossip_port)))?;
    let mut node = LegacyContactInfo::new_localhost(&keypair.pubkey(), timestamp());
    node.gossip = gossip_socket.local_addr()?;
    let cluster_info = Arc::new(ClusterInfo::new(node, keypair));
    if let Some(entrypoint) = entrypoint {
        info!("gossip entrypoint: {}", entrypoint);
        cluster_info.set_entrypoint(LegacyContactInfo::new_gossip_entry_point(&entrypoint));
    }
    info!("spy node id: {}", cluster_info.id());

    let exit = Arc::new(AtomicBool::new(false));
    let gossip_service = GossipService::new(&cluster_info, gossip_socket, &exit);
    let start = Instant::now();
    loop {
        let peers = cluster_info.gossip_peers();
        let shred_versions = peers.iter().map(|node| node.shred_version).counts();
        info!(
            "{} peers visible, shred versions: {:?}",
            peers.len(),
            shred_versions
        );
        if num_nodes.map(|num| peers.len() >= num).unwrap_or_default() {
            break;
        }
        if let Some(secs) = timeout {
            if start.elapsed() >= Duration::from_secs(secs) {
                break;
            }
        }
        sleep(Duration::from_millis(GOSSIP_SLEEP_MILLIS));
    }
    exit.store(true, Ordering::Relaxed);
    gossip_service.join().expect("gossip service panicked");
    Ok(())
}
