//! Socket facing worker loops: blocking UDP reads onto the ingress
//! queue, and egress queue drains onto the socket.

use {
    crate::packet::{Packet, PACKET_DATA_SIZE},
    crossbeam_channel::{Receiver, Sender},
    std::{
        io::ErrorKind,
        net::UdpSocket,
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
        thread::{sleep, Builder, JoinHandle},
        time::Duration,
    },
};

/// Reads datagrams in a blocking loop with a one second timeout so the
/// exit flag stays responsive. Read timeouts are not errors.
pub fn receiver(
    socket: Arc<UdpSocket>,
    exit: Arc<AtomicBool>,
    packet_sender: Sender<Packet>,
) -> JoinHandle<()> {
    socket
        .set_read_timeout(Some(Duration::from_secs(1)))
        .expect("set socket read timeout");
    Builder::new()
        .name("gossip-receiver".to_string())
        .spawn(move || {
            let mut buf = [0u8; PACKET_DATA_SIZE];
            while !exit.load(Ordering::Relaxed) {
                match socket.recv_from(&mut buf) {
                    Ok((size, addr)) => {
                        let packet = Packet {
                            addr,
                            data: buf[..size].to_vec(),
                        };
                        if packet_sender.send(packet).is_err() {
                            break;
                        }
                    }
                    Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    }
                    Err(err) => debug!("gossip socket read error: {:?}", err),
                }
            }
        })
        .unwrap()
}

/// Drains the egress queue and writes each packet to its destination.
/// Send failures are logged and dropped; the datagram transport gives
/// no delivery guarantee anyway.
pub fn responder(
    name: &'static str,
    socket: Arc<UdpSocket>,
    response_receiver: Receiver<Packet>,
    exit: Arc<AtomicBool>,
) -> JoinHandle<()> {
    Builder::new()
        .name(format!("{}-responder", name))
        .spawn(move || {
            while !exit.load(Ordering::Relaxed) {
                let packets: Vec<Packet> = response_receiver.try_iter().collect();
                if packets.is_empty() {
                    sleep(Duration::from_millis(1));
                    continue;
                }
                for packet in packets {
                    if let Err(err) = socket.send_to(&packet.data, packet.addr) {
                        debug!("{}: send_to {} failed: {:?}", name, packet.addr, err);
                    }
                }
            }
        })
        .unwrap()
}

#[cfg(test)]
mod test {
    use {super::*, crossbeam_channel::bounded, std::net::SocketAddr};

    #[test]
    fn test_receiver_responder_round_trip() {
        let send_socket = Arc::new(UdpSocket::bind("127.0.0.1:0").unwrap());
        let read_socket = Arc::new(UdpSocket::bind("127.0.0.1:0").unwrap());
        let read_addr: SocketAddr = read_socket.local_addr().unwrap();

        let exit = Arc::new(AtomicBool::new(false));
        let (packet_sender, packet_receiver) = bounded(8);
        let (response_sender, response_receiver) = bounded(8);
        let t_receiver = receiver(read_socket, exit.clone(), packet_sender);
        let t_responder = responder("test", send_socket, response_receiver, exit.clone());

        let packet = Packet {
            addr: read_addr,
            data: b"hello cluster".to_vec(),
        };
        response_sender.send(packet.clone()).unwrap();
        let received = packet_receiver
            .recv_timeout(Duration::from_secs(5))
            .unwrap();
        assert_eq!(received.data, packet.data);

        exit.store(true, Ordering::Relaxed);
        t_receiver.join().unwrap();
        t_responder.join().unwrap();
    }
}
