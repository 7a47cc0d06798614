//! A gossip engine for cluster membership and data dissemination.
//!
//! Nodes advertise signed, timestamped records about themselves and
//! re-broadcast records about others, converging on an eventually
//! consistent replicated store (the crds table). Dissemination runs
//! over plain UDP through three interlocking sub-protocols, push, pull
//! and prune, plus a ping/pong liveness exchange.

#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;

pub mod cluster_info;
pub mod crds;
pub mod crds_gossip_pull;
pub mod crds_value;
pub mod epoch_slots;
pub mod gossip_error;
pub mod gossip_service;
pub mod legacy_contact_info;
pub mod packet;
pub mod ping_pong;
pub mod protocol;
pub mod push_active_set;
pub mod streamer;
