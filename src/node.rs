//! The module that contains the processes built around the proposer: the client, which submits
//! the values to decide on, and the node which owns one `Proposer` and drives it from a network
//! event loop.

use std::net::SocketAddrV4;

use log::Level;
use uuid::Uuid;

use crate::configurations::ProtocolSettings;
use crate::message::{Message, Request};
use crate::net_node::NetNode;
use crate::proposer::Proposer;

/// Implement this trait if you are a process which needs to run in a infinite loop, while
/// receiving and sending messages.
pub trait Runnable {
    fn run(&mut self);
}

/// The struct representing a client, which submits the values the proposers try to get decided.
pub struct Client {
    // Every process has an associated universal unique identifier number.
    uuid: Uuid,

    id: usize,

    node: NetNode,

    proposers_address: SocketAddrV4,
}

impl Client {
    pub fn new(id: usize, clients_address: SocketAddrV4, proposers_address: SocketAddrV4) -> Self {
        Client {
            uuid: Uuid::new_v4(),
            id,
            node: NetNode::new(&clients_address, None),
            proposers_address,
        }
    }

    pub fn submit(&self, value: Vec<u8>) {
        let m = Message::Phase0a(Request { value, sender_uuid: self.uuid });

        self.node.send(&m, &self.proposers_address);

        if log_enabled!(Level::Info) {
            info!("[C={:?}] {:?} sent to {:?}.", self.id, m, self.proposers_address);
        }
    }
}

/// The struct which owns one `Proposer` and serializes all of its stimuli: client submissions,
/// promises, accepted acks, and the periodic tick which re-issues timed-out prepare requests.
pub struct ProposerNode {
    id: usize,

    proposer: Proposer,

    node: NetNode,

    acceptors_address: SocketAddrV4,

    // How many prepare-phase instances are kept open at any time.
    preexec_window: usize,
}

impl ProposerNode {
    pub fn new(
        id: usize,
        proposers_address: SocketAddrV4,
        acceptors_address: SocketAddrV4,
        settings: &ProtocolSettings,
    ) -> Self {
        // Waking up at a fraction of the instance timeout keeps retries reasonably prompt.
        let tick = settings.instance_timeout / 2;

        ProposerNode {
            id,
            proposer: Proposer::new(id, settings),
            node: NetNode::new(&proposers_address, Some(tick)),
            acceptors_address,
            preexec_window: settings.preexec_window,
        }
    }

    /// Opens new instances until the pre-execution window is full, then drains every instance
    /// which became ready for the accept phase.
    fn drive(&mut self) {
        while self.proposer.prepared_count() < self.preexec_window {
            let req = self.proposer.prepare();

            if log_enabled!(Level::Info) {
                info!("[P={:?}] I will send {:?}.", self.id, req);
            }

            self.node.send(&Message::Phase1a(req), &self.acceptors_address);
        }

        while let Some(req) = self.proposer.accept() {
            if log_enabled!(Level::Info) {
                info!("[P={:?}] I will send {:?}.", self.id, req);
            }

            self.node.send(&Message::Phase2a(req), &self.acceptors_address);
        }
    }

    /// Re-issues the prepare request of every instance which timed out on its current ballot.
    fn tick(&mut self) {
        let requests: Vec<_> = self.proposer.timeout_iterator().collect();

        for req in requests {
            if log_enabled!(Level::Info) {
                info!("[P={:?}] I will resend {:?}.", self.id, req);
            }

            self.node.send(&Message::Phase1a(req), &self.acceptors_address);
        }
    }
}

impl Runnable for ProposerNode {
    fn run(&mut self) {
        loop {
            self.drive();

            if log_enabled!(Level::Info) {
                info!("[P={:?}] Proposer waiting...", self.id);
            }

            match self.node.receive() {
                Some(Message::Phase0a(request)) => {
                    if log_enabled!(Level::Info) {
                        info!("[P={:?}] I will handle {:?}.", self.id, request);
                    }

                    self.proposer.propose(request.value);
                }
                Some(Message::Phase1b(ack)) => {
                    if let Some(req) = self.proposer.receive_promise(ack) {
                        self.node.send(&Message::Phase1a(req), &self.acceptors_address);
                    }
                }
                Some(Message::Phase2b(ack)) => {
                    if let Some(req) = self.proposer.receive_accepted(&ack) {
                        self.node.send(&Message::Phase1a(req), &self.acceptors_address);
                    }
                }
                Some(_) => info!(
                    "[P={:?}] Unexpected message received. I'll ignore it.",
                    self.id
                ),
                None => self.tick(),
            }
        }
    }
}
