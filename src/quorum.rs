//! A module which keeps track of which acceptors have responded at the current ballot of one
//! instance, and whether enough of them have.

use std::collections::HashSet;

/// The set of acceptor ids counted towards the current ballot of one instance, together with the
/// number of distinct responses that constitutes a quorum.
#[derive(Debug)]
pub struct Quorum {
    acceptors: HashSet<usize>,

    quorum: usize,
}

impl Quorum {
    pub fn new(quorum: usize) -> Self {
        Quorum {
            acceptors: HashSet::new(),
            quorum,
        }
    }

    /// Counts a response from `acceptor_id`. Returns false if this acceptor was already counted;
    /// acceptors may resend, and a resent response must never advance the quorum.
    pub fn add(&mut self, acceptor_id: usize) -> bool {
        self.acceptors.insert(acceptor_id)
    }

    pub fn reached(&self) -> bool {
        self.acceptors.len() >= self.quorum
    }

    /// Forgets every counted response. Responses at an old ballot say nothing about the new one.
    pub fn clear(&mut self) {
        self.acceptors.clear();
    }
}
