//! The module that contains the proposer of the Paxos algorithm: the state container which
//! drives consensus instances through the prepare and accept phases, adopts values that some
//! acceptor already accepted, and recovers from preemption by competing proposers. The proposer
//! is passive: an owning event loop injects client submissions, promises, accepted acks and
//! ticks, and drains the prepare and accept requests this module produces.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use std::vec;

use crate::configurations::ProtocolSettings;
use crate::message::{AcceptRequest, AcceptedAck, Ballot, Iid, PrepareRequest, PromiseAck};
use crate::quorum::Quorum;

/// Produces monotonically increasing ballots unique to one proposer: every returned ballot is
/// congruent to the proposer id modulo `max_proposers`.
#[derive(Debug)]
struct BallotGenerator {
    id: usize,

    max_proposers: Ballot,
}

impl BallotGenerator {
    fn new(id: usize, max_proposers: Ballot) -> Self {
        BallotGenerator { id, max_proposers }
    }

    /// Returns this proposer's lowest ballot strictly greater than `current`, where 0 means no
    /// ballot has been issued yet for the instance.
    fn next(&self, current: Ballot) -> Ballot {
        if current > 0 {
            current + self.max_proposers
        } else {
            self.max_proposers + self.id as Ballot
        }
    }
}

// The state of one consensus instance this proposer is running.
struct Instance {
    iid: Iid,

    // The ballot the proposer is currently running for this instance.
    ballot: Ballot,

    // The value currently bound to the instance: either adopted from a promise or pulled from
    // the value queue once the instance is about to enter the accept phase.
    value: Option<Vec<u8>>,

    // The ballot at which `value` was previously accepted by some acceptor, 0 if the value is
    // proposer-chosen.
    value_ballot: Ballot,

    // How many distinct promises at the current ballot reported exactly the adopted
    // (value_ballot, value) pair.
    value_promises: usize,

    // Set once a whole quorum of acceptors reported the same accepted value: the instance has
    // already been decided elsewhere and this proposer abandons it.
    closed: bool,

    quorum: Quorum,

    // When the current ballot was issued.
    created_at: Instant,
}

impl Instance {
    fn new(iid: Iid, ballot: Ballot, quorum: usize) -> Self {
        Instance {
            iid,
            ballot,
            value: None,
            value_ballot: 0,
            value_promises: 0,
            closed: false,
            quorum: Quorum::new(quorum),
            created_at: Instant::now(),
        }
    }

    /// Moves the instance to a new, higher ballot. The quorum and the per-ballot promise count
    /// restart from scratch, while the bound value is retained. Returns the prepare request to
    /// rebroadcast.
    fn preempt(&mut self, ballot: Ballot) -> PrepareRequest {
        self.ballot = ballot;
        self.quorum.clear();
        self.value_promises = 0;
        self.created_at = Instant::now();

        PrepareRequest { iid: self.iid, ballot: self.ballot }
    }

    fn has_timed_out(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.created_at) >= timeout
    }
}

/// The struct representing the proposer in the Paxos algorithm. All operations are synchronous
/// and non-blocking; the owning event loop serializes calls, so no locking is needed. Dropping
/// the proposer releases the queued values and every live instance.
pub struct Proposer {
    id: usize,

    // The number of distinct acceptor responses required in either phase.
    quorum: usize,

    instance_timeout: Duration,

    ballots: BallotGenerator,

    // FIFO of client values not yet bound to an instance.
    values: VecDeque<Vec<u8>>,

    // The last instance id this proposer allocated. Instance ids are never reused.
    next_prepare_iid: Iid,

    // Instances which have issued a prepare request and are collecting promises, in allocation
    // order. Preempted instances re-enter at the front, so accept requests still go out in
    // instance order.
    prepare_instances: VecDeque<Instance>,

    // Instances which have issued an accept request and are collecting accepted acks.
    accept_instances: HashMap<Iid, Instance>,
}

impl Proposer {
    pub fn new(id: usize, settings: &ProtocolSettings) -> Self {
        assert!(
            id >= 1 && (id as u64) < settings.max_proposers,
            "proposer id {} outside [1, {})",
            id,
            settings.max_proposers
        );

        Proposer {
            id,
            quorum: settings.quorum(),
            instance_timeout: settings.instance_timeout,
            ballots: BallotGenerator::new(id, settings.max_proposers),
            values: VecDeque::new(),
            next_prepare_iid: 0,
            prepare_instances: VecDeque::new(),
            accept_instances: HashMap::new(),
        }
    }

    /// Enqueues a client value. The proposer owns the value until it is delivered or re-queued.
    /// Empty values are rejected: a promise carrying no value is indistinguishable from one
    /// carrying an accepted empty value.
    pub fn propose(&mut self, value: Vec<u8>) {
        if value.is_empty() {
            warn!("[P={}] Rejected empty value.", self.id);
            return;
        }

        self.values.push_back(value);
    }

    /// The number of live prepare-phase instances. The event loop calls `prepare` until this
    /// count fills its pre-execution window.
    pub fn prepared_count(&self) -> usize {
        self.prepare_instances.len()
    }

    /// Opens the next instance and returns the prepare request to broadcast.
    pub fn prepare(&mut self) -> PrepareRequest {
        self.next_prepare_iid += 1;
        let iid = self.next_prepare_iid;

        let inst = Instance::new(iid, self.ballots.next(0), self.quorum);
        let req = PrepareRequest { iid, ballot: inst.ballot };
        self.prepare_instances.push_back(inst);

        req
    }

    /// Handles a promise from an acceptor. Returns the prepare request to rebroadcast if the
    /// promise revealed a higher ballot (preemption), `None` otherwise.
    pub fn receive_promise(&mut self, ack: PromiseAck) -> Option<PrepareRequest> {
        let idx = match self.prepare_instances.iter().position(|inst| inst.iid == ack.iid) {
            Some(idx) => idx,
            None => {
                debug!("[P={}] Promise dropped, instance {} not pending.", self.id, ack.iid);
                return None;
            }
        };

        let inst = &mut self.prepare_instances[idx];

        if ack.ballot < inst.ballot {
            debug!("[P={}] Promise dropped, ballot {} too old.", self.id, ack.ballot);
            return None;
        }

        if ack.ballot > inst.ballot {
            debug!(
                "[P={}] Instance {} preempted: ballot {}, ack ballot {}.",
                self.id, inst.iid, inst.ballot, ack.ballot
            );
            let ballot = self.ballots.next(inst.ballot);
            return Some(inst.preempt(ballot));
        }

        if !inst.quorum.add(ack.acceptor_id) {
            debug!(
                "[P={}] Promise dropped, duplicate from acceptor {} for instance {}.",
                self.id, ack.acceptor_id, inst.iid
            );
            return None;
        }

        debug!(
            "[P={}] Received valid promise from acceptor {} for instance {}.",
            self.id, ack.acceptor_id, inst.iid
        );

        let value = match ack.value {
            Some(value) => value,
            None => return None,
        };

        // The acceptor already accepted a value at ack.value_ballot. Safety requires binding
        // the value reported at the highest such ballot.
        let displaced = if inst.value.is_none() {
            inst.value = Some(value);
            inst.value_ballot = ack.value_ballot;
            inst.value_promises = 1;
            None
        } else if ack.value_ballot > inst.value_ballot {
            debug!("[P={}] Value in promise saved, removed older value.", self.id);
            let displaced = inst.value.replace(value);
            inst.value_ballot = ack.value_ballot;
            inst.value_promises = 1;
            displaced
        } else if ack.value_ballot == inst.value_ballot
            && inst.value.as_deref() == Some(value.as_slice())
        {
            inst.value_promises += 1;
            if inst.value_promises >= self.quorum {
                // A whole quorum accepted this value at the same ballot: the instance has been
                // decided elsewhere.
                debug!("[P={}] Instance {} closed.", self.id, inst.iid);
                inst.closed = true;
            }
            None
        } else {
            debug!("[P={}] Value in promise ignored.", self.id);
            None
        };

        if let Some(displaced) = displaced {
            // The displaced value still has to be proposed eventually.
            self.values.push_back(displaced);
        }

        None
    }

    /// Drains the next instance ready to enter the accept phase. Returns `None` while the
    /// instance at the head of the prepare table is still collecting promises, or when no value
    /// is available to bind to it. Accept requests go out in instance order.
    pub fn accept(&mut self) -> Option<AcceptRequest> {
        // Reap decided instances at the head; their ids are abandoned by this proposer.
        loop {
            match self.prepare_instances.front() {
                Some(inst) if inst.closed => {
                    debug!("[P={}] Instance {} closed, dropped.", self.id, inst.iid);
                    self.prepare_instances.pop_front();
                }
                Some(inst) if inst.quorum.reached() => break,
                _ => return None,
            }
        }

        let mut inst = self.prepare_instances.pop_front()?;

        debug!("[P={}] Trying to accept instance {}.", self.id, inst.iid);

        let value = match inst.value.take().or_else(|| self.values.pop_front()) {
            Some(value) => value,
            None => {
                debug!("[P={}] No value to accept.", self.id);
                // The instance stays at the head, awaiting a value.
                self.prepare_instances.push_front(inst);
                return None;
            }
        };

        let req = AcceptRequest { iid: inst.iid, ballot: inst.ballot, value: value.clone() };

        // The instance now counts accepted acks at the same ballot.
        inst.value = Some(value);
        inst.quorum.clear();
        self.accept_instances.insert(inst.iid, inst);

        Some(req)
    }

    /// Handles an accepted ack from an acceptor. On quorum the instance is decided and freed;
    /// delivery is the learner's job. Returns the prepare request to rebroadcast if the ack
    /// revealed a higher ballot (preemption), `None` otherwise.
    pub fn receive_accepted(&mut self, ack: &AcceptedAck) -> Option<PrepareRequest> {
        let mut inst = match self.accept_instances.remove(&ack.iid) {
            Some(inst) => inst,
            None => {
                debug!("[P={}] Accepted ack dropped, instance {} not pending.", self.id, ack.iid);
                return None;
            }
        };

        if ack.ballot == inst.ballot {
            // An acceptor answering at the instance's ballot must have accepted at that very
            // ballot; anything else is a buggy acceptor or a corrupted message.
            assert_eq!(
                ack.value_ballot, inst.ballot,
                "acceptor {} answered instance {} at ballot {} but reported value ballot {}",
                ack.acceptor_id, ack.iid, ack.ballot, ack.value_ballot
            );

            if !inst.quorum.add(ack.acceptor_id) {
                debug!(
                    "[P={}] Dropped duplicate accepted ack from acceptor {} for instance {}.",
                    self.id, ack.acceptor_id, inst.iid
                );
                self.accept_instances.insert(ack.iid, inst);
                return None;
            }

            if inst.quorum.reached() {
                debug!("[P={}] Quorum reached for instance {}.", self.id, inst.iid);
                // The instance is decided and freed here; the learners deliver its value.
                return None;
            }

            self.accept_instances.insert(ack.iid, inst);
            None
        } else {
            // Acceptors never accept at a lower ballot, so a mismatch means a competing
            // proposer moved the instance past us.
            debug!(
                "[P={}] Instance {} preempted: ballot {}, ack ballot {}.",
                self.id, inst.iid, inst.ballot, ack.ballot
            );
            let ballot = self.ballots.next(inst.ballot);
            let req = inst.preempt(ballot);
            self.prepare_instances.push_front(inst);
            Some(req)
        }
    }

    /// Captures the current time and returns a cursor over the instances whose ballot has not
    /// reached a quorum within the instance timeout. Prepare-phase instances are re-issued at
    /// the same ballot with a fresh clock; accept-phase instances move back to the front of the
    /// prepare table at a higher ballot.
    pub fn timeout_iterator(&mut self) -> TimeoutIterator<'_> {
        let now = Instant::now();
        let timeout = self.instance_timeout;

        let prepare: Vec<Iid> = self
            .prepare_instances
            .iter()
            .filter(|inst| !inst.quorum.reached() && inst.has_timed_out(now, timeout))
            .map(|inst| inst.iid)
            .collect();

        let mut accept: Vec<Iid> = self
            .accept_instances
            .values()
            .filter(|inst| !inst.quorum.reached() && inst.has_timed_out(now, timeout))
            .map(|inst| inst.iid)
            .collect();
        accept.sort_unstable();

        TimeoutIterator {
            proposer: self,
            now,
            prepare: prepare.into_iter(),
            accept: accept.into_iter(),
        }
    }
}

/// A single-pass cursor over the instances which timed out, yielding the prepare requests to
/// rebroadcast. The target instance ids are captured up front, so entries can move between the
/// two tables while the cursor is drained.
pub struct TimeoutIterator<'a> {
    proposer: &'a mut Proposer,

    now: Instant,

    prepare: vec::IntoIter<Iid>,

    accept: vec::IntoIter<Iid>,
}

impl<'a> Iterator for TimeoutIterator<'a> {
    type Item = PrepareRequest;

    fn next(&mut self) -> Option<PrepareRequest> {
        // Prepare-phase instances retry the same ballot with a fresh clock.
        while let Some(iid) = self.prepare.next() {
            let found = self.proposer.prepare_instances.iter_mut().find(|inst| inst.iid == iid);
            if let Some(inst) = found {
                inst.created_at = self.now;
                return Some(PrepareRequest { iid: inst.iid, ballot: inst.ballot });
            }
        }

        // Accept-phase instances restart phase 1 at a higher ballot.
        while let Some(iid) = self.accept.next() {
            if let Some(mut inst) = self.proposer.accept_instances.remove(&iid) {
                let ballot = self.proposer.ballots.next(inst.ballot);
                let req = inst.preempt(ballot);
                self.proposer.prepare_instances.push_front(inst);
                return Some(req);
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn settings() -> ProtocolSettings {
        ProtocolSettings {
            max_proposers: 10,
            num_of_acceptors: 3,
            // Instances never time out unless a test asks for it.
            instance_timeout: Duration::from_secs(3600),
            preexec_window: 16,
        }
    }

    fn proposer() -> Proposer {
        Proposer::new(1, &settings())
    }

    fn promise(iid: Iid, acceptor_id: usize, ballot: Ballot) -> PromiseAck {
        PromiseAck { iid, acceptor_id, ballot, value_ballot: 0, value: None }
    }

    fn promise_with_value(
        iid: Iid,
        acceptor_id: usize,
        ballot: Ballot,
        value_ballot: Ballot,
        value: &[u8],
    ) -> PromiseAck {
        PromiseAck { iid, acceptor_id, ballot, value_ballot, value: Some(value.to_vec()) }
    }

    fn accepted(iid: Iid, acceptor_id: usize, ballot: Ballot) -> AcceptedAck {
        AcceptedAck { iid, acceptor_id, ballot, value_ballot: ballot }
    }

    #[test]
    fn ballot_generation_is_monotonic_and_proposer_tagged() {
        let generator = BallotGenerator::new(3, 10);

        assert_eq!(generator.next(0), 13);
        assert_eq!(generator.next(13), 23);
        assert_eq!(generator.next(21), 31);
    }

    #[test]
    fn emitted_ballots_are_congruent_to_the_proposer_id() {
        for &id in &[1usize, 2, 7] {
            let mut p = Proposer::new(id, &settings());

            let req = p.prepare();
            assert_eq!(req.ballot % 10, id as Ballot);

            // Preemption bumps the ballot but keeps the congruence.
            let out = p.receive_promise(promise(1, 1, req.ballot + 10));
            let req = out.unwrap();
            assert_eq!(req.ballot % 10, id as Ballot);
        }
    }

    #[test]
    fn happy_path_reaches_accept_and_frees_the_instance() {
        let mut p = proposer();
        p.propose(b"x".to_vec());

        let req = p.prepare();
        assert_eq!(req, PrepareRequest { iid: 1, ballot: 11 });
        assert_eq!(p.prepared_count(), 1);

        assert_eq!(p.receive_promise(promise(1, 1, 11)), None);
        // One promise is not a quorum yet.
        assert_eq!(p.accept(), None);
        assert_eq!(p.receive_promise(promise(1, 2, 11)), None);

        let accept = p.accept().unwrap();
        assert_eq!(accept, AcceptRequest { iid: 1, ballot: 11, value: b"x".to_vec() });
        assert_eq!(p.prepared_count(), 0);

        assert_eq!(p.receive_accepted(&accepted(1, 1, 11)), None);
        assert_eq!(p.receive_accepted(&accepted(1, 2, 11)), None);

        // The instance was freed on quorum, so even a preempting ack is a stale drop now.
        let late = AcceptedAck { iid: 1, acceptor_id: 3, ballot: 21, value_ballot: 21 };
        assert_eq!(p.receive_accepted(&late), None);
    }

    #[test]
    fn preemption_during_phase_one_restarts_with_a_higher_ballot() {
        let mut p = proposer();
        p.prepare();

        let out = p.receive_promise(promise(1, 1, 21));
        assert_eq!(out, Some(PrepareRequest { iid: 1, ballot: 21 }));

        // The quorum restarted: the same acceptor counts again at the new ballot.
        p.propose(b"x".to_vec());
        assert_eq!(p.receive_promise(promise(1, 1, 21)), None);
        assert_eq!(p.accept(), None);
        assert_eq!(p.receive_promise(promise(1, 2, 21)), None);
        assert_eq!(p.accept().unwrap().ballot, 21);
    }

    #[test]
    fn adopted_value_wins_over_the_queued_one() {
        let mut p = proposer();
        p.propose(b"x".to_vec());
        p.prepare();

        p.receive_promise(promise_with_value(1, 1, 11, 5, b"y"));
        p.receive_promise(promise(1, 2, 11));

        let accept = p.accept().unwrap();
        assert_eq!(accept, AcceptRequest { iid: 1, ballot: 11, value: b"y".to_vec() });

        // "x" is still queued and goes out with the next instance.
        p.prepare();
        p.receive_promise(promise(2, 1, 11));
        p.receive_promise(promise(2, 2, 11));
        assert_eq!(p.accept().unwrap().value, b"x".to_vec());
    }

    #[test]
    fn displaced_value_returns_to_the_queue() {
        let mut p = proposer();
        p.prepare();

        p.receive_promise(promise_with_value(1, 1, 11, 5, b"y"));
        p.receive_promise(promise_with_value(1, 2, 11, 7, b"z"));

        let accept = p.accept().unwrap();
        assert_eq!(accept.value, b"z".to_vec());

        // "y" was displaced by the higher-ballot value and must be proposed later.
        p.prepare();
        p.receive_promise(promise(2, 1, 11));
        p.receive_promise(promise(2, 2, 11));
        assert_eq!(p.accept().unwrap().value, b"y".to_vec());
    }

    #[test]
    fn lower_ballot_values_do_not_displace_the_adopted_one() {
        let mut p = proposer();
        p.prepare();

        p.receive_promise(promise_with_value(1, 1, 11, 7, b"z"));
        p.receive_promise(promise_with_value(1, 2, 11, 5, b"y"));

        assert_eq!(p.accept().unwrap().value, b"z".to_vec());

        // "y" was ignored, not queued: the next instance has nothing to propose.
        p.prepare();
        p.receive_promise(promise(2, 1, 11));
        p.receive_promise(promise(2, 2, 11));
        assert_eq!(p.accept(), None);
    }

    #[test]
    fn preemption_during_phase_two_returns_to_the_prepare_table() {
        let mut p = proposer();
        p.propose(b"x".to_vec());
        p.prepare();
        p.receive_promise(promise(1, 1, 11));
        p.receive_promise(promise(1, 2, 11));
        assert!(p.accept().is_some());

        let ack = AcceptedAck { iid: 1, acceptor_id: 1, ballot: 21, value_ballot: 21 };
        assert_eq!(p.receive_accepted(&ack), Some(PrepareRequest { iid: 1, ballot: 21 }));
        assert_eq!(p.prepared_count(), 1);

        // Still bound to "x": after a fresh promise quorum the same value goes out again.
        p.receive_promise(promise(1, 1, 21));
        p.receive_promise(promise(1, 2, 21));
        let accept = p.accept().unwrap();
        assert_eq!(accept, AcceptRequest { iid: 1, ballot: 21, value: b"x".to_vec() });
    }

    #[test]
    fn duplicate_promises_do_not_advance_the_quorum() {
        let mut p = proposer();
        p.propose(b"x".to_vec());
        p.prepare();

        p.receive_promise(promise(1, 1, 11));
        p.receive_promise(promise(1, 1, 11));
        assert_eq!(p.accept(), None);

        p.receive_promise(promise(1, 2, 11));
        assert!(p.accept().is_some());
    }

    #[test]
    fn duplicate_accepted_acks_do_not_advance_the_quorum() {
        let mut p = proposer();
        p.propose(b"x".to_vec());
        p.prepare();
        p.receive_promise(promise(1, 1, 11));
        p.receive_promise(promise(1, 2, 11));
        assert!(p.accept().is_some());

        p.receive_accepted(&accepted(1, 1, 11));
        p.receive_accepted(&accepted(1, 1, 11));

        // The instance must still be pending: a higher-ballot ack preempts it instead of being
        // dropped as stale.
        let ack = AcceptedAck { iid: 1, acceptor_id: 2, ballot: 21, value_ballot: 21 };
        assert!(p.receive_accepted(&ack).is_some());
    }

    #[test]
    fn stale_promises_are_dropped() {
        let mut p = proposer();

        // No instance exists at all.
        assert_eq!(p.receive_promise(promise(1, 1, 11)), None);

        p.propose(b"x".to_vec());
        p.prepare();

        // A promise below the instance's ballot does not count.
        assert_eq!(p.receive_promise(promise(1, 1, 1)), None);
        p.receive_promise(promise(1, 2, 11));
        assert_eq!(p.accept(), None);

        p.receive_promise(promise(1, 3, 11));
        assert!(p.accept().is_some());
    }

    #[test]
    fn accept_waits_for_a_value() {
        let mut p = proposer();
        p.prepare();
        p.receive_promise(promise(1, 1, 11));
        p.receive_promise(promise(1, 2, 11));

        // Quorum-ready but the value queue is empty: the instance stays at the head.
        assert_eq!(p.accept(), None);
        assert_eq!(p.prepared_count(), 1);

        p.propose(b"x".to_vec());
        assert!(p.accept().is_some());
        assert_eq!(p.prepared_count(), 0);
    }

    #[test]
    fn accepts_go_out_in_instance_order() {
        let mut p = proposer();
        p.propose(b"a".to_vec());
        p.propose(b"b".to_vec());
        p.prepare();
        p.prepare();

        // The second instance reaches its quorum first.
        p.receive_promise(promise(2, 1, 11));
        p.receive_promise(promise(2, 2, 11));
        assert_eq!(p.accept(), None);

        p.receive_promise(promise(1, 1, 11));
        p.receive_promise(promise(1, 2, 11));
        assert_eq!(p.accept().unwrap().iid, 1);
        assert_eq!(p.accept().unwrap().iid, 2);
        assert_eq!(p.accept(), None);
    }

    #[test]
    fn closed_instances_never_produce_an_accept() {
        let mut p = proposer();
        p.propose(b"x".to_vec());
        p.prepare();
        p.prepare();

        // Two acceptors report the same accepted value: with a quorum of two the instance was
        // decided elsewhere.
        p.receive_promise(promise_with_value(1, 1, 11, 5, b"y"));
        p.receive_promise(promise_with_value(1, 2, 11, 5, b"y"));
        p.receive_promise(promise(2, 1, 11));
        p.receive_promise(promise(2, 2, 11));

        let accept = p.accept().unwrap();
        assert_eq!(accept.iid, 2);
        assert_eq!(accept.value, b"x".to_vec());

        // Instance 1 was reaped from the head without ever producing an accept.
        assert_eq!(p.prepared_count(), 0);
    }

    #[test]
    fn closure_requires_a_full_quorum_of_matching_reports() {
        let mut s = settings();
        s.num_of_acceptors = 5;
        let mut p = Proposer::new(1, &s);
        p.prepare();

        p.receive_promise(promise_with_value(1, 1, 11, 5, b"y"));
        p.receive_promise(promise_with_value(1, 2, 11, 5, b"y"));
        p.receive_promise(promise(1, 3, 11));

        // Two matching reports are not enough evidence with a quorum of three: the instance
        // proceeds with the adopted value.
        let accept = p.accept().unwrap();
        assert_eq!(accept.value, b"y".to_vec());
    }

    #[test]
    fn a_quorum_of_matching_reports_closes_the_instance() {
        let mut s = settings();
        s.num_of_acceptors = 5;
        let mut p = Proposer::new(1, &s);
        p.prepare();

        p.receive_promise(promise_with_value(1, 1, 11, 5, b"y"));
        p.receive_promise(promise_with_value(1, 2, 11, 5, b"y"));
        p.receive_promise(promise_with_value(1, 3, 11, 5, b"y"));

        assert_eq!(p.accept(), None);
        assert_eq!(p.prepared_count(), 0);
    }

    #[test]
    fn promises_for_accepting_instances_are_ignored() {
        let mut p = proposer();
        p.propose(b"x".to_vec());
        p.prepare();
        p.receive_promise(promise(1, 1, 11));
        p.receive_promise(promise(1, 2, 11));
        assert!(p.accept().is_some());

        // The instance left the prepare table, so even a higher-ballot promise is dropped
        // rather than treated as a preemption.
        assert_eq!(p.receive_promise(promise(1, 3, 21)), None);
    }

    #[test]
    fn timed_out_prepares_are_reissued_with_the_same_ballot() {
        let mut s = settings();
        s.instance_timeout = Duration::from_micros(0);
        let mut p = Proposer::new(1, &s);

        let first = p.prepare();
        let requests: Vec<_> = p.timeout_iterator().collect();
        assert_eq!(requests, vec![first]);

        // Quorum progress is retained across the retry.
        p.propose(b"x".to_vec());
        p.receive_promise(promise(1, 1, 11));
        p.receive_promise(promise(1, 2, 11));
        assert!(p.accept().is_some());
    }

    #[test]
    fn fresh_instances_do_not_time_out() {
        let mut p = proposer();
        p.prepare();

        let requests: Vec<_> = p.timeout_iterator().collect();
        assert!(requests.is_empty());
    }

    #[test]
    fn instances_with_a_quorum_do_not_time_out() {
        let mut s = settings();
        s.instance_timeout = Duration::from_micros(0);
        let mut p = Proposer::new(1, &s);
        p.prepare();

        // Quorum-ready but stuck waiting for a value: not the timeout iterator's business.
        p.receive_promise(promise(1, 1, 11));
        p.receive_promise(promise(1, 2, 11));

        let requests: Vec<_> = p.timeout_iterator().collect();
        assert!(requests.is_empty());
    }

    #[test]
    fn timed_out_accepts_restart_phase_one_with_a_higher_ballot() {
        let mut s = settings();
        s.instance_timeout = Duration::from_micros(0);
        let mut p = Proposer::new(1, &s);
        p.propose(b"x".to_vec());
        p.prepare();
        p.receive_promise(promise(1, 1, 11));
        p.receive_promise(promise(1, 2, 11));
        assert!(p.accept().is_some());

        let requests: Vec<_> = p.timeout_iterator().collect();
        assert_eq!(requests, vec![PrepareRequest { iid: 1, ballot: 21 }]);
        assert_eq!(p.prepared_count(), 1);

        // Still bound to "x" at the new ballot.
        p.receive_promise(promise(1, 1, 21));
        p.receive_promise(promise(1, 2, 21));
        let accept = p.accept().unwrap();
        assert_eq!(accept, AcceptRequest { iid: 1, ballot: 21, value: b"x".to_vec() });
    }

    #[test]
    fn prepare_table_entries_drain_before_accept_table_entries() {
        let mut s = settings();
        s.instance_timeout = Duration::from_micros(0);
        let mut p = Proposer::new(1, &s);
        p.propose(b"a".to_vec());
        p.prepare();
        p.receive_promise(promise(1, 1, 11));
        p.receive_promise(promise(1, 2, 11));
        assert!(p.accept().is_some());
        p.prepare();

        let requests: Vec<_> = p.timeout_iterator().collect();
        assert_eq!(
            requests,
            vec![
                PrepareRequest { iid: 2, ballot: 11 },
                PrepareRequest { iid: 1, ballot: 21 },
            ]
        );

        // The preempted instance re-entered at the front, keeping accepts in instance order.
        p.receive_promise(promise(1, 1, 21));
        p.receive_promise(promise(1, 2, 21));
        assert_eq!(p.accept().unwrap().iid, 1);
    }

    #[test]
    #[should_panic]
    fn accepted_ack_with_mismatched_value_ballot_is_a_protocol_violation() {
        let mut p = proposer();
        p.propose(b"x".to_vec());
        p.prepare();
        p.receive_promise(promise(1, 1, 11));
        p.receive_promise(promise(1, 2, 11));
        assert!(p.accept().is_some());

        let ack = AcceptedAck { iid: 1, acceptor_id: 1, ballot: 11, value_ballot: 1 };
        p.receive_accepted(&ack);
    }

    #[test]
    fn empty_values_are_rejected() {
        let mut p = proposer();
        p.propose(Vec::new());
        p.prepare();
        p.receive_promise(promise(1, 1, 11));
        p.receive_promise(promise(1, 2, 11));

        // Nothing was enqueued, so the quorum-ready instance has nothing to propose.
        assert_eq!(p.accept(), None);
    }

    #[test]
    #[should_panic]
    fn proposer_id_zero_is_rejected() {
        Proposer::new(0, &settings());
    }
}
