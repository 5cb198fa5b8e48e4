//! A module which contains the definition of the messages exchanged between the processes taking
//! part in the algorithm, together with the identifier types they carry.

use uuid::Uuid;

/// The identifier of one consensus instance (one slot). Instance identifiers are densely
/// allocated by each proposer, starting at 1, and are never reused.
pub type Iid = u64;

/// A totally ordered round number. Every ballot issued by the proposer with id `p` is congruent
/// to `p` modulo the maximum number of proposers, which makes ballots globally unique as long as
/// each proposer is started with a distinct id.
pub type Ballot = u64;

/// An enum which contains all types of messages which nodes can exchange.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum Message {
    Phase0a(Request),
    Phase1a(PrepareRequest),
    Phase1b(PromiseAck),
    Phase2a(AcceptRequest),
    Phase2b(AcceptedAck),
}

/// In phase 0, a client submits a value to the proposers, which need to start the algorithm.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Request {
    // The value which nodes need to agree on.
    pub value: Vec<u8>,

    // The unique identifier of the sender of this message (which is a client).
    pub sender_uuid: Uuid,
}

/// In phase 1a, a proposer asks all acceptors to promise not to take part in any round of the
/// given instance below `ballot`.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub struct PrepareRequest {
    pub iid: Iid,

    pub ballot: Ballot,
}

/// In phase 1b, an acceptor answers a `PrepareRequest` with the highest-numbered round it has
/// taken part in, along with the value it last accepted, if any.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PromiseAck {
    pub iid: Iid,

    pub acceptor_id: usize,

    // The ballot the sender promises on. Below the instance's current ballot the promise is
    // stale; above it the instance has been preempted by a competing proposer.
    pub ballot: Ballot,

    // The ballot at which the sender previously accepted `value`, 0 if it never accepted one.
    pub value_ballot: Ballot,

    // The value the sender already accepted at `value_ballot`, if any.
    pub value: Option<Vec<u8>>,
}

/// In phase 2a, a proposer asks all acceptors to accept a value for the given instance at the
/// ballot that reached a quorum of promises.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AcceptRequest {
    pub iid: Iid,

    pub ballot: Ballot,

    pub value: Vec<u8>,
}

/// In phase 2b, an acceptor confirms that it accepted the value proposed at `value_ballot`, or
/// reveals the higher ballot it has moved to.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub struct AcceptedAck {
    pub iid: Iid,

    pub acceptor_id: usize,

    pub ballot: Ballot,

    pub value_ballot: Ballot,
}
