extern crate bincode;
extern crate config;
#[macro_use]
extern crate log;
extern crate net2;
extern crate serde;
#[macro_use]
extern crate serde_derive;
extern crate uuid;

mod net_node;
pub mod configurations;
pub mod message;
pub mod node;
pub mod proposer;
pub mod quorum;
