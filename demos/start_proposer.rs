//! A script used to start one proposer, which will infinitely listen to incoming messages
//! (either from clients or acceptors).
//!
//! You can run this example as follows
//!     RUST_LOG=paxos_proposer=info cargo run --example start_proposer -- <proposer_id> Config
//! where <proposer_id> is a number in [1, max_proposers - 1] which must be unique among the
//! proposers.

extern crate env_logger;
#[macro_use]
extern crate log;
extern crate paxos_proposer;

use std::env;

use paxos_proposer::configurations::{get_config, get_protocol_settings};
use paxos_proposer::node::{ProposerNode, Runnable};

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    info!("{:?}", args);

    match args.len() {
        3 => {
            let id = &args[1];
            let id: usize = match id.parse() {
                Ok(n) => n,
                Err(_) => {
                    eprintln!("Error: second argument not an usize");
                    return;
                }
            };

            let config_file_name = &args[2];
            let config = get_config(config_file_name);
            let mut settings = get_protocol_settings(config_file_name);

            let (_, proposers_address) = config["proposers"];
            let (num_of_acceptors, acceptors_address) = config["acceptors"];
            settings.num_of_acceptors = num_of_acceptors;

            let mut proposer =
                ProposerNode::new(id, proposers_address, acceptors_address, &settings);
            proposer.run();
        }
        _ => {
            panic!("Expected 2 arguments (excluding file name)");
        }
    }
}
