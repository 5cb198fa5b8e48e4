//! A script used to start one client, which infinitely reads proposal values from the standard
//! input or, if more than two command-line arguments are passed, uses the 3rd, 4th, etc.,
//! arguments as the proposal values.
//!
//! You can run this example as follows
//!     RUST_LOG=paxos_proposer=info cargo run --example start_client -- <client_id> Config
//! if you want to run this client interactively (i.e. provide one proposal at a time), or
//!     RUST_LOG=paxos_proposer=info cargo run --example start_client -- <client_id> Config p1 p2 ...
//! where p1, p2, etc., are the proposal values.

extern crate env_logger;
#[macro_use]
extern crate log;
extern crate paxos_proposer;
#[macro_use]
extern crate text_io;

use std::env;
use std::io;
use std::io::prelude::*;

use paxos_proposer::configurations::get_config;
use paxos_proposer::node::Client;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    info!("{:?}", args);

    match args.len() {
        len if len >= 3 => {
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

            let (_, clients_address) = config["clients"];
            let (_, proposers_address) = config["proposers"];

            let client = Client::new(id, clients_address, proposers_address);

            if len == 3 {
                loop {
                    print!("Enter the proposal: ");
                    io::stdout().flush().expect("Could not flush stdout");
                    let value: String = read!();
                    client.submit(value.into_bytes());
                }
            } else {
                for proposal in args.iter().skip(3) {
                    client.submit(proposal.clone().into_bytes());
                }
            }
        }
        _ => {
            panic!("Expected 2 arguments (excluding file name)");
        }
    }
}
