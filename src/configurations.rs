//! A module that contains functions required to read, parse and return the configuration settings
//! from the file `Config.toml` at the root of this crate.

// TODO: handle errors more appropriately.

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::str::FromStr;
use std::time::Duration;

use config::{Config, File};

/// The protocol settings, which must be fixed beforehand and agreed upon by every process.
#[derive(Debug, Clone)]
pub struct ProtocolSettings {
    // The maximum number of proposers must be fixed beforehand, because of unique ballot
    // generation. The proposers must be started with different ids in [1, max_proposers - 1],
    // and this number MUST be a power of 10.
    pub max_proposers: u64,

    // The number of acceptors must also be fixed beforehand.
    pub num_of_acceptors: usize,

    // How long an instance may sit on one ballot without reaching a quorum before the timeout
    // iterator re-issues its prepare request.
    pub instance_timeout: Duration,

    // How many prepare-phase instances the event loop keeps open at any time.
    pub preexec_window: usize,
}

impl ProtocolSettings {
    /// The number of responses sufficient to proceed in either phase: N/2 + 1.
    pub fn quorum(&self) -> usize {
        self.num_of_acceptors / 2 + 1
    }
}

impl Default for ProtocolSettings {
    fn default() -> Self {
        ProtocolSettings {
            max_proposers: 10,
            num_of_acceptors: 3,
            instance_timeout: Duration::from_micros(1_000_000),
            preexec_window: 128,
        }
    }
}

/// Returns, for each process class, its count and the multicast group address it listens on.
pub fn get_config(file_name: &str) -> HashMap<String, (usize, SocketAddrV4)> {
    let c = read_config(file_name);
    parse_addresses(&c)
}

/// Returns the protocol settings from the `[protocol]` table of the configuration file, falling
/// back to the defaults for anything the file does not mention.
pub fn get_protocol_settings(file_name: &str) -> ProtocolSettings {
    let c = read_config(file_name);
    parse_protocol(&c)
}

fn read_config(file_name: &str) -> HashMap<String, HashMap<String, String>> {
    let mut c = Config::default();
    c.merge(File::with_name(file_name)).unwrap();
    c.try_into::<HashMap<String, HashMap<String, String>>>().expect("Could not try_into")
}

fn parse_addresses(
    c: &HashMap<String, HashMap<String, String>>,
) -> HashMap<String, (usize, SocketAddrV4)> {
    c.iter().filter(|(key, _)| key.as_str() != "protocol").map(|(key, value)| {
        (
            key.clone(),
            (
                value["size"].parse().unwrap(),
                SocketAddrV4::new(
                    Ipv4Addr::from_str(&value["host"]).unwrap(),
                    value["port"].parse().unwrap(),
                ),
            ),
        )
    }).collect()
}

fn parse_protocol(c: &HashMap<String, HashMap<String, String>>) -> ProtocolSettings {
    let defaults = ProtocolSettings::default();

    match c.get("protocol") {
        None => defaults,
        Some(table) => ProtocolSettings {
            max_proposers: table
                .get("max_proposers")
                .map_or(defaults.max_proposers, |v| v.parse().unwrap()),
            num_of_acceptors: table
                .get("num_of_acceptors")
                .map_or(defaults.num_of_acceptors, |v| v.parse().unwrap()),
            instance_timeout: table
                .get("instance_timeout_us")
                .map_or(defaults.instance_timeout, |v| {
                    Duration::from_micros(v.parse().unwrap())
                }),
            preexec_window: table
                .get("preexec_window")
                .map_or(defaults.preexec_window, |v| v.parse().unwrap()),
        },
    }
}
