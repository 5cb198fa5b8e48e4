//! A module which contains the definition of a struct which can be used to send or receive
//! messages using a UDP socket.

use std::io;
use std::net::{Ipv4Addr, SocketAddrV4, UdpSocket};
use std::time::Duration;

use bincode::{deserialize, serialize};
use net2::UdpBuilder;

use crate::message::Message;

/// A struct which can be used to send to or receive from a UDP multicast group.
pub struct NetNode {
    udp_socket_sender: UdpSocket,

    udp_socket_receiver: UdpSocket,
}

impl NetNode {
    /// Joins the given multicast group. With a read timeout, `receive` returns `None` once the
    /// timeout elapses without a message; the run loops use that as their tick.
    pub fn new(multicast_address_v4: &SocketAddrV4, read_timeout: Option<Duration>) -> Self {
        // Create the UdpSocket to send messages to other sockets. This socket does not have to
        // bind to a specific port, but just to one available, hence we use 0 as the port.
        let udp_socket_sender = UdpSocket::bind("0.0.0.0:0").expect("Could not bind to address");

        udp_socket_sender.set_multicast_loop_v4(true).expect("set_multicast_loop_v4 call failed");

        // Create a UdpSocket to receive messages from other sockets on the same address as the
        // multicast group one. Multiple sockets could bind to the same multicast group address,
        // so the address must be reusable.
        let udp_socket_receiver = UdpBuilder::new_v4()
            .expect("Could not construct UdpBuilder")
            .reuse_address(true)
            .expect("Could not reuse address")
            .bind(multicast_address_v4)
            .expect("Could not bind to address");

        // Let the socket that wants to receive messages join its corresponding multicast group.
        udp_socket_receiver
            .join_multicast_v4(multicast_address_v4.ip(), &Ipv4Addr::UNSPECIFIED)
            .expect("Could not join multicast group");

        udp_socket_receiver
            .set_read_timeout(read_timeout)
            .expect("Could not set the read timeout");

        NetNode { udp_socket_sender, udp_socket_receiver }
    }

    /// Sends the message m to the socket with address destination_address.
    pub fn send(&self, m: &Message, destination_address: &SocketAddrV4) {
        let encoded: Vec<u8> = serialize(m).expect("Could not serialize the message m");

        self.udp_socket_sender
            .send_to(&encoded[..], destination_address)
            .expect("Could not send data");
    }

    /// Receives a message using the socket which listens on the multicast group address given to
    /// `new`, or returns `None` if the read timed out first.
    pub fn receive(&self) -> Option<Message> {
        // TODO: what's the required size of data_received?
        let mut data_received = vec![0; 16384];

        match self.udp_socket_receiver.recv_from(&mut data_received) {
            Ok((number_of_bytes, _src_addr)) => Some(
                deserialize(&data_received[..number_of_bytes])
                    .expect("Could not deserialize received data"),
            ),
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => None,
            Err(ref e) if e.kind() == io::ErrorKind::TimedOut => None,
            Err(e) => panic!("Could not receive data: {}", e),
        }
    }
}
