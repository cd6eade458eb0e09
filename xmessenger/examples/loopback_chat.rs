//! Two in-process stations chatting over UDP loopback.
//!
//! This example shows how to:
//! - Bind a UDP link and register the partner station
//! - Create a messenger and its delivery channel
//! - Drive a receive pump alongside a send loop
//!
//! Run with: cargo run --example loopback_chat

use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use xmessenger::{Config, Delivery, Messenger, PeerAddress, SendOutcome, UdpLink};

const STATION_A: PeerAddress = PeerAddress::new([0x02, 0x00, 0x00, 0x00, 0x00, 0xA1]);
const STATION_B: PeerAddress = PeerAddress::new([0x02, 0x00, 0x00, 0x00, 0x00, 0xB2]);

fn start_station(
    name: &str,
    link: UdpLink,
    partner: PeerAddress,
) -> (Arc<Messenger<UdpLink>>, mpsc::Receiver<Delivery>) {
    let config = Config::default().with_ack_delay(Duration::from_millis(10));
    let (messenger, deliveries) =
        Messenger::new(link.clone(), partner, name, config).expect("station name too long");
    let messenger = Arc::new(messenger);

    let pump = Arc::clone(&messenger);
    thread::spawn(move || {
        while let Ok((peer, frame)) = link.recv_frame() {
            pump.on_frame_received(peer, &frame);
        }
    });

    (messenger, deliveries)
}

fn main() {
    env_logger::init();

    println!("=== XMessenger Loopback Chat Example ===\n");

    let link_a = UdpLink::bind("127.0.0.1:0").expect("bind station a");
    let link_b = UdpLink::bind("127.0.0.1:0").expect("bind station b");
    link_a.add_peer(STATION_B, link_b.local_addr().expect("local addr"));
    link_b.add_peer(STATION_A, link_a.local_addr().expect("local addr"));

    let (alice, alice_in) = start_station("alice", link_a, STATION_B);
    let (bob, bob_in) = start_station("bob", link_b, STATION_A);

    let printer = thread::spawn(move || {
        for delivery in bob_in.iter().take(3) {
            println!(
                "bob received #{} from {}: {}",
                delivery.sequence, delivery.origin, delivery.text
            );
        }
    });

    for n in 1..=3 {
        let text = format!("hello bob, message {n}");
        match alice.send_message(&text).expect("message fits the frame") {
            SendOutcome::Acknowledged => println!("alice: message {n} acknowledged"),
            SendOutcome::TimedOut => println!("alice: message {n} timed out"),
            SendOutcome::SendFailed => println!("alice: message {n} rejected by the link"),
        }
    }
    printer.join().expect("printer thread");

    // one reply the other way
    match bob.send_message("nice talking to you").expect("reply fits") {
        SendOutcome::Acknowledged => println!("bob: reply acknowledged"),
        outcome => println!("bob: reply not confirmed ({outcome:?})"),
    }
    if let Ok(delivery) = alice_in.recv_timeout(Duration::from_secs(1)) {
        println!("alice received: {}", delivery.text);
    }

    println!("\n=== Example Complete ===");
}
