use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{error, info, warn};
use xmessenger::{Config, Messenger, PeerAddress, SendOutcome, UdpLink};

const LOCAL_ADDR: &str = "127.0.0.1:47101";
const PARTNER_ADDR: &str = "127.0.0.1:47100";

// Station address of the chat partner (must match the server binary)
const PARTNER_STATION: PeerAddress = PeerAddress::new([0x94, 0xB5, 0x55, 0xF8, 0x4B, 0xD8]);

const STATION_NAME: &str = "node-b";

// Pause between send cycles
const SEND_PACING: Duration = Duration::from_millis(1000);

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let link = UdpLink::bind(LOCAL_ADDR).expect("Failed to bind chat socket");
    link.add_peer(
        PARTNER_STATION,
        PARTNER_ADDR.parse().expect("Bad partner address"),
    );
    info!("{STATION_NAME} on {LOCAL_ADDR}, chatting with {PARTNER_STATION} at {PARTNER_ADDR}");

    let (messenger, deliveries) =
        Messenger::new(link.clone(), PARTNER_STATION, STATION_NAME, Config::default())
            .expect("Failed to create messenger");
    let messenger = Arc::new(messenger);

    // receive pump: one inbound datagram is one frame
    let pump = Arc::clone(&messenger);
    thread::spawn(move || loop {
        match link.recv_frame() {
            Ok((peer, frame)) => pump.on_frame_received(peer, &frame),
            Err(err) => {
                error!("Receive failed: {err}");
                return;
            }
        }
    });

    // delivery printer
    thread::spawn(move || {
        for delivery in deliveries {
            info!(
                "Received from {} ({}): {} [#{}]",
                delivery.origin, delivery.peer, delivery.text, delivery.sequence
            );
        }
    });

    let mut counter = 0u32;
    loop {
        counter += 1;
        let text = format!("hello from {STATION_NAME}, message {counter}");
        info!("Sending message {counter}");
        match messenger.send_message(&text) {
            Ok(SendOutcome::Acknowledged) => info!("Message {counter} acknowledged"),
            Ok(SendOutcome::TimedOut) => warn!("Message {counter} timed out, moving on"),
            Ok(SendOutcome::SendFailed) => warn!("Message {counter} rejected by the link"),
            Err(err) => error!("Message {counter} not sent: {err}"),
        }
        thread::sleep(SEND_PACING);
    }
}
