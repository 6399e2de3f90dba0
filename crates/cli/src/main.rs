use clap::Parser;
use gvsp::Receiver;
use std::io;
use std::net::IpAddr;

#[derive(Parser)]
#[command(
    name = "gvsp-listen",
    about = "Standalone GVSP stream listener for GigE Vision cameras"
)]
struct Args {
    /// Host interface address to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: IpAddr,

    /// Camera IP address (firewall-traversal target)
    #[arg(long)]
    camera: IpAddr,

    /// Expected frame payload size in bytes
    #[arg(long)]
    payload_size: usize,

    /// Negotiated packet size, including the 36 bytes of header overhead
    #[arg(long, default_value_t = 1500)]
    packet_size: usize,

    /// Verbose status messages
    #[arg(long, short)]
    verbose: bool,
}

fn main() {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let mut receiver = match Receiver::bind(args.host) {
        Ok(receiver) => receiver,
        Err(e) => {
            eprintln!("Failed to bind receiver: {}", e);
            return;
        }
    };
    receiver.set_verbose(args.verbose);

    if let Err(e) = receiver.create_buffer(args.payload_size, args.packet_size) {
        eprintln!("Failed to create reassembly buffer: {}", e);
        return;
    }

    receiver.set_frame_callback(|frame| {
        tracing::info!(
            width = frame.width,
            height = frame.height,
            bit_depth = frame.bit_depth,
            "frame received"
        );
    });

    if let Err(e) = receiver.start_receive(args.camera) {
        eprintln!("Failed to start receiving: {}", e);
        return;
    }

    println!(
        "Listening for GVSP packets on port {} — point the camera's stream destination here, press Enter to stop",
        receiver.port()
    );
    let mut input = String::new();
    io::stdin().read_line(&mut input).unwrap();

    if let Err(e) = receiver.stop_receive() {
        eprintln!("Failed to stop receiving: {}", e);
    }
}
