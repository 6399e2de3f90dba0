//! The dedicated GVSP receive loop.

use std::io;
use std::net::UdpSocket;
use std::sync::Arc;

use crate::assembly::Delivery;
use crate::protocol::{PacketKind, DATAGRAM_SIZE, GVSP_HEADER_SIZE};
use crate::receiver::Shared;

/// Receive loop body. Runs on the dedicated receive thread until the
/// controller clears the enable flag.
///
/// Lock discipline per iteration: frame lock for dispatch, then the enable
/// lock for the termination check (frame lock still held), released in
/// reverse order. Completed frames are handed to the callback only after
/// both locks are released, so the callback may re-enter controller
/// operations.
pub(crate) fn receive_loop(socket: Arc<UdpSocket>, shared: Arc<Shared>, port: u16) {
    let mut scratch = [0u8; DATAGRAM_SIZE];
    if shared.verbose() {
        tracing::info!(port, "receiver listening");
    }

    loop {
        // Bounded by the 100 ms socket timeout, so a cleared enable flag is
        // observed promptly even when the camera has stopped transmitting.
        let len = match socket.recv(&mut scratch) {
            Ok(len) => len,
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => 0,
            Err(e) => {
                if shared.warnings() {
                    tracing::warn!(error = %e, "socket receive error");
                }
                0
            }
        };

        let mut delivery: Option<Delivery> = None;
        let mut stop = false;
        {
            let mut stream = shared.stream.lock();
            if len >= GVSP_HEADER_SIZE {
                let warnings = shared.warnings();
                let datagram = &scratch[..len];
                match PacketKind::from_format(scratch[4] & 0x0f) {
                    Some(PacketKind::Leader) => stream.handle_leader(datagram, warnings),
                    Some(PacketKind::Trailer) => delivery = stream.handle_trailer(datagram, warnings),
                    Some(PacketKind::Data) => stream.handle_data(datagram, warnings),
                    None => {}
                }
            }
            let enabled = shared.enabled.lock();
            if !*enabled {
                stop = true;
            }
            // Guards drop in reverse order: enable first, then frame.
        }

        if let Some((callback, frame)) = delivery {
            callback(frame);
        }
        if stop {
            break;
        }
    }

    tracing::debug!(port, "receive loop exited");
}
