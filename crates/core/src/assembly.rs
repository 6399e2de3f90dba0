//! Per-frame reassembly state and the GVSP packet handlers.
//!
//! One frame travels as leader → data packets (any order) → trailer. The
//! leader announces geometry and pixel format, data packets land at
//! `(packet_id - 1) * packet_payload_size` in the reassembly buffer, and the
//! trailer triggers decode and delivery. Anything else — missing leader,
//! dropped packets, malformed or unsupported packets — drops the packet or
//! the frame with a warning and the stream carries on.

use std::sync::Arc;

use crate::pixel::{self, Frame};
use crate::protocol::{HeaderRejection, ImageLeader, PacketHeader, GVSP_HEADER_SIZE};

/// Consumer of completed frames. Invoked outside the stream locks; the frame
/// is owned by the callback.
pub(crate) type FrameCallback = Arc<dyn Fn(Frame) + Send + Sync>;

/// A completed frame paired with the callback that was installed when its
/// trailer arrived. Invoked by the receive loop after both locks are
/// released.
pub(crate) type Delivery = (FrameCallback, Frame);

/// Bitmap of received data-packet slots within one frame.
///
/// Counts distinct slots, so a duplicate packet plus a dropped one is still
/// detected as an incomplete frame rather than delivered corrupt.
#[derive(Debug, Default)]
pub(crate) struct SlotBitmap {
    words: Vec<u64>,
    distinct: usize,
}

impl SlotBitmap {
    /// Clear and resize for a frame of `slots` packets.
    pub(crate) fn reset(&mut self, slots: usize) {
        self.words.clear();
        self.words.resize(slots.div_ceil(64), 0);
        self.distinct = 0;
    }

    /// Mark a slot received. The caller bounds-checks `slot`.
    pub(crate) fn set(&mut self, slot: usize) {
        let word = &mut self.words[slot / 64];
        let mask = 1u64 << (slot % 64);
        if *word & mask == 0 {
            *word |= mask;
            self.distinct += 1;
        }
    }

    /// Number of distinct slots received.
    pub(crate) fn distinct(&self) -> usize {
        self.distinct
    }
}

/// Stream state guarded by the frame lock: buffer configuration, the
/// reassembly buffer, the in-progress frame, and the callback slot.
pub(crate) struct StreamState {
    /// Total wire payload bytes per frame.
    pub(crate) payload_size: usize,
    /// Image bytes carried per data packet.
    pub(crate) packet_payload_size: usize,
    /// Data packets per frame; `payload_size / packet_payload_size`.
    pub(crate) packet_count: usize,
    /// Reassembly buffer of `payload_size` bytes; `None` until created.
    pub(crate) buffer: Option<Vec<u8>>,

    /// Columns, from the current leader.
    pub(crate) size_x: u32,
    /// Rows / spectral lines, from the current leader.
    pub(crate) size_s: u32,
    /// Raw pixel format code, from the current leader.
    pub(crate) pixel_format: u32,
    /// Set by a leader, cleared by its trailer.
    pub(crate) leader_received: bool,
    /// Which data-packet slots of the current frame have arrived.
    pub(crate) received: SlotBitmap,

    pub(crate) callback: Option<FrameCallback>,
}

impl StreamState {
    pub(crate) fn new() -> Self {
        Self {
            payload_size: 0,
            packet_payload_size: 0,
            packet_count: 0,
            buffer: None,
            size_x: 0,
            size_s: 0,
            pixel_format: 0,
            leader_received: false,
            received: SlotBitmap::default(),
            callback: None,
        }
    }

    fn header_ok(&self, datagram: &[u8], warnings: bool) -> bool {
        let Some(header) = PacketHeader::parse(datagram) else {
            return false;
        };
        match header.validate() {
            Ok(()) => true,
            Err(rejection) => {
                warn_rejected_header(rejection, warnings);
                false
            }
        }
    }

    /// Packet format 1: start a new frame.
    pub(crate) fn handle_leader(&mut self, datagram: &[u8], warnings: bool) {
        if !self.header_ok(datagram, warnings) {
            if warnings {
                tracing::warn!("received invalid leader packet");
            }
            return;
        }
        match ImageLeader::parse(datagram) {
            Ok(leader) => {
                self.pixel_format = leader.pixel_format;
                self.size_x = leader.size_x;
                self.size_s = leader.size_s;
                self.received.reset(self.packet_count);
                self.leader_received = true;
            }
            Err(rejection) => {
                if warnings {
                    tracing::warn!(%rejection, "rejected image leader");
                }
            }
        }
    }

    /// Packet format 3: copy one payload slice into the reassembly buffer.
    pub(crate) fn handle_data(&mut self, datagram: &[u8], warnings: bool) {
        if !self.leader_received {
            // A packet straggling past its trailer would land in the next
            // frame's buffer; without a leader there is no frame to join.
            tracing::trace!("data packet outside a leader/trailer pair, ignored");
            return;
        }
        let Some(header) = PacketHeader::parse(datagram) else {
            return;
        };
        let Some(slot) = header.packet_id.checked_sub(1) else {
            if warnings {
                tracing::warn!("data packet id must be 1-based");
            }
            return;
        };
        let slot = slot as usize;
        if datagram.len() < GVSP_HEADER_SIZE + self.packet_payload_size {
            if warnings {
                tracing::warn!(
                    expected = GVSP_HEADER_SIZE + self.packet_payload_size,
                    received = datagram.len(),
                    "data packet is too small"
                );
            }
            return;
        }
        let start = slot * self.packet_payload_size;
        if start + self.packet_payload_size > self.payload_size {
            if warnings {
                tracing::warn!(
                    packet_id = header.packet_id,
                    "data packet exceeds the reassembly buffer"
                );
            }
            return;
        }
        let Some(buffer) = self.buffer.as_mut() else {
            return;
        };
        buffer[start..start + self.packet_payload_size]
            .copy_from_slice(&datagram[GVSP_HEADER_SIZE..GVSP_HEADER_SIZE + self.packet_payload_size]);
        self.received.set(slot);
    }

    /// Packet format 2: close the frame and decode it if complete.
    ///
    /// Returns the callback and decoded frame for the receive loop to
    /// deliver once the locks are released.
    pub(crate) fn handle_trailer(&mut self, datagram: &[u8], warnings: bool) -> Option<Delivery> {
        if !self.leader_received {
            if warnings {
                tracing::warn!("trailer received before leader");
            }
            return None;
        }
        // Cleared before any further check, so a missing leader for the
        // next frame is detected.
        self.leader_received = false;

        if !self.header_ok(datagram, warnings) || datagram.len() < GVSP_HEADER_SIZE + 4 {
            if warnings {
                tracing::warn!("received invalid trailer packet");
            }
            return None;
        }
        let received = self.received.distinct();
        if received != self.packet_count {
            if warnings {
                tracing::warn!(
                    dropped = self.packet_count - received,
                    "packets dropped, frame abandoned"
                );
            }
            return None;
        }

        let buffer = self.buffer.as_deref().unwrap_or(&[]);
        match pixel::decode(self.pixel_format, buffer, self.size_x, self.size_s) {
            Ok(frame) => self.callback.clone().map(|callback| (callback, frame)),
            Err(error) => {
                if warnings {
                    tracing::warn!(%error, "frame dropped");
                }
                None
            }
        }
    }
}

fn warn_rejected_header(rejection: HeaderRejection, warnings: bool) {
    if !warnings {
        return;
    }
    match rejection {
        HeaderRejection::ErrorStatus(status) => {
            tracing::warn!(
                status = format_args!("{status:#06x}"),
                "received packet with error status"
            );
        }
        // All-zero block IDs carry no diagnostic value.
        HeaderRejection::ZeroBlockId => {}
        HeaderRejection::ExtendedId => {
            tracing::warn!("extended packet ids are not supported");
        }
    }
}
