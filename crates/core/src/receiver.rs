//! GVSP session controller: socket, buffer, and receive-thread lifecycle.
//!
//! One [`Receiver`] owns one bound UDP socket, one reassembly buffer, and at
//! most one dedicated receive thread. Lifecycle:
//!
//! ```text
//! bind           -> idle       (socket bound, ephemeral port reported)
//! create_buffer  -> buffered
//! start_receive  -> receiving  (receive thread spawned)
//! stop_receive   -> buffered   (receive thread joined)
//! free_buffer    -> idle
//! close_socket   -> (socket released)
//! ```
//!
//! Illegal transitions fail with the matching [`GvspError`] variant and
//! leave the session untouched. The receive thread is created on each start
//! and joined on each stop; no thread outlives the session.

use std::net::{IpAddr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;

use crate::assembly::StreamState;
use crate::engine;
use crate::error::{GvspError, Result};
use crate::pixel::Frame;
use crate::protocol::TOTAL_HEADER_SIZE;

/// Socket receive timeout. Bounds how long the receive thread can sit in a
/// blocking read after the enable flag is cleared, so
/// [`Receiver::stop_receive`] always returns promptly.
const RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// State shared between the controller and the receive thread.
///
/// Two locks guard disjoint fields. When both are held, the acquisition
/// order is always {stream → enabled}; reversing it deadlocks
/// [`Receiver::stop_receive`] against the receive loop.
pub(crate) struct Shared {
    /// Frame lock: reassembly buffer, in-progress frame, callback slot.
    pub(crate) stream: Mutex<StreamState>,
    /// Enable lock: whether the receive loop should keep running.
    pub(crate) enabled: Mutex<bool>,
    verbose: AtomicBool,
    warnings: AtomicBool,
}

impl Shared {
    pub(crate) fn verbose(&self) -> bool {
        self.verbose.load(Ordering::Relaxed)
    }

    pub(crate) fn warnings(&self) -> bool {
        self.warnings.load(Ordering::Relaxed)
    }
}

/// GVSP streaming receiver for one camera stream.
///
/// The control plane (GVCP) stays with the caller: configure the camera to
/// transmit to [`port`](Self::port), tell this receiver the expected payload
/// and packet sizes, and every completed frame arrives at the installed
/// callback as a decoded pixel matrix.
///
/// # Quick start
///
/// ```no_run
/// use gvsp::Receiver;
///
/// let mut receiver = Receiver::bind("192.168.1.10".parse().unwrap()).unwrap();
/// println!("camera destination port: {}", receiver.port());
///
/// // 512x512 Mono12; 1060-byte packets carry 1024 payload bytes each.
/// receiver.create_buffer(512 * 512 * 2, 1060).unwrap();
/// receiver.set_frame_callback(|frame| {
///     println!("{}x{} @ {} bit", frame.width, frame.height, frame.bit_depth);
/// });
/// receiver.start_receive("192.168.1.64".parse().unwrap()).unwrap();
/// // ... acquisition runs ...
/// receiver.stop_receive().unwrap();
/// receiver.close_socket().unwrap();
/// ```
///
/// The callback runs on the receive thread with no session locks held; it
/// may re-enter controller operations such as
/// [`set_frame_callback`](Self::set_frame_callback), but
/// [`stop_receive`](Self::stop_receive) must come from another thread (it
/// joins the thread the callback runs on), and a callback that blocks for
/// long lets datagrams back up in the socket buffer.
pub struct Receiver {
    socket: Option<Arc<UdpSocket>>,
    port: u16,
    shared: Arc<Shared>,
    recv_thread: Option<JoinHandle<()>>,
}

impl Receiver {
    /// Bind a UDP socket on `host_ip` with an OS-assigned ephemeral port and
    /// a 100 ms receive timeout.
    ///
    /// Warnings are on and verbose messages off by default.
    pub fn bind(host_ip: IpAddr) -> Result<Self> {
        let socket = UdpSocket::bind((host_ip, 0))?;
        socket.set_read_timeout(Some(RECV_TIMEOUT))?;
        let port = socket.local_addr()?.port();
        tracing::debug!(%host_ip, port, "socket bound");

        Ok(Self {
            socket: Some(Arc::new(socket)),
            port,
            shared: Arc::new(Shared {
                stream: Mutex::new(StreamState::new()),
                enabled: Mutex::new(false),
                verbose: AtomicBool::new(false),
                warnings: AtomicBool::new(true),
            }),
            recv_thread: None,
        })
    }

    /// The bound ephemeral port. The caller programs this as the camera's
    /// stream destination port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Whether the receive loop is currently enabled.
    pub fn is_receiving(&self) -> bool {
        *self.shared.enabled.lock()
    }

    fn ensure_not_receiving(&self) -> Result<()> {
        if *self.shared.enabled.lock() {
            Err(GvspError::ReceiveActive)
        } else {
            Ok(())
        }
    }

    /// Close the socket. The session is finished afterwards: every
    /// subsequent socket operation fails with [`GvspError::NoSocket`].
    ///
    /// Fails with [`GvspError::ReceiveActive`] while receiving.
    pub fn close_socket(&mut self) -> Result<()> {
        self.ensure_not_receiving()?;
        if self.socket.take().is_none() {
            return Err(GvspError::NoSocket);
        }
        if self.shared.verbose() {
            tracing::info!("socket closed");
        }
        Ok(())
    }

    /// Allocate the reassembly buffer for frames of `payload_size` wire
    /// bytes, delivered in packets of `packet_size` bytes including the
    /// 36-byte combined IP + UDP + GVSP header overhead.
    ///
    /// `payload_size` must be a positive multiple of
    /// `packet_size - 36`.
    pub fn create_buffer(&mut self, payload_size: usize, packet_size: usize) -> Result<()> {
        self.ensure_not_receiving()?;
        let mut stream = self.shared.stream.lock();
        if stream.buffer.is_some() {
            return Err(GvspError::BufferExists);
        }
        let packet_payload_size = packet_size
            .checked_sub(TOTAL_HEADER_SIZE)
            .filter(|&n| n > 0)
            .ok_or(GvspError::PacketSizeTooSmall(packet_size))?;
        if payload_size == 0 || payload_size % packet_payload_size != 0 {
            return Err(GvspError::PayloadSizeInvalid {
                payload_size,
                packet_payload_size,
            });
        }
        stream.payload_size = payload_size;
        stream.packet_payload_size = packet_payload_size;
        stream.packet_count = payload_size / packet_payload_size;
        stream.buffer = Some(vec![0u8; payload_size]);
        if self.shared.verbose() {
            tracing::info!(
                packet_payload_size,
                packet_count = stream.packet_count,
                payload_size,
                "reassembly buffer created"
            );
        }
        Ok(())
    }

    /// Release the reassembly buffer and zero the derived sizes.
    ///
    /// Fails with [`GvspError::ReceiveActive`] while receiving and
    /// [`GvspError::NoBuffer`] when no buffer exists.
    pub fn free_buffer(&mut self) -> Result<()> {
        self.ensure_not_receiving()?;
        let mut stream = self.shared.stream.lock();
        if stream.buffer.take().is_none() {
            return Err(GvspError::NoBuffer);
        }
        stream.payload_size = 0;
        stream.packet_payload_size = 0;
        stream.packet_count = 0;
        if self.shared.verbose() {
            tracing::info!("reassembly buffer freed");
        }
        Ok(())
    }

    /// Start the receive loop on its dedicated thread.
    ///
    /// First sends a 4-byte zero datagram to `(camera_ip, bound_port)` —
    /// content is irrelevant, it only establishes conntrack/NAT state so the
    /// camera's inbound stream passes a stateful firewall.
    pub fn start_receive(&mut self, camera_ip: IpAddr) -> Result<()> {
        self.ensure_not_receiving()?;
        let socket = self.socket.as_ref().ok_or(GvspError::NoSocket)?.clone();
        if self.shared.stream.lock().buffer.is_none() {
            return Err(GvspError::NoBuffer);
        }

        socket.send_to(&[0u8; 4], SocketAddr::new(camera_ip, self.port))?;
        if self.shared.verbose() {
            tracing::info!(%camera_ip, "connection open");
        }

        *self.shared.enabled.lock() = true;
        let shared = self.shared.clone();
        let port = self.port;
        self.recv_thread = Some(thread::spawn(move || {
            engine::receive_loop(socket, shared, port);
        }));
        Ok(())
    }

    /// Clear the enable flag and join the receive thread.
    ///
    /// On return the loop has exited and no further callbacks will fire.
    /// Worst-case latency is the 100 ms socket timeout.
    pub fn stop_receive(&mut self) -> Result<()> {
        {
            let mut enabled = self.shared.enabled.lock();
            if !*enabled {
                return Err(GvspError::ReceiveInactive);
            }
            *enabled = false;
        }
        if let Some(handle) = self.recv_thread.take() {
            let _ = handle.join();
        }
        if self.shared.verbose() {
            tracing::info!("stopped listening for incoming packets");
        }
        Ok(())
    }

    /// Install the frame callback. Replaces any previous callback atomically
    /// under the frame lock; safe to call while receiving, including from
    /// the callback itself.
    pub fn set_frame_callback<F>(&self, callback: F)
    where
        F: Fn(Frame) + Send + Sync + 'static,
    {
        self.shared.stream.lock().callback = Some(Arc::new(callback));
        if self.shared.verbose() {
            tracing::info!("frame callback installed");
        }
    }

    /// Detach the frame callback. A delivery already in flight on the
    /// receive thread still completes with the previous callback.
    pub fn clear_frame_callback(&self) {
        self.shared.stream.lock().callback = None;
    }

    /// Toggle verbose status messages.
    pub fn set_verbose(&self, verbose: bool) {
        self.shared.verbose.store(verbose, Ordering::Relaxed);
    }

    /// Toggle protocol warning messages. On by default.
    pub fn set_warnings(&self, warnings: bool) {
        self.shared.warnings.store(warnings, Ordering::Relaxed);
    }
}

impl Drop for Receiver {
    /// A dropped session never leaks its receive thread.
    fn drop(&mut self) {
        let _ = self.stop_receive();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    fn make_receiver() -> Receiver {
        Receiver::bind(LOCALHOST).expect("bind receiver")
    }

    #[test]
    fn bind_reports_ephemeral_port() {
        let receiver = make_receiver();
        assert_ne!(receiver.port(), 0);
        assert!(!receiver.is_receiving());
    }

    #[test]
    fn create_buffer_twice_fails() {
        let mut receiver = make_receiver();
        receiver.create_buffer(8, 40).unwrap();
        let err = receiver.create_buffer(8, 40).unwrap_err();
        assert!(matches!(err, GvspError::BufferExists), "{err:?}");
    }

    #[test]
    fn create_buffer_rejects_small_packets() {
        let mut receiver = make_receiver();
        for packet_size in [0, 10, 36] {
            let err = receiver.create_buffer(8, packet_size).unwrap_err();
            assert!(matches!(err, GvspError::PacketSizeTooSmall(_)), "{err:?}");
        }
    }

    #[test]
    fn create_buffer_rejects_non_multiple_payload() {
        let mut receiver = make_receiver();
        let err = receiver.create_buffer(10, 40).unwrap_err();
        assert!(matches!(
            err,
            GvspError::PayloadSizeInvalid {
                payload_size: 10,
                packet_payload_size: 4
            }
        ));
    }

    #[test]
    fn create_buffer_rejects_zero_payload() {
        let mut receiver = make_receiver();
        let err = receiver.create_buffer(0, 40).unwrap_err();
        assert!(matches!(err, GvspError::PayloadSizeInvalid { .. }));
    }

    #[test]
    fn free_buffer_without_buffer_fails() {
        let mut receiver = make_receiver();
        let err = receiver.free_buffer().unwrap_err();
        assert!(matches!(err, GvspError::NoBuffer));
    }

    #[test]
    fn free_then_recreate_buffer() {
        let mut receiver = make_receiver();
        receiver.create_buffer(8, 40).unwrap();
        receiver.free_buffer().unwrap();
        receiver.create_buffer(16, 40).unwrap();
    }

    #[test]
    fn stop_without_start_fails() {
        let mut receiver = make_receiver();
        let err = receiver.stop_receive().unwrap_err();
        assert!(matches!(err, GvspError::ReceiveInactive));
    }

    #[test]
    fn start_without_buffer_fails() {
        let mut receiver = make_receiver();
        let err = receiver.start_receive(LOCALHOST).unwrap_err();
        assert!(matches!(err, GvspError::NoBuffer));
    }

    #[test]
    fn start_stop_cycle() {
        let mut receiver = make_receiver();
        receiver.create_buffer(8, 40).unwrap();
        receiver.start_receive(LOCALHOST).unwrap();
        assert!(receiver.is_receiving());
        let err = receiver.start_receive(LOCALHOST).unwrap_err();
        assert!(matches!(err, GvspError::ReceiveActive));
        receiver.stop_receive().unwrap();
        assert!(!receiver.is_receiving());
        // Restartable after a stop.
        receiver.start_receive(LOCALHOST).unwrap();
        receiver.stop_receive().unwrap();
    }

    #[test]
    fn guards_while_receiving() {
        let mut receiver = make_receiver();
        receiver.create_buffer(8, 40).unwrap();
        receiver.start_receive(LOCALHOST).unwrap();

        assert!(matches!(
            receiver.close_socket().unwrap_err(),
            GvspError::ReceiveActive
        ));
        assert!(matches!(
            receiver.free_buffer().unwrap_err(),
            GvspError::ReceiveActive
        ));

        receiver.stop_receive().unwrap();
        receiver.close_socket().unwrap();
    }

    #[test]
    fn close_twice_fails() {
        let mut receiver = make_receiver();
        receiver.close_socket().unwrap();
        assert!(matches!(
            receiver.close_socket().unwrap_err(),
            GvspError::NoSocket
        ));
        assert!(matches!(
            receiver.start_receive(LOCALHOST).unwrap_err(),
            GvspError::NoSocket
        ));
    }
}
