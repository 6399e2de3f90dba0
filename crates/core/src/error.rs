//! Error types for the GVSP receiver library.

/// Errors that can occur in the GVSP receiver library.
///
/// Variants map to specific failure modes across the stack:
///
/// - **Transport**: [`Io`](Self::Io) — socket creation, bind, permission,
///   or send failures.
/// - **Connection state**: [`NoSocket`](Self::NoSocket),
///   [`ReceiveActive`](Self::ReceiveActive),
///   [`ReceiveInactive`](Self::ReceiveInactive).
/// - **Buffer state**: [`BufferExists`](Self::BufferExists),
///   [`NoBuffer`](Self::NoBuffer).
/// - **Configuration**: [`PacketSizeTooSmall`](Self::PacketSizeTooSmall),
///   [`PayloadSizeInvalid`](Self::PayloadSizeInvalid).
///
/// Malformed, unsupported, or out-of-sequence packets never surface here —
/// they are absorbed by the receive loop and reported as warnings.
#[derive(Debug, thiserror::Error)]
pub enum GvspError {
    /// Underlying I/O or socket error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The socket has been closed; the receiver can no longer be used.
    #[error("socket has been closed")]
    NoSocket,

    /// The receive loop is running; the operation requires it stopped first.
    #[error("receiving of incoming packets is active")]
    ReceiveActive,

    /// [`Receiver::stop_receive`](crate::Receiver::stop_receive) was called
    /// while no receive loop is running.
    #[error("receiving of incoming packets has already been stopped")]
    ReceiveInactive,

    /// A reassembly buffer already exists; free it before creating another.
    #[error("reassembly buffer already exists")]
    BufferExists,

    /// No reassembly buffer; call
    /// [`Receiver::create_buffer`](crate::Receiver::create_buffer) first.
    #[error("reassembly buffer does not exist")]
    NoBuffer,

    /// The packet size leaves no payload once the 36 bytes of combined
    /// IP + UDP + GVSP header overhead are subtracted.
    #[error("packet size {0} leaves no payload after 36 bytes of headers")]
    PacketSizeTooSmall(usize),

    /// The payload size is not a positive multiple of the per-packet payload.
    #[error(
        "payload size {payload_size} is not a positive multiple of the \
         {packet_payload_size}-byte packet payload"
    )]
    PayloadSizeInvalid {
        payload_size: usize,
        packet_payload_size: usize,
    },
}

/// Convenience alias for `Result<T, GvspError>`.
pub type Result<T> = std::result::Result<T, GvspError>;
