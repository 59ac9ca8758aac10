use thiserror::Error;

/// Main error type for ComfoConnect operations
#[derive(Error, Debug)]
pub enum ComfoError {
    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),

    #[error("Bridge is not reachable: {0}")]
    NotReachable(String),

    #[error("App is not registered with the bridge and no pin was provided")]
    NotRegistered,

    #[error("Bridge rejected the registration pin")]
    BadPin,

    #[error("Session is already connected")]
    AlreadyConnected,

    #[error("Session is not open")]
    NotOpen,

    #[error("Timeout while waiting for the bridge")]
    Timeout,

    #[error("Session closed")]
    SessionClosed,

    #[error("Peer closed the connection")]
    PeerClosed,

    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("RMI request failed with status 0x{0:02X}")]
    Rmi(u8),

    #[error("PDO subscription refused with status {0}")]
    Refused(u8),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("No usable network interfaces for discovery")]
    NoInterfaces,

    // Errors reported by the bridge in the envelope result field.
    #[error("Bridge rejected the request as malformed")]
    BadRequest,

    #[error("Bridge failed internally while handling the request")]
    InternalError,

    #[error("Bridge could not route the request to the unit")]
    UnitNotReachable,

    #[error("Another session is already active on the bridge")]
    OtherSession,

    #[error("Bridge did not allow the request")]
    NotAllowed,

    #[error("Bridge has no resources to handle the request")]
    NoResources,

    #[error("Addressed node or property does not exist")]
    NotExist,
}

/// Result type alias for ComfoConnect operations
pub type ComfoResult<T> = Result<T, ComfoError>;
