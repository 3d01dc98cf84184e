//! Error taxonomy shared by the codec, the filter, and the server.
//!
//! Five families: parse, encode, server, upstream, blocklist. Cache codes are
//! reserved for a future answer cache and are never raised. Causes that only
//! matter for diagnostics (io errors, file names) are logged at the failure
//! site rather than carried in the variant.

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DnsError {
    // Parse errors: the datagram is logged and dropped, no response is sent.
    #[error("packet shorter than the 12-byte header")]
    ParseTooShort,
    #[error("unsupported opcode")]
    ParseBadOpcode,
    #[error("bad label length octet")]
    ParseBadLabel,
    #[error("decoded name exceeds 255 bytes")]
    ParseNameTooLong,
    #[error("compression pointer loop")]
    ParsePtrLoop,
    #[error("compression pointer out of bounds")]
    ParsePtrOob,
    #[error("packet truncated mid-field")]
    ParseTruncated,
    #[error("unrecognised qtype")]
    ParseBadQtype,
    #[error("unrecognised qclass")]
    ParseBadQclass,
    #[error("qdcount not exactly one")]
    ParseBadQdcount,

    // Encode errors: the synthetic response is unsendable, log and drop.
    #[error("encode: name exceeds 255 bytes")]
    EncodeNameTooLong,
    #[error("encode: label empty or longer than 63 bytes")]
    EncodeLabelTooLong,
    #[error("encode: packet exceeds max UDP payload")]
    EncodeOverflow,

    // Server errors: fatal at init, logged and survivable inside the loop.
    #[error("socket creation failed")]
    ServerSocketFail,
    #[error("bind failed")]
    ServerBindFail,
    #[error("recvfrom failed")]
    ServerRecvFail,
    #[error("sendto failed")]
    ServerSendFail,
    #[error("server not running")]
    ServerNotRunning,
    #[error("invalid IP address")]
    InvalidIp,

    // Upstream errors: logged, the client retries on its own schedule.
    #[error("upstream timed out")]
    UpstreamTimeout,
    #[error("upstream unreachable")]
    UpstreamUnreachable,

    // Cache errors, reserved.
    #[error("cache miss")]
    CacheMiss,
    #[error("cache entry expired")]
    CacheExpired,
    #[error("cache full")]
    CacheFull,

    // Blocklist errors: non-fatal at startup.
    #[error("blocklist file not found")]
    BlocklistFileNotFound,
    #[error("malformed blocklist line")]
    BlocklistParseError,
    #[error("blocklist is empty")]
    BlocklistEmpty,

    #[error("unknown error")]
    Unknown,
}
