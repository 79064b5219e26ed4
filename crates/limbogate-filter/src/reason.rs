/// Why a connection was refused. Doubles as the category key for
/// blocked-counter attribution and attack-method labelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockReason {
    UnsupportedVersion,
    InvalidHost,
    Country,
    Proxy,
    AlreadyOnline,
    InvalidName,
    NameSimilarity,
    InvalidMovement,
    Timer,
    KeepAliveTimeout,
    PacketLimit,
    ChatDisabled,
    ProtocolViolation,
}

impl BlockReason {
    pub const ALL: &'static [BlockReason] = &[
        BlockReason::UnsupportedVersion,
        BlockReason::InvalidHost,
        BlockReason::Country,
        BlockReason::Proxy,
        BlockReason::AlreadyOnline,
        BlockReason::InvalidName,
        BlockReason::NameSimilarity,
        BlockReason::InvalidMovement,
        BlockReason::Timer,
        BlockReason::KeepAliveTimeout,
        BlockReason::PacketLimit,
        BlockReason::ChatDisabled,
        BlockReason::ProtocolViolation,
    ];

    pub const COUNT: usize = Self::ALL.len();

    /// Stable index into per-reason counter arrays.
    pub fn index(self) -> usize {
        Self::ALL.iter().position(|r| *r == self).unwrap_or(0)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BlockReason::UnsupportedVersion => "unsupported-version",
            BlockReason::InvalidHost => "invalid-host",
            BlockReason::Country => "country",
            BlockReason::Proxy => "proxy",
            BlockReason::AlreadyOnline => "already-online",
            BlockReason::InvalidName => "invalid-name",
            BlockReason::NameSimilarity => "name-similarity",
            BlockReason::InvalidMovement => "invalid-movement",
            BlockReason::Timer => "timer",
            BlockReason::KeepAliveTimeout => "keepalive-timeout",
            BlockReason::PacketLimit => "packet-limit",
            BlockReason::ChatDisabled => "chat-disabled",
            BlockReason::ProtocolViolation => "protocol-violation",
        }
    }
}
