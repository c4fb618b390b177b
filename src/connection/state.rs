//! Connection lifecycle state.

/// Externally visible connection state.
///
/// `Connecting → Open → Closed`; `Closed` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// Waiting for negotiation or for the transport to open.
    Connecting,
    /// Application data may be sent.
    Open,
    /// Terminal state.
    Closed,
}

/// Tracks the lifecycle and whether the connection ever opened.
#[derive(Debug)]
pub(super) struct Lifecycle {
    state: ConnectionState,
    ever_opened: bool,
}

impl Lifecycle {
    pub(super) fn new() -> Self {
        Self {
            state: ConnectionState::Connecting,
            ever_opened: false,
        }
    }

    pub(super) fn state(&self) -> ConnectionState { self.state }

    pub(super) fn is_open(&self) -> bool { self.state == ConnectionState::Open }

    pub(super) fn is_closed(&self) -> bool { self.state == ConnectionState::Closed }

    /// Move to `Open`. Returns `false` unless the connection was connecting.
    pub(super) fn open(&mut self) -> bool {
        if self.state != ConnectionState::Connecting {
            return false;
        }
        self.state = ConnectionState::Open;
        self.ever_opened = true;
        true
    }

    /// Move to `Closed`.
    ///
    /// Returns `None` if already closed, otherwise whether the connection had
    /// ever been open.
    pub(super) fn close(&mut self) -> Option<bool> {
        if self.is_closed() {
            return None;
        }
        self.state = ConnectionState::Closed;
        Some(self.ever_opened)
    }
}
