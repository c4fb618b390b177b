//! Signaling relay to the negotiator.

use log::{debug, warn};

use super::Connection;
use crate::{negotiator::SignalMessage, serializer::Serializer};

impl<T, S> Connection<T, S>
where
    S: Serializer<T>,
{
    /// Forward a signaling message from the remote peer to the negotiator.
    ///
    /// Messages arriving after the negotiator was released, and messages of
    /// unknown kinds, are logged and ignored. A message the negotiator
    /// rejects is fatal.
    pub fn handle_signal(&mut self, message: SignalMessage) {
        let Some(negotiator) = self.negotiator.as_deref_mut() else {
            debug!(
                "signal ignored, negotiation finished: connection_id={}",
                self.config.id()
            );
            return;
        };

        let applied = match message {
            SignalMessage::Answer(description) => negotiator.handle_remote_description(description),
            SignalMessage::Candidate(candidate) => negotiator.handle_remote_candidate(candidate),
            SignalMessage::Other { kind, .. } => {
                warn!(
                    "unrecognized signal message: connection_id={}, kind={kind}",
                    self.config.id()
                );
                return;
            }
        };
        if let Err(err) = applied {
            self.fail(err.into());
        }
    }
}
