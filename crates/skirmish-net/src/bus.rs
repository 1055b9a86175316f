//! The replication command bus: invoke a command on an audience of session
//! participants.
//!
//! Delivery is at-least-once and unordered; the bus performs no
//! deduplication. Commands addressed to the local node (the authority
//! invoking `AuthorityOnly`, or `AllIncludingSender`) go through a loopback
//! queue and are handed back by the next [`CommandBus::drain`], so handlers
//! never run re-entrantly inside `invoke`.

use std::collections::VecDeque;

use crate::messages::{Audience, Command, Envelope, NodeId, decode_envelope, encode_envelope};
use crate::transport::Transport;

/// Running totals, for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusStats {
    /// Frames handed to the transport.
    pub frames_sent: u64,
    /// Envelopes queued on the local loopback.
    pub loopback: u64,
    /// Envelopes handed out by `drain`.
    pub delivered: u64,
    /// Frames that failed to decode.
    pub decode_failures: u64,
    /// Frames the transport refused.
    pub send_failures: u64,
}

/// One node's handle on the command bus.
pub struct CommandBus {
    local: NodeId,
    authority: NodeId,
    participants: Vec<NodeId>,
    transport: Box<dyn Transport>,
    loopback: VecDeque<Envelope>,
    stats: BusStats,
}

impl CommandBus {
    /// Create a bus endpoint. `participants` is the fixed session roster and
    /// must include both `local` and `authority`.
    pub fn new(
        local: NodeId,
        authority: NodeId,
        participants: Vec<NodeId>,
        transport: Box<dyn Transport>,
    ) -> Self {
        Self {
            local,
            authority,
            participants,
            transport,
            loopback: VecDeque::new(),
            stats: BusStats::default(),
        }
    }

    /// This node's id.
    pub fn local_node(&self) -> NodeId {
        self.local
    }

    /// The authority's id.
    pub fn authority_node(&self) -> NodeId {
        self.authority
    }

    /// Whether this node holds authority.
    pub fn is_authority(&self) -> bool {
        self.local == self.authority
    }

    /// The session roster.
    pub fn participants(&self) -> &[NodeId] {
        &self.participants
    }

    /// Diagnostics counters.
    pub fn stats(&self) -> BusStats {
        self.stats
    }

    /// Invoke `command` on `audience`. Returns the number of nodes addressed
    /// (the local node counts when it is part of the audience).
    pub fn invoke(&mut self, command: Command, audience: Audience) -> usize {
        let envelope = Envelope {
            sender: self.local,
            audience,
            command,
        };

        let (remote, include_local): (Vec<NodeId>, bool) = match audience {
            Audience::AuthorityOnly if self.is_authority() => (Vec::new(), true),
            Audience::AuthorityOnly => (vec![self.authority], false),
            Audience::AllExceptSender => (self.others(), false),
            Audience::AllIncludingSender => (self.others(), true),
            Audience::Node(node) if node == self.local => (Vec::new(), true),
            Audience::Node(node) => (vec![node], false),
        };

        let mut addressed = 0;
        if !remote.is_empty() {
            match encode_envelope(&envelope) {
                Ok(frame) => {
                    for node in remote {
                        if self.transport.send(node, frame.clone()) {
                            self.stats.frames_sent += 1;
                            addressed += 1;
                        } else {
                            self.stats.send_failures += 1;
                        }
                    }
                }
                Err(err) => {
                    tracing::warn!("Failed to encode {:?}: {}", envelope.command.tag(), err);
                }
            }
        }

        if include_local {
            tracing::trace!("Loopback {:?} on {}", envelope.command.tag(), self.local);
            self.loopback.push_back(envelope);
            self.stats.loopback += 1;
            addressed += 1;
        }

        addressed
    }

    /// Everything received since the last drain: loopback first, then
    /// decoded transport frames. Undecodable frames are logged and skipped.
    pub fn drain(&mut self) -> Vec<Envelope> {
        let mut envelopes: Vec<Envelope> = self.loopback.drain(..).collect();
        for frame in self.transport.receive() {
            match decode_envelope(&frame) {
                Ok(envelope) => envelopes.push(envelope),
                Err(err) => {
                    self.stats.decode_failures += 1;
                    tracing::warn!("{} dropped undecodable frame: {}", self.local, err);
                }
            }
        }
        self.stats.delivered += envelopes.len() as u64;
        envelopes
    }

    fn others(&self) -> Vec<NodeId> {
        self.participants
            .iter()
            .copied()
            .filter(|node| *node != self.local)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{ReportKill, TimeLeft};
    use crate::transport::{LinkFaults, channel_mesh};

    fn buses(count: u32, faults: LinkFaults) -> Vec<CommandBus> {
        let nodes: Vec<NodeId> = (0..count).map(NodeId).collect();
        channel_mesh(&nodes, faults)
            .into_iter()
            .map(|transport| {
                let local = transport.local();
                CommandBus::new(local, NodeId(0), nodes.clone(), Box::new(transport))
            })
            .collect()
    }

    #[test]
    fn test_authority_only_from_observer_reaches_authority_alone() {
        let mut buses = buses(3, LinkFaults::default());
        let addressed = buses[2].invoke(
            Command::ReportKill(ReportKill {
                killer_team: 1,
                report_id: 1,
            }),
            Audience::AuthorityOnly,
        );
        assert_eq!(addressed, 1);
        let received = buses[0].drain();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].sender, NodeId(2));
        assert!(buses[1].drain().is_empty());
        assert!(buses[2].drain().is_empty());
    }

    #[test]
    fn test_authority_only_on_authority_loops_back() {
        let mut buses = buses(2, LinkFaults::default());
        buses[0].invoke(
            Command::ReportKill(ReportKill {
                killer_team: 0,
                report_id: 1,
            }),
            Audience::AuthorityOnly,
        );
        assert_eq!(buses[0].drain().len(), 1);
        assert!(buses[1].drain().is_empty());
        assert_eq!(buses[0].stats().loopback, 1);
    }

    #[test]
    fn test_audience_fan_out() {
        let mut buses = buses(4, LinkFaults::default());
        let cmd = || Command::TimeLeft(TimeLeft { secs: 3 });

        assert_eq!(buses[0].invoke(cmd(), Audience::AllExceptSender), 3);
        assert!(buses[0].drain().is_empty());
        for bus in &mut buses[1..] {
            assert_eq!(bus.drain().len(), 1);
        }

        assert_eq!(buses[0].invoke(cmd(), Audience::AllIncludingSender), 4);
        for bus in &mut buses {
            assert_eq!(bus.drain().len(), 1);
        }

        assert_eq!(buses[0].invoke(cmd(), Audience::Node(NodeId(3))), 1);
        assert!(buses[1].drain().is_empty());
        assert_eq!(buses[3].drain().len(), 1);
    }

    #[test]
    fn test_at_least_once_duplicates_pass_through() {
        let faults = LinkFaults {
            duplicates: 1,
            reverse: false,
        };
        let mut buses = buses(2, faults);
        buses[1].invoke(
            Command::ReportKill(ReportKill {
                killer_team: 0,
                report_id: 1,
            }),
            Audience::AuthorityOnly,
        );
        assert_eq!(buses[0].drain().len(), 2);
    }

    #[test]
    fn test_single_node_session_has_no_remote_audience() {
        let mut buses = buses(1, LinkFaults::default());
        assert_eq!(
            buses[0].invoke(Command::MatchStarted, Audience::AllExceptSender),
            0
        );
        assert!(buses[0].drain().is_empty());
    }
}
