//! Frame transport between session participants.
//!
//! The core assumes at-least-once delivery with no ordering guarantee. The
//! [`ChannelTransport`] mesh connects nodes living in one process over
//! [`tokio::sync::mpsc`] channels; [`LinkFaults`] can duplicate frames and
//! reverse drain order to exercise handlers against that contract.

use std::collections::HashMap;

use tokio::sync::mpsc;

use crate::messages::NodeId;

/// An encoded envelope.
pub type Frame = Vec<u8>;

/// Moves encoded frames between nodes.
pub trait Transport: Send {
    /// Queue a frame for delivery to `to`. Returns `false` if the peer is
    /// unknown or gone.
    fn send(&mut self, to: NodeId, frame: Frame) -> bool;

    /// Drain every frame received since the last call.
    fn receive(&mut self) -> Vec<Frame>;
}

/// Fault injection applied by a [`ChannelTransport`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkFaults {
    /// Extra copies of every frame sent (0 = exactly once).
    pub duplicates: u32,
    /// Deliver each drained batch in reverse order.
    pub reverse: bool,
}

/// One node's endpoint of an in-process channel mesh.
pub struct ChannelTransport {
    local: NodeId,
    peers: HashMap<NodeId, mpsc::UnboundedSender<Frame>>,
    inbox: mpsc::UnboundedReceiver<Frame>,
    faults: LinkFaults,
}

impl ChannelTransport {
    /// The node this endpoint belongs to.
    pub fn local(&self) -> NodeId {
        self.local
    }

    /// Replace the fault profile on outgoing and incoming frames.
    pub fn set_faults(&mut self, faults: LinkFaults) {
        self.faults = faults;
    }
}

impl Transport for ChannelTransport {
    fn send(&mut self, to: NodeId, frame: Frame) -> bool {
        let Some(peer) = self.peers.get(&to) else {
            tracing::debug!("{} has no link to {}, dropping frame", self.local, to);
            return false;
        };
        for _ in 0..self.faults.duplicates {
            if peer.send(frame.clone()).is_err() {
                return false;
            }
        }
        peer.send(frame).is_ok()
    }

    fn receive(&mut self) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.inbox.try_recv() {
            frames.push(frame);
        }
        if self.faults.reverse {
            frames.reverse();
        }
        frames
    }
}

/// Build a fully connected mesh. Endpoints are returned in `nodes` order.
pub fn channel_mesh(nodes: &[NodeId], faults: LinkFaults) -> Vec<ChannelTransport> {
    let mut senders = HashMap::new();
    let mut receivers = Vec::with_capacity(nodes.len());
    for &node in nodes {
        let (tx, rx) = mpsc::unbounded_channel();
        senders.insert(node, tx);
        receivers.push((node, rx));
    }

    receivers
        .into_iter()
        .map(|(local, inbox)| ChannelTransport {
            local,
            peers: senders
                .iter()
                .filter(|(node, _)| **node != local)
                .map(|(node, tx)| (*node, tx.clone()))
                .collect(),
            inbox,
            faults,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mesh_delivers_between_peers() {
        let nodes = [NodeId(0), NodeId(1), NodeId(2)];
        let mut mesh = channel_mesh(&nodes, LinkFaults::default());
        assert!(mesh[0].send(NodeId(2), vec![1, 2, 3]));
        assert!(mesh[1].send(NodeId(2), vec![4]));
        assert_eq!(mesh[2].receive(), vec![vec![1, 2, 3], vec![4]]);
        assert!(mesh[0].receive().is_empty());
    }

    #[test]
    fn test_no_self_link() {
        let mut mesh = channel_mesh(&[NodeId(0), NodeId(1)], LinkFaults::default());
        assert!(!mesh[0].send(NodeId(0), vec![9]));
        assert!(!mesh[0].send(NodeId(7), vec![9]));
    }

    #[test]
    fn test_faults_duplicate_and_reverse() {
        let faults = LinkFaults {
            duplicates: 2,
            reverse: true,
        };
        let mut mesh = channel_mesh(&[NodeId(0), NodeId(1)], faults);
        mesh[0].send(NodeId(1), vec![1]);
        mesh[0].send(NodeId(1), vec![2]);
        let frames = mesh[1].receive();
        assert_eq!(frames.len(), 6);
        assert_eq!(frames.first(), Some(&vec![2]));
        assert_eq!(frames.last(), Some(&vec![1]));
    }

    #[tokio::test]
    async fn test_mesh_endpoints_move_across_tasks() {
        let mut mesh = channel_mesh(&[NodeId(0), NodeId(1)], LinkFaults::default());
        let mut receiver = mesh.pop().unwrap();
        let mut sender = mesh.pop().unwrap();
        tokio::spawn(async move {
            sender.send(NodeId(1), vec![42]);
        })
        .await
        .unwrap();
        assert_eq!(receiver.local(), NodeId(1));
        assert_eq!(receiver.receive(), vec![vec![42]]);
    }
}
