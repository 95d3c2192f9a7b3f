//! # Connection Network
//!
//! The collection of [`ClosedNet`]s in a block. The network keeps the nets
//! disjoint: inserting an edge either starts a fresh net, extends the one net
//! an endpoint already belongs to, closes a loop inside a single net, or
//! merges two nets into one.

use crate::error::GraphError;
use crate::math::Direction;
use crate::model::{Connection, NetId, NodeId, PortObjRef, PortRef, PortType};
use crate::net::ClosedNet;
use crate::store::{PepperedStore, StableStore};

/// All closed nets of one block, stored behind stable handles.
#[derive(Debug, Default)]
pub struct ConnectionNetwork {
    nets: PepperedStore<NetId, ClosedNet>,
}

impl ConnectionNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nets.
    pub fn len(&self) -> usize {
        self.nets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nets.is_empty()
    }

    /// Iterates `(handle, &net)` pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (NetId, &ClosedNet)> {
        self.nets.iter()
    }

    pub fn get(&self, net: NetId) -> Result<&ClosedNet, GraphError> {
        self.nets.get(net)
    }

    pub fn get_mut(&mut self, net: NetId) -> Result<&mut ClosedNet, GraphError> {
        self.nets.get_mut(net)
    }

    /// Registers a net produced by a split.
    pub fn register(&mut self, net: ClosedNet) -> NetId {
        self.nets.insert(net)
    }

    /// Drops a net entry; the net must already be drained or about to be
    /// discarded wholesale.
    pub fn remove(&mut self, net: NetId) -> Result<ClosedNet, GraphError> {
        self.nets.erase(net)
    }

    /// Inserts `con` given the nets its endpoints already belong to.
    ///
    /// `net1` / `net2` are the nets containing `con.p1` / `con.p2` (through
    /// their owning node, for node ports); pass `None` for endpoints not on
    /// any wiring yet. Callers that cached the handles avoid the O(nets ×
    /// edges) scans of [`ConnectionNetwork::net_of_port`]. Returns the handle
    /// of the net that ended up holding `con`.
    pub fn insert(
        &mut self,
        con: Connection,
        net1: Option<NetId>,
        net2: Option<NetId>,
        types: (PortType, PortType),
    ) -> Result<NetId, GraphError> {
        match (net1, net2) {
            (None, None) => {
                let mut net = ClosedNet::new();
                net.insert(con, types)?;
                let id = self.nets.insert(net);
                tracing::debug!(net = ?id, "opened fresh net");
                Ok(id)
            }
            (Some(id), None) | (None, Some(id)) => {
                self.nets.get_mut(id)?.insert(con, types)?;
                Ok(id)
            }
            (Some(id1), Some(id2)) if id1 == id2 => {
                // both endpoints already share a net: the edge closes a loop
                self.nets.get_mut(id1)?.insert(con, types)?;
                Ok(id1)
            }
            (Some(id1), Some(id2)) => {
                let (keep, drain) = if self.nets.get(id1)?.size() >= self.nets.get(id2)?.size() {
                    (id1, id2)
                } else {
                    (id2, id1)
                };
                // refuse up front so a conflict cannot leave a half-merged pair
                let driven = usize::from(self.nets.get(keep)?.input().is_some())
                    + usize::from(self.nets.get(drain)?.input().is_some())
                    + [types.0, types.1]
                        .iter()
                        .filter(|t| **t == PortType::Input)
                        .count();
                if driven > 1 {
                    return Err(GraphError::InputConflict);
                }
                let drained = self.nets.erase(drain)?;
                let survivor = self.nets.get_mut(keep)?;
                survivor.absorb(drained)?;
                survivor.insert(con, types)?;
                tracing::debug!(keep = ?keep, drained = ?drain, "merged nets");
                Ok(keep)
            }
        }
    }

    /// The net containing `port`, by scanning every net.
    pub fn net_of_port(&self, port: &PortRef) -> Option<NetId> {
        self.nets
            .iter()
            .find(|(_, net)| net.contains_port(port))
            .map(|(id, _)| id)
    }

    /// The net containing the edge `con`.
    pub fn net_of_con(&self, con: &Connection) -> Option<NetId> {
        self.nets
            .iter()
            .find(|(_, net)| net.contains_con(con))
            .map(|(id, _)| id)
    }

    /// The net touching any of the four port slots of `node`.
    pub fn net_of_node(&self, node: NodeId) -> Option<NetId> {
        self.nets
            .iter()
            .find(|(_, net)| net.contains_node(node))
            .map(|(id, _)| id)
    }

    /// The net containing `port`, probing the whole owning node for node
    /// ports: an edge attached to any slot of the node connects them all.
    pub fn net_of_endpoint(&self, port: &PortRef) -> Option<NetId> {
        match port.owner {
            PortObjRef::Node(node) => self.net_of_node(node),
            PortObjRef::Gate(_) | PortObjRef::BlockInst(_) => self.net_of_port(port),
        }
    }

    /// How many of the four port slots of `node` host a connection.
    pub fn node_con_count(&self, node: NodeId) -> usize {
        let Some(net) = self.net_of_node(node).and_then(|id| self.nets.get(id).ok()) else {
            return 0;
        };
        Direction::ALL
            .iter()
            .filter(|dir| net.contains_port(&PortRef::node(node, **dir)))
            .count()
    }
}
