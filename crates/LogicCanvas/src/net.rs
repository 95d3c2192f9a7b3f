//! # Closed Nets
//!
//! A [`ClosedNet`] is one connected wiring component. It owns its edges as a
//! pair of mirrored port→port maps, so that from either endpoint of an edge
//! the other endpoint is an O(1) lookup, and tracks which of its endpoints
//! drive or consume signal.
//!
//! Invariants maintained across every public mutation:
//! - the induced graph is connected,
//! - both maps hold exactly `size` entries and mirror each other,
//! - at most one driving endpoint, no duplicate consuming endpoints,
//! - a port appears in at most one entry across the two maps (a port slot
//!   hosts at most one connection).

use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::GraphError;
use crate::math::Direction;
use crate::model::{Connection, NodeId, PortObjRef, PortRef, PortType};

/// One maximal connected subgraph of connections.
#[derive(Clone, Debug, Default)]
pub struct ClosedNet {
    /// Canonical forward copy: one entry per edge.
    con_map: HashMap<PortRef, PortRef>,
    /// Mirror of `con_map` keyed by the opposite endpoint.
    con_map_rev: HashMap<PortRef, PortRef>,
    /// The endpoint driving this net, if any.
    input: Option<PortRef>,
    /// Consuming endpoints.
    outputs: Vec<PortRef>,
    /// Cached edge count; always equals `con_map.len()`.
    size: usize,
}

impl ClosedNet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of edges.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// The driving endpoint, if one has been registered.
    pub fn input(&self) -> Option<PortRef> {
        self.input
    }

    /// The consuming endpoints.
    pub fn outputs(&self) -> &[PortRef] {
        &self.outputs
    }

    /// Inserts the edge `con`, with `types` classifying `(p1, p2)`.
    ///
    /// Preconditions (checked by [`crate::block::Block`], asserted here): the
    /// edge is not already present and neither endpoint hosts another edge.
    /// Fails with `InputConflict`, before mutating, if the edge would add a
    /// second driving endpoint.
    pub fn insert(&mut self, con: Connection, types: (PortType, PortType)) -> Result<(), GraphError> {
        debug_assert!(!self.contains_con(&con));
        debug_assert!(!self.contains_port(&con.p1) && !self.contains_port(&con.p2));
        let incoming = [types.0, types.1]
            .iter()
            .filter(|t| **t == PortType::Input)
            .count();
        if incoming + usize::from(self.input.is_some()) > 1 {
            return Err(GraphError::InputConflict);
        }
        self.con_map.insert(con.p1, con.p2);
        self.con_map_rev.insert(con.p2, con.p1);
        self.size += 1;
        self.register_endpoint(con.p1, types.0);
        self.register_endpoint(con.p2, types.1);
        Ok(())
    }

    fn register_endpoint(&mut self, port: PortRef, port_type: PortType) {
        match port_type {
            PortType::Input => {
                debug_assert!(self.input.is_none());
                self.input = Some(port);
            }
            PortType::Output => {
                debug_assert!(!self.outputs.contains(&port));
                self.outputs.push(port);
            }
            PortType::NodeInternal => {}
        }
    }

    /// Removes the edge `con`, failing with `NotInNet` if it is absent.
    ///
    /// Both endpoints leave the net entirely (a port hosts at most one edge),
    /// so any I/O registration they held is dropped as well.
    pub fn erase(&mut self, con: &Connection) -> Result<(), GraphError> {
        if self.con_map.get(&con.p1) == Some(&con.p2) {
            self.con_map.remove(&con.p1);
            self.con_map_rev.remove(&con.p2);
        } else if self.con_map.get(&con.p2) == Some(&con.p1) {
            self.con_map.remove(&con.p2);
            self.con_map_rev.remove(&con.p1);
        } else {
            return Err(GraphError::NotInNet);
        }
        self.size -= 1;
        for port in [con.p1, con.p2] {
            if self.input == Some(port) {
                self.input = None;
            }
            self.outputs.retain(|p| *p != port);
        }
        Ok(())
    }

    /// True if `port` is an endpoint of some edge in this net.
    pub fn contains_port(&self, port: &PortRef) -> bool {
        self.con_map.contains_key(port) || self.con_map_rev.contains_key(port)
    }

    /// True if the edge `con` is in this net.
    pub fn contains_con(&self, con: &Connection) -> bool {
        self.con_map.get(&con.p1) == Some(&con.p2) || self.con_map.get(&con.p2) == Some(&con.p1)
    }

    /// True if any of the four port slots of `node` is in this net.
    pub fn contains_node(&self, node: NodeId) -> bool {
        Direction::ALL
            .iter()
            .any(|dir| self.contains_port(&PortRef::node(node, *dir)))
    }

    /// The unique edge incident to `port`.
    pub fn get_con(&self, port: &PortRef) -> Result<Connection, GraphError> {
        if let Some(other) = self.con_map.get(port) {
            Ok(Connection::new(*port, *other))
        } else if let Some(other) = self.con_map_rev.get(port) {
            Ok(Connection::new(*port, *other))
        } else {
            Err(GraphError::NotInNet)
        }
    }

    /// Iterates every edge exactly once, in forward-map order.
    pub fn iter(&self) -> impl Iterator<Item = Connection> + '_ {
        self.con_map
            .iter()
            .map(|(p1, p2)| Connection::new(*p1, *p2))
    }

    /// Iterates every port that is an endpoint of some edge.
    pub fn ports(&self) -> impl Iterator<Item = PortRef> + '_ {
        self.con_map
            .keys()
            .chain(self.con_map_rev.keys())
            .copied()
    }

    /// True if `b` is reachable from `a` through edges and node-internal
    /// port transitions.
    pub fn is_connected(&self, a: PortRef, b: PortRef) -> bool {
        if a == b {
            return true;
        }
        let mut seen = HashSet::new();
        let mut frontier = VecDeque::new();
        seen.insert(a);
        frontier.push_back(a);
        while let Some(port) = frontier.pop_front() {
            for next in self.neighbors(port) {
                if next == b {
                    return true;
                }
                if seen.insert(next) {
                    frontier.push_back(next);
                }
            }
        }
        false
    }

    /// Ports one step away from `port`: the far end of its edge, if it hosts
    /// one, and the occupied sibling slots of its owning node, if any. Gate
    /// and block pins do not conduct through their owner.
    fn neighbors(&self, port: PortRef) -> Vec<PortRef> {
        let mut out = Vec::with_capacity(4);
        if let Some(other) = self
            .con_map
            .get(&port)
            .or_else(|| self.con_map_rev.get(&port))
        {
            out.push(*other);
        }
        if let PortObjRef::Node(node) = port.owner {
            for dir in Direction::ALL {
                let sibling = PortRef::node(node, dir);
                if sibling != port && self.contains_port(&sibling) {
                    out.push(sibling);
                }
            }
        }
        out
    }

    /// Every port in the connected component of `seed`, including `seed`
    /// itself even when it hosts no edge.
    fn component_ports(&self, seed: PortRef) -> HashSet<PortRef> {
        let mut seen = HashSet::new();
        let mut frontier = VecDeque::new();
        seen.insert(seed);
        frontier.push_back(seed);
        while let Some(port) = frontier.pop_front() {
            for next in self.neighbors(port) {
                if seen.insert(next) {
                    frontier.push_back(next);
                }
            }
        }
        seen
    }

    /// Moves the connected component of `seed` out of this net and returns it.
    ///
    /// Edges reachable from `seed`, through node-internal transitions as in
    /// [`ClosedNet::is_connected`], leave this net, together with any I/O
    /// endpoints among the moved ports. If the net was still connected from
    /// `seed`, the returned net holds everything and this one ends up empty;
    /// the caller decides which husk to discard.
    pub fn split_net(&mut self, seed: PortRef) -> ClosedNet {
        let component = self.component_ports(seed);
        let moved: Vec<(PortRef, PortRef)> = self
            .con_map
            .iter()
            .filter(|(p1, _)| component.contains(p1))
            .map(|(p1, p2)| (*p1, *p2))
            .collect();
        let mut split = ClosedNet::new();
        for (p1, p2) in moved {
            self.con_map.remove(&p1);
            self.con_map_rev.remove(&p2);
            self.size -= 1;
            split.con_map.insert(p1, p2);
            split.con_map_rev.insert(p2, p1);
            split.size += 1;
        }
        if let Some(input) = self.input
            && component.contains(&input)
        {
            split.input = self.input.take();
        }
        let (moved_outputs, kept): (Vec<_>, Vec<_>) = self
            .outputs
            .drain(..)
            .partition(|port| component.contains(port));
        self.outputs = kept;
        split.outputs = moved_outputs;
        tracing::debug!(
            moved = split.size,
            remaining = self.size,
            "split component out of net"
        );
        split
    }

    /// Drains `other` into this net.
    ///
    /// Fails with `InputConflict`, before mutating, if both nets have a
    /// driving endpoint.
    pub fn absorb(&mut self, other: ClosedNet) -> Result<(), GraphError> {
        if self.input.is_some() && other.input.is_some() {
            return Err(GraphError::InputConflict);
        }
        self.con_map.extend(other.con_map);
        self.con_map_rev.extend(other.con_map_rev);
        self.size += other.size;
        self.input = self.input.or(other.input);
        self.outputs.extend(other.outputs);
        Ok(())
    }
}
