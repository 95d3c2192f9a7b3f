//! # Entity Model
//!
//! The entities a [`crate::block::Block`] stores: junction nodes, gates and
//! nested block instances, plus the port and connection value types that tie
//! them into the connection network.
//!
//! Entities live in flat arenas keyed by `new_key_type!` handles; nothing in
//! the model holds a pointer to anything else. A port knows its own geometry
//! but not what it is connected to; connectivity lives entirely in
//! [`crate::net::ClosedNet`].

use glam::IVec2;
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use std::hash::{DefaultHasher, Hash, Hasher};

use crate::math::Direction;

new_key_type! {
    /// Unique identifier for a junction [`Node`].
    pub struct NodeId;
    /// Unique identifier for a [`Gate`].
    pub struct GateId;
    /// Unique identifier for a [`BlockInst`].
    pub struct BlockInstId;
    /// Unique identifier for a closed net in the connection network.
    pub struct NetId;
}

/// One attachment point on a node, gate or block instance.
///
/// Ports face *outward*: a port hosting a wire points along that wire toward
/// its far endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortInst {
    /// Outward facing direction.
    pub dir: Direction,
    /// Grid position of the attachment cell.
    pub pos: IVec2,
    /// Logic inversion bubble on this pin.
    pub negated: bool,
    /// True if the owning entity drives signal out of this pin. Node ports
    /// never drive; see [`PortType`].
    pub output: bool,
}

impl PortInst {
    /// A plain non-negated, non-driving port.
    pub fn new(dir: Direction, pos: IVec2) -> Self {
        Self {
            dir,
            pos,
            negated: false,
            output: false,
        }
    }
}

/// A wire junction: a 4-port entity anchoring a wire endpoint or bend.
///
/// Nodes are created with exactly one incident connection and deleted on the
/// erase that drops them to zero.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Node {
    /// Grid position; all four ports sit on this cell.
    pub pos: IVec2,
    /// Port slots indexed by [`Direction::index`].
    pub ports: [PortInst; 4],
}

impl Node {
    /// A node at `pos` with its four direction ports.
    pub fn new(pos: IVec2) -> Self {
        Self {
            pos,
            ports: Direction::ALL.map(|dir| PortInst::new(dir, pos)),
        }
    }

    /// The port slot facing `dir`.
    pub fn port(&self, dir: Direction) -> &PortInst {
        &self.ports[dir.index()]
    }
}

/// A logic gate with a variable-length pin list.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Gate {
    /// Top-left corner of the footprint.
    pub pos: IVec2,
    /// Footprint extent in grid cells.
    pub size: IVec2,
    /// Pins, in port-number order.
    pub ports: Vec<PortInst>,
}

/// An instance of another block placed inside this one.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockInst {
    /// Top-left corner of the footprint.
    pub pos: IVec2,
    /// Footprint extent in grid cells.
    pub size: IVec2,
    /// Pins, in port-number order.
    pub ports: Vec<PortInst>,
    /// Name of the block definition this instantiates. Resolution against a
    /// block registry is the host's concern.
    pub definition: String,
}

/// The closed set of entities that can own ports.
///
/// Every site that discriminates must handle all three variants, so that gate
/// and block routing only extend the existing matchers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortObjRef {
    Node(NodeId),
    Gate(GateId),
    BlockInst(BlockInstId),
}

/// A reference to one port: owning entity plus port number.
///
/// For nodes the port number is the [`Direction::index`] of the slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRef {
    pub owner: PortObjRef,
    pub port: usize,
}

impl PortRef {
    pub fn new(owner: PortObjRef, port: usize) -> Self {
        Self { owner, port }
    }

    /// The port of `node` facing `dir`.
    pub fn node(node: NodeId, dir: Direction) -> Self {
        Self {
            owner: PortObjRef::Node(node),
            port: dir.index(),
        }
    }

    /// The owning node and slot direction, if this is a node port.
    pub fn as_node(&self) -> Option<(NodeId, Direction)> {
        match self.owner {
            PortObjRef::Node(node) => Some((node, Direction::from_index(self.port)?)),
            _ => None,
        }
    }
}

/// An unordered axis-aligned edge between two ports.
///
/// Equality and hashing are commutative: `{a, b}` equals `{b, a}` and both
/// hash identically.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Connection {
    pub p1: PortRef,
    pub p2: PortRef,
}

impl Connection {
    pub fn new(p1: PortRef, p2: PortRef) -> Self {
        Self { p1, p2 }
    }

    /// The endpoint opposite `port`, or `None` if `port` is not an endpoint.
    pub fn other(&self, port: PortRef) -> Option<PortRef> {
        if self.p1 == port {
            Some(self.p2)
        } else if self.p2 == port {
            Some(self.p1)
        } else {
            None
        }
    }

    /// True if `port` is one of the two endpoints.
    pub fn touches(&self, port: PortRef) -> bool {
        self.p1 == port || self.p2 == port
    }

    /// The same edge with its endpoints swapped.
    pub fn swapped(&self) -> Self {
        Self {
            p1: self.p2,
            p2: self.p1,
        }
    }
}

impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        (self.p1 == other.p1 && self.p2 == other.p2)
            || (self.p1 == other.p2 && self.p2 == other.p1)
    }
}

impl Eq for Connection {}

impl Hash for Connection {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // endpoint hashes combined commutatively so {a,b} == {b,a} holds
        fn port_hash(port: &PortRef) -> u64 {
            let mut hasher = DefaultHasher::new();
            port.hash(&mut hasher);
            hasher.finish()
        }
        state.write_u64(port_hash(&self.p1).wrapping_add(port_hash(&self.p2)));
    }
}

/// Classification of a connection endpoint for net I/O accounting.
///
/// `Input` marks the endpoint that *drives* a net: a gate or block pin with
/// [`PortInst::output`] set; by convention a gate's output pin is the input of
/// the net it feeds. `Output` marks a consuming pin. Node ports are pure
/// plumbing and count as neither.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortType {
    Input,
    Output,
    NodeInternal,
}
