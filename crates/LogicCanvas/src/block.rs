//! # Block
//!
//! A [`Block`] owns the entity arenas and the connection network of one
//! schematic, and exposes the mutation API the editor drives: spatial
//! classification, endpoint materialization, connection insert/split/overlap/
//! erase. Every public mutation leaves the net invariants intact; compound
//! operations refuse before touching anything wherever a refusal is possible.

use glam::{IVec2, Vec2};

use crate::error::GraphError;
use crate::math::{self, DirSet, Direction};
use crate::model::{
    BlockInst, BlockInstId, Connection, Gate, GateId, NetId, Node, NodeId, PortInst, PortObjRef,
    PortRef, PortType,
};
use crate::network::ConnectionNetwork;
use crate::store::{PepperedStore, StableStore};

/// Classification of one grid cell, as reported by [`Block::what_is_at`].
///
/// Exactly one variant applies to any cell. `ConCross` is a cell where two
/// unrelated wires cross without a node: visually an "x", electrically
/// nothing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ObjAtCoord {
    #[default]
    Empty,
    Con(Connection),
    ConCross(Connection, Connection),
    Port(PortRef),
    Node(NodeId),
    Gate(GateId),
    BlockInst(BlockInstId),
}

impl ObjAtCoord {
    /// True for classifications a connection endpoint can be built on.
    pub fn is_connectable(&self) -> bool {
        matches!(
            self,
            ObjAtCoord::Empty | ObjAtCoord::Con(_) | ObjAtCoord::Port(_) | ObjAtCoord::Node(_)
        )
    }
}

/// What one end of a proposed connection resolves to, computed without
/// touching the graph; see [`Block::resolve_end`].
struct ResolvedEnd {
    /// Facing direction of the port the endpoint would use.
    dir: Direction,
    /// I/O classification of that port.
    port_type: PortType,
    /// Net the finished endpoint would belong to, through its owning node.
    net: Option<NetId>,
}

/// One schematic: entity arenas, the connection network, and metadata.
pub struct Block {
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Grid dimension; valid cells are `[0, size)²`.
    pub size: i32,

    nodes: PepperedStore<NodeId, Node>,
    gates: PepperedStore<GateId, Gate>,
    block_instances: PepperedStore<BlockInstId, BlockInst>,
    net: ConnectionNetwork,
}

impl Block {
    pub fn new(name: impl Into<String>, size: i32) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            size,
            nodes: PepperedStore::default(),
            gates: PepperedStore::default(),
            block_instances: PepperedStore::default(),
            net: ConnectionNetwork::new(),
        }
    }

    /// The junction node arena.
    pub fn nodes(&self) -> &PepperedStore<NodeId, Node> {
        &self.nodes
    }

    /// The gate arena.
    pub fn gates(&self) -> &PepperedStore<GateId, Gate> {
        &self.gates
    }

    /// The block-instance arena.
    pub fn block_instances(&self) -> &PepperedStore<BlockInstId, BlockInst> {
        &self.block_instances
    }

    /// The connection network.
    pub fn nets(&self) -> &ConnectionNetwork {
        &self.net
    }

    /// Rounds a world coordinate to the nearest grid cell, clamped to the
    /// block bounds.
    pub fn snap_to_grid(&self, world: Vec2) -> IVec2 {
        IVec2::new(
            (world.x.round() as i32).clamp(0, self.size - 1),
            (world.y.round() as i32).clamp(0, self.size - 1),
        )
    }

    /// Resolves a port reference to its instance, across all three owner
    /// kinds.
    pub fn get_port(&self, port: &PortRef) -> Result<&PortInst, GraphError> {
        match port.owner {
            PortObjRef::Node(node) => self
                .nodes
                .get(node)?
                .ports
                .get(port.port)
                .ok_or(GraphError::InvalidHandle),
            PortObjRef::Gate(gate) => self
                .gates
                .get(gate)?
                .ports
                .get(port.port)
                .ok_or(GraphError::InvalidHandle),
            PortObjRef::BlockInst(inst) => self
                .block_instances
                .get(inst)?
                .ports
                .get(port.port)
                .ok_or(GraphError::InvalidHandle),
        }
    }

    /// How a connection endpoint on `port` counts toward net I/O.
    pub fn port_type(&self, port: &PortRef) -> Result<PortType, GraphError> {
        match port.owner {
            PortObjRef::Node(_) => Ok(PortType::NodeInternal),
            PortObjRef::Gate(_) | PortObjRef::BlockInst(_) => {
                // a driving pin is the input of the net it feeds
                let inst = self.get_port(port)?;
                Ok(if inst.output {
                    PortType::Input
                } else {
                    PortType::Output
                })
            }
        }
    }

    fn con_types(&self, con: &Connection) -> Result<(PortType, PortType), GraphError> {
        Ok((self.port_type(&con.p1)?, self.port_type(&con.p2)?))
    }

    /// Which of the four port slots of `node` host a connection.
    pub fn occupied_dirs(&self, node: NodeId) -> DirSet {
        let mut set = DirSet::empty();
        let Some(net) = self.net.net_of_node(node).and_then(|id| self.net.get(id).ok()) else {
            return set;
        };
        for dir in Direction::ALL {
            if net.contains_port(&PortRef::node(node, dir)) {
                set |= dir.into();
            }
        }
        set
    }

    /// False for nodes that render as bare wire: exactly two incident
    /// connections passing straight through.
    pub fn node_is_visible(&self, node: NodeId) -> bool {
        let occupied = self.occupied_dirs(node);
        if occupied.bits().count_ones() != 2 {
            return true;
        }
        !(occupied == (DirSet::UP | DirSet::DOWN) || occupied == (DirSet::LEFT | DirSet::RIGHT))
    }

    /// Classifies the grid cell at `coord`.
    ///
    /// Nodes win over everything; gate and block pins report as `Port`; then
    /// wires (one hit is a `Con`, two a `ConCross`); then gate and block
    /// footprints. More than two wires through a cell without a node cannot
    /// happen on an axis-aligned grid and is reported as corruption.
    pub fn what_is_at(&self, coord: IVec2) -> Result<ObjAtCoord, GraphError> {
        for (id, node) in self.nodes.iter() {
            if node.pos == coord {
                return Ok(ObjAtCoord::Node(id));
            }
        }
        for (id, gate) in self.gates.iter() {
            for (num, port) in gate.ports.iter().enumerate() {
                if port.pos == coord {
                    return Ok(ObjAtCoord::Port(PortRef::new(PortObjRef::Gate(id), num)));
                }
            }
        }
        for (id, inst) in self.block_instances.iter() {
            for (num, port) in inst.ports.iter().enumerate() {
                if port.pos == coord {
                    return Ok(ObjAtCoord::Port(PortRef::new(
                        PortObjRef::BlockInst(id),
                        num,
                    )));
                }
            }
        }
        let mut hits: Vec<Connection> = Vec::new();
        for (_, net) in self.net.iter() {
            for con in net.iter() {
                let pos1 = self.get_port(&con.p1)?.pos;
                let pos2 = self.get_port(&con.p2)?.pos;
                if math::is_between(coord, pos1, pos2) {
                    hits.push(con);
                }
            }
        }
        match hits.len() {
            0 => {}
            1 => return Ok(ObjAtCoord::Con(hits[0])),
            2 => return Ok(ObjAtCoord::ConCross(hits[0], hits[1])),
            _ => return Err(GraphError::GraphInvariantViolation),
        }
        for (id, gate) in self.gates.iter() {
            if rect_contains(gate.pos, gate.size, coord) {
                return Ok(ObjAtCoord::Gate(id));
            }
        }
        for (id, inst) in self.block_instances.iter() {
            if rect_contains(inst.pos, inst.size, coord) {
                return Ok(ObjAtCoord::BlockInst(id));
            }
        }
        Ok(ObjAtCoord::Empty)
    }

    /// Produces a port at `pos` suitable as one end of a new connection,
    /// where `toward` is the outward direction from `pos` along that
    /// connection.
    ///
    /// Builds a node on empty cells, splits an existing wire under the cell,
    /// returns gate/block pins unchanged, and on an existing node either
    /// hands out the free slot facing `toward`. When the node carries exactly
    /// one connection leaving through the opposite slot, it instead dissolves
    /// the node and hands back the far end of that connection, so straight
    /// runs never accumulate junctions.
    pub fn make_port_ref(&mut self, pos: IVec2, toward: Direction) -> Result<PortRef, GraphError> {
        match self.what_is_at(pos)? {
            ObjAtCoord::Empty => {
                let node = self.nodes.insert(Node::new(pos));
                tracing::debug!(node = ?node, pos = ?pos, "created node");
                Ok(PortRef::node(node, toward))
            }
            ObjAtCoord::Con(con) => {
                let node = self.nodes.insert(Node::new(pos));
                tracing::debug!(node = ?node, pos = ?pos, "created node on wire");
                self.split_con(con, node)?;
                Ok(PortRef::node(node, toward))
            }
            ObjAtCoord::Port(port) => {
                if self.net.net_of_port(&port).is_some() {
                    return Err(GraphError::PortOccupied);
                }
                Ok(port)
            }
            ObjAtCoord::Node(node) => {
                let hosting = PortRef::node(node, toward);
                if self.net.net_of_port(&hosting).is_some() {
                    return Err(GraphError::PortOccupied);
                }
                let opposite = PortRef::node(node, toward.reverse());
                if self.net.node_con_count(node) == 1
                    && let Some(net_id) = self.net.net_of_port(&opposite)
                {
                    // sole connection continues straight through: the node is
                    // redundant in the to-be-built geometry
                    let far = {
                        let net = self.net.get_mut(net_id)?;
                        let redundant = net.get_con(&opposite)?;
                        net.erase(&redundant)?;
                        redundant
                            .other(opposite)
                            .ok_or(GraphError::GraphInvariantViolation)?
                    };
                    if self.net.get(net_id)?.is_empty() {
                        self.net.remove(net_id)?;
                    }
                    self.nodes.erase(node)?;
                    tracing::debug!(node = ?node, pos = ?pos, "collapsed redundant node");
                    return Ok(far);
                }
                Ok(hosting)
            }
            ObjAtCoord::ConCross(..) | ObjAtCoord::Gate(_) | ObjAtCoord::BlockInst(_) => {
                Err(GraphError::IllegalTarget)
            }
        }
    }

    /// Replaces `con` with two half-segments meeting at `node`, inside the
    /// net that held `con`. The net gains one edge.
    ///
    /// `node` must sit strictly between the endpoints of `con`.
    pub fn split_con(&mut self, con: Connection, node: NodeId) -> Result<(), GraphError> {
        let net_id = self.net.net_of_con(&con).ok_or(GraphError::NotInNet)?;
        let node_pos = self.nodes.get(node)?.pos;
        let pos1 = self.get_port(&con.p1)?.pos;
        let pos2 = self.get_port(&con.p2)?.pos;
        debug_assert!(math::is_between(node_pos, pos1, pos2));
        let (t1, t2) = self.con_types(&con)?;
        let net = self.net.get_mut(net_id)?;
        net.erase(&con)?;
        let toward_p1 = math::vec_to_dir(pos1 - node_pos);
        net.insert(
            Connection::new(con.p1, PortRef::node(node, toward_p1)),
            (t1, PortType::NodeInternal),
        )?;
        let toward_p2 = math::vec_to_dir(pos2 - node_pos);
        net.insert(
            Connection::new(con.p2, PortRef::node(node, toward_p2)),
            (t2, PortType::NodeInternal),
        )?;
        tracing::debug!(node = ?node, "split connection through node");
        Ok(())
    }

    /// Resolves what [`Block::make_port_ref`] would hand out at `pos`,
    /// without mutating anything: the port's facing direction, its I/O
    /// classification, and the net the finished endpoint would belong to.
    /// Mirrors [`Block::make_port_ref`] case for case, including the
    /// redundant-node collapse, so callers can refuse a compound operation
    /// before its first mutation.
    fn resolve_end(&self, pos: IVec2, toward: Direction) -> Result<ResolvedEnd, GraphError> {
        match self.what_is_at(pos)? {
            ObjAtCoord::Empty => Ok(ResolvedEnd {
                dir: toward,
                port_type: PortType::NodeInternal,
                net: None,
            }),
            ObjAtCoord::Con(con) => Ok(ResolvedEnd {
                dir: toward,
                port_type: PortType::NodeInternal,
                net: self.net.net_of_con(&con),
            }),
            ObjAtCoord::Port(port) => {
                if self.net.net_of_port(&port).is_some() {
                    return Err(GraphError::PortOccupied);
                }
                Ok(ResolvedEnd {
                    dir: self.get_port(&port)?.dir,
                    port_type: self.port_type(&port)?,
                    net: None,
                })
            }
            ObjAtCoord::Node(node) => {
                let hosting = PortRef::node(node, toward);
                if self.net.net_of_port(&hosting).is_some() {
                    return Err(GraphError::PortOccupied);
                }
                let opposite = PortRef::node(node, toward.reverse());
                if self.net.node_con_count(node) == 1
                    && let Some(net_id) = self.net.net_of_port(&opposite)
                {
                    // the collapse would hand back the far end of the
                    // straight-through wire, detached from its edge
                    let net = self.net.get(net_id)?;
                    let redundant = net.get_con(&opposite)?;
                    let far = redundant
                        .other(opposite)
                        .ok_or(GraphError::GraphInvariantViolation)?;
                    let net_after = match far.owner {
                        PortObjRef::Node(owner) => {
                            (self.net.node_con_count(owner) > 1).then_some(net_id)
                        }
                        PortObjRef::Gate(_) | PortObjRef::BlockInst(_) => None,
                    };
                    return Ok(ResolvedEnd {
                        dir: self.get_port(&far)?.dir,
                        port_type: self.port_type(&far)?,
                        net: net_after,
                    });
                }
                Ok(ResolvedEnd {
                    dir: toward,
                    port_type: PortType::NodeInternal,
                    net: self.net.net_of_node(node),
                })
            }
            ObjAtCoord::ConCross(..) | ObjAtCoord::Gate(_) | ObjAtCoord::BlockInst(_) => {
                Err(GraphError::IllegalTarget)
            }
        }
    }

    /// Builds an axis-aligned straight connection between `start` and `end`,
    /// materializing endpoints as needed, and routes it into the network.
    ///
    /// Both endpoints are resolved read-only first, so every refusal
    /// (`NonOpposingPorts`, `PortOccupied`, `IllegalTarget`, `InputConflict`)
    /// fires before any mutation.
    pub fn add_connection(&mut self, start: IVec2, end: IVec2) -> Result<Connection, GraphError> {
        let diff = end - start;
        if !math::is_axis_aligned(diff) {
            // zero-length and diagonal segments cannot have opposing ports
            return Err(GraphError::NonOpposingPorts);
        }
        let res_start = self.resolve_end(start, math::vec_to_dir(diff))?;
        let res_end = self.resolve_end(end, math::vec_to_dir(-diff))?;
        if res_start.dir != res_end.dir.reverse() {
            return Err(GraphError::NonOpposingPorts);
        }
        let mut driven = usize::from(res_start.port_type == PortType::Input)
            + usize::from(res_end.port_type == PortType::Input);
        let mut hinted = [res_start.net, res_end.net];
        if hinted[0] == hinted[1] {
            hinted[1] = None;
        }
        for id in hinted.into_iter().flatten() {
            if self.net.get(id)?.input().is_some() {
                driven += 1;
            }
        }
        if driven > 1 {
            return Err(GraphError::InputConflict);
        }
        let p_start = self.make_port_ref(start, math::vec_to_dir(diff))?;
        let p_end = self.make_port_ref(end, math::vec_to_dir(-diff))?;
        let con = Connection::new(p_start, p_end);
        let types = self.con_types(&con)?;
        let net1 = self.net.net_of_endpoint(&p_start);
        let net2 = self.net.net_of_endpoint(&p_end);
        self.net.insert(con, net1, net2, types)?;
        tracing::debug!(start = ?start, end = ?end, "added connection");
        Ok(con)
    }

    /// Turns the crossing of `c1` and `c2` at `pos` into a real junction.
    ///
    /// A node is allocated at `pos` and both wires are re-routed through it;
    /// if the wires belonged to different nets, the nets merge.
    pub fn insert_overlap(
        &mut self,
        c1: Connection,
        c2: Connection,
        pos: IVec2,
    ) -> Result<NodeId, GraphError> {
        let net1 = self.net.net_of_con(&c1).ok_or(GraphError::NotInNet)?;
        let net2 = self.net.net_of_con(&c2).ok_or(GraphError::NotInNet)?;
        let (c1_pos1, c1_pos2) = self.con_positions(&c1)?;
        let (c2_pos1, c2_pos2) = self.con_positions(&c2)?;
        if !math::is_between(pos, c1_pos1, c1_pos2) || !math::is_between(pos, c2_pos1, c2_pos2) {
            return Err(GraphError::IllegalTarget);
        }
        if net1 != net2
            && self.net.get(net1)?.input().is_some()
            && self.net.get(net2)?.input().is_some()
        {
            // the junction would merge two driven nets; refuse before the
            // first split
            return Err(GraphError::InputConflict);
        }
        let node = self.nodes.insert(Node::new(pos));
        tracing::debug!(node = ?node, pos = ?pos, "created junction at crossing");
        self.split_con(c1, node)?;
        if net1 == net2 {
            self.split_con(c2, node)?;
        } else {
            // re-route c2 through the node; inserting the halves merges the
            // two nets through the network's union branch
            let (t1, t2) = self.con_types(&c2)?;
            {
                let net = self.net.get_mut(net2)?;
                net.erase(&c2)?;
            }
            if self.net.get(net2)?.is_empty() {
                self.net.remove(net2)?;
            }
            let toward_p1 = math::vec_to_dir(c2_pos1 - pos);
            let half1 = Connection::new(c2.p1, PortRef::node(node, toward_p1));
            self.net.insert(
                half1,
                self.net.net_of_endpoint(&c2.p1),
                self.net.net_of_node(node),
                (t1, PortType::NodeInternal),
            )?;
            let toward_p2 = math::vec_to_dir(c2_pos2 - pos);
            let half2 = Connection::new(c2.p2, PortRef::node(node, toward_p2));
            self.net.insert(
                half2,
                self.net.net_of_endpoint(&c2.p2),
                self.net.net_of_node(node),
                (t2, PortType::NodeInternal),
            )?;
        }
        Ok(node)
    }

    /// Erases `con` from its net, splitting the net when the removal
    /// disconnects it and reaping endpoint nodes that drop to zero incident
    /// connections.
    pub fn erase_con(&mut self, con: Connection) -> Result<(), GraphError> {
        let net_id = self.net.net_of_con(&con).ok_or(GraphError::NotInNet)?;
        {
            let net = self.net.get_mut(net_id)?;
            net.erase(&con)?;
        }
        let (now_empty, disconnected) = {
            let net = self.net.get(net_id)?;
            (net.is_empty(), !net.is_connected(con.p1, con.p2))
        };
        if now_empty {
            self.net.remove(net_id)?;
            tracing::debug!(net = ?net_id, "erased last connection, dropped net");
        } else if disconnected {
            let split = self.net.get_mut(net_id)?.split_net(con.p1);
            if !split.is_empty() {
                let new_id = self.net.register(split);
                tracing::debug!(from = ?net_id, to = ?new_id, "erase disconnected net");
            }
            if self.net.get(net_id)?.is_empty() {
                self.net.remove(net_id)?;
            }
        }
        for port in [con.p1, con.p2] {
            if let PortObjRef::Node(node) = port.owner
                && self.nodes.contains(node)
                && self.net.node_con_count(node) == 0
            {
                self.nodes.erase(node)?;
                tracing::debug!(node = ?node, "reaped isolated node");
            }
        }
        Ok(())
    }

    /// Places a gate.
    pub fn add_gate(&mut self, gate: Gate) -> GateId {
        let id = self.gates.insert(gate);
        tracing::debug!(gate = ?id, "placed gate");
        id
    }

    /// Places an instance of another block.
    pub fn add_block_instance(&mut self, inst: BlockInst) -> BlockInstId {
        let id = self.block_instances.insert(inst);
        tracing::debug!(inst = ?id, "placed block instance");
        id
    }

    fn con_positions(&self, con: &Connection) -> Result<(IVec2, IVec2), GraphError> {
        Ok((self.get_port(&con.p1)?.pos, self.get_port(&con.p2)?.pos))
    }
}

fn rect_contains(pos: IVec2, size: IVec2, coord: IVec2) -> bool {
    coord.x >= pos.x && coord.x < pos.x + size.x && coord.y >= pos.y && coord.y < pos.y + size.y
}
