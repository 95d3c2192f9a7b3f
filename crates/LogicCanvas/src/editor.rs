//! # Editor
//!
//! The interactive state machine that turns a sequence of grid clicks into
//! legal graph mutations. The editor holds only transient interaction state;
//! the [`Block`] is passed into every entry point, so one editor can serve
//! any block and the renderer keeps free read access between calls.
//!
//! Per render tick the host calls [`Editor::on_frame`] with the grid-snapped
//! cursor; per input event it calls [`Editor::on_event`]. Everything the
//! renderer needs to draw the in-progress segment, legality cursors, net
//! highlights and overlap warnings is exposed through read-only accessors.

use glam::IVec2;

use crate::block::{Block, ObjAtCoord};
use crate::store::StableStore;
use crate::error::GraphError;
use crate::input::{EditorEvent, Key, MouseButton};
use crate::math::{self, DirSet, Direction};
use crate::model::NetId;

/// The editor's interaction state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EditorState {
    /// Tracking the hover; a left release starts a connection.
    #[default]
    Idle,
    /// A connection is in progress from `con_start_pos`.
    Connecting,
    /// Delete mode; a left release erases the hovered connection.
    Deleting,
}

/// Interactive editing session over a [`Block`].
#[derive(Debug, Default)]
pub struct Editor {
    state: EditorState,
    con_start_pos: IVec2,
    con_end_pos: IVec2,
    con_start_obj: ObjAtCoord,
    con_end_obj: ObjAtCoord,
    con_start_net: Option<NetId>,
    con_end_net: Option<NetId>,
    con_start_legal: bool,
    con_end_legal: bool,
    overlap_pos: Vec<IVec2>,
}

impl Editor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    /// Anchor of the in-progress connection (the hover cell while idle).
    pub fn con_start_pos(&self) -> IVec2 {
        self.con_start_pos
    }

    /// Proposed end of the in-progress connection.
    pub fn con_end_pos(&self) -> IVec2 {
        self.con_end_pos
    }

    pub fn con_start_obj(&self) -> &ObjAtCoord {
        &self.con_start_obj
    }

    pub fn con_end_obj(&self) -> &ObjAtCoord {
        &self.con_end_obj
    }

    /// Net under the start cell, for highlight rendering.
    pub fn con_start_net(&self) -> Option<NetId> {
        self.con_start_net
    }

    /// Net under the proposed end cell, for highlight rendering.
    pub fn con_end_net(&self) -> Option<NetId> {
        self.con_end_net
    }

    pub fn con_start_legal(&self) -> bool {
        self.con_start_legal
    }

    pub fn con_end_legal(&self) -> bool {
        self.con_end_legal
    }

    /// Cells where the committed connection would cross or merge with
    /// existing nets. Purely a visual warning; commits proceed regardless.
    pub fn overlap_pos(&self) -> &[IVec2] {
        &self.overlap_pos
    }

    /// True when both ends of the proposal sit on the same net, i.e. the
    /// commit would close a loop.
    pub fn proposes_loop(&self) -> bool {
        self.state == EditorState::Connecting
            && self.con_start_pos != self.con_end_pos
            && self.con_start_net.is_some()
            && self.con_start_net == self.con_end_net
    }

    /// Per-tick update: refreshes hover classification or the proposed end
    /// point, legality, net highlights and the overlap indicator set.
    pub fn on_frame(&mut self, cursor: IVec2, block: &Block) -> Result<(), GraphError> {
        match self.state {
            EditorState::Idle => {
                self.con_start_pos = cursor;
                self.con_start_obj = block.what_is_at(cursor)?;
                self.con_start_net = net_of_obj(block, &self.con_start_obj);
                self.con_start_legal = self.is_legal_start(cursor, block)?;
                self.overlap_pos.clear();
            }
            EditorState::Deleting => {
                self.con_start_pos = cursor;
                self.con_start_obj = block.what_is_at(cursor)?;
                self.con_start_net = net_of_obj(block, &self.con_start_obj);
                self.con_start_legal = matches!(self.con_start_obj, ObjAtCoord::Con(_));
                self.overlap_pos.clear();
            }
            EditorState::Connecting => {
                let diff = cursor - self.con_start_pos;
                let Some(end_prop) = self.propose_end(diff, block)? else {
                    self.con_end_legal = false;
                    self.overlap_pos.clear();
                    return Ok(());
                };
                if !self.is_legal_end(end_prop, block)? {
                    self.con_end_legal = false;
                    self.overlap_pos.clear();
                    return Ok(());
                }
                self.con_end_legal = true;
                self.con_end_pos = end_prop;
                self.con_end_obj = block.what_is_at(end_prop)?;
                self.con_end_net = net_of_obj(block, &self.con_end_obj);
                self.update_overlap(block)?;
            }
        }
        Ok(())
    }

    /// Event dispatch: commits, cancels, and mode switches.
    pub fn on_event(&mut self, event: EditorEvent, block: &mut Block) -> Result<(), GraphError> {
        match event {
            EditorEvent::MouseReleased(MouseButton::Left) => self.commit(block),
            EditorEvent::MouseReleased(MouseButton::Right) => {
                self.reset();
                Ok(())
            }
            EditorEvent::KeyPressed(Key::Delete) => {
                let was_deleting = self.state == EditorState::Deleting;
                self.reset();
                if !was_deleting {
                    self.state = EditorState::Deleting;
                }
                Ok(())
            }
            EditorEvent::KeyPressed(Key::Escape) => {
                self.reset();
                Ok(())
            }
        }
    }

    fn commit(&mut self, block: &mut Block) -> Result<(), GraphError> {
        match self.state {
            EditorState::Idle => {
                if let ObjAtCoord::ConCross(c1, c2) = self.con_start_obj {
                    // a click on a bare crossing promotes it to a junction
                    block.insert_overlap(c1, c2, self.con_start_pos)?;
                    self.con_start_net = None;
                    return Ok(());
                }
                if self.con_start_legal && self.con_start_obj.is_connectable() {
                    self.state = EditorState::Connecting;
                    self.con_end_pos = self.con_start_pos;
                    self.con_end_obj = self.con_start_obj;
                    self.con_end_net = self.con_start_net;
                    self.con_end_legal = true;
                }
                Ok(())
            }
            EditorState::Connecting => {
                if !self.con_end_legal {
                    return Ok(());
                }
                if self.con_end_pos == self.con_start_pos {
                    // zero-length commit is a plain reset
                    self.reset();
                    return Ok(());
                }
                match block.add_connection(self.con_start_pos, self.con_end_pos) {
                    Ok(_) => {
                        self.reset();
                        Ok(())
                    }
                    Err(err) if err.is_user_refusal() => {
                        tracing::debug!(error = %err, "commit refused");
                        self.con_end_legal = false;
                        Ok(())
                    }
                    Err(err) => Err(err),
                }
            }
            EditorState::Deleting => {
                if let ObjAtCoord::Con(con) = self.con_start_obj {
                    block.erase_con(con)?;
                    self.con_start_obj = ObjAtCoord::Empty;
                    self.con_start_net = None;
                    self.con_start_legal = false;
                }
                Ok(())
            }
        }
    }

    fn reset(&mut self) {
        self.state = EditorState::Idle;
        self.con_start_net = None;
        self.con_end_net = None;
        self.con_end_legal = false;
        self.overlap_pos.clear();
    }

    /// The proposed end point for the raw cursor offset `diff`, constrained
    /// by what the connection started from. `None` means no end can be
    /// proposed at all (a node with every slot taken).
    fn propose_end(&self, diff: IVec2, block: &Block) -> Result<Option<IVec2>, GraphError> {
        let start = self.con_start_pos;
        let end = match &self.con_start_obj {
            ObjAtCoord::Port(port) => {
                // projected onto the pin's outward axis, never behind it
                let dir = block.get_port(port)?.dir;
                let dist = math::dir_dot(dir, diff).max(0);
                start + dir.to_vec() * dist
            }
            ObjAtCoord::Node(node) => {
                let occupied = block.occupied_dirs(*node);
                let best = Direction::ALL
                    .into_iter()
                    .filter(|dir| !occupied.has(*dir))
                    .max_by_key(|dir| math::dir_dot(*dir, diff));
                let Some(dir) = best else {
                    return Ok(None);
                };
                start + dir.to_vec() * math::dir_dot(dir, diff).max(0)
            }
            ObjAtCoord::Con(con) => {
                // new wire must tee off perpendicular to the one below
                let dir = block.get_port(&con.p1)?.dir.swap_xy();
                start + dir.to_vec() * math::dir_dot(dir, diff)
            }
            _ => start + math::snap_to_axis(diff),
        };
        Ok(Some(end))
    }

    /// Whether a connection may start at `pos`.
    pub fn is_legal_start(&self, pos: IVec2, block: &Block) -> Result<bool, GraphError> {
        let obj = block.what_is_at(pos)?;
        Ok(match obj {
            ObjAtCoord::Node(node) => block.occupied_dirs(node) != DirSet::all(),
            ObjAtCoord::Port(port) => block.nets().net_of_port(&port).is_none(),
            _ => obj.is_connectable(),
        })
    }

    /// Whether `end` is a legal final target for the in-progress connection.
    pub fn is_legal_end(&self, end: IVec2, block: &Block) -> Result<bool, GraphError> {
        let start = self.con_start_pos;
        if end == start {
            // committing in place is an allowed no-op
            return Ok(true);
        }
        if !math::is_axis_aligned(end - start) {
            return Ok(false);
        }
        let obj = block.what_is_at(end)?;
        if !obj.is_connectable() {
            return Ok(false);
        }
        if let ObjAtCoord::Node(node) = obj {
            let facing = math::vec_to_dir(start - end);
            if block.occupied_dirs(node).has(facing) {
                return Ok(false);
            }
        }
        if let ObjAtCoord::Con(con) = obj {
            let con_dir = block.get_port(&con.p1)?.dir;
            let prop_dir = math::vec_to_dir(end - start);
            if prop_dir == con_dir || prop_dir == con_dir.reverse() {
                // the new wire would lie along the existing one
                return Ok(false);
            }
        }
        for (_, node) in block.nodes().iter() {
            if math::is_between(node.pos, start, end) {
                // the segment would overshoot a junction without teeing off
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Recomputes the overlap indicator set: intersections of the proposed
    /// segment with each end's net, plus pairwise intersections between the
    /// two end nets when they differ.
    fn update_overlap(&mut self, block: &Block) -> Result<(), GraphError> {
        self.overlap_pos.clear();
        if self.state != EditorState::Connecting || self.con_end_pos == self.con_start_pos {
            return Ok(());
        }
        let proposed = (self.con_start_pos, self.con_end_pos);
        let mut net_ids = Vec::new();
        for id in [self.con_start_net, self.con_end_net].into_iter().flatten() {
            if !net_ids.contains(&id) {
                net_ids.push(id);
            }
        }
        for id in &net_ids {
            for con in block.nets().get(*id)?.iter() {
                let seg = (
                    block.get_port(&con.p1)?.pos,
                    block.get_port(&con.p2)?.pos,
                );
                if let Some(hit) = math::line_intersection(proposed, seg) {
                    self.overlap_pos.push(hit);
                }
            }
        }
        if let [net_a, net_b] = net_ids[..] {
            for con_a in block.nets().get(net_a)?.iter() {
                let seg_a = (
                    block.get_port(&con_a.p1)?.pos,
                    block.get_port(&con_a.p2)?.pos,
                );
                for con_b in block.nets().get(net_b)?.iter() {
                    let seg_b = (
                        block.get_port(&con_b.p1)?.pos,
                        block.get_port(&con_b.p2)?.pos,
                    );
                    if let Some(hit) = math::line_intersection(seg_a, seg_b) {
                        self.overlap_pos.push(hit);
                    }
                }
            }
        }
        self.overlap_pos.sort_unstable_by_key(|v| (v.x, v.y));
        self.overlap_pos.dedup();
        Ok(())
    }
}

fn net_of_obj(block: &Block, obj: &ObjAtCoord) -> Option<NetId> {
    match obj {
        ObjAtCoord::Node(node) => block.nets().net_of_node(*node),
        ObjAtCoord::Con(con) => block.nets().net_of_con(con),
        ObjAtCoord::Port(port) => block.nets().net_of_port(port),
        _ => None,
    }
}
