//! # LogicCanvas
//!
//! `logic_canvas` is a headless, retained-mode engine for grid-routed logic
//! schematics. It maintains the wiring diagram (junction nodes, gates, block
//! instances and the connection network partitioning the wires into closed
//! nets) while the host application owns the window, the event loop and the
//! rendering.
//!
//! ## Core Architecture
//! - **Stores (`src/store.rs`)**: insertion-stable handle-indexed arenas.
//! - **Model (`src/model.rs`)**: the entities and the port/connection types.
//! - **Nets (`src/net.rs`, `src/network.rs`)**: connected wiring components
//!   with merge-on-insert and split-on-erase.
//! - **Block (`src/block.rs`)**: the mutation API over one schematic.
//! - **Editor (`src/editor.rs`)**: the click-to-wire interaction state
//!   machine.

pub mod block;
pub mod editor;
pub mod error;
pub mod input;
pub mod math;
pub mod model;
pub mod net;
pub mod network;
pub mod store;

// Re-exports for convenience
pub use block::{Block, ObjAtCoord};
pub use editor::{Editor, EditorState};
pub use error::GraphError;
pub use input::{EditorEvent, Key, MouseButton};
pub use math::{DirSet, Direction};
pub use model::{Connection, PortObjRef, PortRef, PortType};
