use glam::Vec2;
use logic_canvas::store::StableStore;
use logic_canvas::{Block, Editor, EditorEvent, EditorState, MouseButton};

/// Scripted cursor positions and clicks standing in for a real event loop.
enum Step {
    Move(f32, f32),
    Click,
}

fn main() {
    println!("=== LogicCanvas Headless Demo ===");

    // 1. A fresh 50x50 schematic and an editor session
    let mut block = Block::new("demo", 50);
    block.description = "Headless editor walkthrough".to_string();
    let mut editor = Editor::new();

    // 2. Script: draw a vertical wire, tee off it, cross it, then promote the
    // crossing to a junction
    let script = [
        Step::Move(10.0, 5.0),
        Step::Click,
        Step::Move(10.0, 15.0),
        Step::Click, // wire (10,5)-(10,15)
        Step::Move(10.0, 10.0),
        Step::Click,
        Step::Move(16.0, 10.0),
        Step::Click, // tee off the middle
        Step::Move(13.0, 7.0),
        Step::Click,
        Step::Move(13.0, 13.0),
        Step::Click, // crosses the tee at (13,10)
        Step::Move(13.0, 10.0),
        Step::Click, // promote the crossing
    ];

    let mut cursor = block.snap_to_grid(Vec2::ZERO);
    for (i, step) in script.iter().enumerate() {
        match step {
            Step::Move(x, y) => {
                cursor = block.snap_to_grid(Vec2::new(*x, *y));
                println!("[{i:2}] move  -> {cursor}");
            }
            Step::Click => {
                println!("[{i:2}] click -> {cursor}");
                editor
                    .on_event(EditorEvent::MouseReleased(MouseButton::Left), &mut block)
                    .expect("scripted click should be valid");
            }
        }
        editor
            .on_frame(cursor, &block)
            .expect("frame update should be valid");

        if editor.state() == EditorState::Connecting {
            println!(
                "      connecting {} -> {} (legal: {}, overlaps: {:?})",
                editor.con_start_pos(),
                editor.con_end_pos(),
                editor.con_end_legal(),
                editor.overlap_pos(),
            );
        }
    }

    // 3. Inspect the result
    println!("\nFinal schematic '{}':", block.name);
    println!("  nodes: {}", block.nodes().len());
    println!("  nets:  {}", block.nets().len());
    for (id, net) in block.nets().iter() {
        println!("    {id:?}: {} connections", net.size());
    }
    for (id, node) in block.nodes().iter() {
        println!(
            "    {id:?} at {} ({} connections, visible: {})",
            node.pos,
            block.nets().node_con_count(id),
            block.node_is_visible(id),
        );
    }

    println!("\nDemo Complete.");
}
