use glam::IVec2;
use logic_canvas::model::{BlockInst, Gate, NetId, PortInst};
use logic_canvas::net::ClosedNet;
use logic_canvas::store::StableStore;
use logic_canvas::{Block, Connection, Direction, GraphError, ObjAtCoord, PortRef};

fn block() -> Block {
    Block::new("test", 50)
}

fn v(x: i32, y: i32) -> IVec2 {
    IVec2::new(x, y)
}

/// The one net a single-component block is expected to hold.
fn single_net(block: &Block) -> (NetId, &ClosedNet) {
    assert_eq!(block.nets().len(), 1);
    block.nets().iter().next().unwrap()
}

/// Structural health check run after mutations: edges live in exactly one
/// net, nets are internally connected, caches agree, and no node is isolated
/// or oversubscribed.
fn check_invariants(block: &Block) {
    let mut all_cons: Vec<Connection> = Vec::new();
    for (_, net) in block.nets().iter() {
        assert!(!net.is_empty(), "empty net left registered");
        assert_eq!(net.size(), net.iter().count());
        for con in net.iter() {
            assert!(!all_cons.contains(&con), "connection owned by two nets");
            all_cons.push(con);
        }
        let ports: Vec<PortRef> = net.ports().collect();
        for port in &ports {
            // no isolated ports: membership implies a resolvable edge
            assert!(net.get_con(port).is_ok());
        }
        for a in &ports {
            for b in &ports {
                assert!(net.is_connected(*a, *b), "net is not one component");
            }
        }
    }
    for (id, _) in block.nodes().iter() {
        let count = block.nets().node_con_count(id);
        assert!(
            (1..=4).contains(&count),
            "node with {count} incident connections"
        );
    }
}

#[test]
fn new_block_is_empty() {
    let block = block();
    assert!(block.nodes().is_empty());
    assert!(block.nets().is_empty());
    assert!(block.gates().is_empty());
    assert!(block.block_instances().is_empty());
}

#[test]
fn make_port_at_empty_creates_node() {
    let mut block = block();
    let pos = v(21, 21);
    assert_eq!(block.what_is_at(pos).unwrap(), ObjAtCoord::Empty);

    let port = block.make_port_ref(pos, Direction::Up).unwrap();
    let (node, dir) = port.as_node().expect("port should sit on a node");
    assert_eq!(dir, Direction::Up);
    assert_eq!(block.nodes().len(), 1);
    assert!(block.nodes().contains(node));
    assert_eq!(block.what_is_at(pos).unwrap(), ObjAtCoord::Node(node));
    // the fresh node is not wired up yet
    assert_eq!(block.nets().node_con_count(node), 0);
}

#[test]
fn make_port_on_free_node_slot_is_repeatable() {
    let mut block = block();
    let first = block.make_port_ref(v(0, 0), Direction::Down).unwrap();
    // nothing was wired, so asking again hands out the same slot
    assert_eq!(first, block.make_port_ref(v(0, 0), Direction::Down).unwrap());
}

#[test]
fn add_connection_refuses_degenerate_segments() {
    let mut block = block();
    assert_eq!(
        block.add_connection(v(2, 2), v(2, 2)),
        Err(GraphError::NonOpposingPorts)
    );
    assert_eq!(
        block.add_connection(v(0, 0), v(3, 4)),
        Err(GraphError::NonOpposingPorts)
    );
    assert!(block.nodes().is_empty());
    assert!(block.nets().is_empty());
}

#[test]
fn empty_to_empty_connection() {
    let mut block = block();
    let con = block.add_connection(v(21, 21), v(21, 13)).unwrap();

    let (net_id, net) = single_net(&block);
    assert_eq!(net.size(), 1);
    assert!(net.contains_con(&con));
    assert_eq!(block.nets().net_of_con(&con), Some(net_id));
    assert_eq!(block.nets().net_of_port(&con.p1), Some(net_id));
    assert_eq!(block.nets().net_of_port(&con.p2), Some(net_id));

    // the wire occupies the cells strictly between its endpoints
    let mid = block.what_is_at(v(21, 17)).unwrap();
    assert_eq!(mid, ObjAtCoord::Con(con));
}

#[test]
fn connected_port_slot_is_occupied() {
    let mut block = block();
    let con = block.add_connection(v(0, 0), v(0, 10)).unwrap();
    let (start_node, start_dir) = con.p1.as_node().unwrap();
    assert_eq!(start_dir, Direction::Down);
    assert_eq!(
        block.make_port_ref(v(0, 0), Direction::Down),
        Err(GraphError::PortOccupied)
    );
    // the other three slots are still free
    assert!(block.make_port_ref(v(0, 0), Direction::Right).is_ok());
    assert_eq!(block.nets().node_con_count(start_node), 1);
}

#[test]
fn two_connections_share_a_corner_node() {
    let mut block = block();
    let con1 = block.add_connection(v(0, 0), v(0, 10)).unwrap();
    let con2 = block.add_connection(v(0, 0), v(10, 0)).unwrap();

    assert_eq!(block.nodes().len(), 3);
    let (_, net) = single_net(&block);
    assert_eq!(net.size(), 2);

    let (corner, _) = con1.p1.as_node().unwrap();
    assert_eq!(block.nets().node_con_count(corner), 2);
    // the two far endpoints are connected through the shared corner
    assert!(net.is_connected(con1.p2, con2.p2));
    check_invariants(&block);
}

#[test]
fn redundant_node_collapses_into_straight_wire() {
    let mut block = block();
    block.add_connection(v(0, 0), v(0, 1)).unwrap();
    block.add_connection(v(0, 2), v(0, 3)).unwrap();
    assert_eq!(block.nodes().len(), 4);
    assert_eq!(block.nets().len(), 2);

    // bridging the gap dissolves the two interior nodes
    let con = block.add_connection(v(0, 1), v(0, 2)).unwrap();
    assert_eq!(block.nodes().len(), 2);
    let (_, net) = single_net(&block);
    assert_eq!(net.size(), 1);
    assert!(net.contains_con(&con));

    let pos1 = block.get_port(&con.p1).unwrap().pos;
    let pos2 = block.get_port(&con.p2).unwrap().pos;
    let mut span = [pos1, pos2];
    span.sort_by_key(|p| p.y);
    assert_eq!(span, [v(0, 0), v(0, 3)]);
    check_invariants(&block);
}

#[test]
fn splitting_a_connection_in_place() {
    let mut block = block();
    let con1 = block.add_connection(v(0, 0), v(5, 0)).unwrap();

    let split_port = block.make_port_ref(v(2, 0), Direction::Down).unwrap();
    let (split_node, _) = split_port.as_node().unwrap();
    assert_eq!(block.nodes().len(), 3);

    let (_, net) = single_net(&block);
    assert_eq!(net.size(), 2);
    assert!(!net.contains_con(&con1));
    let left_half =
        logic_canvas::Connection::new(con1.p1, PortRef::node(split_node, Direction::Left));
    let right_half =
        logic_canvas::Connection::new(con1.p2, PortRef::node(split_node, Direction::Right));
    assert!(net.contains_con(&left_half));
    assert!(net.contains_con(&right_half));
    assert!(net.is_connected(con1.p1, con1.p2));
}

#[test]
fn rung_between_two_wires_merges_their_nets() {
    let mut block = block();
    let con1 = block.add_connection(v(0, 0), v(5, 0)).unwrap();
    let con2 = block.add_connection(v(0, 5), v(5, 5)).unwrap();
    assert_eq!(block.nets().len(), 2);

    // the rung splits both wires and unions the two nets
    let rung = block.add_connection(v(2, 0), v(2, 5)).unwrap();
    assert_eq!(block.nodes().len(), 6);
    let (_, net) = single_net(&block);
    assert!(net.contains_con(&rung));
    assert!(net.is_connected(con1.p1, con2.p2));
    check_invariants(&block);
}

#[test]
fn overlap_turns_crossing_into_junction() {
    let mut block = block();
    let con1 = block.add_connection(v(0, 2), v(5, 2)).unwrap();
    let con2 = block.add_connection(v(2, 0), v(2, 5)).unwrap();
    assert_eq!(block.nets().len(), 2);
    assert_eq!(block.nodes().len(), 4);
    // without a node the crossing cell reads as an x
    assert_eq!(
        block.what_is_at(v(2, 2)).unwrap(),
        ObjAtCoord::ConCross(con1, con2)
    );

    let node = block.insert_overlap(con1, con2, v(2, 2)).unwrap();
    assert_eq!(block.nets().len(), 1);
    assert_eq!(block.nodes().len(), 5);
    assert_eq!(block.what_is_at(v(2, 2)).unwrap(), ObjAtCoord::Node(node));

    let (_, net) = single_net(&block);
    assert_eq!(net.size(), 4);
    assert_eq!(block.nets().node_con_count(node), 4);
    for dir in Direction::ALL {
        assert!(net.contains_port(&PortRef::node(node, dir)));
    }
    assert!(net.is_connected(con1.p1, con2.p2));
    check_invariants(&block);
}

#[test]
fn overlap_within_one_net() {
    let mut block = block();
    // an I-beam: two horizontal rails bridged in the middle
    let con1 = block.add_connection(v(0, 0), v(4, 0)).unwrap();
    let con2 = block.add_connection(v(0, 4), v(4, 4)).unwrap();
    let bridge = block.add_connection(v(2, 0), v(2, 4)).unwrap();
    assert_eq!(block.nets().len(), 1);

    // a second horizontal cut crosses the bridge inside the same net
    let cut = block.add_connection(v(0, 2), v(4, 2)).unwrap();
    assert_eq!(block.nets().len(), 2);
    let node = block.insert_overlap(cut, bridge, v(2, 2)).unwrap();

    let (_, net) = single_net(&block);
    assert_eq!(net.size(), 8);
    assert_eq!(block.nets().node_con_count(node), 4);
    assert!(net.is_connected(con1.p1, con2.p2));
    check_invariants(&block);
}

#[test]
fn erasing_last_connection_drops_nodes_and_net() {
    let mut block = block();
    let con1 = block.add_connection(v(0, 0), v(5, 0)).unwrap();
    block.erase_con(con1).unwrap();
    assert_eq!(block.nodes().len(), 0);
    assert_eq!(block.nets().len(), 0);
    // erasing again has nothing to remove
    assert_eq!(block.erase_con(con1), Err(GraphError::NotInNet));
}

#[test]
fn erasing_leaf_connection_keeps_net_whole() {
    let mut block = block();
    let con1 = block.add_connection(v(0, 0), v(5, 0)).unwrap();
    let con2 = block.add_connection(v(5, 0), v(5, 5)).unwrap();
    assert_eq!(block.nodes().len(), 3);
    {
        let (_, net) = single_net(&block);
        assert!(net.is_connected(con1.p1, con2.p2));
    }

    block.erase_con(con2).unwrap();
    assert_eq!(block.nodes().len(), 2);
    let (_, net) = single_net(&block);
    assert_eq!(net.size(), 1);
    assert!(net.contains_con(&con1));
    assert!(!net.contains_con(&con2));
    assert!(!net.is_connected(con1.p1, con2.p2));
    check_invariants(&block);
}

#[test]
fn erasing_bridge_splits_net_in_two() {
    let mut block = block();
    let con1 = block.add_connection(v(0, 0), v(5, 0)).unwrap();
    let con2 = block.add_connection(v(0, 5), v(5, 5)).unwrap();
    let con3 = block.add_connection(v(5, 0), v(5, 5)).unwrap();
    assert_eq!(block.nodes().len(), 4);
    assert_eq!(block.nets().len(), 1);

    block.erase_con(con3).unwrap();
    assert_eq!(block.nets().len(), 2);
    assert_eq!(block.nodes().len(), 4);
    assert!(block.nets().net_of_con(&con3).is_none());
    let net1 = block.nets().net_of_con(&con1).expect("con1 net");
    let net2 = block.nets().net_of_con(&con2).expect("con2 net");
    assert_ne!(net1, net2);
    assert_eq!(block.nets().get(net1).unwrap().size(), 1);
    assert_eq!(block.nets().get(net2).unwrap().size(), 1);
    check_invariants(&block);
}

#[test]
fn erasing_square_edge_leaves_open_path() {
    let mut block = block();
    let left = block.add_connection(v(0, 0), v(0, 10)).unwrap();
    let top = block.add_connection(v(0, 0), v(10, 0)).unwrap();
    block.add_connection(v(0, 10), v(10, 10)).unwrap();
    block.add_connection(v(10, 0), v(10, 10)).unwrap();
    assert_eq!(block.nodes().len(), 4);
    let (_, net) = single_net(&block);
    assert_eq!(net.size(), 4);

    // the square closes a loop, so removing one side keeps it connected
    block.erase_con(top).unwrap();
    assert_eq!(block.nets().len(), 1);
    assert_eq!(block.nodes().len(), 4);
    let (_, net) = single_net(&block);
    assert_eq!(net.size(), 3);
    assert!(net.is_connected(left.p1, top.p2));
    check_invariants(&block);
}

#[test]
fn add_then_erase_round_trips() {
    let mut block = block();
    let con1 = block.add_connection(v(0, 0), v(0, 10)).unwrap();
    block.add_connection(v(0, 0), v(10, 0)).unwrap();
    let nodes_before = block.nodes().len();
    let (_, net) = single_net(&block);
    let size_before = net.size();

    let con3 = block.add_connection(v(10, 0), v(10, 5)).unwrap();
    assert_eq!(block.nodes().len(), nodes_before + 1);
    block.erase_con(con3).unwrap();

    assert_eq!(block.nodes().len(), nodes_before);
    let (_, net) = single_net(&block);
    assert_eq!(net.size(), size_before);
    assert!(net.contains_con(&con1));
    check_invariants(&block);
}

#[test]
fn erasing_one_overlapped_wire_leaves_the_other() {
    let mut block = block();
    let con1 = block.add_connection(v(0, 2), v(5, 2)).unwrap();
    let con2 = block.add_connection(v(2, 0), v(2, 5)).unwrap();
    let node = block.insert_overlap(con1, con2, v(2, 2)).unwrap();

    // remove both halves of the vertical wire
    let upper = block
        .nets()
        .get(block.nets().net_of_node(node).unwrap())
        .unwrap()
        .get_con(&PortRef::node(node, Direction::Up))
        .unwrap();
    block.erase_con(upper).unwrap();
    let lower = block
        .nets()
        .get(block.nets().net_of_node(node).unwrap())
        .unwrap()
        .get_con(&PortRef::node(node, Direction::Down))
        .unwrap();
    block.erase_con(lower).unwrap();

    // the horizontal wire survives as two halves through the junction
    assert_eq!(block.nodes().len(), 3);
    let (_, net) = single_net(&block);
    assert_eq!(net.size(), 2);
    assert!(net.is_connected(con1.p1, con1.p2));
    assert_eq!(block.nets().node_con_count(node), 2);
    check_invariants(&block);
}

#[test]
fn gate_pins_and_footprint_classify() {
    let mut block = block();
    let gate = block.add_gate(Gate {
        pos: v(10, 10),
        size: v(3, 2),
        ports: vec![PortInst {
            dir: Direction::Left,
            pos: v(10, 11),
            negated: false,
            output: false,
        }],
    });

    match block.what_is_at(v(10, 11)).unwrap() {
        ObjAtCoord::Port(port) => {
            assert_eq!(port.owner, logic_canvas::PortObjRef::Gate(gate));
            assert_eq!(port.port, 0);
        }
        other => panic!("expected a pin, got {other:?}"),
    }
    assert_eq!(block.what_is_at(v(11, 10)).unwrap(), ObjAtCoord::Gate(gate));
    assert_eq!(block.what_is_at(v(20, 20)).unwrap(), ObjAtCoord::Empty);
    // a gate body is not a valid connection target
    assert_eq!(
        block.make_port_ref(v(11, 10), Direction::Up),
        Err(GraphError::IllegalTarget)
    );
}

#[test]
fn driving_pin_registers_as_net_input() {
    let mut block = block();
    block.add_gate(Gate {
        pos: v(0, 0),
        size: v(1, 1),
        ports: vec![PortInst {
            dir: Direction::Right,
            pos: v(0, 0),
            negated: false,
            output: true,
        }],
    });

    let con = block.add_connection(v(0, 0), v(3, 0)).unwrap();
    let (_, net) = single_net(&block);
    assert_eq!(net.input(), Some(con.p1));
    assert!(net.outputs().is_empty());
}

#[test]
fn merging_two_driven_nets_is_refused() {
    let mut block = block();
    block.add_gate(Gate {
        pos: v(0, 0),
        size: v(1, 1),
        ports: vec![PortInst {
            dir: Direction::Right,
            pos: v(0, 0),
            negated: false,
            output: true,
        }],
    });
    block.add_gate(Gate {
        pos: v(8, 0),
        size: v(1, 1),
        ports: vec![PortInst {
            dir: Direction::Left,
            pos: v(8, 0),
            negated: false,
            output: true,
        }],
    });
    block.add_connection(v(0, 0), v(3, 0)).unwrap();
    block.add_connection(v(8, 0), v(5, 0)).unwrap();
    assert_eq!(block.nets().len(), 2);

    assert_eq!(
        block.add_connection(v(3, 0), v(5, 0)),
        Err(GraphError::InputConflict)
    );

    // the refusal left both driven wires untouched
    assert_eq!(block.nets().len(), 2);
    assert_eq!(block.nodes().len(), 2);
    for (_, net) in block.nets().iter() {
        assert_eq!(net.size(), 1);
        assert!(net.input().is_some());
    }
    assert!(matches!(
        block.what_is_at(v(1, 0)).unwrap(),
        ObjAtCoord::Con(_)
    ));
    assert!(matches!(
        block.what_is_at(v(6, 0)).unwrap(),
        ObjAtCoord::Con(_)
    ));
    check_invariants(&block);
}

#[test]
fn overlap_of_two_driven_nets_is_refused() {
    let mut block = block();
    block.add_gate(Gate {
        pos: v(0, 2),
        size: v(1, 1),
        ports: vec![PortInst {
            dir: Direction::Right,
            pos: v(0, 2),
            negated: false,
            output: true,
        }],
    });
    block.add_gate(Gate {
        pos: v(3, 5),
        size: v(1, 1),
        ports: vec![PortInst {
            dir: Direction::Up,
            pos: v(3, 5),
            negated: false,
            output: true,
        }],
    });
    let con1 = block.add_connection(v(0, 2), v(6, 2)).unwrap();
    let con2 = block.add_connection(v(3, 5), v(3, 0)).unwrap();
    assert_eq!(
        block.what_is_at(v(3, 2)).unwrap(),
        ObjAtCoord::ConCross(con1, con2)
    );

    assert_eq!(
        block.insert_overlap(con1, con2, v(3, 2)),
        Err(GraphError::InputConflict)
    );

    // the refusal left both driven wires untouched
    assert_eq!(block.nets().len(), 2);
    assert_eq!(block.nodes().len(), 2);
    assert_eq!(
        block.what_is_at(v(3, 2)).unwrap(),
        ObjAtCoord::ConCross(con1, con2)
    );
    check_invariants(&block);
}

#[test]
fn classifications_are_mutually_exclusive() {
    let mut block = block();
    let con1 = block.add_connection(v(0, 2), v(5, 2)).unwrap();
    block.add_connection(v(2, 0), v(2, 5)).unwrap();

    // walk the populated region; every cell must classify exactly one way
    for x in 0..8 {
        for y in 0..8 {
            let obj = block.what_is_at(v(x, y)).unwrap();
            match obj {
                ObjAtCoord::Node(node) => {
                    assert_eq!(block.nodes().get(node).unwrap().pos, v(x, y));
                }
                ObjAtCoord::Con(con) => {
                    let pos1 = block.get_port(&con.p1).unwrap().pos;
                    let pos2 = block.get_port(&con.p2).unwrap().pos;
                    assert!(logic_canvas::math::is_between(v(x, y), pos1, pos2));
                }
                ObjAtCoord::ConCross(a, b) => {
                    assert_eq!(v(x, y), v(2, 2));
                    assert_ne!(a, b);
                }
                ObjAtCoord::Empty => {}
                other => panic!("unexpected classification {other:?}"),
            }
        }
    }
    // the crossing cell did not grow a node
    assert!(matches!(
        block.what_is_at(v(2, 2)).unwrap(),
        ObjAtCoord::ConCross(..)
    ));
    assert_eq!(block.what_is_at(v(4, 2)).unwrap(), ObjAtCoord::Con(con1));
}

#[test]
fn node_visibility_follows_junction_shape() {
    let mut block = block();
    // corner: two perpendicular wires meeting at (0,0)
    let con1 = block.add_connection(v(0, 0), v(0, 5)).unwrap();
    block.add_connection(v(0, 0), v(5, 0)).unwrap();
    let (corner, _) = con1.p1.as_node().unwrap();
    let (leaf, _) = con1.p2.as_node().unwrap();

    // endpoints and corners draw, straight pass-throughs do not
    assert!(block.node_is_visible(leaf));
    assert!(block.node_is_visible(corner));

    let mut straight = Block::new("straight", 50);
    let con = straight.add_connection(v(0, 0), v(4, 0)).unwrap();
    let split = straight.make_port_ref(v(2, 0), Direction::Down).unwrap();
    let (mid, _) = split.as_node().unwrap();
    assert!(!straight.node_is_visible(mid));
    let (end, _) = con.p1.as_node().unwrap();
    assert!(straight.node_is_visible(end));
}

#[test]
fn block_instance_pins_and_footprint_classify() {
    let mut block = block();
    let inst = block.add_block_instance(BlockInst {
        pos: v(20, 20),
        size: v(4, 4),
        ports: vec![PortInst {
            dir: Direction::Up,
            pos: v(22, 20),
            negated: false,
            output: false,
        }],
        definition: "half_adder".to_string(),
    });

    match block.what_is_at(v(22, 20)).unwrap() {
        ObjAtCoord::Port(port) => {
            assert_eq!(port.owner, logic_canvas::PortObjRef::BlockInst(inst));
        }
        other => panic!("expected a pin, got {other:?}"),
    }
    assert_eq!(
        block.what_is_at(v(21, 22)).unwrap(),
        ObjAtCoord::BlockInst(inst)
    );
    assert_eq!(
        block.make_port_ref(v(21, 22), Direction::Up),
        Err(GraphError::IllegalTarget)
    );

    // wiring into the pin goes through the regular connection path
    let con = block.add_connection(v(22, 20), v(22, 15)).unwrap();
    let pin = block.get_port(&con.p1).unwrap();
    assert_eq!(pin.dir, Direction::Up);
    assert!(!pin.output);
    let (_, net) = single_net(&block);
    // a consuming pin registers on the output side of the net
    assert_eq!(net.outputs(), &[con.p1]);
    assert_eq!(net.input(), None);
    check_invariants(&block);
}

#[test]
fn erasing_a_pin_wire_frees_the_pin() {
    let mut block = block();
    block.add_gate(Gate {
        pos: v(0, 0),
        size: v(1, 1),
        ports: vec![PortInst {
            dir: Direction::Right,
            pos: v(0, 0),
            negated: false,
            output: true,
        }],
    });
    let con = block.add_connection(v(0, 0), v(4, 0)).unwrap();
    assert_eq!(
        block.make_port_ref(v(0, 0), Direction::Right),
        Err(GraphError::PortOccupied)
    );

    block.erase_con(con).unwrap();
    // the node endpoint is reaped, the gate and its pin stay
    assert!(block.nodes().is_empty());
    assert!(block.nets().is_empty());
    assert_eq!(block.gates().len(), 1);

    // the pin is free to host a new wire again
    let again = block.add_connection(v(0, 0), v(4, 0)).unwrap();
    let (_, net) = single_net(&block);
    assert_eq!(net.input(), Some(again.p1));
    check_invariants(&block);
}
