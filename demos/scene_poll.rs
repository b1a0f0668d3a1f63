use std::cell::RefCell;
use std::rc::Rc;

use hierarchy_sync::{HierarchyList, HierarchySync, IdentityKey, LiveNode, LiveTreeCursor};
use tracing_subscriber::EnvFilter;

const EDITOR_RIG: IdentityKey = IdentityKey::new(900);

fn scene() -> hierarchy_sync::Result<Vec<LiveNode>> {
    let key = IdentityKey::new;
    Ok(vec![
        LiveNode::new(
            key(1),
            "Environment",
            vec![
                LiveNode::new_leaf(key(2), "Directional Light"),
                LiveNode::new_leaf(key(3), "Floor"),
            ],
        )?,
        LiveNode::new(
            EDITOR_RIG,
            "EditorRig",
            vec![
                LiveNode::new_leaf(key(901), "Left Hand"),
                LiveNode::new_leaf(key(902), "Right Hand"),
            ],
        )?,
        LiveNode::new_leaf(key(4), "Main Camera"),
    ])
}

fn print(list: &HierarchyList) {
    println!("generation {}", list.snapshot.generation());
    for row in list.rows() {
        let Some(node) = list.snapshot.node(row.node) else {
            continue;
        };
        let symbol = match (row.has_children, list.state.get_all_opened().contains(&row.identifier)) {
            (false, _) => "  ",
            (true, true) => "\u{25bc} ",
            (true, false) => "\u{25b6} ",
        };
        println!(
            "{}{symbol}{} {}",
            "  ".repeat(row.depth()),
            node.name(),
            node.identity()
        );
    }
    println!();
}

fn main() -> hierarchy_sync::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hierarchy_sync=debug")),
        )
        .init();

    let mut live = scene()?;
    let mut sync = HierarchySync::new(LiveTreeCursor::new(&live)).exclude(EDITOR_RIG);

    let list = Rc::new(RefCell::new(HierarchyList::default()));
    sync.register(list.clone());

    // Host starts up
    sync.invalidate();
    sync.refresh_if_invalidated()?;
    list.borrow_mut().state.open(vec![IdentityKey::new(1)]);
    list.borrow_mut().state.select(vec![IdentityKey::new(1), IdentityKey::new(3)]);
    print(&list.borrow());

    // A tick without any host notification
    sync.refresh_if_invalidated()?;

    // Rename the floor and spawn a cube
    if let Some(floor) = live[0].child_mut(1) {
        floor.set_name("Floor (Stone)");
    }
    live.push(LiveNode::new_leaf(IdentityKey::new(5), "Cube"));
    sync.cursor_mut().update(&live);
    sync.invalidate();
    sync.refresh_if_invalidated()?;
    print(&list.borrow());

    // Delete the floor, the selection falls back to its parent
    live[0].remove_child(1);
    sync.cursor_mut().update(&live);
    sync.invalidate();
    sync.refresh_if_invalidated()?;
    print(&list.borrow());
    println!("selected {:?}", list.borrow().state.selected());

    Ok(())
}
