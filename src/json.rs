use serde::ser::{SerializeSeq, SerializeStruct};
use serde::{Serialize, Serializer};

use crate::{IdentityKey, NodeRef, Snapshot};

impl Serialize for IdentityKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.get())
    }
}

/// Serialized as the list of top level nodes.
impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.roots().len()))?;
        for node in self.root_nodes() {
            seq.serialize_element(&node)?;
        }
        seq.end()
    }
}

/// `{ "name", "identity", "children"? }`, `children` is left out for nodes without any.
impl Serialize for NodeRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = if self.has_children() { 3 } else { 2 };
        let mut node = serializer.serialize_struct("Node", fields)?;
        node.serialize_field("name", self.name())?;
        node.serialize_field("identity", &self.identity())?;
        if self.has_children() {
            node.serialize_field("children", &Children(*self))?;
        } else {
            node.skip_field("children")?;
        }
        node.end()
    }
}

struct Children<'a>(NodeRef<'a>);

impl Serialize for Children<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.child_nodes())
    }
}

impl Snapshot {
    /// Nested JSON of the whole hierarchy.
    ///
    /// # Errors
    ///
    /// Errors when `serde_json` fails to build the value.
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

#[test]
fn example_as_json() {
    let live = vec![
        crate::LiveNode::new(
            IdentityKey::new(1),
            "A",
            vec![crate::LiveNode::new_leaf(IdentityKey::new(10), "X")],
        )
        .unwrap(),
        crate::LiveNode::new_leaf(IdentityKey::new(2), "B"),
    ];
    let mut sync = crate::HierarchySync::new(crate::LiveTreeCursor::new(&live));
    sync.refresh().unwrap();

    let json = sync.snapshot().to_json().unwrap();
    pretty_assertions::assert_eq!(
        json,
        serde_json::json!([
            { "name": "A", "identity": 1, "children": [{ "name": "X", "identity": 10 }] },
            { "name": "B", "identity": 2 },
        ])
    );
}
