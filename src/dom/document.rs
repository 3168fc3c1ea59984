//! Arena-backed document tree with mutation records.

use std::collections::BTreeMap;

/// Handle to an element in a [`Document`]. Only valid for the document that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Layout box in document coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Shortest gap between two boxes; zero when they touch or overlap.
    pub fn distance_to(&self, other: &Rect) -> f64 {
        let dx = (other.x - self.right()).max(self.x - other.right()).max(0.0);
        let dy = (other.y - self.bottom()).max(self.y - other.bottom()).max(0.0);
        (dx * dx + dy * dy).sqrt()
    }

    /// Grow the box by `margin` on every side.
    pub fn expand(&self, margin: f64) -> Rect {
        Rect::new(
            self.x - margin,
            self.y - margin,
            self.width + 2.0 * margin,
            self.height + 2.0 * margin,
        )
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// A change to the connected tree, as a structural observer would report it.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    ChildList {
        target: NodeId,
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
    },
    Attribute {
        target: NodeId,
        name: String,
        old_value: Option<String>,
    },
}

#[derive(Debug, Clone)]
struct Element {
    tag: String,
    attrs: BTreeMap<String, String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    rect: Rect,
}

/// The live document: element tree, location and viewport.
///
/// Only changes under the root are recorded; building a detached subtree and
/// attaching it produces a single child-list record.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Element>,
    root: NodeId,
    location: String,
    viewport: Rect,
    records: Vec<Mutation>,
}

impl Document {
    pub fn new(location: impl Into<String>) -> Self {
        let root = Element {
            tag: "body".to_string(),
            attrs: BTreeMap::new(),
            parent: None,
            children: Vec::new(),
            rect: Rect::default(),
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            location: location.into(),
            viewport: Rect::new(0.0, 0.0, 1280.0, 800.0),
            records: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes ever created, attached or not.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Client-side navigation. Does not touch the tree.
    pub fn set_location(&mut self, location: impl Into<String>) {
        self.location = location.into();
    }

    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Rect) {
        self.viewport = viewport;
    }

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.nodes.push(Element {
            tag: tag.to_ascii_lowercase(),
            attrs: BTreeMap::new(),
            parent: None,
            children: Vec::new(),
            rect: Rect::default(),
        });
        NodeId(self.nodes.len() - 1)
    }

    /// Create a detached element with attributes.
    pub fn element(&mut self, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let id = self.create_element(tag);
        for (name, value) in attrs {
            self.nodes[id.0]
                .attrs
                .insert(name.to_string(), value.to_string());
        }
        id
    }

    /// Append `child` under `parent`, detaching it from any previous parent first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if parent == child || self.is_ancestor_of(child, parent) {
            return;
        }
        if self.nodes[child.0].parent.is_some() {
            self.remove(child);
        }
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);

        if self.is_connected(parent) {
            self.records.push(Mutation::ChildList {
                target: parent,
                added: vec![child],
                removed: Vec::new(),
            });
        }
    }

    /// Detach `node` (and its subtree) from its parent.
    pub fn remove(&mut self, node: NodeId) {
        let Some(parent) = self.nodes[node.0].parent else {
            return;
        };
        let connected = self.is_connected(parent);
        self.nodes[parent.0].children.retain(|c| *c != node);
        self.nodes[node.0].parent = None;

        if connected {
            self.records.push(Mutation::ChildList {
                target: parent,
                added: Vec::new(),
                removed: vec![node],
            });
        }
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        let old_value = self.nodes[node.0]
            .attrs
            .insert(name.to_string(), value.to_string());
        if self.is_connected(node) {
            self.records.push(Mutation::Attribute {
                target: node,
                name: name.to_string(),
                old_value,
            });
        }
    }

    pub fn remove_attribute(&mut self, node: NodeId, name: &str) {
        let old_value = self.nodes[node.0].attrs.remove(name);
        if old_value.is_some() && self.is_connected(node) {
            self.records.push(Mutation::Attribute {
                target: node,
                name: name.to_string(),
                old_value,
            });
        }
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.nodes[node.0].attrs.get(name).map(String::as_str)
    }

    pub fn tag(&self, node: NodeId) -> &str {
        &self.nodes[node.0].tag
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attr(node, "class")
            .map(|c| c.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) {
        if self.has_class(node, class) {
            return;
        }
        let classes = match self.attr(node, "class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing, class),
            _ => class.to_string(),
        };
        self.set_attribute(node, "class", &classes);
    }

    pub fn rect(&self, node: NodeId) -> Rect {
        self.nodes[node.0].rect
    }

    /// Set the layout box. Layout is not a structural change and is not recorded.
    pub fn set_rect(&mut self, node: NodeId, rect: Rect) {
        self.nodes[node.0].rect = rect;
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    /// Ancestors from the parent upwards.
    pub fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(node), move |n| self.parent(*n))
    }

    /// Descendants in document order, excluding `node` itself.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).iter().rev().copied().collect();
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.children(n).iter().rev().copied());
        }
        out
    }

    /// Nearest node, starting with `node` itself, matching `pred`.
    pub fn closest(&self, node: NodeId, pred: impl Fn(NodeId) -> bool) -> Option<NodeId> {
        std::iter::once(node)
            .chain(self.ancestors(node))
            .find(|n| pred(*n))
    }

    pub fn is_connected(&self, node: NodeId) -> bool {
        node == self.root || self.ancestors(node).any(|a| a == self.root)
    }

    /// Whether `ancestor` contains `node` (strictly).
    pub fn is_ancestor_of(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).any(|a| a == ancestor)
    }

    /// Drain the mutation records collected since the last call.
    pub fn take_records(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detached_building_records_single_insert() {
        let mut doc = Document::new("https://fansly.com/home");
        let post = doc.element("div", &[("data-post-id", "1")]);
        let img = doc.element("img", &[("src", "https://x/a.jpg")]);
        doc.append_child(post, img);
        doc.set_attribute(img, "alt", "a");
        assert!(doc.take_records().is_empty());

        let root = doc.root();
        doc.append_child(root, post);
        let records = doc.take_records();
        assert_eq!(
            records,
            vec![Mutation::ChildList {
                target: root,
                added: vec![post],
                removed: vec![]
            }]
        );
    }

    #[test]
    fn test_attribute_records_old_value() {
        let mut doc = Document::new("https://fansly.com/home");
        let slide = doc.element("div", &[("aria-hidden", "true")]);
        let root = doc.root();
        doc.append_child(root, slide);
        doc.take_records();

        doc.set_attribute(slide, "aria-hidden", "false");
        assert_eq!(
            doc.take_records(),
            vec![Mutation::Attribute {
                target: slide,
                name: "aria-hidden".into(),
                old_value: Some("true".into())
            }]
        );
    }

    #[test]
    fn test_tree_queries() {
        let mut doc = Document::new("https://fansly.com/home");
        let root = doc.root();
        let a = doc.element("div", &[("class", "post feed-item")]);
        let b = doc.element("div", &[]);
        let c = doc.element("video", &[]);
        doc.append_child(root, a);
        doc.append_child(a, b);
        doc.append_child(b, c);

        assert_eq!(doc.descendants(a), vec![b, c]);
        assert_eq!(doc.ancestors(c).collect::<Vec<_>>(), vec![b, a, root]);
        assert_eq!(doc.closest(c, |n| doc.has_class(n, "post")), Some(a));
        assert!(doc.is_connected(c));

        doc.remove(b);
        assert!(!doc.is_connected(c));
        assert_eq!(doc.children(a), &[] as &[NodeId]);
    }

    #[test]
    fn test_add_class_is_idempotent() {
        let mut doc = Document::new("https://fansly.com/home");
        let a = doc.element("div", &[("class", "one")]);
        doc.add_class(a, "two");
        doc.add_class(a, "two");
        assert_eq!(doc.attr(a, "class"), Some("one two"));
    }

    #[test]
    fn test_rect_distance_and_intersection() {
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        let b = Rect::new(150.0, 0.0, 50.0, 50.0);
        let c = Rect::new(50.0, 50.0, 10.0, 10.0);

        assert_eq!(a.distance_to(&b), 50.0);
        assert_eq!(a.distance_to(&c), 0.0);
        assert!(!a.intersects(&b));
        assert!(a.expand(60.0).intersects(&b));
    }
}
