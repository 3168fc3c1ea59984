//! Typed change events derived from mutation records.

use crate::dom::{Document, Markup, Mutation, NodeId};

/// Attributes whose changes are observed; all others are ignored.
pub const OBSERVED_ATTRIBUTES: &[&str] = &["class", "aria-hidden", "style"];

/// A change the injection layer reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// A post-like node was inserted.
    ItemAdded(NodeId),
    /// A viewer node was inserted.
    ViewerOpened(NodeId),
    /// A viewer slide became visible.
    ActiveItemChanged(NodeId),
    /// A post-like or viewer node was removed.
    ItemRemoved(NodeId),
    /// Anything else under observation.
    Structural,
}

impl ChangeEvent {
    /// Immediate events bypass the debounce window.
    pub fn is_immediate(&self) -> bool {
        matches!(
            self,
            ChangeEvent::ItemAdded(_) | ChangeEvent::ViewerOpened(_) | ChangeEvent::ActiveItemChanged(_)
        )
    }
}

/// Classify a batch of mutation records.
///
/// Nodes carrying `marker_class` are our own controls and never produce events.
pub fn classify(
    doc: &Document,
    markup: &dyn Markup,
    marker_class: &str,
    records: &[Mutation],
) -> Vec<ChangeEvent> {
    let mut events = Vec::new();

    for record in records {
        match record {
            Mutation::ChildList { added, removed, .. } => {
                for node in added.iter().filter(|n| !doc.has_class(**n, marker_class)) {
                    classify_added(doc, markup, *node, &mut events);
                }
                for node in removed.iter().filter(|n| !doc.has_class(**n, marker_class)) {
                    if markup.is_container(doc, *node) {
                        events.push(ChangeEvent::ItemRemoved(*node));
                    } else {
                        events.push(ChangeEvent::Structural);
                    }
                }
            }
            Mutation::Attribute {
                target,
                name,
                old_value,
            } => {
                if !OBSERVED_ATTRIBUTES.contains(&name.as_str()) {
                    continue;
                }
                if doc.has_class(*target, marker_class) {
                    continue;
                }
                let became_visible = name == "aria-hidden"
                    && doc.attr(*target, "aria-hidden") == Some("false")
                    && old_value.as_deref() != Some("false");
                if became_visible && markup.is_slide(doc, *target) {
                    events.push(ChangeEvent::ActiveItemChanged(*target));
                } else {
                    events.push(ChangeEvent::Structural);
                }
            }
        }
    }

    events
}

fn classify_added(doc: &Document, markup: &dyn Markup, node: NodeId, events: &mut Vec<ChangeEvent>) {
    let mut found = false;
    for n in std::iter::once(node).chain(doc.descendants(node)) {
        if markup.is_viewer(doc, n) {
            events.push(ChangeEvent::ViewerOpened(n));
            found = true;
        } else if markup.is_post(doc, n) {
            events.push(ChangeEvent::ItemAdded(n));
            found = true;
        }
    }
    if !found {
        events.push(ChangeEvent::Structural);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::DefaultMarkup;

    const MARKER: &str = "fgrab-test";

    #[test]
    fn test_inserted_wrapper_with_posts() {
        let mut doc = Document::new("https://fansly.com/home");
        let root = doc.root();
        let wrapper = doc.element("div", &[]);
        let a = doc.element("div", &[("data-post-id", "1")]);
        let b = doc.element("div", &[("data-post-id", "2")]);
        doc.append_child(wrapper, a);
        doc.append_child(wrapper, b);
        doc.append_child(root, wrapper);

        let records = doc.take_records();
        let events = classify(&doc, &DefaultMarkup, MARKER, &records);
        assert_eq!(events, vec![ChangeEvent::ItemAdded(a), ChangeEvent::ItemAdded(b)]);
        assert!(events.iter().all(ChangeEvent::is_immediate));
    }

    #[test]
    fn test_slide_visibility_is_immediate() {
        let mut doc = Document::new("https://fansly.com/home");
        let root = doc.root();
        let slide = doc.element("div", &[("class", "slide"), ("aria-hidden", "true")]);
        doc.append_child(root, slide);
        doc.take_records();

        doc.set_attribute(slide, "aria-hidden", "false");
        let records = doc.take_records();
        assert_eq!(
            classify(&doc, &DefaultMarkup, MARKER, &records),
            vec![ChangeEvent::ActiveItemChanged(slide)]
        );

        doc.set_attribute(slide, "aria-hidden", "false");
        let records = doc.take_records();
        assert_eq!(
            classify(&doc, &DefaultMarkup, MARKER, &records),
            vec![ChangeEvent::Structural]
        );
    }

    #[test]
    fn test_unobserved_attributes_and_own_controls_ignored() {
        let mut doc = Document::new("https://fansly.com/home");
        let root = doc.root();
        let div = doc.element("div", &[]);
        doc.append_child(root, div);
        doc.take_records();

        doc.set_attribute(div, "data-foo", "1");
        let control = doc.element("button", &[("class", MARKER)]);
        doc.append_child(div, control);
        doc.set_attribute(control, "class", &format!("{} active", MARKER));

        let records = doc.take_records();
        assert_eq!(records.len(), 3);
        assert!(classify(&doc, &DefaultMarkup, MARKER, &records).is_empty());
    }

    #[test]
    fn test_removal_and_style_are_coalesced() {
        let mut doc = Document::new("https://fansly.com/home");
        let root = doc.root();
        let post = doc.element("div", &[("data-post-id", "1")]);
        doc.append_child(root, post);
        doc.take_records();

        doc.set_attribute(post, "style", "display:none");
        doc.remove(post);
        let records = doc.take_records();
        let events = classify(&doc, &DefaultMarkup, MARKER, &records);
        assert_eq!(events, vec![ChangeEvent::Structural, ChangeEvent::ItemRemoved(post)]);
        assert!(events.iter().all(|e| !e.is_immediate()));
    }
}
