//! Markup conventions: which elements are posts, viewers, slides and players.

use crate::dom::document::{Document, NodeId};

/// Selectors for a specific site layout.
pub trait Markup: Send + Sync {
    /// A post or chat message carrying media.
    fn is_post(&self, doc: &Document, node: NodeId) -> bool;

    /// A full-screen media viewer / lightbox.
    fn is_viewer(&self, doc: &Document, node: NodeId) -> bool;

    /// One slide of a carousel or viewer.
    fn is_slide(&self, doc: &Document, node: NodeId) -> bool;

    /// A player shell wrapping a video element.
    fn is_video_container(&self, doc: &Document, node: NodeId) -> bool;

    /// A carousel dot or thumbnail strip entry; returns the slide index it selects.
    fn nav_target(&self, doc: &Document, node: NodeId) -> Option<usize>;

    /// Post identifier declared by the container or its ancestors.
    fn post_id(&self, doc: &Document, node: NodeId) -> Option<String>;

    /// Creator identifier for a container, falling back to the page location.
    fn creator_id(&self, doc: &Document, node: NodeId) -> Option<String>;

    /// Elements whose presence means the page has rendered content.
    fn is_content_marker(&self, doc: &Document, node: NodeId) -> bool {
        self.is_post(doc, node) || self.is_viewer(doc, node)
    }

    /// Posts and viewers can both host a control.
    fn is_container(&self, doc: &Document, node: NodeId) -> bool {
        self.is_post(doc, node) || self.is_viewer(doc, node)
    }

    /// Slides of a container in document order.
    fn slides(&self, doc: &Document, container: NodeId) -> Vec<NodeId> {
        doc.descendants(container)
            .into_iter()
            .filter(|n| self.is_slide(doc, *n))
            .collect()
    }
}

/// Data-attribute conventions used by the Fansly web client.
#[derive(Debug, Clone, Default)]
pub struct DefaultMarkup;

/// Location path segments that are routes, not creator names.
const RESERVED_ROUTES: &[&str] = &[
    "home", "messages", "post", "explore", "notifications", "settings", "collection", "lists",
];

impl Markup for DefaultMarkup {
    fn is_post(&self, doc: &Document, node: NodeId) -> bool {
        doc.attr(node, "data-post-id").is_some()
            || doc.attr(node, "data-message-id").is_some()
            || doc.tag(node) == "app-post"
    }

    fn is_viewer(&self, doc: &Document, node: NodeId) -> bool {
        doc.has_class(node, "media-viewer") || doc.tag(node) == "app-media-viewer"
    }

    fn is_slide(&self, doc: &Document, node: NodeId) -> bool {
        doc.has_class(node, "slide") || doc.has_class(node, "carousel-item")
    }

    fn is_video_container(&self, doc: &Document, node: NodeId) -> bool {
        doc.has_class(node, "video-player")
            || doc.has_class(node, "video-container")
            || doc.tag(node) == "app-video-player"
    }

    fn nav_target(&self, doc: &Document, node: NodeId) -> Option<usize> {
        if !(doc.has_class(node, "carousel-dot") || doc.has_class(node, "thumbnail")) {
            return None;
        }
        doc.attr(node, "data-index")?.parse().ok()
    }

    fn post_id(&self, doc: &Document, node: NodeId) -> Option<String> {
        let owner = doc.closest(node, |n| {
            doc.attr(n, "data-post-id").is_some() || doc.attr(n, "data-message-id").is_some()
        })?;
        doc.attr(owner, "data-post-id")
            .or_else(|| doc.attr(owner, "data-message-id"))
            .map(str::to_string)
    }

    fn creator_id(&self, doc: &Document, node: NodeId) -> Option<String> {
        let declared = doc
            .closest(node, |n| doc.attr(n, "data-creator").is_some())
            .and_then(|n| doc.attr(n, "data-creator"))
            .filter(|c| !c.trim().is_empty());
        if let Some(creator) = declared {
            return Some(creator.to_string());
        }

        let url = url::Url::parse(doc.location()).ok()?;
        let first = url.path_segments()?.find(|s| !s.is_empty())?;
        if RESERVED_ROUTES.contains(&first) {
            None
        } else {
            Some(first.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_and_creator_ids() {
        let mut doc = Document::new("https://fansly.com/Bob/posts");
        let root = doc.root();
        let post = doc.element("div", &[("data-post-id", "42")]);
        let img = doc.element("img", &[]);
        doc.append_child(root, post);
        doc.append_child(post, img);

        let markup = DefaultMarkup;
        assert_eq!(markup.post_id(&doc, img).as_deref(), Some("42"));
        assert_eq!(markup.creator_id(&doc, img).as_deref(), Some("Bob"));

        doc.set_attribute(post, "data-creator", "Alice");
        assert_eq!(markup.creator_id(&doc, img).as_deref(), Some("Alice"));
    }

    #[test]
    fn test_reserved_route_has_no_creator() {
        let mut doc = Document::new("https://fansly.com/messages/123");
        let root = doc.root();
        assert_eq!(DefaultMarkup.creator_id(&doc, root), None);
        doc.set_location("https://fansly.com/post/1234567890123");
        assert_eq!(DefaultMarkup.creator_id(&doc, root), None);
    }

    #[test]
    fn test_nav_target() {
        let mut doc = Document::new("https://fansly.com/home");
        let dot = doc.element("span", &[("class", "carousel-dot"), ("data-index", "2")]);
        let other = doc.element("span", &[("data-index", "2")]);
        assert_eq!(DefaultMarkup.nav_target(&doc, dot), Some(2));
        assert_eq!(DefaultMarkup.nav_target(&doc, other), None);
    }
}
