//! Idempotent injection of download controls.

use std::collections::HashMap;

use uuid::Uuid;

use crate::dom::{Document, NodeId};
use crate::download::DownloadRequest;
use crate::media::ContentLabel;
use crate::resolve::ControlSpec;

/// Visible state of a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    Idle,
    Queued,
    Failed,
}

impl ControlState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlState::Idle => "idle",
            ControlState::Queued => "queued",
            ControlState::Failed => "failed",
        }
    }
}

/// A control attached to a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectedControl {
    pub node: NodeId,
    pub container: NodeId,
    pub label: ContentLabel,
    pub requests: Vec<DownloadRequest>,
}

/// Result of an injection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectOutcome {
    Created(NodeId),
    Unchanged(NodeId),
    Replaced(NodeId),
}

impl InjectOutcome {
    pub fn node(&self) -> NodeId {
        match self {
            InjectOutcome::Created(n) | InjectOutcome::Unchanged(n) | InjectOutcome::Replaced(n) => *n,
        }
    }
}

/// Registry of injected controls, keyed by container.
#[derive(Debug)]
pub struct Injector {
    marker: String,
    controls: HashMap<NodeId, InjectedControl>,
}

impl Default for Injector {
    fn default() -> Self {
        Self::new()
    }
}

impl Injector {
    /// Create an injector with a marker class unique to this process.
    pub fn new() -> Self {
        Self {
            marker: format!("fgrab-control-{}", Uuid::new_v4().simple()),
            controls: HashMap::new(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// The control already present as a direct child of `container`, if any.
    pub fn existing_control(&self, doc: &Document, container: NodeId) -> Option<NodeId> {
        doc.children(container)
            .iter()
            .copied()
            .find(|c| doc.has_class(*c, &self.marker))
    }

    /// Attach a control for `spec` to `container`.
    ///
    /// A container never carries more than one control. An existing control
    /// bound to the same requests is kept; otherwise it is rebound to `spec`.
    pub fn inject(
        &mut self,
        doc: &mut Document,
        container: NodeId,
        spec: &ControlSpec,
        creator_id: &str,
    ) -> InjectOutcome {
        let requests: Vec<DownloadRequest> = spec
            .assets
            .iter()
            .map(|a| DownloadRequest::new(a.url.clone(), creator_id, a.label))
            .collect();

        let class = format!("{} fgrab-control", self.marker);
        let label = spec.label.as_str();
        let state = ControlState::Idle.as_str();

        let outcome = match self.existing_control(doc, container) {
            Some(existing) => {
                let same = self
                    .controls
                    .get(&container)
                    .map(|c| c.node == existing && c.requests == requests && c.label == spec.label)
                    .unwrap_or(false);
                if same {
                    return InjectOutcome::Unchanged(existing);
                }
                // Arena nodes are never freed, so rebind in place.
                doc.set_attribute(existing, "class", &class);
                doc.set_attribute(existing, "data-label", label);
                doc.set_attribute(existing, "data-state", state);
                InjectOutcome::Replaced(existing)
            }
            None => {
                let node = doc.element(
                    "button",
                    &[("class", class.as_str()), ("data-label", label), ("data-state", state)],
                );
                doc.append_child(container, node);
                InjectOutcome::Created(node)
            }
        };
        tracing::debug!(
            "Injected '{}' control on {:?} ({} assets)",
            spec.label,
            container,
            requests.len()
        );

        self.controls.insert(
            container,
            InjectedControl {
                node: outcome.node(),
                container,
                label: spec.label,
                requests,
            },
        );
        outcome
    }

    /// Remove the control attached to `container`.
    pub fn remove(&mut self, doc: &mut Document, container: NodeId) -> bool {
        let registered = self.controls.remove(&container).map(|c| c.node);
        let present = self.existing_control(doc, container);
        for node in registered.into_iter().chain(present) {
            doc.remove(node);
        }
        registered.is_some() || present.is_some()
    }

    /// Remove every control this injector created. Returns how many were removed.
    pub fn remove_all(&mut self, doc: &mut Document) -> usize {
        let mut nodes: Vec<NodeId> = self.controls.drain().map(|(_, c)| c.node).collect();
        let root = doc.root();
        for stray in doc
            .descendants(root)
            .into_iter()
            .filter(|n| doc.has_class(*n, &self.marker))
        {
            if !nodes.contains(&stray) {
                nodes.push(stray);
            }
        }
        for node in &nodes {
            doc.remove(*node);
        }
        nodes.len()
    }

    /// Drop registry entries whose container left the document.
    pub fn forget_disconnected(&mut self, doc: &Document) {
        self.controls.retain(|container, _| doc.is_connected(*container));
    }

    pub fn control(&self, container: NodeId) -> Option<&InjectedControl> {
        self.controls.get(&container)
    }

    /// Find a control by its own node, or by any node inside it.
    pub fn control_by_node(&self, doc: &Document, node: NodeId) -> Option<&InjectedControl> {
        self.controls
            .values()
            .find(|c| c.node == node || doc.is_ancestor_of(c.node, node))
    }

    pub fn set_state(&self, doc: &mut Document, control: NodeId, state: ControlState) {
        if self.controls.values().any(|c| c.node == control) {
            doc.set_attribute(control, "data-state", state.as_str());
        }
    }

    /// Controls currently attached under `container`.
    pub fn count_in(&self, doc: &Document, container: NodeId) -> usize {
        doc.children(container)
            .iter()
            .filter(|c| doc.has_class(**c, &self.marker))
            .count()
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }
}
