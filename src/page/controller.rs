//! Per-page observation state machine.
//!
//! The controller is driven entirely from the outside: the runtime feeds it
//! mutation batches, gestures, scrolls and timer deadlines, and it reacts by
//! resolving containers and injecting controls into the document.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::api::Ack;
use crate::config::Settings;
use crate::dom::{Document, Markup, NodeId};
use crate::download::DownloadRequest;
use crate::page::events::{classify, ChangeEvent};
use crate::page::inject::{ControlState, InjectOutcome, Injector};
use crate::page::navigation::{swipe_step, Gesture, SlidePointer};
use crate::page::timers::{Scheduler, TimerKind};
use crate::resolve::{group_action, resolve_container, ResolveContext};
use crate::store::SharedStore;

/// Content marker polls before giving up and observing anyway.
pub const SCAN_ATTEMPTS: u32 = 30;
pub const SCAN_INTERVAL: Duration = Duration::from_secs(1);
/// Trailing-edge window for coalesced changes.
pub const DEBOUNCE: Duration = Duration::from_millis(500);
pub const ROUTE_REENTER_DELAY: Duration = Duration::from_secs(1);
pub const LOCATION_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const RETRY_DELAY: Duration = Duration::from_secs(2);
/// Retries after a resolution miss before giving up.
pub const RETRY_LIMIT: u32 = 2;
/// Containers this close to the viewport count as intersecting.
pub const INTERSECTION_MARGIN: f64 = 100.0;

/// Lifecycle of the current viewing context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Scanning { attempt: u32 },
    Active,
}

pub struct PageController {
    markup: Arc<dyn Markup>,
    store: SharedStore,
    settings: watch::Receiver<Settings>,
    injector: Injector,
    scheduler: Scheduler,
    phase: Phase,
    last_location: String,
    pointers: HashMap<NodeId, SlidePointer>,
    focused: Option<NodeId>,
    visible: HashSet<NodeId>,
}

impl PageController {
    pub fn new(markup: Arc<dyn Markup>, store: SharedStore, settings: watch::Receiver<Settings>) -> Self {
        Self {
            markup,
            store,
            settings,
            injector: Injector::new(),
            scheduler: Scheduler::new(),
            phase: Phase::Idle,
            last_location: String::new(),
            pointers: HashMap::new(),
            focused: None,
            visible: HashSet::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn injector(&self) -> &Injector {
        &self.injector
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    /// Begin observing: start location polling and scan for content.
    pub fn start(&mut self, doc: &mut Document, now: Instant) {
        self.last_location = doc.location().to_string();
        self.scheduler
            .schedule_unbound(now + LOCATION_POLL_INTERVAL, TimerKind::LocationPoll);
        self.enter_scanning(now);
        self.advance(doc, now);
    }

    /// Fire every timer due at `now`, each at its own deadline.
    pub fn advance(&mut self, doc: &mut Document, now: Instant) {
        while let Some((deadline, kind)) = self.scheduler.pop_due(now) {
            self.fire(doc, kind, deadline);
        }
    }

    fn fire(&mut self, doc: &mut Document, kind: TimerKind, now: Instant) {
        match kind {
            TimerKind::ScanPoll { attempt } => self.scan(doc, attempt, now),
            TimerKind::Retry { container, remaining } => {
                if self.phase == Phase::Active {
                    tracing::debug!("Retrying {:?} ({} retries left)", container, remaining);
                    self.process_container(doc, container, now, Some(remaining));
                }
            }
            TimerKind::Reinject => {
                if self.phase == Phase::Active {
                    self.reinject_all(doc, now);
                }
            }
            TimerKind::RouteReenter => self.enter_scanning(now),
            TimerKind::LocationPoll => {
                self.check_location(doc, now);
                self.scheduler
                    .schedule_unbound(now + LOCATION_POLL_INTERVAL, TimerKind::LocationPoll);
            }
        }
    }

    fn enter_scanning(&mut self, now: Instant) {
        self.phase = Phase::Scanning { attempt: 0 };
        self.scheduler.schedule(now, TimerKind::ScanPoll { attempt: 1 });
    }

    fn scan(&mut self, doc: &mut Document, attempt: u32, now: Instant) {
        if !matches!(self.phase, Phase::Scanning { .. }) {
            return;
        }
        self.phase = Phase::Scanning { attempt };

        let root = doc.root();
        let found = doc
            .descendants(root)
            .into_iter()
            .any(|n| self.markup.is_content_marker(doc, n));

        if found || attempt >= SCAN_ATTEMPTS {
            if !found {
                tracing::debug!("No content after {} polls, observing anyway", attempt);
            }
            self.activate(doc, now);
        } else {
            self.scheduler.schedule(
                now + SCAN_INTERVAL,
                TimerKind::ScanPoll {
                    attempt: attempt + 1,
                },
            );
        }
    }

    fn activate(&mut self, doc: &mut Document, now: Instant) {
        tracing::debug!("Observing {}", doc.location());
        self.phase = Phase::Active;
        doc.take_records();
        self.reinject_all(doc, now);
    }

    /// Consume pending mutation records.
    ///
    /// Outside the active phase nothing is observing and records are dropped.
    pub fn on_mutations(&mut self, doc: &mut Document, now: Instant) {
        let records = doc.take_records();
        if self.phase != Phase::Active || records.is_empty() {
            return;
        }

        let events = classify(doc, self.markup.as_ref(), self.injector.marker(), &records);
        let mut coalesce = false;
        for event in events {
            tracing::debug!("Change event: {:?}", event);
            match event {
                ChangeEvent::ItemAdded(node) => {
                    self.process_container(doc, node, now, None);
                }
                ChangeEvent::ViewerOpened(node) => {
                    self.focused = Some(node);
                    self.process_container(doc, node, now, None);
                }
                ChangeEvent::ActiveItemChanged(slide) => {
                    if let Some(container) = self.container_of(doc, slide) {
                        let slides = self.markup.slides(doc, container);
                        if let Some(index) = slides.iter().position(|s| *s == slide) {
                            self.pointers.insert(
                                container,
                                SlidePointer {
                                    current: index,
                                    len: slides.len(),
                                },
                            );
                        }
                        self.process_container(doc, container, now, None);
                    }
                }
                ChangeEvent::ItemRemoved(node) => {
                    self.pointers.remove(&node);
                    self.visible.remove(&node);
                    if self.focused == Some(node) {
                        self.focused = None;
                    }
                    coalesce = true;
                }
                ChangeEvent::Structural => coalesce = true,
            }
        }

        if coalesce {
            self.scheduler.reschedule(now + DEBOUNCE, TimerKind::Reinject);
        }
        // Controls injected above are our own records.
        doc.take_records();
    }

    /// A navigation event from the host.
    pub fn on_navigation(&mut self, doc: &mut Document, now: Instant) {
        self.check_location(doc, now);
    }

    fn check_location(&mut self, doc: &mut Document, now: Instant) {
        if doc.location() == self.last_location {
            return;
        }
        tracing::info!("Route changed: {} -> {}", self.last_location, doc.location());
        self.last_location = doc.location().to_string();
        self.teardown(doc);
        self.scheduler
            .schedule(now + ROUTE_REENTER_DELAY, TimerKind::RouteReenter);
    }

    /// Drop every control and invalidate every pending timer of this page.
    pub fn teardown(&mut self, doc: &mut Document) {
        let epoch = self.scheduler.bump_epoch();
        let removed = self.injector.remove_all(doc);
        tracing::debug!("Teardown: removed {} controls, now at epoch {}", removed, epoch);
        self.pointers.clear();
        self.visible.clear();
        self.focused = None;
        self.phase = Phase::Idle;
        doc.take_records();
    }

    /// The viewport moved; resolve containers that just came into range.
    pub fn on_scroll(&mut self, doc: &mut Document, now: Instant) {
        if self.phase != Phase::Active {
            return;
        }
        let area = doc.viewport().expand(INTERSECTION_MARGIN);
        let visible: HashSet<NodeId> = self
            .containers(doc)
            .into_iter()
            .filter(|c| doc.rect(*c).intersects(&area))
            .collect();

        let mut entering: Vec<NodeId> = visible.difference(&self.visible).copied().collect();
        entering.sort();
        for container in entering {
            self.process_container(doc, container, now, None);
        }
        self.visible = visible;
        self.scheduler.reschedule(now + DEBOUNCE, TimerKind::Reinject);
        doc.take_records();
    }

    /// New API data reached the store; misses may now resolve.
    pub fn on_api_data(&mut self, now: Instant) {
        if self.phase == Phase::Active {
            self.scheduler.reschedule(now + DEBOUNCE, TimerKind::Reinject);
        }
    }

    /// The preferred quality or folder setting changed.
    pub fn on_settings_changed(&mut self, doc: &mut Document, now: Instant) {
        if self.phase == Phase::Active {
            self.reinject_all(doc, now);
            doc.take_records();
        }
    }

    /// Handle in-viewer navigation. Returns the container whose active item changed.
    pub fn on_gesture(&mut self, doc: &mut Document, gesture: Gesture, now: Instant) -> Option<NodeId> {
        if self.phase != Phase::Active {
            return None;
        }

        let (container, step, select) = match gesture {
            Gesture::ArrowLeft => (self.key_target(doc)?, -1, None),
            Gesture::ArrowRight => (self.key_target(doc)?, 1, None),
            Gesture::Swipe { target, dx, dy } => {
                let step = swipe_step(dx, dy)?;
                (self.container_of(doc, target)?, step, None)
            }
            Gesture::Click(node) => {
                let index = self.markup.nav_target(doc, node)?;
                (self.container_of(doc, node)?, 0, Some(index))
            }
        };
        self.focused = Some(container);

        let mut pointer = self.pointer_for(doc, container)?;
        let moved = match select {
            Some(index) => pointer.select(index),
            None => pointer.step(step),
        };
        if !moved {
            return None;
        }
        self.pointers.insert(container, pointer);
        self.process_container(doc, container, now, None);
        doc.take_records();
        Some(container)
    }

    /// Requests bound to the control containing `node`; marks it queued.
    pub fn on_control_click(&mut self, doc: &mut Document, node: NodeId) -> Option<(NodeId, Vec<DownloadRequest>)> {
        let control = self.injector.control_by_node(doc, node)?;
        let (control_node, requests) = (control.node, control.requests.clone());
        self.injector.set_state(doc, control_node, ControlState::Queued);
        doc.take_records();
        Some((control_node, requests))
    }

    /// Reflect the executor's acknowledgement on the control.
    pub fn on_ack(&mut self, doc: &mut Document, control: NodeId, ack: &Ack) {
        let state = if ack.success {
            ControlState::Queued
        } else {
            ControlState::Failed
        };
        self.injector.set_state(doc, control, state);
        doc.take_records();
    }

    /// Resolve and inject every container in the document.
    pub fn reinject_all(&mut self, doc: &mut Document, now: Instant) {
        self.injector.forget_disconnected(doc);
        for container in self.containers(doc) {
            self.process_container(doc, container, now, None);
        }
    }

    /// Resolve one container and attach its control.
    ///
    /// A miss removes any stale control and schedules a bounded retry.
    /// `remaining` is `Some` when called from a retry timer.
    pub fn process_container(
        &mut self,
        doc: &mut Document,
        container: NodeId,
        now: Instant,
        remaining: Option<u32>,
    ) -> Option<InjectOutcome> {
        if !doc.is_connected(container) {
            return None;
        }

        let root = self.focus_root(doc, container);
        let quality = self.settings.borrow().quality;
        let spec = {
            let store = self.store.read();
            let ctx = ResolveContext {
                doc,
                container: root,
                store: &store,
                markup: self.markup.as_ref(),
                quality,
            };
            group_action(resolve_container(&ctx))
        };

        if let Some(spec) = spec {
            let creator = self.markup.creator_id(doc, container).unwrap_or_default();
            return Some(self.injector.inject(doc, container, &spec, &creator));
        }

        self.injector.remove(doc, container);
        let next = match remaining {
            None => {
                let pending = self.scheduler.any_pending(
                    |k| matches!(k, TimerKind::Retry { container: c, .. } if *c == container),
                );
                (!pending).then_some(RETRY_LIMIT - 1)
            }
            Some(0) => {
                tracing::debug!("Giving up on {:?}", container);
                None
            }
            Some(r) => Some(r - 1),
        };
        if let Some(remaining) = next {
            self.scheduler.schedule(
                now + RETRY_DELAY,
                TimerKind::Retry {
                    container,
                    remaining,
                },
            );
        }
        None
    }

    fn containers(&self, doc: &Document) -> Vec<NodeId> {
        doc.descendants(doc.root())
            .into_iter()
            .filter(|n| self.markup.is_container(doc, *n))
            .collect()
    }

    fn container_of(&self, doc: &Document, node: NodeId) -> Option<NodeId> {
        doc.closest(node, |n| self.markup.is_container(doc, n))
    }

    /// Arrow keys act on the open viewer, else on the last focused container.
    fn key_target(&self, doc: &Document) -> Option<NodeId> {
        let viewer = doc
            .descendants(doc.root())
            .into_iter()
            .find(|n| self.markup.is_viewer(doc, *n));
        viewer.or(self.focused.filter(|f| doc.is_connected(*f)))
    }

    fn pointer_for(&self, doc: &Document, container: NodeId) -> Option<SlidePointer> {
        let len = self.markup.slides(doc, container).len();
        self.pointers
            .get(&container)
            .copied()
            .filter(|p| p.len == len && p.current < len)
            .or_else(|| SlidePointer::from_document(doc, self.markup.as_ref(), container))
    }

    /// The subtree a container's control resolves against: its current slide, if any.
    fn focus_root(&self, doc: &Document, container: NodeId) -> NodeId {
        let slides = self.markup.slides(doc, container);
        match self.pointer_for(doc, container) {
            Some(p) => slides.get(p.current).copied().unwrap_or(container),
            None => container,
        }
    }
}
