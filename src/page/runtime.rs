//! Async driver for one page.
//!
//! Owns the document and its controller and serializes every input through a
//! single channel, sleeping until the next timer deadline in between.

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use crate::api::{Ack, ApiDataEvent};
use crate::config::Settings;
use crate::dom::{Document, NodeId, Rect};
use crate::download::DownloadQueue;
use crate::error::{Error, Result};
use crate::page::controller::PageController;
use crate::page::navigation::Gesture;

/// Document mutation applied inside the runtime.
pub type Mutator = Box<dyn FnOnce(&mut Document) + Send>;

/// Inputs to a page runtime.
pub enum PageEvent {
    /// Apply a change to the document, then observe it.
    Mutate(Mutator),
    /// The host reported a navigation.
    Navigate(String),
    Gesture(Gesture),
    /// The viewport moved.
    Scroll(Rect),
    ApiData(ApiDataEvent),
    ControlClicked(NodeId),
    Shutdown,
}

/// Sending side of a page runtime.
#[derive(Clone)]
pub struct PageHandle {
    tx: mpsc::UnboundedSender<PageEvent>,
}

impl PageHandle {
    pub fn send(&self, event: PageEvent) -> Result<()> {
        self.tx.send(event).map_err(|_| Error::PageClosed)
    }

    pub fn mutate(&self, f: impl FnOnce(&mut Document) + Send + 'static) -> Result<()> {
        self.send(PageEvent::Mutate(Box::new(f)))
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send(PageEvent::Shutdown)
    }
}

pub struct PageRuntime {
    doc: Document,
    controller: PageController,
    queue: DownloadQueue,
    settings: watch::Receiver<Settings>,
    events: mpsc::UnboundedReceiver<PageEvent>,
}

impl PageRuntime {
    pub fn new(
        doc: Document,
        controller: PageController,
        queue: DownloadQueue,
        settings: watch::Receiver<Settings>,
    ) -> (Self, PageHandle) {
        let (tx, events) = mpsc::unbounded_channel();
        let runtime = Self {
            doc,
            controller,
            queue,
            settings,
            events,
        };
        (runtime, PageHandle { tx })
    }

    /// Run until shut down or every handle is dropped. Returns the final document.
    pub async fn run(mut self) -> Document {
        self.controller.start(&mut self.doc, Instant::now());
        let mut settings_open = true;

        loop {
            let deadline = self.controller.next_deadline();
            tokio::select! {
                event = self.events.recv() => match event {
                    None | Some(PageEvent::Shutdown) => break,
                    Some(event) => self.handle(event),
                },
                changed = self.settings.changed(), if settings_open => {
                    if changed.is_err() {
                        settings_open = false;
                    } else {
                        self.controller.on_settings_changed(&mut self.doc, Instant::now());
                    }
                }
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.controller.advance(&mut self.doc, Instant::now());
                }
            }
        }

        self.controller.teardown(&mut self.doc);
        self.doc
    }

    fn handle(&mut self, event: PageEvent) {
        let now = Instant::now();
        let doc = &mut self.doc;
        match event {
            PageEvent::Mutate(f) => {
                f(doc);
                self.controller.on_mutations(doc, now);
            }
            PageEvent::Navigate(location) => {
                doc.set_location(location);
                self.controller.on_navigation(doc, now);
            }
            PageEvent::Gesture(gesture) => {
                self.controller.on_mutations(doc, now);
                self.controller.on_gesture(doc, gesture, now);
            }
            PageEvent::Scroll(viewport) => {
                doc.set_viewport(viewport);
                self.controller.on_scroll(doc, now);
            }
            PageEvent::ApiData(event) => {
                tracing::debug!("API data received (dm: {})", event.is_for_dm);
                self.controller.on_api_data(now);
            }
            PageEvent::ControlClicked(node) => {
                let Some((control, requests)) = self.controller.on_control_click(doc, node) else {
                    tracing::debug!("Click on {:?} is not on a control", node);
                    return;
                };
                let errors: Vec<String> = requests
                    .into_iter()
                    .filter_map(|request| self.queue.enqueue(request).err())
                    .map(|e| e.to_string())
                    .collect();
                let ack = errors.into_iter().next().map(Ack::failed).unwrap_or_else(Ack::ok);
                self.controller.on_ack(doc, control, &ack);
            }
            PageEvent::Shutdown => {}
        }
    }
}
