//! Document observation and control injection.
//!
//! Mutation records are classified into typed events; immediate events
//! resolve their container on the spot, everything else is coalesced into a
//! debounced re-injection pass. All timers are epoch-tokened so a route
//! change invalidates everything scheduled for the previous page.

pub mod controller;
pub mod events;
pub mod inject;
pub mod navigation;
pub mod runtime;
pub mod timers;

pub use controller::{PageController, Phase};
pub use events::{classify, ChangeEvent};
pub use inject::{ControlState, InjectOutcome, InjectedControl, Injector};
pub use navigation::{swipe_step, Gesture, SlidePointer};
pub use runtime::{Mutator, PageEvent, PageHandle, PageRuntime};
pub use timers::{Scheduler, TimerKind};
