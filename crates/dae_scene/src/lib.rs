//! Scene graph, registries, and the two-thread game loop.
//!
//! The `Engine` context object owns everything that the original style of
//! framework would park in process-wide statics: the active-element roster,
//! the depth-sorted stage, input state, the resource cache, and the two
//! scheduler threads. Platform concerns (window surface, bitmap decoding,
//! audio device, settings storage) enter through the collaborator traits in
//! `target`, `resource`, `sink`, and `store`.

pub mod element;
pub mod registry;
pub mod resource;
pub mod save;
pub mod scheduler;
pub mod sink;
pub mod store;
pub mod target;

pub use element::{Behavior, Element, ElementHandle, ElementKind};
pub use registry::{set_depth, Roster, Stage};
pub use resource::{Pixmap, ResourceCache, ResourceId, ResourceLoader};
pub use save::{FieldReader, Saveable, SaveableHandle, StateRegistry};
pub use scheduler::{Engine, EngineThreads};
pub use sink::AudioSink;
pub use store::{KeyValueStore, MemoryStore};
pub use target::RenderTarget;
