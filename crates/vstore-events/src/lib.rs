//! Version notifications.
//!
//! Before an object version is committed, the engine publishes an
//! [`ObjectVersionCreatingEvent`] keyed by the object id. Delivery is
//! at-least-once and ordered only within one key.

pub mod error;
pub mod event;
pub mod memory;
pub mod traits;

pub use error::{EventError, EventResult};
pub use event::{EventEnvelope, ObjectVersionCreatingEvent};
pub use memory::{EventStream, InMemoryEventPublisher};
pub use traits::EventPublisher;
