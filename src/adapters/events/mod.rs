//! Event sink adapters.

mod in_memory;
mod tracing_sink;

pub use in_memory::InMemoryEventBus;
pub use tracing_sink::TracingEventSink;
