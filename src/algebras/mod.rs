//! Capability algebras for notion-puller.
//!
//! This module defines traits that represent **capabilities** the core
//! components are handed at construction time, rather than ambient globals.
//! Each trait is:
//!
//! - **Object-safe**: can be used as `dyn Trait`
//! - **Documented with laws**: properties that all implementations must satisfy
//!
//! # Capability Traits
//!
//! - [`EventSink`]: structured observability events from the client and crawler

pub mod events;

pub use events::{EventSink, Field, LogSink, MemorySink, RecordedEvent};
