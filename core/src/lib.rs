//! The concurrent work-distribution engine.
//!
//! A fixed pool of workers drains a queue of host identifiers, runs one
//! command per host through a [`session::SessionFactory`], classifies each
//! failure and reports every outcome through a serialized [`sink::OutputSink`].
//! The [`dispatcher`] owns the pool lifecycle: spawn, feed, wait for drain
//! or abort, tear down.

pub mod control;
pub mod dispatcher;
pub mod queue;
pub mod session;
pub mod sink;
pub mod worker;
