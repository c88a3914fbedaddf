//! Test suites for the client engine.

mod support;
