//! Unit tests for the session lifecycle
//!
//! These exercise the controller and the session context against the
//! in-memory persistence and the mock verifier.
