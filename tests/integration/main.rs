//! Integration tests for the Relatara session core
//! These drive the public API end to end against a real session file

pub mod test_harness;

pub mod file_store_test;
pub mod route_guard_test;
pub mod session_lifecycle_test;
