//! CLI integration tests, driven by a fake `docker` executable.

#![cfg(unix)]

mod common;
mod flush_tests;
