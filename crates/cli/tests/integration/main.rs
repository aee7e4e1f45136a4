//! End-to-end runs against scripted stand-ins for cmake and ctest.

#![cfg(unix)]

mod common;
mod run_tests;
