//! Tests for the interpreter
//!
//! Organized by command family

mod effect_tests;
mod helpers;
