//! Tactile Search Core Library
//!
//! This library provides the active-inference controller for tactile search:
//! - Generative model construction and precision reweighting
//! - Mean-field belief updating and expected-free-energy policy scoring
//! - The decision endpoint control loop and its wire protocol
//! - The robot endpoint (shared touch state, Sense/Act tasks, devices)
//! - Exit codes and structured logging for the CLI
//!
//! The binary entry point is in `main.rs`.

pub mod channel;
pub mod config;
pub mod control;
pub mod decision;
pub mod environment;
pub mod exit_codes;
pub mod inference;
pub mod logging;
pub mod model;
pub mod robot;
pub mod simulate;
