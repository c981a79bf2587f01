//! Clock, update pipeline, collapse controller and state store for the
//! Entropy Engine.
//!
//! This crate owns the five-stage tick that drives the simulation: task
//! decay, entropy accumulation, collapse check, metric drift and pattern
//! lifecycle. Everything a tick or action does is a pure transform of the
//! prior [`SystemState`](entropy_types::SystemState); the [`store`] applies
//! those transforms one at a time and publishes the result.
//!
//! # Modules
//!
//! - [`clock`] -- [`TickSource`](clock::TickSource) trait, wall-clock,
//!   fixed-step and manual sources, delta clamping.
//! - [`config`] -- Configuration loading from `entropy-config.yaml` into
//!   strongly-typed structs.
//! - [`tick`] -- The five-stage update pipeline.
//! - [`collapse`] -- Termination predicate and post-collapse state.
//! - [`actions`] -- One-shot mutations: inject, spawn, add/complete task,
//!   force collapse.
//! - [`spawn`] -- Randomized patterns, tasks and metric re-seeding.
//! - [`store`] -- Single-writer [`StateStore`](store::StateStore) with
//!   snapshot reads, watch channel and synchronous listeners.
//! - [`history`] -- Collapse history listener.
//! - [`events`] -- Event log listener.
//! - [`operator`] -- Pause/resume/speed/stop controls and run bounds.
//! - [`runner`] -- The async loop tying clock, store and operator together.

pub mod actions;
pub mod clock;
pub mod collapse;
pub mod config;
pub mod events;
pub mod history;
pub mod operator;
pub mod runner;
pub mod spawn;
pub mod store;
pub mod tick;
