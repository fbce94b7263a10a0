//! Bare-repository worktree hub: a layout where the repository engine
//! lives in `.bare` and every branch checkout is a flat peer directory
//! beside it. The library is split into a git process gateway, the
//! worktree lifecycle, auditing and teleport services, and a modal
//! terminal UI driven by a background task executor.

pub mod app;
pub mod audit;
pub mod cli;
pub mod commands;
pub mod error;
pub mod filter;
pub mod gateway;
pub mod keystore;
pub mod lifecycle;
pub mod project;
pub mod sync;
pub mod tasks;
pub mod teleport;
pub mod textgen;
pub mod ui;
