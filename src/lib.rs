//! # guest-tasks
//!
//! A small task manager for one guest at a time. Tasks live either on a
//! hosted Supabase-compatible backend, under an anonymous guest account
//! protected by row-level security, or in local storage for offline/demo use.
//!
//! The mode is chosen once at startup from configuration (see [`config`]),
//! producing a [`backend::Backend`] that the [`controller::Controller`]
//! drives. Both the terminal UI and the one-shot commands go through the
//! controller.

pub mod backend;
pub mod commands;
pub mod config;
pub mod controller;
pub mod error;
pub mod identity;
pub mod logging;
pub mod models;
pub mod storage;
pub mod store;
pub mod supabase;
pub mod tui;
