//! yearboard library
//!
//! Core of a year-at-a-glance sticky-note calendar: the pan/zoom viewport
//! transform, the calendar grid model, the note and connection stores with
//! their backend adapter contract, and settings persistence. The UI shell,
//! auth and sharing surfaces live outside this crate and drive it through
//! the store APIs.

pub mod config;
pub mod database;
pub mod error;
pub mod grid;
pub mod settings;
pub mod store;
pub mod viewport;
