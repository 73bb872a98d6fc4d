//! parley-store - persistence layer for the Parley workspace
//!
//! This crate provides:
//! - Entity types for users, rooms, messages, activity, memory, notifications
//! - SQLite-backed `WorkspaceDb` with async wrappers over blocking queries
//!
//! Rooms hold an append-only message log plus one mutable summary; everything
//! else is insert-only. The orchestration core in `parley-core` is the only
//! writer of room summaries.

pub mod sqlite;
pub mod types;

// Re-export main types
pub use sqlite::{Activity, MemoryRecord, Message, Notification, Room, User, WorkspaceDb};
pub use types::{Role, Sender};
