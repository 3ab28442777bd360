//! Pure validation primitives shared by every tool profile.
//!
//! Nothing in this module spawns, blocks, or mutates state: each function
//! either accepts its input unchanged or returns a message naming the
//! offending part. The execution pipeline turns those messages into
//! `VALIDATION_ERROR` outputs.

pub mod args;
pub mod target;
