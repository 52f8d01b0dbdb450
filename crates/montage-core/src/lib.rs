//! Core types and utilities shared by the montage crates.
//!
//! This crate is intentionally small: borrowed image views over
//! caller-owned pixel storage, an owned double-valued field type, and a
//! minimal logger. It does *not* depend on any concrete filter or
//! registration algorithm.

mod image;
mod logger;

pub use image::{GeometryError, GrayImageView, GrayImageViewMut, ScalarField};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
