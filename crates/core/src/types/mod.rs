//! Core types for LifeStream.
//!
//! This module provides type-safe wrappers for the portal's domain concepts
//! and the entity records stored in each collection.

pub mod blood;
pub mod email;
pub mod entity;
pub mod key;
pub mod status;

pub use blood::{BloodGroup, BloodGroupError};
pub use email::{Email, EmailError};
pub use entity::*;
pub use key::*;
pub use status::*;
