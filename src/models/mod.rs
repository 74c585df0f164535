// src/models/mod.rs
pub mod booking;
pub mod ward;

pub use booking::*;
pub use ward::*;
