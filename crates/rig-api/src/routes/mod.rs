//! API route handlers

pub mod gps;
pub mod rig;
pub mod settings;
