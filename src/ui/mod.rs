//! # UI Module
//!
//! View-model and styling pieces used by the iced application in `app.rs`.
//!
//! - `peripheral_list`: ordered, de-duplicated list of sighted peripherals
//! - `styles`: shared styling for the scan toggle and notice dialog

pub mod peripheral_list;
pub mod styles;
