//! API exposure modules
//!
//! An exposure turns registered resources into a router for one protocol.

pub mod rest;

pub use rest::RestExposure;
