//! Foundation types for lnk.
//!
//! This crate provides the persisted [`Link`] entity, its read-only
//! [`LinkOwnerView`] projection, and the alias generator. Every other lnk
//! crate depends on `lnk-types`.
//!
//! # Key Types
//!
//! - [`Link`] -- an origin mapped to a stable alias with a time-to-live
//! - [`LinkOwnerView`] -- every link ever created by one owner
//! - [`alias::derive`] -- sequence number to short opaque alias

pub mod alias;
pub mod error;
pub mod link;
pub mod owner;

pub use error::TypeError;
pub use link::Link;
pub use owner::LinkOwnerView;
