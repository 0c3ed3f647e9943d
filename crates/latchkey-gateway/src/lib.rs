//! HTTP front-end for the latch driver.
//!
//! Every path answers the same plain-text protocol. Requests carry an
//! `action` and, for actions that move the latch, a `token`, either in the
//! query string or as a urlencoded form body:
//!
//! ```text
//! GET /?action=open&token=...   -> OPEN
//! GET /?action=state            -> LOCKED
//! GET /?action=dance            -> INVALID ACTION
//! ```
//!
//! Responses are always `200 OK` with a `text/plain` body; see
//! [`Reply`] for the words a client can receive.

pub mod action;
pub mod config;
pub mod error;
pub mod router;

pub use action::Action;
pub use config::GatewayConfig;
pub use error::{GatewayError, Result};
pub use router::{GatewayState, Reply, router, serve};
