//! Talk to the router's LuCI web interface.

mod client;
pub use client::Client;

pub mod challenge;

mod session;
pub use session::{AuthCookie, Session, SessionState};
