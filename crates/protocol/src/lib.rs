//! Wire types and correlation rules for the Bazaar daemon websocket API.
//!
//! The daemon speaks newline-free JSON text frames over a websocket at
//! `ws://<host>:<port>/ws`. Outbound frames are [`Request`]s; inbound frames
//! are arbitrary JSON whose `result.type` field routes them back to the
//! caller. This crate is deliberately runtime-free (no tokio) so both the
//! connector and its tests can use it directly.

mod correlation;
mod requests;
mod responses;

pub use correlation::correlation_key;
pub use requests::Request;
pub use responses::{parse_frame, response_type, FrameError};
