//! Push-channel synchronization for Tether.
//!
//! Owns the one physical SSE channel per conversation session:
//! - Wire frame types and decoding
//! - A reconnecting channel manager with bounded exponential backoff
//! - The dispatcher that routes decoded frames into the state stores
//! - The outbound client for submitting new user turns
//!
//! Frames for a given channel are processed in receipt order; the
//! transport preserves send order so no reordering buffer exists.

pub mod channel;
pub mod dispatch;
pub mod retry;
pub mod sse;
pub mod submit;
pub mod transport;
pub mod wire;

pub use channel::ChannelManager;
pub use dispatch::{Applied, Dispatcher};
pub use retry::RetryPolicy;
pub use submit::SubmitClient;
pub use transport::{FrameStream, SseTransport, Transport};
pub use wire::{decode_frame, PushFrame, RawFrame};
