//! Work provider implementations: in-memory slice, line file, channel.

mod channel;
mod file;
mod memory;

pub use channel::ChannelWorkProvider;
pub use file::{LineFileProvider, LineParser};
pub use memory::SliceWorkProvider;
