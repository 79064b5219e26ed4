//! Minecraft Java Edition protocol types and packet definitions for the
//! limbo front door: version table, byte codec, per-version packet
//! mappings and the packets a verification session speaks.

pub mod codec;
pub mod dimension;
pub mod error;
pub mod nbt;
pub mod packets;
pub mod registry;
pub mod snapshot;
pub mod version;
