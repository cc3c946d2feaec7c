//! The early-boot reset-on-boot immutability engine: mounts the raw
//! btrfs volume, rotates a bounded snapshot history per subvolume, and
//! materialises the next live content, recovering from a crash in a
//! prior run along the way.

pub mod copier;
pub mod dispatcher;
pub mod filter;
pub mod logger;
pub mod mount;
pub mod process;
pub mod reconciler;
pub mod recovery;
pub mod snapshot;
