//! SD/MMC-over-SPI card model: a byte-level command state machine backed
//! by a regular host file.

pub mod sdcard;

pub use sdcard::SdCard;
