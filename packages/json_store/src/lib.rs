pub mod checkpoint;
pub mod client;
pub mod json_utils;

pub use sonic_data_core::{path, Error, Path};

pub use checkpoint::Checkpoint;
pub use client::JsonClient;
