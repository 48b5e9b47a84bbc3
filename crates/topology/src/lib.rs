//! Address-space arithmetic and validated provisioning parameters for
//! private virtual networks.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod address_space;
mod config;
mod error;

pub use address_space::AddressSpace;
pub use config::{TopologyConfig, ValidTopology};
pub use error::{Error, Result};
