//! Dependency-ordered provisioning of a private virtual network: create
//! the network, gate on its readiness, fan subranges out across
//! availability zones and realize a declarative firewall-rule set, all
//! against an explicit provider session with idempotent re-runs.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod client;
mod engine;
mod error;

pub use client::{
    DRY_RUN_GROUP_ID, DRY_RUN_NETWORK_ID, ProvisioningClient, RuleAuthorization, SubrangeSpec,
};
pub use engine::{DrainReport, RuleResolutionEngine};
pub use error::{Error, Result};
