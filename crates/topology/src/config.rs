use crate::address_space::AddressSpace;
use crate::error::{Error, Result};

/// Provisioning parameters gathered before a session starts. Fields are set
/// through validating setters and checked as a whole by [`Self::validate`].
///
/// The provider handle is deliberately not part of the config: it is passed
/// explicitly to the provisioning client so no ambient session state exists.
#[derive(Clone, Debug, Default)]
pub struct TopologyConfig {
    block: Option<AddressSpace>,
    name: Option<String>,
    zone_count: Option<u32>,
}

impl TopologyConfig {
    /// Creates an empty config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the address block from its text form.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` when the text does not parse as an
    /// address block.
    pub fn set_block(&mut self, text: &str) -> Result<()> {
        self.block = Some(AddressSpace::parse(text)?);
        Ok(())
    }

    /// Sets the display name applied to the network on creation.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// Sets the desired number of availability zones.
    pub fn set_zone_count(&mut self, count: u32) {
        self.zone_count = Some(count);
    }

    /// The configured address block, if set.
    #[must_use]
    pub fn block(&self) -> Option<&AddressSpace> {
        self.block.as_ref()
    }

    /// The configured display name, if set.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The configured zone count, if set.
    #[must_use]
    pub fn zone_count(&self) -> Option<u32> {
        self.zone_count
    }

    /// Checks that every required field is present.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` listing every missing field, not just
    /// the first one encountered.
    pub fn validate(&self) -> Result<ValidTopology> {
        let mut missing = Vec::new();
        if self.block.is_none() {
            missing.push("block is required");
        }
        if self.name.is_none() {
            missing.push("name is required");
        }
        if self.zone_count.is_none() {
            missing.push("zone count is required");
        }
        let (Some(block), Some(name), Some(zone_count)) =
            (self.block, self.name.clone(), self.zone_count)
        else {
            return Err(Error::Validation(missing.join(", ")));
        };

        Ok(ValidTopology {
            block,
            name,
            zone_count,
        })
    }
}

/// A fully-populated topology, produced only by [`TopologyConfig::validate`].
#[derive(Clone, Debug)]
pub struct ValidTopology {
    /// The address block the network will own.
    pub block: AddressSpace,

    /// The display name tagged onto the network.
    pub name: String,

    /// The desired number of availability zones.
    pub zone_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_passes_with_all_fields() {
        let mut config = TopologyConfig::new();
        config.set_block("172.27.0.0/18").unwrap();
        config.set_name("test-network");
        config.set_zone_count(3);

        let topology = config.validate().unwrap();
        assert_eq!(topology.block.to_string(), "172.27.0.0/18");
        assert_eq!(topology.name, "test-network");
        assert_eq!(topology.zone_count, 3);
    }

    #[test]
    fn validate_reports_every_missing_field() {
        let config = TopologyConfig::new();
        let err = config.validate().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("block is required"));
        assert!(message.contains("name is required"));
        assert!(message.contains("zone count is required"));
    }

    #[test]
    fn validate_reports_only_missing_fields() {
        let mut config = TopologyConfig::new();
        config.set_name("partial");
        let message = config.validate().unwrap_err().to_string();
        assert!(message.contains("block is required"));
        assert!(!message.contains("name is required"));
    }

    #[test]
    fn set_block_rejects_malformed_text() {
        let mut config = TopologyConfig::new();
        assert!(config.set_block("bogus").is_err());
        assert!(config.block().is_none());
    }
}
