use cirrus_provider::{CallOutcome, Direction, NetworkProvider, Protocol};
use cirrus_rules::{RuleRecord, RuleSet};
use tracing::{debug, info};

use crate::client::{DRY_RUN_GROUP_ID, ProvisioningClient, RuleAuthorization};
use crate::error::{Error, Result};

/// The target of a realized rule.
#[derive(Clone, Debug, Eq, PartialEq)]
enum RealizedTarget {
    Cidr(String),
    Group(String),
}

/// A rule record that passed shape validation.
#[derive(Clone, Debug)]
struct RealizedRule {
    declaring: String,
    direction: Direction,
    protocol: Protocol,
    from_port: i32,
    to_port: i32,
    target: RealizedTarget,
}

fn realize(rule: &RuleRecord) -> Result<RealizedRule> {
    let mut violations = Vec::new();

    let declaring = rule.target_sec_group_name.clone();
    if declaring.is_none() {
        violations.push("targetSecGroupName is required".to_string());
    }

    let direction = match rule.direction.as_deref() {
        None => {
            violations.push("type (ingress/egress) is required".to_string());
            None
        }
        Some(text) => match text.parse::<Direction>() {
            Ok(direction) => Some(direction),
            Err(error) => {
                violations.push(error.to_string());
                None
            }
        },
    };

    let protocol = match rule.protocol.as_deref() {
        None => {
            violations.push("protocol (tcp/udp/icmp/all) is required".to_string());
            None
        }
        Some(text) => match text.parse::<Protocol>() {
            Ok(protocol) => Some(protocol),
            Err(error) => {
                violations.push(error.to_string());
                None
            }
        },
    };

    if rule.from_port.is_none() {
        violations.push("fromPort is required".to_string());
    }
    if rule.to_port.is_none() {
        violations.push("toPort is required".to_string());
    }

    let target = match &rule.target {
        None => {
            violations.push("target is required".to_string());
            None
        }
        Some(record) => match (record.kind.as_deref(), record.data.as_deref()) {
            (Some("cidr"), Some(data)) => Some(RealizedTarget::Cidr(data.to_string())),
            (Some("securityGroup"), Some(data)) => Some(RealizedTarget::Group(data.to_string())),
            (Some(kind), Some(_)) => {
                violations.push(format!("target type {kind} not valid"));
                None
            }
            (None, _) => {
                violations.push("target type is required".to_string());
                None
            }
            (_, None) => {
                violations.push("target data is required".to_string());
                None
            }
        },
    };

    match (
        declaring,
        direction,
        protocol,
        rule.from_port,
        rule.to_port,
        target,
    ) {
        (Some(declaring), Some(direction), Some(protocol), Some(from_port), Some(to_port), Some(target))
            if violations.is_empty() =>
        {
            Ok(RealizedRule {
                declaring,
                direction,
                protocol,
                from_port,
                to_port,
                target,
            })
        }
        _ => Err(Error::Validation(format!(
            "invalid rule: {}",
            violations.join(", ")
        ))),
    }
}

/// Counts reported by a completed drain.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DrainReport {
    /// Rules newly registered with the provider.
    pub applied: usize,

    /// Rules the provider already had; skipped as successes.
    pub duplicates: usize,
}

/// Realizes a declarative rule set against one provisioning session,
/// creating referenced firewall groups on demand.
///
/// Rules are consumed exactly once, in declaration order, because a later
/// rule may target a group an earlier rule implicitly created. A
/// malformed rule aborts the whole batch; rules already applied stay in
/// place and are absorbed as duplicates by the next run.
#[derive(Debug)]
pub struct RuleResolutionEngine<'a, P: NetworkProvider> {
    client: &'a mut ProvisioningClient<P>,
}

impl<'a, P: NetworkProvider> RuleResolutionEngine<'a, P> {
    /// Binds the engine to a provisioning session.
    pub const fn new(client: &'a mut ProvisioningClient<P>) -> Self {
        Self { client }
    }

    /// Drains the rule set, registering each rule once. Re-running the
    /// same set against an already-configured network succeeds without
    /// modification, reporting those rules as duplicates.
    ///
    /// # Errors
    ///
    /// `Error::Validation` on the first malformed rule; any provider
    /// failure aborts the remaining batch with no internal retry and no
    /// rollback of rules already applied.
    pub async fn drain(&mut self, rule_set: RuleSet, dry_run: bool) -> Result<DrainReport> {
        let mut report = DrainReport::default();
        info!(rules = rule_set.len(), dry_run, "draining rule set");

        for rule in rule_set {
            let realized = realize(&rule)?;

            if let RealizedTarget::Group(referenced) = &realized.target {
                self.ensure_group(referenced, dry_run).await?;
            }
            self.ensure_group(&realized.declaring, dry_run).await?;

            let group_id = match self.client.lookup_firewall_group(&realized.declaring).await? {
                Some(id) => id,
                None if dry_run => DRY_RUN_GROUP_ID.to_string(),
                None => {
                    return Err(Error::Validation(format!(
                        "security group {} does not exist",
                        realized.declaring
                    )));
                }
            };

            let (cidr, peer_group) = match realized.target {
                RealizedTarget::Cidr(data) => (Some(data), None),
                RealizedTarget::Group(data) => (None, Some(data)),
            };
            let outcome = self
                .client
                .authorize_rule(RuleAuthorization {
                    direction: realized.direction,
                    group_id,
                    protocol: realized.protocol,
                    from_port: realized.from_port,
                    to_port: realized.to_port,
                    cidr,
                    peer_group,
                    dry_run,
                })
                .await?;

            match outcome {
                CallOutcome::AlreadyExists(_) => {
                    debug!(group = %realized.declaring, "duplicate rule, continuing");
                    report.duplicates += 1;
                }
                CallOutcome::Created(_) | CallOutcome::DryRun => report.applied += 1,
            }
        }

        info!(
            applied = report.applied,
            duplicates = report.duplicates,
            "rule set drained"
        );
        Ok(report)
    }

    /// Creates the group if no group with that name exists yet, using the
    /// name as its description.
    async fn ensure_group(&self, name: &str, dry_run: bool) -> Result<()> {
        if !self.client.firewall_group_exists(name).await? {
            debug!(name, "creating missing firewall group");
            self.client
                .create_firewall_group(name, name, dry_run)
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(json: &str) -> RuleRecord {
        let set = RuleSet::from_json(&format!(r#"{{"rules": [{json}]}}"#)).unwrap();
        set.rules()[0].clone()
    }

    #[test]
    fn realize_accepts_complete_rule() {
        let rule = record(
            r#"{
                "targetSecGroupName": "web",
                "type": "ingress",
                "protocol": "tcp",
                "fromPort": 80,
                "toPort": 80,
                "target": { "type": "cidr", "data": "0.0.0.0/0" }
            }"#,
        );
        let realized = realize(&rule).unwrap();
        assert_eq!(realized.declaring, "web");
        assert_eq!(realized.direction, Direction::Ingress);
        assert_eq!(realized.protocol, Protocol::Tcp);
        assert_eq!(
            realized.target,
            RealizedTarget::Cidr("0.0.0.0/0".to_string())
        );
    }

    #[test]
    fn realize_aggregates_every_missing_field() {
        let rule = record(r#"{}"#);
        let message = realize(&rule).unwrap_err().to_string();
        assert!(message.contains("targetSecGroupName is required"));
        assert!(message.contains("type (ingress/egress) is required"));
        assert!(message.contains("protocol (tcp/udp/icmp/all) is required"));
        assert!(message.contains("fromPort is required"));
        assert!(message.contains("toPort is required"));
        assert!(message.contains("target is required"));
    }

    #[test]
    fn realize_rejects_unknown_direction_and_protocol() {
        let rule = record(
            r#"{
                "targetSecGroupName": "web",
                "type": "sideways",
                "protocol": "carrier-pigeon",
                "fromPort": 80,
                "toPort": 80,
                "target": { "type": "cidr", "data": "0.0.0.0/0" }
            }"#,
        );
        let message = realize(&rule).unwrap_err().to_string();
        assert!(message.contains("sideways"));
        assert!(message.contains("carrier-pigeon"));
    }

    #[test]
    fn realize_rejects_unknown_target_kind() {
        let rule = record(
            r#"{
                "targetSecGroupName": "web",
                "type": "ingress",
                "protocol": "tcp",
                "fromPort": 80,
                "toPort": 80,
                "target": { "type": "dns", "data": "example.com" }
            }"#,
        );
        let message = realize(&rule).unwrap_err().to_string();
        assert!(message.contains("target type dns not valid"));
    }
}
