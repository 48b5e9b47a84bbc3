use cirrus_provider::{
    AuthorizeRequest, CallOutcome, CreateFirewallGroupRequest, CreateKeyMaterialRequest,
    CreateNetworkRequest, CreateSubrangeRequest, CreateTagsRequest, DeleteNetworkRequest,
    Direction, NetworkProvider, NetworkState, Protocol, RulePeer, Tag, is_known_zone,
    zones_for_region,
};
use cirrus_topology::{AddressSpace, ValidTopology};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Placeholder network id reported when a dry-run create succeeds without
/// the provider assigning one.
pub const DRY_RUN_NETWORK_ID: &str = "net-00000000";

/// Placeholder firewall group id used when resolving a group that a
/// dry-run pass never actually created.
pub const DRY_RUN_GROUP_ID: &str = "fwg-00000000";

/// A subrange to carve out of the network's block.
#[derive(Clone, Debug)]
pub struct SubrangeSpec {
    /// The child address block.
    pub block: AddressSpace,

    /// The availability zone the subrange is pinned to.
    pub zone: String,

    /// Whether the subrange carries public visibility.
    pub public: bool,

    /// Validate only, mutate nothing.
    pub dry_run: bool,
}

/// One rule to register on a firewall group. Exactly one of `cidr` and
/// `peer_group` must be supplied; supplying neither or both is a
/// validation failure rather than a silent preference.
#[derive(Clone, Debug)]
pub struct RuleAuthorization {
    /// Direction of the rule.
    pub direction: Direction,

    /// Provider id of the declaring group.
    pub group_id: String,

    /// Protocol the rule applies to.
    pub protocol: Protocol,

    /// Start of the port range.
    pub from_port: i32,

    /// End of the port range.
    pub to_port: i32,

    /// Literal address-block target, in `"a.b.c.d/len"` form.
    pub cidr: Option<String>,

    /// Named firewall-group target, resolved to an id before the call.
    pub peer_group: Option<String>,

    /// Validate only, mutate nothing.
    pub dry_run: bool,
}

/// Orchestrates readiness-gated, idempotent create/describe calls against
/// one provider session. Holds the session's mutable state (the assigned
/// network id and created subrange ids); the provider is the sole source
/// of truth for everything else.
///
/// Calls are issued strictly sequentially. Readiness is a one-shot check
/// per invocation; polling loops and backoff belong to the caller.
#[derive(Debug)]
pub struct ProvisioningClient<P: NetworkProvider> {
    provider: P,
    topology: ValidTopology,
    network_id: Option<String>,
    subrange_ids: Vec<String>,
}

impl<P: NetworkProvider> ProvisioningClient<P> {
    /// Creates a client bound to one provider session and one validated
    /// topology.
    pub const fn new(provider: P, topology: ValidTopology) -> Self {
        Self {
            provider,
            topology,
            network_id: None,
            subrange_ids: Vec::new(),
        }
    }

    /// The validated topology this session provisions.
    #[must_use]
    pub const fn topology(&self) -> &ValidTopology {
        &self.topology
    }

    /// The provider session this client drives.
    #[must_use]
    pub const fn provider(&self) -> &P {
        &self.provider
    }

    /// The network id assigned by the provider, once known.
    #[must_use]
    pub fn network_id(&self) -> Option<&str> {
        self.network_id.as_deref()
    }

    /// Ids of the subranges created in this session, in creation order.
    #[must_use]
    pub fn subrange_ids(&self) -> &[String] {
        &self.subrange_ids
    }

    /// Creates the network owning the configured address block and tags
    /// it with the display name. Tagging is best-effort; its failure does
    /// not fail the call. A dry-run success stores the deterministic
    /// placeholder id [`DRY_RUN_NETWORK_ID`].
    ///
    /// # Errors
    ///
    /// Returns `Error::Provider` when the create call fails outright.
    pub async fn create_network(&mut self, dry_run: bool) -> Result<CallOutcome> {
        let request = CreateNetworkRequest {
            cidr_block: self.topology.block.to_string(),
            instance_tenancy: "default".to_string(),
            dry_run,
        };
        debug!(cidr_block = %request.cidr_block, dry_run, "creating network");

        let outcome = self.provider.create_network(request).await?;
        match &outcome {
            CallOutcome::Created(response) | CallOutcome::AlreadyExists(response) => {
                self.network_id.clone_from(&response.resource_id);
            }
            CallOutcome::DryRun => {
                self.network_id = Some(DRY_RUN_NETWORK_ID.to_string());
            }
        }

        if let Some(id) = self.network_id.clone() {
            info!(network_id = %id, "network created");
            let tag = Tag::new("Name", self.topology.name.clone());
            if !self.tag_object(&id, &tag, dry_run).await {
                warn!(network_id = %id, "could not tag network with its name");
            }
        }

        Ok(outcome)
    }

    /// Deletes the session's network and forgets its id.
    ///
    /// # Errors
    ///
    /// `Error::NotReady` while the network is still pending,
    /// `Error::Validation` when no network id is set.
    pub async fn delete_network(&mut self, dry_run: bool) -> Result<CallOutcome> {
        self.require_ready(dry_run).await?;
        let network_id = self.current_network_id()?;

        debug!(network_id = %network_id, dry_run, "deleting network");
        let outcome = self
            .provider
            .delete_network(DeleteNetworkRequest {
                network_id,
                dry_run,
            })
            .await?;

        if !outcome.is_dry_run() {
            self.network_id = None;
            self.subrange_ids.clear();
        }

        Ok(outcome)
    }

    /// One synchronous readiness probe: true iff the provider reports the
    /// network `available`. Dry-run sessions are always ready. No retry
    /// or backoff happens here.
    ///
    /// # Errors
    ///
    /// `Error::Validation` when no network id is set.
    pub async fn is_ready(&self, dry_run: bool) -> Result<bool> {
        let Some(id) = &self.network_id else {
            return Err(Error::Validation("network id must be defined".to_string()));
        };
        if dry_run {
            return Ok(true);
        }

        let described = self
            .provider
            .describe_networks(std::slice::from_ref(id))
            .await?;
        Ok(described
            .first()
            .is_some_and(|network| network.state == NetworkState::Available))
    }

    /// Creates one subrange and tags it `"<zone>-public"` or
    /// `"<zone>-private"` per its visibility.
    ///
    /// # Errors
    ///
    /// `Error::NotReady` until the network is available;
    /// `Error::Validation` listing every violation when the zone is not
    /// in the provider allow-list or the block falls outside the
    /// network's block.
    pub async fn create_subrange(&mut self, spec: SubrangeSpec) -> Result<CallOutcome> {
        self.require_ready(spec.dry_run).await?;

        let mut violations = Vec::new();
        if !is_known_zone(&spec.zone) {
            violations.push(format!("invalid availability zone {}", spec.zone));
        }
        if !self.topology.block.contains(&spec.block) {
            violations.push(format!(
                "provided block {} is outside of the network block {}",
                spec.block, self.topology.block
            ));
        }
        if !violations.is_empty() {
            return Err(Error::Validation(violations.join(", ")));
        }

        let network_id = self.current_network_id()?;
        debug!(
            network_id = %network_id,
            block = %spec.block,
            zone = %spec.zone,
            public = spec.public,
            "creating subrange"
        );
        let outcome = self
            .provider
            .create_subrange(CreateSubrangeRequest {
                network_id,
                cidr_block: spec.block.to_string(),
                availability_zone: spec.zone.clone(),
                dry_run: spec.dry_run,
            })
            .await?;

        if let Some(id) = outcome.resource_id().map(ToString::to_string) {
            self.subrange_ids.push(id.clone());
            let visibility = if spec.public { "public" } else { "private" };
            let tag = Tag::new("Name", format!("{}-{}", spec.zone, visibility));
            if !self.tag_object(&id, &tag, spec.dry_run).await {
                warn!(subrange_id = %id, "could not tag subrange with its name");
            }
        }

        Ok(outcome)
    }

    /// Subdivides the network block across the configured zone count and
    /// creates every child subrange, alternating public (even index) and
    /// private (odd index) visibility while cycling zones per pair.
    ///
    /// Aborts on the first failure; subranges already created are left in
    /// place and reconciled by an idempotent re-run, not rolled back.
    ///
    /// # Errors
    ///
    /// `Error::Validation` when the zone count is zero, the block cannot
    /// be subdivided far enough, or the session region has no known
    /// zones; `Error::NotReady` until the network is available.
    pub async fn create_subranges(&mut self, dry_run: bool) -> Result<Vec<String>> {
        if self.topology.zone_count == 0 {
            return Err(Error::Validation(
                "the number of availability zones must be positive".to_string(),
            ));
        }
        self.require_ready(dry_run).await?;

        let children = self
            .topology
            .block
            .subdivide(self.topology.zone_count)
            .ok_or_else(|| {
                Error::Validation(format!(
                    "block {} cannot be subdivided into {} subranges",
                    self.topology.block, self.topology.zone_count
                ))
            })?;
        let zones = zones_for_region(self.provider.region()).ok_or_else(|| {
            Error::Validation(format!(
                "no availability zones known for region {}",
                self.provider.region()
            ))
        })?;

        info!(
            children = children.len(),
            zone_count = self.topology.zone_count,
            "creating subranges"
        );
        let mut created = Vec::with_capacity(children.len());
        for (i, child) in children.into_iter().enumerate() {
            let zone = zones[(i / 2) % zones.len()];
            let outcome = self
                .create_subrange(SubrangeSpec {
                    block: child,
                    zone: zone.to_string(),
                    public: i % 2 == 0,
                    dry_run,
                })
                .await?;
            if let Some(id) = outcome.resource_id() {
                created.push(id.to_string());
            }
        }

        Ok(created)
    }

    /// Creates named login key material.
    ///
    /// # Errors
    ///
    /// `Error::Validation` when the name is empty.
    pub async fn create_key_material(&self, name: &str, dry_run: bool) -> Result<CallOutcome> {
        if name.is_empty() {
            return Err(Error::Validation("key name is required".to_string()));
        }

        debug!(name, dry_run, "creating key material");
        Ok(self
            .provider
            .create_key_material(CreateKeyMaterialRequest {
                name: name.to_string(),
                dry_run,
            })
            .await?)
    }

    /// Creates a named firewall group on the session's network. Detecting
    /// an already-existing group is the caller's responsibility; the
    /// provider's `AlreadyExists` outcome passes through untouched.
    ///
    /// # Errors
    ///
    /// `Error::Validation` listing each of name/description that is
    /// empty.
    pub async fn create_firewall_group(
        &self,
        name: &str,
        description: &str,
        dry_run: bool,
    ) -> Result<CallOutcome> {
        let mut violations = Vec::new();
        if name.is_empty() {
            violations.push("group name is required");
        }
        if description.is_empty() {
            violations.push("group description is required");
        }
        if !violations.is_empty() {
            return Err(Error::Validation(violations.join(", ")));
        }

        debug!(name, dry_run, "creating firewall group");
        Ok(self
            .provider
            .create_firewall_group(CreateFirewallGroupRequest {
                name: name.to_string(),
                description: description.to_string(),
                network_id: self.network_id.clone().unwrap_or_default(),
                dry_run,
            })
            .await?)
    }

    /// Resolves a firewall group name to its provider id, when the group
    /// exists.
    ///
    /// # Errors
    ///
    /// `Error::Validation` when the name is empty.
    pub async fn lookup_firewall_group(&self, name: &str) -> Result<Option<String>> {
        if name.is_empty() {
            return Err(Error::Validation("group name is required".to_string()));
        }

        let groups = self.provider.describe_firewall_groups(name).await?;
        Ok(groups.into_iter().next().map(|group| group.id))
    }

    /// Whether a firewall group with the given name exists.
    ///
    /// # Errors
    ///
    /// `Error::Validation` when the name is empty.
    pub async fn firewall_group_exists(&self, name: &str) -> Result<bool> {
        Ok(self.lookup_firewall_group(name).await?.is_some())
    }

    /// Registers one rule, resolving a named-group target to its id
    /// first. For a cidr target the declaring group is always the call's
    /// subject. For a named-group target the subject depends on the
    /// direction: egress keeps the declaring group as subject with the
    /// referenced group as peer, ingress registers on the referenced
    /// group with the declaring group as peer.
    ///
    /// A duplicate permission comes back as `AlreadyExists`, not an
    /// error; re-applying the same rule is a supported no-op.
    ///
    /// # Errors
    ///
    /// `Error::NotReady` until the network is available;
    /// `Error::Validation` aggregating every violation: missing group id,
    /// no target or two targets, an unparseable cidr, or an unresolvable
    /// referenced group.
    pub async fn authorize_rule(&self, auth: RuleAuthorization) -> Result<CallOutcome> {
        self.require_ready(auth.dry_run).await?;

        let mut violations = Vec::new();
        if auth.group_id.is_empty() {
            violations.push("security group id is required".to_string());
        }
        match (auth.cidr.as_deref(), auth.peer_group.as_deref()) {
            (None, None) => violations.push("target required".to_string()),
            (Some(_), Some(_)) => violations
                .push("exactly one of cidr and security group may be supplied".to_string()),
            (Some(cidr), None) => {
                if AddressSpace::parse(cidr).is_err() {
                    violations.push(format!("cidr {cidr} is not valid"));
                }
            }
            (None, Some(_)) => {}
        }
        if !violations.is_empty() {
            return Err(Error::Validation(violations.join(", ")));
        }

        let (subject, peer) = match (auth.cidr.as_deref(), auth.peer_group.as_deref()) {
            (Some(cidr), None) => (auth.group_id.clone(), RulePeer::Cidr(cidr.to_string())),
            (None, Some(name)) => {
                let referenced = match self.lookup_firewall_group(name).await? {
                    Some(id) => id,
                    None if auth.dry_run => DRY_RUN_GROUP_ID.to_string(),
                    None => {
                        return Err(Error::Validation(format!(
                            "referenced security group {name} does not exist"
                        )));
                    }
                };
                match auth.direction {
                    Direction::Egress => (auth.group_id.clone(), RulePeer::Group(referenced)),
                    Direction::Ingress => (referenced, RulePeer::Group(auth.group_id.clone())),
                }
            }
            _ => unreachable!("exactly one target survives validation"),
        };

        let request = AuthorizeRequest {
            group_id: subject,
            protocol: auth.protocol.wire_value().to_string(),
            from_port: auth.from_port,
            to_port: auth.to_port,
            peer,
            dry_run: auth.dry_run,
        };
        debug!(
            direction = %auth.direction,
            group_id = %request.group_id,
            protocol = %auth.protocol,
            from_port = auth.from_port,
            to_port = auth.to_port,
            "authorizing rule"
        );

        let outcome = match auth.direction {
            Direction::Ingress => self.provider.authorize_ingress(request).await?,
            Direction::Egress => self.provider.authorize_egress(request).await?,
        };
        Ok(outcome)
    }

    /// Attaches one tag to a resource. Never errors: returns `false` on an
    /// empty resource id, an empty tag key, or a provider failure, `true`
    /// otherwise (a duplicate tag counts as success).
    pub async fn tag_object(&self, resource_id: &str, tag: &Tag, dry_run: bool) -> bool {
        if resource_id.is_empty() || tag.key.is_empty() {
            return false;
        }

        let request = CreateTagsRequest {
            resource_id: resource_id.to_string(),
            tags: vec![tag.clone()],
            dry_run,
        };
        match self.provider.create_tags(request).await {
            Ok(_) => true,
            Err(error) => {
                warn!(resource_id, %error, "tagging failed");
                false
            }
        }
    }

    async fn require_ready(&self, dry_run: bool) -> Result<()> {
        if self.is_ready(dry_run).await? {
            Ok(())
        } else {
            Err(Error::NotReady)
        }
    }

    fn current_network_id(&self) -> Result<String> {
        self.network_id
            .clone()
            .ok_or_else(|| Error::Validation("network id must be defined".to_string()))
    }
}
