//! Abstract interface to a cloud provider's private-network API: create,
//! describe and delete primitives for networks, subranges, firewall groups
//! and tags, with explicit dry-run support.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;
mod zones;

pub use error::{Error, Result};
pub use zones::{is_known_zone, zones_for_region};

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

/// The wire value providers use for the "all protocols" wildcard.
pub const PROTOCOL_WILDCARD: &str = "-1";

/// Direction of traffic a rule governs.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Direction {
    /// Traffic arriving at the attached resource.
    Ingress,

    /// Traffic leaving the attached resource.
    Egress,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ingress => write!(f, "ingress"),
            Self::Egress => write!(f, "egress"),
        }
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ingress" => Ok(Self::Ingress),
            "egress" => Ok(Self::Egress),
            other => Err(Error::InvalidValue(format!(
                "type (ingress/egress) not valid: {other}"
            ))),
        }
    }
}

/// Protocol a rule applies to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Protocol {
    /// TCP traffic.
    Tcp,

    /// UDP traffic.
    Udp,

    /// ICMP traffic.
    Icmp,

    /// Every protocol; sent on the wire as [`PROTOCOL_WILDCARD`].
    All,
}

impl Protocol {
    /// The value sent to the provider for this protocol.
    #[must_use]
    pub const fn wire_value(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
            Self::Icmp => "icmp",
            Self::All => PROTOCOL_WILDCARD,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => write!(f, "tcp"),
            Self::Udp => write!(f, "udp"),
            Self::Icmp => write!(f, "icmp"),
            Self::All => write!(f, "all"),
        }
    }
}

impl FromStr for Protocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tcp" => Ok(Self::Tcp),
            "udp" => Ok(Self::Udp),
            "icmp" => Ok(Self::Icmp),
            "all" => Ok(Self::All),
            other => Err(Error::InvalidValue(format!(
                "protocol (tcp/udp/icmp/all) not valid: {other}"
            ))),
        }
    }
}

/// A key/value pair attachable to any provider resource.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Tag {
    /// The tag key.
    pub key: String,

    /// The tag value.
    pub value: String,
}

impl Tag {
    /// Builds a tag from its parts.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Lifecycle state of a network resource as reported by the provider.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum NetworkState {
    /// Creation accepted but not yet finished.
    Pending,

    /// Ready for dependent resources.
    Available,

    /// A state this tool does not model.
    Unknown(String),
}

/// One network as reported by a describe call.
#[derive(Clone, Debug)]
pub struct NetworkDescription {
    /// The provider-assigned network id.
    pub id: String,

    /// The reported lifecycle state.
    pub state: NetworkState,
}

/// One firewall group as reported by a describe call.
#[derive(Clone, Debug)]
pub struct FirewallGroupDescription {
    /// The provider-assigned group id.
    pub id: String,

    /// The group's name.
    pub name: String,
}

/// Successful payload of a provider call.
#[derive(Clone, Debug, Default)]
pub struct ProviderResponse {
    /// Id of the resource the call touched, when the provider assigns one.
    pub resource_id: Option<String>,

    /// Raw provider payload, kept for diagnostics.
    pub raw: serde_json::Value,
}

impl ProviderResponse {
    /// Builds a response carrying just a resource id.
    #[must_use]
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            resource_id: Some(id.into()),
            raw: serde_json::Value::Null,
        }
    }
}

/// Outcome of a mutating provider call. Expected conditions (duplicate
/// resources, dry-run no-ops) are variants rather than errors; hard
/// failures surface as [`Error::Call`].
#[derive(Clone, Debug)]
pub enum CallOutcome {
    /// The resource was created (or the permission registered).
    Created(ProviderResponse),

    /// The provider reports an equivalent resource or permission already
    /// exists. Callers honoring an idempotence contract treat this as
    /// success.
    AlreadyExists(ProviderResponse),

    /// The call was validated in dry-run mode; nothing was mutated.
    DryRun,
}

impl CallOutcome {
    /// The resource id carried by the outcome, when present.
    #[must_use]
    pub fn resource_id(&self) -> Option<&str> {
        match self {
            Self::Created(response) | Self::AlreadyExists(response) => {
                response.resource_id.as_deref()
            }
            Self::DryRun => None,
        }
    }

    /// Whether the outcome is a dry-run no-op.
    #[must_use]
    pub const fn is_dry_run(&self) -> bool {
        matches!(self, Self::DryRun)
    }
}

/// Request to create a network owning an address block.
#[derive(Clone, Debug)]
pub struct CreateNetworkRequest {
    /// The address block, in `"a.b.c.d/len"` form.
    pub cidr_block: String,

    /// The tenancy model; `"default"` unless the caller overrides it.
    pub instance_tenancy: String,

    /// Validate only, mutate nothing.
    pub dry_run: bool,
}

/// Request to delete a network.
#[derive(Clone, Debug)]
pub struct DeleteNetworkRequest {
    /// The network to delete.
    pub network_id: String,

    /// Validate only, mutate nothing.
    pub dry_run: bool,
}

/// Request to create a subrange inside a network.
#[derive(Clone, Debug)]
pub struct CreateSubrangeRequest {
    /// The parent network id.
    pub network_id: String,

    /// The child address block, in `"a.b.c.d/len"` form.
    pub cidr_block: String,

    /// The availability zone the subrange is pinned to.
    pub availability_zone: String,

    /// Validate only, mutate nothing.
    pub dry_run: bool,
}

/// Request to create a named firewall group.
#[derive(Clone, Debug)]
pub struct CreateFirewallGroupRequest {
    /// The group name; unique per network.
    pub name: String,

    /// A human-readable description.
    pub description: String,

    /// The network the group belongs to.
    pub network_id: String,

    /// Validate only, mutate nothing.
    pub dry_run: bool,
}

/// The peer a rule authorizes traffic with: a literal address block or an
/// already-resolved firewall group id. Exactly one, by construction.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum RulePeer {
    /// A literal address block, in `"a.b.c.d/len"` form.
    Cidr(String),

    /// A provider-assigned firewall group id.
    Group(String),
}

/// Request to register one rule on a firewall group.
#[derive(Clone, Debug)]
pub struct AuthorizeRequest {
    /// The group the permission is registered on.
    pub group_id: String,

    /// The protocol wire value (see [`Protocol::wire_value`]).
    pub protocol: String,

    /// Start of the port range.
    pub from_port: i32,

    /// End of the port range.
    pub to_port: i32,

    /// The authorized peer.
    pub peer: RulePeer,

    /// Validate only, mutate nothing.
    pub dry_run: bool,
}

/// Request to create login key material.
#[derive(Clone, Debug)]
pub struct CreateKeyMaterialRequest {
    /// Name of the key material.
    pub name: String,

    /// Validate only, mutate nothing.
    pub dry_run: bool,
}

/// Request to attach tags to a resource.
#[derive(Clone, Debug)]
pub struct CreateTagsRequest {
    /// The resource to tag.
    pub resource_id: String,

    /// The tags to attach.
    pub tags: Vec<Tag>,

    /// Validate only, mutate nothing.
    pub dry_run: bool,
}

/// Capability offered by a cloud provider's network API. All calls block
/// until the provider responds; implementations must be shareable across
/// await points but are driven strictly sequentially by this tool.
#[async_trait]
pub trait NetworkProvider: Send + Sync {
    /// Creates a network owning an address block.
    async fn create_network(&self, request: CreateNetworkRequest) -> Result<CallOutcome>;

    /// Deletes a network.
    async fn delete_network(&self, request: DeleteNetworkRequest) -> Result<CallOutcome>;

    /// Describes the given networks; an empty filter describes all.
    async fn describe_networks(&self, ids: &[String]) -> Result<Vec<NetworkDescription>>;

    /// Creates a subrange bound to one availability zone.
    async fn create_subrange(&self, request: CreateSubrangeRequest) -> Result<CallOutcome>;

    /// Creates a named firewall group.
    async fn create_firewall_group(
        &self,
        request: CreateFirewallGroupRequest,
    ) -> Result<CallOutcome>;

    /// Describes firewall groups matching a name filter.
    async fn describe_firewall_groups(
        &self,
        name_filter: &str,
    ) -> Result<Vec<FirewallGroupDescription>>;

    /// Registers an ingress rule on a firewall group.
    async fn authorize_ingress(&self, request: AuthorizeRequest) -> Result<CallOutcome>;

    /// Registers an egress rule on a firewall group.
    async fn authorize_egress(&self, request: AuthorizeRequest) -> Result<CallOutcome>;

    /// Creates login key material.
    async fn create_key_material(&self, request: CreateKeyMaterialRequest) -> Result<CallOutcome>;

    /// Attaches tags to an existing resource.
    async fn create_tags(&self, request: CreateTagsRequest) -> Result<CallOutcome>;

    /// The region this session is bound to.
    fn region(&self) -> &str;
}
