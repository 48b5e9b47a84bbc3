//! In-memory implementation of the network-provider capability for tests
//! and local development. Ids are deterministic and sequential, networks
//! start out pending, and duplicate firewall groups / permissions report
//! `AlreadyExists` the way a real provider would.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use cirrus_provider::{
    AuthorizeRequest, CallOutcome, CreateFirewallGroupRequest, CreateKeyMaterialRequest,
    CreateNetworkRequest, CreateSubrangeRequest, CreateTagsRequest, DeleteNetworkRequest,
    Direction, Error, FirewallGroupDescription, NetworkDescription, NetworkProvider, NetworkState,
    ProviderResponse, Result, RulePeer, Tag,
};
use serde_json::json;

#[derive(Clone, Debug)]
struct MockNetwork {
    cidr_block: String,
    state: NetworkState,
}

#[derive(Clone, Debug)]
struct MockSubrange {
    network_id: String,
    cidr_block: String,
    availability_zone: String,
}

#[derive(Clone, Debug)]
struct MockGroup {
    id: String,
    name: String,
    network_id: String,
}

/// One permission as registered through the mock, exposed so tests can
/// assert on the exact subject/peer a call produced.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct RegisteredPermission {
    /// Direction of the registered rule.
    pub direction: Direction,

    /// The group the permission was registered on.
    pub group_id: String,

    /// The protocol wire value.
    pub protocol: String,

    /// Start of the port range.
    pub from_port: i32,

    /// End of the port range.
    pub to_port: i32,

    /// The authorized peer.
    pub peer: RulePeer,
}

#[derive(Debug, Default)]
struct State {
    counter: u64,
    networks: HashMap<String, MockNetwork>,
    subranges: HashMap<String, MockSubrange>,
    groups: Vec<MockGroup>,
    permissions: HashSet<RegisteredPermission>,
    key_material: HashSet<String>,
    tags: HashMap<String, Vec<Tag>>,
    fail_next: Option<String>,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.counter += 1;
        format!("{prefix}-{:08}", self.counter)
    }

    fn take_injected_failure(&mut self) -> Option<Error> {
        self.fail_next.take().map(|message| Error::Call {
            errors: vec![message],
            raw: serde_json::Value::Null,
        })
    }
}

/// Mock network provider backed by in-memory state.
#[derive(Debug)]
pub struct MockProvider {
    region: String,
    immediately_available: bool,
    state: Mutex<State>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("us-east-1")
    }
}

impl MockProvider {
    /// Creates a mock provider bound to a region. Networks created through
    /// it start out `Pending` until [`Self::make_available`] is called.
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            immediately_available: false,
            state: Mutex::new(State::default()),
        }
    }

    /// Creates a mock provider whose networks are `Available` as soon as
    /// they are created. Convenient for tests that are not exercising the
    /// readiness gate itself.
    pub fn immediately_available(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            immediately_available: true,
            state: Mutex::new(State::default()),
        }
    }

    /// Flips a pending network to `Available`.
    pub fn make_available(&self, network_id: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(network) = state.networks.get_mut(network_id) {
            network.state = NetworkState::Available;
        }
    }

    /// Makes the next mutating call fail with the given message.
    pub fn fail_next_call(&self, message: impl Into<String>) {
        self.state.lock().unwrap().fail_next = Some(message.into());
    }

    /// Number of networks currently held.
    #[must_use]
    pub fn network_count(&self) -> usize {
        self.state.lock().unwrap().networks.len()
    }

    /// Ids of every subrange created so far, in creation order by id.
    #[must_use]
    pub fn subrange_ids(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        let mut ids: Vec<String> = state.subranges.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// The zone a subrange was pinned to.
    #[must_use]
    pub fn subrange_zone(&self, subrange_id: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state
            .subranges
            .get(subrange_id)
            .map(|s| s.availability_zone.clone())
    }

    /// The address block a subrange was created with.
    #[must_use]
    pub fn subrange_block(&self, subrange_id: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state
            .subranges
            .get(subrange_id)
            .map(|s| s.cidr_block.clone())
    }

    /// The address block a network was created with.
    #[must_use]
    pub fn network_block(&self, network_id: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state
            .networks
            .get(network_id)
            .map(|n| n.cidr_block.clone())
    }

    /// Names of every firewall group created so far, in creation order.
    #[must_use]
    pub fn group_names(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.groups.iter().map(|g| g.name.clone()).collect()
    }

    /// Number of distinct permissions registered so far.
    #[must_use]
    pub fn permission_count(&self) -> usize {
        self.state.lock().unwrap().permissions.len()
    }

    /// Every permission registered so far, ordered by subject group id.
    #[must_use]
    pub fn permissions(&self) -> Vec<RegisteredPermission> {
        let state = self.state.lock().unwrap();
        let mut all: Vec<RegisteredPermission> = state.permissions.iter().cloned().collect();
        all.sort_by(|a, b| a.group_id.cmp(&b.group_id));
        all
    }

    /// The value of a tag on a resource, if set.
    #[must_use]
    pub fn tag_value(&self, resource_id: &str, key: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state.tags.get(resource_id).and_then(|tags| {
            tags.iter()
                .find(|tag| tag.key == key)
                .map(|tag| tag.value.clone())
        })
    }
}

#[async_trait]
impl NetworkProvider for MockProvider {
    async fn create_network(&self, request: CreateNetworkRequest) -> Result<CallOutcome> {
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.take_injected_failure() {
            return Err(error);
        }
        if request.dry_run {
            return Ok(CallOutcome::DryRun);
        }

        let id = state.next_id("net");
        let network_state = if self.immediately_available {
            NetworkState::Available
        } else {
            NetworkState::Pending
        };
        state.networks.insert(
            id.clone(),
            MockNetwork {
                cidr_block: request.cidr_block.clone(),
                state: network_state,
            },
        );

        Ok(CallOutcome::Created(ProviderResponse {
            resource_id: Some(id.clone()),
            raw: json!({
                "vpc": {
                    "vpcId": id,
                    "cidrBlock": request.cidr_block,
                    "instanceTenancy": request.instance_tenancy,
                    "state": "pending",
                }
            }),
        }))
    }

    async fn delete_network(&self, request: DeleteNetworkRequest) -> Result<CallOutcome> {
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.take_injected_failure() {
            return Err(error);
        }
        if request.dry_run {
            return Ok(CallOutcome::DryRun);
        }

        if state.networks.remove(&request.network_id).is_none() {
            return Err(Error::Call {
                errors: vec![format!("network {} not found", request.network_id)],
                raw: serde_json::Value::Null,
            });
        }
        state
            .subranges
            .retain(|_, subrange| subrange.network_id != request.network_id);

        Ok(CallOutcome::Created(ProviderResponse::with_id(
            request.network_id,
        )))
    }

    async fn describe_networks(&self, ids: &[String]) -> Result<Vec<NetworkDescription>> {
        let state = self.state.lock().unwrap();
        if ids.is_empty() {
            let mut all: Vec<NetworkDescription> = state
                .networks
                .iter()
                .map(|(id, network)| NetworkDescription {
                    id: id.clone(),
                    state: network.state.clone(),
                })
                .collect();
            all.sort_by(|a, b| a.id.cmp(&b.id));
            return Ok(all);
        }

        ids.iter()
            .map(|id| {
                state
                    .networks
                    .get(id)
                    .map(|network| NetworkDescription {
                        id: id.clone(),
                        state: network.state.clone(),
                    })
                    .ok_or_else(|| Error::Call {
                        errors: vec![format!("network {id} not found")],
                        raw: serde_json::Value::Null,
                    })
            })
            .collect()
    }

    async fn create_subrange(&self, request: CreateSubrangeRequest) -> Result<CallOutcome> {
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.take_injected_failure() {
            return Err(error);
        }
        if request.dry_run {
            return Ok(CallOutcome::DryRun);
        }

        if !state.networks.contains_key(&request.network_id) {
            return Err(Error::Call {
                errors: vec![format!("network {} not found", request.network_id)],
                raw: serde_json::Value::Null,
            });
        }

        let id = state.next_id("sub");
        state.subranges.insert(
            id.clone(),
            MockSubrange {
                network_id: request.network_id.clone(),
                cidr_block: request.cidr_block.clone(),
                availability_zone: request.availability_zone.clone(),
            },
        );

        Ok(CallOutcome::Created(ProviderResponse {
            resource_id: Some(id.clone()),
            raw: json!({
                "subnet": {
                    "subnetId": id,
                    "vpcId": request.network_id,
                    "cidrBlock": request.cidr_block,
                    "availabilityZone": request.availability_zone,
                }
            }),
        }))
    }

    async fn create_firewall_group(
        &self,
        request: CreateFirewallGroupRequest,
    ) -> Result<CallOutcome> {
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.take_injected_failure() {
            return Err(error);
        }
        if request.dry_run {
            return Ok(CallOutcome::DryRun);
        }

        if let Some(existing) = state
            .groups
            .iter()
            .find(|group| group.name == request.name && group.network_id == request.network_id)
        {
            return Ok(CallOutcome::AlreadyExists(ProviderResponse::with_id(
                existing.id.clone(),
            )));
        }

        let id = state.next_id("fwg");
        state.groups.push(MockGroup {
            id: id.clone(),
            name: request.name.clone(),
            network_id: request.network_id.clone(),
        });

        Ok(CallOutcome::Created(ProviderResponse {
            resource_id: Some(id.clone()),
            raw: json!({
                "groupId": id,
                "groupName": request.name,
                "description": request.description,
            }),
        }))
    }

    async fn describe_firewall_groups(
        &self,
        name_filter: &str,
    ) -> Result<Vec<FirewallGroupDescription>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .groups
            .iter()
            .filter(|group| name_filter.is_empty() || group.name == name_filter)
            .map(|group| FirewallGroupDescription {
                id: group.id.clone(),
                name: group.name.clone(),
            })
            .collect())
    }

    async fn authorize_ingress(&self, request: AuthorizeRequest) -> Result<CallOutcome> {
        self.authorize(Direction::Ingress, request)
    }

    async fn authorize_egress(&self, request: AuthorizeRequest) -> Result<CallOutcome> {
        self.authorize(Direction::Egress, request)
    }

    async fn create_key_material(&self, request: CreateKeyMaterialRequest) -> Result<CallOutcome> {
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.take_injected_failure() {
            return Err(error);
        }
        if request.dry_run {
            return Ok(CallOutcome::DryRun);
        }

        if !state.key_material.insert(request.name.clone()) {
            return Ok(CallOutcome::AlreadyExists(ProviderResponse::with_id(
                format!("key-{}", request.name),
            )));
        }

        Ok(CallOutcome::Created(ProviderResponse::with_id(format!(
            "key-{}",
            request.name
        ))))
    }

    async fn create_tags(&self, request: CreateTagsRequest) -> Result<CallOutcome> {
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.take_injected_failure() {
            return Err(error);
        }
        if request.dry_run {
            return Ok(CallOutcome::DryRun);
        }

        let entry = state.tags.entry(request.resource_id.clone()).or_default();
        for tag in request.tags {
            entry.retain(|existing| existing.key != tag.key);
            entry.push(tag);
        }

        Ok(CallOutcome::Created(ProviderResponse::with_id(
            request.resource_id,
        )))
    }

    fn region(&self) -> &str {
        &self.region
    }
}

impl MockProvider {
    fn authorize(&self, direction: Direction, request: AuthorizeRequest) -> Result<CallOutcome> {
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.take_injected_failure() {
            return Err(error);
        }
        if request.dry_run {
            return Ok(CallOutcome::DryRun);
        }

        if !state.groups.iter().any(|group| group.id == request.group_id) {
            return Err(Error::Call {
                errors: vec![format!("firewall group {} not found", request.group_id)],
                raw: serde_json::Value::Null,
            });
        }

        let permission = RegisteredPermission {
            direction,
            group_id: request.group_id.clone(),
            protocol: request.protocol.clone(),
            from_port: request.from_port,
            to_port: request.to_port,
            peer: request.peer.clone(),
        };
        if !state.permissions.insert(permission) {
            return Ok(CallOutcome::AlreadyExists(ProviderResponse::default()));
        }

        Ok(CallOutcome::Created(ProviderResponse {
            resource_id: None,
            raw: json!({ "return": true }),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn networks_start_pending_and_become_available() {
        let provider = MockProvider::new("us-east-1");
        let outcome = provider
            .create_network(CreateNetworkRequest {
                cidr_block: "10.0.0.0/16".to_string(),
                instance_tenancy: "default".to_string(),
                dry_run: false,
            })
            .await
            .unwrap();
        let id = outcome.resource_id().unwrap().to_string();

        let described = provider.describe_networks(&[id.clone()]).await.unwrap();
        assert_eq!(described[0].state, NetworkState::Pending);

        provider.make_available(&id);
        let described = provider.describe_networks(&[id]).await.unwrap();
        assert_eq!(described[0].state, NetworkState::Available);
    }

    #[tokio::test]
    async fn dry_run_mutates_nothing() {
        let provider = MockProvider::new("us-east-1");
        let outcome = provider
            .create_network(CreateNetworkRequest {
                cidr_block: "10.0.0.0/16".to_string(),
                instance_tenancy: "default".to_string(),
                dry_run: true,
            })
            .await
            .unwrap();
        assert!(outcome.is_dry_run());
        assert_eq!(provider.network_count(), 0);
    }

    #[tokio::test]
    async fn duplicate_group_reports_already_exists() {
        let provider = MockProvider::immediately_available("us-east-1");
        let network = provider
            .create_network(CreateNetworkRequest {
                cidr_block: "10.0.0.0/16".to_string(),
                instance_tenancy: "default".to_string(),
                dry_run: false,
            })
            .await
            .unwrap();
        let network_id = network.resource_id().unwrap().to_string();

        let request = CreateFirewallGroupRequest {
            name: "web".to_string(),
            description: "web".to_string(),
            network_id,
            dry_run: false,
        };
        let first = provider
            .create_firewall_group(request.clone())
            .await
            .unwrap();
        let second = provider.create_firewall_group(request).await.unwrap();

        assert!(matches!(first, CallOutcome::Created(_)));
        assert!(matches!(second, CallOutcome::AlreadyExists(_)));
        assert_eq!(second.resource_id(), first.resource_id());
    }

    #[tokio::test]
    async fn duplicate_permission_reports_already_exists() {
        let provider = MockProvider::immediately_available("us-east-1");
        let network = provider
            .create_network(CreateNetworkRequest {
                cidr_block: "10.0.0.0/16".to_string(),
                instance_tenancy: "default".to_string(),
                dry_run: false,
            })
            .await
            .unwrap();
        let group = provider
            .create_firewall_group(CreateFirewallGroupRequest {
                name: "web".to_string(),
                description: "web".to_string(),
                network_id: network.resource_id().unwrap().to_string(),
                dry_run: false,
            })
            .await
            .unwrap();

        let request = AuthorizeRequest {
            group_id: group.resource_id().unwrap().to_string(),
            protocol: "tcp".to_string(),
            from_port: 443,
            to_port: 443,
            peer: RulePeer::Cidr("0.0.0.0/0".to_string()),
            dry_run: false,
        };
        let first = provider.authorize_ingress(request.clone()).await.unwrap();
        let second = provider.authorize_ingress(request).await.unwrap();

        assert!(matches!(first, CallOutcome::Created(_)));
        assert!(matches!(second, CallOutcome::AlreadyExists(_)));
        assert_eq!(provider.permission_count(), 1);
    }

    #[tokio::test]
    async fn injected_failure_fires_once() {
        let provider = MockProvider::new("us-east-1");
        provider.fail_next_call("throttled");

        let request = CreateNetworkRequest {
            cidr_block: "10.0.0.0/16".to_string(),
            instance_tenancy: "default".to_string(),
            dry_run: false,
        };
        assert!(provider.create_network(request.clone()).await.is_err());
        assert!(provider.create_network(request).await.is_ok());
    }
}
