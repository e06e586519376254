use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::graph::{
    Group, IdentityGraph, Instance, NetworkGraph, NetworkInterface, Policy, Role, RouteTable,
    SecurityGraph, SecurityGroup, Subnet, User, Vpc,
};

#[derive(Debug, Clone, Error)]
pub enum SourceError {
    #[error("{call}: {message}")]
    Fetch { call: String, message: String },
    #[error("snapshot has no {section} section")]
    MissingSection { section: &'static str },
}

impl SourceError {
    pub fn fetch(call: impl Into<String>, message: impl Into<String>) -> Self {
        SourceError::Fetch {
            call: call.into(),
            message: message.into(),
        }
    }
}

/// Every failure from one construction pass, joined line by line.
#[derive(Debug, Error)]
#[error("{}", .messages.join("\n"))]
pub struct BuildError {
    pub messages: Vec<String>,
}

/// Outcome of a construction pass: the graph is always produced, with the
/// failed categories left empty and their errors collected alongside.
#[derive(Debug)]
pub struct GraphBuild<G> {
    pub graph: G,
    pub errors: Vec<SourceError>,
}

impl<G> GraphBuild<G> {
    pub fn into_result(self) -> Result<G, BuildError> {
        if self.errors.is_empty() {
            Ok(self.graph)
        } else {
            Err(BuildError {
                messages: self.errors.iter().map(|e| e.to_string()).collect(),
            })
        }
    }
}

pub trait IdentitySource {
    fn fetch_policies(&self) -> Result<Vec<Policy>, SourceError>;
    fn fetch_groups(&self) -> Result<Vec<Group>, SourceError>;
    fn fetch_users(&self) -> Result<Vec<User>, SourceError>;
    fn fetch_roles(&self) -> Result<Vec<Role>, SourceError>;
}

pub trait NetworkSource {
    fn fetch_vpcs(&self) -> Result<Vec<Vpc>, SourceError>;
    fn fetch_route_tables(&self, vpc_id: &str) -> Result<Vec<RouteTable>, SourceError>;
    fn fetch_subnets(&self, vpc_id: &str) -> Result<Vec<Subnet>, SourceError>;
}

pub trait SecuritySource {
    fn fetch_security_groups(&self) -> Result<Vec<SecurityGroup>, SourceError>;
    fn fetch_interfaces(&self, group_ids: &[String]) -> Result<Vec<NetworkInterface>, SourceError>;
    fn fetch_instance(&self, instance_id: &str) -> Result<Instance, SourceError>;
}

pub fn build_identity_graph<S: IdentitySource>(source: &S) -> GraphBuild<IdentityGraph> {
    let mut graph = IdentityGraph::default();
    let mut errors = Vec::new();
    match source.fetch_policies() {
        Ok(policies) => graph.policies = policies,
        Err(err) => errors.push(err),
    }
    match source.fetch_groups() {
        Ok(groups) => graph.groups = groups,
        Err(err) => errors.push(err),
    }
    match source.fetch_roles() {
        Ok(roles) => graph.roles = roles,
        Err(err) => errors.push(err),
    }
    match source.fetch_users() {
        Ok(users) => graph.users = users,
        Err(err) => errors.push(err),
    }
    GraphBuild { graph, errors }
}

pub fn build_network_graph<S: NetworkSource>(source: &S) -> GraphBuild<NetworkGraph> {
    let mut graph = NetworkGraph::default();
    let mut errors = Vec::new();
    match source.fetch_vpcs() {
        Ok(vpcs) => graph.vpcs = vpcs,
        Err(err) => errors.push(err),
    }
    for vpc in &mut graph.vpcs {
        match source.fetch_route_tables(&vpc.id) {
            Ok(tables) => vpc.route_tables = tables,
            Err(err) => errors.push(err),
        }
        match source.fetch_subnets(&vpc.id) {
            Ok(subnets) => vpc.subnets = subnets,
            Err(err) => errors.push(err),
        }
    }
    graph.link_associations();
    GraphBuild { graph, errors }
}

pub fn build_security_graph<S: SecuritySource>(source: &S) -> GraphBuild<SecurityGraph> {
    let mut graph = SecurityGraph::default();
    let mut errors = Vec::new();
    match source.fetch_security_groups() {
        Ok(groups) => graph.groups = groups,
        Err(err) => errors.push(err),
    }
    let group_ids: Vec<String> = graph.groups.iter().map(|g| g.id.clone()).collect();
    match source.fetch_interfaces(&group_ids) {
        Ok(interfaces) => graph.interfaces = interfaces,
        Err(err) => errors.push(err),
    }
    for interface in &graph.interfaces {
        let Some(instance_id) = interface.instance_id.as_deref() else {
            continue;
        };
        if graph.instances.iter().any(|inst| inst.id == instance_id) {
            continue;
        }
        match source.fetch_instance(instance_id) {
            Ok(instance) => graph.instances.push(instance),
            Err(err) => errors.push(err),
        }
    }
    GraphBuild { graph, errors }
}

/// Pre-fetched account state, the file format the CLI consumes. Each section
/// is optional; asking a missing section for data raises
/// [`SourceError::MissingSection`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub identity: Option<IdentityGraph>,
    #[serde(default)]
    pub network: Option<NetworkGraph>,
    #[serde(default)]
    pub security: Option<SecurityGraph>,
}

impl Snapshot {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let snapshot = serde_json::from_str(&contents)?;
        Ok(snapshot)
    }

    fn identity(&self) -> Result<&IdentityGraph, SourceError> {
        self.identity
            .as_ref()
            .ok_or(SourceError::MissingSection { section: "identity" })
    }

    fn network(&self) -> Result<&NetworkGraph, SourceError> {
        self.network
            .as_ref()
            .ok_or(SourceError::MissingSection { section: "network" })
    }

    fn security(&self) -> Result<&SecurityGraph, SourceError> {
        self.security
            .as_ref()
            .ok_or(SourceError::MissingSection { section: "security" })
    }
}

impl IdentitySource for Snapshot {
    fn fetch_policies(&self) -> Result<Vec<Policy>, SourceError> {
        Ok(self.identity()?.policies.clone())
    }

    fn fetch_groups(&self) -> Result<Vec<Group>, SourceError> {
        Ok(self.identity()?.groups.clone())
    }

    fn fetch_users(&self) -> Result<Vec<User>, SourceError> {
        Ok(self.identity()?.users.clone())
    }

    fn fetch_roles(&self) -> Result<Vec<Role>, SourceError> {
        Ok(self.identity()?.roles.clone())
    }
}

impl NetworkSource for Snapshot {
    fn fetch_vpcs(&self) -> Result<Vec<Vpc>, SourceError> {
        Ok(self.network()?.vpcs.clone())
    }

    fn fetch_route_tables(&self, vpc_id: &str) -> Result<Vec<RouteTable>, SourceError> {
        let network = self.network()?;
        Ok(network
            .vpcs
            .iter()
            .find(|v| v.id == vpc_id)
            .map(|v| v.route_tables.clone())
            .unwrap_or_default())
    }

    fn fetch_subnets(&self, vpc_id: &str) -> Result<Vec<Subnet>, SourceError> {
        let network = self.network()?;
        Ok(network
            .vpcs
            .iter()
            .find(|v| v.id == vpc_id)
            .map(|v| v.subnets.clone())
            .unwrap_or_default())
    }
}

impl SecuritySource for Snapshot {
    fn fetch_security_groups(&self) -> Result<Vec<SecurityGroup>, SourceError> {
        Ok(self.security()?.groups.clone())
    }

    fn fetch_interfaces(&self, group_ids: &[String]) -> Result<Vec<NetworkInterface>, SourceError> {
        let security = self.security()?;
        Ok(security
            .interfaces
            .iter()
            .filter(|ni| ni.owner_group_ids.iter().any(|id| group_ids.contains(id)))
            .cloned()
            .collect())
    }

    fn fetch_instance(&self, instance_id: &str) -> Result<Instance, SourceError> {
        let security = self.security()?;
        security
            .instances
            .iter()
            .find(|inst| inst.id == instance_id)
            .cloned()
            .ok_or_else(|| {
                SourceError::fetch("fetch_instance", format!("{instance_id} not found"))
            })
    }
}
