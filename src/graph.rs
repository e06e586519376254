use serde::{Deserialize, Serialize};

/// Placeholder recorded when a route table association carries no subnet id
/// (the "main" association of a vpc).
pub const IMPLICIT_ASSOCIATION: &str = "implicit";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityGraph {
    #[serde(default)]
    pub policies: Vec<Policy>,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub name: String,
    /// URL-escaped JSON-ish document body, formatted at render time.
    #[serde(default)]
    pub document: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    /// Loose string keys; names with no matching policy are dropped at render time.
    #[serde(default)]
    pub policy_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    #[serde(default)]
    pub policy_names: Vec<String>,
    #[serde(default)]
    pub group_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    #[serde(default)]
    pub policy_names: Vec<String>,
    #[serde(default)]
    pub assume_document: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkGraph {
    #[serde(default)]
    pub vpcs: Vec<Vpc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vpc {
    pub id: String,
    #[serde(default)]
    pub tag_name: String,
    pub cidr_block: String,
    #[serde(default)]
    pub associated_cidr_blocks: Vec<String>,
    #[serde(default)]
    pub route_tables: Vec<RouteTable>,
    #[serde(default)]
    pub subnets: Vec<Subnet>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteTable {
    pub id: String,
    #[serde(default)]
    pub tag_name: String,
    #[serde(default)]
    pub routes: Vec<Route>,
    /// Subnet ids claimed by this table, or [`IMPLICIT_ASSOCIATION`] entries.
    #[serde(default)]
    pub association_subnet_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub destination_cidr: String,
    #[serde(default)]
    pub router_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subnet {
    pub id: String,
    #[serde(default)]
    pub tag_name: String,
    pub cidr_block: String,
    /// Back reference filled by [`NetworkGraph::link_associations`], never a
    /// cyclic owned reference.
    #[serde(default)]
    pub route_table_id: Option<String>,
}

impl NetworkGraph {
    /// Resolves the subnet -> route table back references. A subnet is
    /// associated with at most one route table within its vpc; the first
    /// claiming table wins. Subnets no table claims keep `None` and land in
    /// the "No Association Subnets" region of the report.
    pub fn link_associations(&mut self) {
        for vpc in &mut self.vpcs {
            let Vpc {
                route_tables,
                subnets,
                ..
            } = vpc;
            for subnet in subnets.iter_mut() {
                subnet.route_table_id = route_tables
                    .iter()
                    .find(|table| {
                        table
                            .association_subnet_ids
                            .iter()
                            .any(|id| id == &subnet.id)
                    })
                    .map(|table| table.id.clone());
            }
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityGraph {
    #[serde(default)]
    pub groups: Vec<SecurityGroup>,
    /// Interfaces are held once and shared by id across every owning group.
    #[serde(default)]
    pub interfaces: Vec<NetworkInterface>,
    #[serde(default)]
    pub instances: Vec<Instance>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityGroup {
    pub id: String,
    pub group_name: String,
    #[serde(default)]
    pub tag_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub ingress: Vec<IpPermission>,
    #[serde(default)]
    pub egress: Vec<IpPermission>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpPermission {
    pub protocol: String,
    #[serde(default)]
    pub from_port: i64,
    #[serde(default)]
    pub to_port: i64,
    #[serde(default)]
    pub cidr_ranges: Vec<String>,
    #[serde(default)]
    pub peer_group_ids: Vec<String>,
}

impl IpPermission {
    pub fn port_label(&self) -> String {
        format!("{} - {}", self.from_port, self.to_port)
    }

    /// Peer security groups take precedence over plain cidr ranges, matching
    /// how the rules were granted.
    pub fn target_label(&self) -> String {
        if !self.peer_group_ids.is_empty() {
            self.peer_group_ids.join(", ")
        } else {
            self.cidr_ranges.join(", ")
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkInterface {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub instance_id: Option<String>,
    /// Every security group whose id appears here renders a reference to this
    /// interface; the interface itself is laid out exactly once.
    #[serde(default)]
    pub owner_group_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,
    #[serde(default)]
    pub tag_name: String,
    #[serde(default)]
    pub az: String,
    #[serde(default)]
    pub private_ip: String,
    #[serde(default)]
    pub public_ip: String,
    #[serde(default)]
    pub instance_type: String,
    #[serde(default)]
    pub key_name: String,
}

/// One fully constructed entity graph, ready for layout.
#[derive(Debug, Clone)]
pub enum ReportGraph {
    Identity(IdentityGraph),
    Network(NetworkGraph),
    Security(SecurityGraph),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subnet(id: &str) -> Subnet {
        Subnet {
            id: id.to_string(),
            tag_name: String::new(),
            cidr_block: "10.0.0.0/24".to_string(),
            route_table_id: None,
        }
    }

    #[test]
    fn links_each_subnet_to_at_most_one_table() {
        let mut graph = NetworkGraph {
            vpcs: vec![Vpc {
                id: "vpc-1".to_string(),
                tag_name: "main".to_string(),
                cidr_block: "10.0.0.0/16".to_string(),
                associated_cidr_blocks: Vec::new(),
                route_tables: vec![
                    RouteTable {
                        id: "rtb-a".to_string(),
                        tag_name: String::new(),
                        routes: Vec::new(),
                        association_subnet_ids: vec!["subnet-1".to_string()],
                    },
                    RouteTable {
                        id: "rtb-b".to_string(),
                        tag_name: String::new(),
                        routes: Vec::new(),
                        association_subnet_ids: vec![
                            "subnet-1".to_string(),
                            IMPLICIT_ASSOCIATION.to_string(),
                        ],
                    },
                ],
                subnets: vec![subnet("subnet-1"), subnet("subnet-2")],
            }],
        };
        graph.link_associations();
        let subnets = &graph.vpcs[0].subnets;
        assert_eq!(subnets[0].route_table_id.as_deref(), Some("rtb-a"));
        assert_eq!(subnets[1].route_table_id, None);
    }

    #[test]
    fn permission_target_prefers_peer_groups() {
        let rule = IpPermission {
            protocol: "tcp".to_string(),
            from_port: 443,
            to_port: 443,
            cidr_ranges: vec!["0.0.0.0/0".to_string()],
            peer_group_ids: vec!["sg-1".to_string(), "sg-2".to_string()],
        };
        assert_eq!(rule.target_label(), "sg-1, sg-2");
        assert_eq!(rule.port_label(), "443 - 443");
    }
}
