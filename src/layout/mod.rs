mod iam;
mod network;
mod security;
pub(crate) mod text;
pub(crate) mod types;
pub use text::format_escaped_document;
pub use types::*;
use iam::*;
use network::*;
use security::*;

use crate::config::Config;
use crate::graph::ReportGraph;

/// Lays a constructed graph out into a device-independent [`Document`].
/// Both emitters in `render.rs` consume the result.
pub fn compute_report(graph: &ReportGraph, config: &Config) -> Document {
    match graph {
        ReportGraph::Identity(identity) => compute_identity_report(identity, config),
        ReportGraph::Network(network) => compute_network_report(network, config),
        ReportGraph::Security(security) => compute_security_report(security, config),
    }
}
