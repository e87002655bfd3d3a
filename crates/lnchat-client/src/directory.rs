//! Alias directory.
//!
//! Maps node keys to display aliases and back, built once from a graph
//! snapshot at session start. Aliases are not unique on the network; when
//! several nodes share one, each gets the first six hex characters of its
//! key appended and the bare alias resolves to nobody.

use std::collections::HashMap;

use tracing::{debug, info};

use lnchat_lnd::{Graph, Lightning, NodeInfo};
use lnchat_shared::NodeId;

use crate::error::DirectoryError;

#[derive(Debug, Clone)]
pub struct AliasDirectory {
    self_id: NodeId,
    key_to_alias: HashMap<NodeId, String>,
    alias_to_key: HashMap<String, NodeId>,
}

impl AliasDirectory {
    /// Fetch the graph and local node info, then build the directory.
    pub async fn fetch(lightning: &dyn Lightning) -> Result<Self, DirectoryError> {
        let graph = lightning.describe_graph().await?;
        let info = lightning.get_info().await?;
        Self::build(&graph, &info)
    }

    pub fn build(graph: &Graph, info: &NodeInfo) -> Result<Self, DirectoryError> {
        let mut alias_count: HashMap<&str, usize> = HashMap::new();
        for node in &graph.nodes {
            *alias_count.entry(node.alias.as_str()).or_default() += 1;
        }

        let mut key_to_alias = HashMap::with_capacity(graph.nodes.len());
        let mut alias_to_key = HashMap::with_capacity(graph.nodes.len() * 2);

        for node in &graph.nodes {
            let key = parse_key(&node.pub_key)?;

            let alias = if alias_count[node.alias.as_str()] > 1 {
                format!("{}-{}", node.alias, key.short())
            } else {
                node.alias.clone()
            };

            alias_to_key.insert(alias.clone(), key);
            alias_to_key.insert(key.to_hex(), key);
            key_to_alias.insert(key, alias);
        }

        let self_id = parse_key(&info.identity_pubkey)?;
        key_to_alias
            .entry(self_id)
            .or_insert_with(|| info.alias.clone());

        info!(
            nodes = graph.nodes.len(),
            self_id = %self_id,
            "Alias directory built"
        );

        Ok(Self {
            self_id,
            key_to_alias,
            alias_to_key,
        })
    }

    /// Resolve a hex node key or an alias.
    ///
    /// Any well-formed key resolves, even one absent from the graph.
    pub fn resolve(&self, input: &str) -> Result<NodeId, DirectoryError> {
        let input = input.trim();
        if let Ok(key) = NodeId::from_hex(input) {
            return Ok(key);
        }
        match self.alias_to_key.get(input) {
            Some(key) => Ok(*key),
            None => {
                debug!(input = %input, "Alias lookup failed");
                Err(DirectoryError::NotFound(input.to_string()))
            }
        }
    }

    pub fn alias(&self, key: &NodeId) -> Option<&str> {
        self.key_to_alias.get(key).map(String::as_str)
    }

    /// The alias if known, otherwise the short hex form of the key.
    pub fn display_name(&self, key: &NodeId) -> String {
        match self.alias(key) {
            Some(alias) if !alias.is_empty() => alias.to_string(),
            _ => key.short(),
        }
    }

    pub fn self_id(&self) -> NodeId {
        self.self_id
    }

    pub fn len(&self) -> usize {
        self.key_to_alias.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key_to_alias.is_empty()
    }
}

fn parse_key(pub_key: &str) -> Result<NodeId, DirectoryError> {
    NodeId::from_hex(pub_key).map_err(|source| DirectoryError::InvalidNodeKey {
        pub_key: pub_key.to_string(),
        source,
    })
}
