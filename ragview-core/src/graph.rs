use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::errors::ClientResult;
use crate::types::value_text;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Pokemon,
    Type,
    Media,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub kind: EntityKind,
    pub name: String,
    pub details: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    HasType,
    EvolvesTo,
    Mentions,
}

impl Relation {
    pub fn label(self) -> &'static str {
        match self {
            Relation::HasType => "HAS_TYPE",
            Relation::EvolvesTo => "EVOLVES_TO",
            Relation::Mentions => "MENTIONS",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct GraphExport {
    #[serde(default)]
    pokemon_nodes: Vec<Map<String, Value>>,
    #[serde(default)]
    type_nodes: Vec<Map<String, Value>>,
    #[serde(default)]
    pokemon_type_edges: Vec<PokemonTypeEdge>,
    #[serde(default)]
    evolution_edges: Vec<EvolutionEdge>,
    #[serde(default)]
    mentions_edges: Vec<MentionsEdge>,
}

#[derive(Debug, Deserialize)]
struct PokemonTypeEdge {
    from_pokemon: String,
    to_type: String,
}

#[derive(Debug, Deserialize)]
struct EvolutionEdge {
    from_pokemon: String,
    to_pokemon: String,
}

#[derive(Debug, Deserialize)]
struct MentionsEdge {
    from_media_id: String,
    to_pokemon: String,
}

/// Knowledge graph as exported by the backend's reprocessing step.
#[derive(Debug, Default, Clone)]
pub struct GraphSnapshot {
    graph: DiGraph<Entity, Relation>,
    index: HashMap<(EntityKind, String), NodeIndex>,
}

impl GraphSnapshot {
    pub fn parse(raw: &str) -> ClientResult<Self> {
        let export: GraphExport = serde_json::from_str(raw)?;
        Ok(Self::from_export(export))
    }

    fn from_export(export: GraphExport) -> Self {
        let mut snapshot = Self::default();
        for node in export.pokemon_nodes {
            snapshot.add_described(EntityKind::Pokemon, node);
        }
        for node in export.type_nodes {
            snapshot.add_described(EntityKind::Type, node);
        }
        for edge in export.pokemon_type_edges {
            let from = snapshot.ensure(EntityKind::Pokemon, &edge.from_pokemon);
            let to = snapshot.ensure(EntityKind::Type, &edge.to_type);
            snapshot.graph.add_edge(from, to, Relation::HasType);
        }
        for edge in export.evolution_edges {
            let from = snapshot.ensure(EntityKind::Pokemon, &edge.from_pokemon);
            let to = snapshot.ensure(EntityKind::Pokemon, &edge.to_pokemon);
            snapshot.graph.add_edge(from, to, Relation::EvolvesTo);
        }
        for edge in export.mentions_edges {
            let from = snapshot.ensure(EntityKind::Media, &edge.from_media_id);
            let to = snapshot.ensure(EntityKind::Pokemon, &edge.to_pokemon);
            snapshot.graph.add_edge(from, to, Relation::Mentions);
        }
        snapshot
    }

    fn add_described(&mut self, kind: EntityKind, mut fields: Map<String, Value>) {
        let Some(name) = fields.remove("name").map(|value| value_text(&value)) else {
            tracing::warn!("Skipping {kind:?} node without a name");
            return;
        };
        let idx = self.ensure(kind, &name);
        let mut details: Vec<(String, String)> = fields
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(key, value)| (key.clone(), value_text(value)))
            .collect();
        details.sort();
        self.graph[idx].details = details;
    }

    fn ensure(&mut self, kind: EntityKind, name: &str) -> NodeIndex {
        if let Some(idx) = self.index.get(&(kind, name.to_string())) {
            return *idx;
        }
        let idx = self.graph.add_node(Entity {
            kind,
            name: name.to_string(),
            details: Vec::new(),
        });
        self.index.insert((kind, name.to_string()), idx);
        idx
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn entity(&self, idx: NodeIndex) -> &Entity {
        &self.graph[idx]
    }

    pub fn entities(&self) -> impl Iterator<Item = (NodeIndex, &Entity)> + '_ {
        self.graph
            .node_indices()
            .map(move |idx| (idx, &self.graph[idx]))
    }

    pub fn relations(&self) -> impl Iterator<Item = (NodeIndex, NodeIndex, Relation)> + '_ {
        self.graph
            .edge_references()
            .map(|edge| (edge.source(), edge.target(), *edge.weight()))
    }

    pub fn neighbors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut out: Vec<NodeIndex> = self.graph.neighbors_undirected(idx).collect();
        out.sort();
        out.dedup();
        out
    }

    /// Pokemon first, exact before case-insensitive, then any other kind.
    pub fn find(&self, name: &str) -> Option<NodeIndex> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        if let Some(idx) = self.index.get(&(EntityKind::Pokemon, name.to_string())) {
            return Some(*idx);
        }
        let lower = name.to_lowercase();
        let mut candidates: Vec<(NodeIndex, &Entity)> = self
            .entities()
            .filter(|(_, entity)| entity.name.to_lowercase() == lower)
            .collect();
        candidates.sort_by_key(|(idx, entity)| (entity.kind, entity.name != name, *idx));
        candidates.first().map(|(idx, _)| *idx)
    }
}

#[async_trait]
pub trait GraphSource: Send + Sync {
    async fn load(&self) -> ClientResult<GraphSnapshot>;
    fn describe(&self) -> String;
}

/// Reads the `graph.json` export from disk.
pub struct FileGraphSource {
    path: PathBuf,
}

impl FileGraphSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl GraphSource for FileGraphSource {
    async fn load(&self) -> ClientResult<GraphSnapshot> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let snapshot = GraphSnapshot::parse(&raw)?;
        tracing::info!(
            "Loaded graph from {}: {} nodes, {} edges",
            self.path.display(),
            snapshot.node_count(),
            snapshot.edge_count()
        );
        Ok(snapshot)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "pokemon_nodes": [
            {"name": "Bulbasaur", "generation": 1, "primary_type": "Grass", "secondary_type": "Poison"},
            {"name": "Ivysaur", "generation": 1, "primary_type": "Grass", "secondary_type": "Poison"}
        ],
        "type_nodes": [{"name": "Grass"}, {"name": "Poison"}],
        "pokemon_type_edges": [
            {"from_pokemon": "Bulbasaur", "to_type": "Grass"},
            {"from_pokemon": "Bulbasaur", "to_type": "Poison"}
        ],
        "evolution_edges": [{"from_pokemon": "Bulbasaur", "to_pokemon": "Ivysaur"}],
        "mentions_edges": [{"from_media_id": "img-001", "to_pokemon": "Charmander"}]
    }"#;

    #[test]
    fn parse_builds_nodes_and_edges() {
        let snapshot = GraphSnapshot::parse(SAMPLE).unwrap();
        // Charmander and img-001 only appear in edges.
        assert_eq!(snapshot.node_count(), 6);
        assert_eq!(snapshot.edge_count(), 4);

        let bulbasaur = snapshot.find("Bulbasaur").unwrap();
        let entity = snapshot.entity(bulbasaur);
        assert_eq!(entity.kind, EntityKind::Pokemon);
        assert!(entity
            .details
            .contains(&("primary_type".to_string(), "Grass".to_string())));
        assert!(entity
            .details
            .contains(&("generation".to_string(), "1".to_string())));
        assert_eq!(snapshot.neighbors(bulbasaur).len(), 3);
    }

    #[test]
    fn find_prefers_pokemon_then_case_insensitive() {
        let snapshot = GraphSnapshot::parse(SAMPLE).unwrap();
        let idx = snapshot.find("charmander").unwrap();
        assert_eq!(snapshot.entity(idx).name, "Charmander");

        let idx = snapshot.find("grass").unwrap();
        assert_eq!(snapshot.entity(idx).kind, EntityKind::Type);

        assert!(snapshot.find("Mewtwo").is_none());
        assert!(snapshot.find("  ").is_none());
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let snapshot = GraphSnapshot::parse("{}").unwrap();
        assert!(snapshot.is_empty());
        assert!(GraphSnapshot::parse("[1, 2]").is_err());
    }

    #[tokio::test]
    async fn file_source_reports_missing_file() {
        let source = FileGraphSource::new("/definitely/not/here/graph.json");
        let err = source.load().await.unwrap_err();
        assert!(matches!(err.kind(), crate::errors::ErrorKind::Io(_)));
    }
}
