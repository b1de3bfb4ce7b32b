//! JSON description of an object graph, for `reach plan`.
//!
//! ```json
//! {
//!   "types": [
//!     {"name": "CUS", "associations": [
//!       {"name": "address", "kind": "one_to_one"},
//!       {"name": "orders", "kind": "one_to_many"}]},
//!     {"name": "ADR"},
//!     {"name": "ORD"}
//!   ],
//!   "objects": [
//!     {"name": "joe", "type": "CUS",
//!      "references": {"address": "home"},
//!      "collections": {"orders": {"elements": ["o1"]}}},
//!     {"name": "home", "type": "ADR"},
//!     {"name": "o1", "type": "ORD"}
//!   ],
//!   "root": "joe"
//! }
//! ```
//!
//! Objects with an `oid` are loaded under that persistent identity. Objects
//! with an `owner` are aggregated into it and must be declared after it.
//! Objects of a collection type are free collections holding `elements`.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use serde::Deserialize;

use reach_graph::{AdapterId, ObjectGraph, ObjectSpecification, SpecRegistry, TypeSpec};
use reach_oid::RootOid;

#[derive(Debug, Deserialize)]
pub struct GraphFile {
    #[serde(default)]
    pub types: Vec<TypeSpec>,
    pub objects: Vec<ObjectDecl>,
    pub root: String,
}

#[derive(Debug, Deserialize)]
pub struct ObjectDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub object_type: String,
    #[serde(default)]
    pub oid: Option<RootOid>,
    #[serde(default)]
    pub owner: Option<OwnerDecl>,
    #[serde(default)]
    pub references: BTreeMap<String, String>,
    #[serde(default)]
    pub collections: BTreeMap<String, CollectionDecl>,
    #[serde(default)]
    pub elements: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct OwnerDecl {
    pub object: String,
    pub local_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CollectionDecl {
    #[serde(rename = "type", default = "default_collection_type")]
    pub collection_type: String,
    #[serde(default)]
    pub elements: Vec<String>,
}

fn default_collection_type() -> String {
    "list".to_string()
}

/// A graph built from a [`GraphFile`], with adapters addressable by name.
#[derive(Debug)]
pub struct BuiltGraph {
    pub graph: ObjectGraph,
    pub root: AdapterId,
    pub names: HashMap<AdapterId, String>,
}

impl GraphFile {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn build(&self) -> anyhow::Result<BuiltGraph> {
        let mut registry = SpecRegistry::new();
        for spec in &self.types {
            registry.register(spec.clone().shared());
        }

        let mut graph = ObjectGraph::new();
        let mut ids: HashMap<&str, AdapterId> = HashMap::new();

        for decl in &self.objects {
            let spec = lookup(&registry, &decl.object_type)?;
            let id = match (&decl.oid, &decl.owner) {
                (Some(_), Some(_)) => bail!("{}: an object has either an oid or an owner", decl.name),
                (Some(oid), None) => graph.add_loaded(spec, oid.clone())?,
                (None, Some(owner)) => {
                    let owner_id = resolve(&ids, &owner.object)
                        .with_context(|| format!("owner of {} must be declared first", decl.name))?;
                    graph.add_aggregated(owner_id, spec, &owner.local_id)?
                }
                (None, None) if spec.is_parented_or_free_collection() => {
                    graph.add_free_collection(spec)?
                }
                (None, None) => graph.add_transient(spec)?,
            };
            if ids.insert(decl.name.as_str(), id).is_some() {
                bail!("object {} declared twice", decl.name);
            }
        }

        for decl in &self.objects {
            let id = resolve(&ids, &decl.name)?;
            for (association, target) in &decl.references {
                let target = resolve(&ids, target)?;
                graph.set_reference(id, association, Some(target))?;
            }
            for (association, collection) in &decl.collections {
                let spec = registry
                    .get(&collection.collection_type)
                    .unwrap_or_else(|| TypeSpec::collection(&collection.collection_type).shared());
                let list = graph.add_collection(id, association, spec)?;
                for element in &collection.elements {
                    graph.push_element(list, resolve(&ids, element)?)?;
                }
            }
            for element in &decl.elements {
                graph.push_element(id, resolve(&ids, element)?)?;
            }
        }

        let root = resolve(&ids, &self.root)?;
        let names = ids
            .into_iter()
            .map(|(name, id)| (id, name.to_string()))
            .collect();
        Ok(BuiltGraph { graph, root, names })
    }
}

fn lookup(registry: &SpecRegistry, name: &str) -> anyhow::Result<Arc<dyn ObjectSpecification>> {
    registry
        .get(name)
        .ok_or_else(|| anyhow!("unknown type {name}"))
}

fn resolve(ids: &HashMap<&str, AdapterId>, name: &str) -> anyhow::Result<AdapterId> {
    ids.get(name)
        .copied()
        .ok_or_else(|| anyhow!("unknown object {name}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reach_graph::make_persistent;
    use reach_store::{InMemoryStore, StoreConfig};

    const SAMPLE: &str = r#"{
        "types": [
            {"name": "CUS", "associations": [
                {"name": "address", "kind": "one_to_one"},
                {"name": "orders", "kind": "one_to_many"},
                {"name": "name", "kind": "one_to_one"}]},
            {"name": "ADR"},
            {"name": "ORD", "associations": [{"name": "customer", "kind": "one_to_one"}]},
            {"name": "NME", "kind": "value"}
        ],
        "objects": [
            {"name": "joe", "type": "CUS",
             "references": {"address": "home", "name": "joe-name"},
             "collections": {"orders": {"elements": ["o1", "o2"]}}},
            {"name": "joe-name", "type": "NME", "owner": {"object": "joe", "local_id": "1"}},
            {"name": "home", "type": "ADR", "oid": "ADR:7"},
            {"name": "o1", "type": "ORD", "references": {"customer": "joe"}},
            {"name": "o2", "type": "ORD", "references": {"customer": "joe"}}
        ],
        "root": "joe"
    }"#;

    #[test]
    fn sample_plans_in_dependency_order() {
        let built = GraphFile::parse(SAMPLE).unwrap().build().unwrap();
        let mut graph = built.graph;
        let mut store = InMemoryStore::new(StoreConfig::deterministic());
        make_persistent(&mut graph, built.root, &mut store).unwrap();

        let created: Vec<String> = store.pending().iter().map(|c| c.oid.to_string()).collect();
        assert_eq!(created, vec!["ORD:1", "ORD:2", "CUS:1"]);
        let aggregated = graph
            .iter()
            .find(|a| built.names.get(&a.id()).map(String::as_str) == Some("joe-name"))
            .unwrap();
        assert_eq!(aggregated.oid().to_string(), "CUS:1~NME:1");
    }

    #[test]
    fn free_collection_root() {
        let text = r#"{
            "types": [{"name": "ORD"}, {"name": "batch", "kind": "collection"}],
            "objects": [
                {"name": "b", "type": "batch", "elements": ["o1", "o2"]},
                {"name": "o1", "type": "ORD"},
                {"name": "o2", "type": "ORD"}
            ],
            "root": "b"
        }"#;
        let built = GraphFile::parse(text).unwrap().build().unwrap();
        let mut graph = built.graph;
        let mut store = InMemoryStore::new(StoreConfig::deterministic());
        let report = make_persistent(&mut graph, built.root, &mut store).unwrap();
        assert_eq!(report.created.len(), 2);
    }

    #[test]
    fn unknown_names_are_reported() {
        let text = r#"{"types": [], "objects": [{"name": "a", "type": "X"}], "root": "a"}"#;
        let err = GraphFile::parse(text).unwrap().build().unwrap_err();
        assert!(err.to_string().contains("unknown type X"));

        let text = r#"{"types": [{"name": "X"}], "objects": [{"name": "a", "type": "X"}], "root": "b"}"#;
        let err = GraphFile::parse(text).unwrap().build().unwrap_err();
        assert!(err.to_string().contains("unknown object b"));
    }

    #[test]
    fn owner_must_precede_aggregate() {
        let text = r#"{
            "types": [{"name": "CUS"}, {"name": "NME", "kind": "value"}],
            "objects": [
                {"name": "n", "type": "NME", "owner": {"object": "c", "local_id": "1"}},
                {"name": "c", "type": "CUS"}
            ],
            "root": "c"
        }"#;
        assert!(GraphFile::parse(text).unwrap().build().is_err());
    }

    #[test]
    fn collection_association_cannot_be_a_reference() {
        let text = r#"{
            "types": [
                {"name": "CUS", "associations": [{"name": "orders", "kind": "one_to_many"}]},
                {"name": "ORD"}
            ],
            "objects": [
                {"name": "c", "type": "CUS", "references": {"orders": "o"}},
                {"name": "o", "type": "ORD"}
            ],
            "root": "c"
        }"#;
        let err = GraphFile::parse(text).unwrap().build().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<reach_graph::GraphError>(),
            Some(reach_graph::GraphError::WrongAssociationKind { .. })
        ));
    }

    #[test]
    fn transient_oid_in_file_is_rejected() {
        let text = r#"{
            "types": [{"name": "CUS"}],
            "objects": [{"name": "c", "type": "CUS", "oid": "!CUS:1"}],
            "root": "c"
        }"#;
        assert!(GraphFile::parse(text).unwrap().build().is_err());
    }
}
