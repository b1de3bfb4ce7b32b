use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use reach_graph::{
    CommandSink, CreateObjectCommand, ObjectAdapter, ObjectReference, SinkError, SinkResult,
};
use reach_oid::{ObjectKey, RootOid, Version};

use crate::config::{IdentifierStrategy, StoreConfig};
use crate::error::{StoreError, StoreResult};

/// An object as held by the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Persistent identity carrying the current version.
    pub oid: RootOid,
    pub references: Vec<ObjectReference>,
}

impl StoredRecord {
    pub fn version(&self) -> Option<&Version> {
        self.oid.version()
    }
}

/// In-memory store acting as the walker's [`CommandSink`].
///
/// Identities are allocated immediately. Create commands queue up in
/// submission order and only become records on [`commit`](Self::commit);
/// [`rollback`](Self::rollback) discards them. Allocated identifiers are
/// never reused, even after a rollback.
#[derive(Default)]
pub struct InMemoryStore {
    config: StoreConfig,
    records: BTreeMap<ObjectKey, StoredRecord>,
    pending: Vec<CreateObjectCommand>,
    sequences: HashMap<String, u64>,
}

impl InMemoryStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Number of committed records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Create commands queued since the last commit or rollback.
    pub fn pending(&self) -> &[CreateObjectCommand] {
        &self.pending
    }

    /// Committed records ordered by key.
    pub fn records(&self) -> impl Iterator<Item = &StoredRecord> {
        self.records.values()
    }

    /// Look up a record by identity, ignoring state and version.
    pub fn get(&self, oid: &RootOid) -> Option<&StoredRecord> {
        self.records.get(&oid.key())
    }

    /// Execute every queued command, in order.
    ///
    /// Returns the stored identities with their first version. Nothing is
    /// stored if any command is invalid.
    pub fn commit(&mut self) -> StoreResult<Vec<RootOid>> {
        let mut staged = Vec::with_capacity(self.pending.len());
        for command in &self.pending {
            if command.oid.is_transient() {
                return Err(StoreError::InvalidCommand {
                    oid: command.oid.to_string(),
                    reason: "identity is still transient".into(),
                });
            }
            let version = self.fresh_version(self.config.initial_sequence);
            staged.push(StoredRecord {
                oid: command.oid.clone().with_version(version)?,
                references: command.references.clone(),
            });
        }

        self.pending.clear();
        let mut committed = Vec::with_capacity(staged.len());
        for record in staged {
            debug!(oid = %record.oid, "stored");
            committed.push(record.oid.clone());
            self.records.insert(record.oid.key(), record);
        }
        info!(count = committed.len(), total = self.records.len(), "committed");
        Ok(committed)
    }

    /// Discard every queued command. Returns how many were dropped.
    pub fn rollback(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        info!(dropped, "rolled back");
        dropped
    }

    /// Record a change to a stored object and return its new version.
    ///
    /// If `oid` carries a version it must match the stored one.
    pub fn touch(&mut self, oid: &RootOid) -> StoreResult<Version> {
        let version = self.fresh_version(0);
        let record = self
            .records
            .get_mut(&oid.key())
            .ok_or_else(|| StoreError::NotFound(oid.to_string()))?;

        let stored = record.oid.version().cloned().unwrap_or(Version::sequence_only(0));
        if let Some(held) = oid.version() {
            if held.differs_from(&stored) {
                return Err(StoreError::Concurrency {
                    oid: oid.without_version().to_string(),
                    held: held.clone(),
                    stored,
                });
            }
        }

        let sequence = stored
            .sequence
            .checked_add(1)
            .ok_or_else(|| StoreError::SequenceExhausted(oid.without_version().to_string()))?;
        let next = Version { sequence, ..version };
        record.oid = record.oid.clone().with_version(next.clone())?;
        debug!(oid = %record.oid, "touched");
        Ok(next)
    }

    fn fresh_version(&self, sequence: i64) -> Version {
        let user = self.config.user.clone();
        if self.config.stamp_time {
            Version::now(sequence, user)
        } else {
            Version::new(sequence, user, None)
        }
    }

    fn is_taken(&self, key: &ObjectKey) -> bool {
        self.records.contains_key(key) || self.pending.iter().any(|c| &c.oid.key() == key)
    }

    fn allocate_identifier(&mut self, object_type: &str) -> String {
        match self.config.identifier_strategy {
            IdentifierStrategy::Uuid => Uuid::now_v7().to_string(),
            IdentifierStrategy::Sequence => loop {
                let counter = self.sequences.entry(object_type.to_string()).or_insert(0);
                *counter += 1;
                let identifier = counter.to_string();
                let key = ObjectKey {
                    object_type: object_type.to_string(),
                    identifier: identifier.clone(),
                };
                if !self.is_taken(&key) {
                    break identifier;
                }
            },
        }
    }
}

impl CommandSink for InMemoryStore {
    fn remap_as_persistent(&mut self, adapter: &ObjectAdapter) -> SinkResult<RootOid> {
        let Some(transient) = adapter.root_oid() else {
            return Err(SinkError::Allocation {
                oid: adapter.oid().to_string(),
                reason: "only root objects receive identities".into(),
            });
        };
        let identifier = self.allocate_identifier(transient.object_type());
        let oid = transient
            .as_persistent(identifier)
            .map_err(|e| SinkError::Allocation {
                oid: transient.to_string(),
                reason: e.to_string(),
            })?;
        debug!(from = %transient, to = %oid, "allocated");
        Ok(oid)
    }

    fn add_create_object_command(&mut self, command: CreateObjectCommand) -> SinkResult<()> {
        if command.oid.is_transient() {
            return Err(SinkError::Rejected {
                oid: command.oid.to_string(),
                reason: "identity is still transient".into(),
            });
        }
        if self.is_taken(&command.oid.key()) {
            return Err(SinkError::Rejected {
                oid: command.oid.to_string(),
                reason: "object already created".into(),
            });
        }
        self.pending.push(command);
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("records", &self.records.len())
            .field("pending", &self.pending.len())
            .field("strategy", &self.config.identifier_strategy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use reach_graph::{make_persistent, ObjectGraph, TypeSpec};

    use super::*;
    use reach_oid::OidMarshaller;

    fn store() -> InMemoryStore {
        InMemoryStore::new(StoreConfig::deterministic())
    }

    /// CUS -> address ADR, CUS -> orders [ORD, ORD]
    fn customer_graph() -> (ObjectGraph, reach_graph::AdapterId) {
        let mut graph = ObjectGraph::new();
        let customer = TypeSpec::entity("CUS")
            .reference("address")
            .collection_of("orders")
            .shared();
        let order = TypeSpec::entity("ORD").shared();
        let cus = graph.add_transient(customer).unwrap();
        let adr = graph.add_transient(TypeSpec::entity("ADR").shared()).unwrap();
        graph.set_reference(cus, "address", Some(adr)).unwrap();
        let orders = graph
            .add_collection(cus, "orders", TypeSpec::collection("list").shared())
            .unwrap();
        for _ in 0..2 {
            let o = graph.add_transient(order.clone()).unwrap();
            graph.push_element(orders, o).unwrap();
        }
        (graph, cus)
    }

    // -----------------------------------------------------------------------
    // Allocation
    // -----------------------------------------------------------------------

    #[test]
    fn sequence_identifiers_count_per_type() {
        let (mut graph, cus) = customer_graph();
        let mut store = store();
        make_persistent(&mut graph, cus, &mut store).unwrap();

        let queued: Vec<String> = store.pending().iter().map(|c| c.oid.to_string()).collect();
        assert_eq!(queued, vec!["ADR:1", "ORD:1", "ORD:2", "CUS:1"]);
        assert!(store.is_empty());
    }

    #[test]
    fn uuid_identifiers_are_distinct() {
        let (mut graph, cus) = customer_graph();
        let mut store = InMemoryStore::new(StoreConfig {
            identifier_strategy: IdentifierStrategy::Uuid,
            ..StoreConfig::deterministic()
        });
        make_persistent(&mut graph, cus, &mut store).unwrap();

        let mut ids: Vec<&str> = store.pending().iter().map(|c| c.oid.identifier()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 4);
        assert!(ids.iter().all(|id| Uuid::parse_str(id).is_ok()));
    }

    #[test]
    fn sequence_skips_identifiers_in_use() {
        let mut store = store();
        store
            .add_create_object_command(CreateObjectCommand::new(
                RootOid::persistent("CUS", "1").unwrap(),
            ))
            .unwrap();
        assert_eq!(store.allocate_identifier("CUS"), "2");
        assert_eq!(store.allocate_identifier("ORD"), "1");
    }

    #[test]
    fn aggregated_adapters_cannot_be_allocated() {
        let mut graph = ObjectGraph::new();
        let owner = graph
            .add_transient(TypeSpec::entity("CUS").shared())
            .unwrap();
        let name = graph
            .add_aggregated(owner, TypeSpec::value("NME").shared(), "1")
            .unwrap();
        let err = store()
            .remap_as_persistent(graph.get(name).unwrap())
            .unwrap_err();
        assert!(matches!(err, SinkError::Allocation { .. }));
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    #[test]
    fn duplicate_create_is_rejected() {
        let mut store = store();
        let oid = RootOid::persistent("CUS", "1").unwrap();
        store
            .add_create_object_command(CreateObjectCommand::new(oid.clone()))
            .unwrap();
        let err = store
            .add_create_object_command(CreateObjectCommand::new(oid))
            .unwrap_err();
        assert!(matches!(err, SinkError::Rejected { .. }));
        assert_eq!(store.pending().len(), 1);
    }

    #[test]
    fn transient_create_is_rejected() {
        let err = store()
            .add_create_object_command(CreateObjectCommand::new(
                RootOid::transient("CUS", "1").unwrap(),
            ))
            .unwrap_err();
        assert!(matches!(err, SinkError::Rejected { .. }));
    }

    #[test]
    fn commit_stores_records_with_first_version() {
        let (mut graph, cus) = customer_graph();
        let mut store = InMemoryStore::new(StoreConfig {
            user: Some("sven".into()),
            ..StoreConfig::deterministic()
        });
        make_persistent(&mut graph, cus, &mut store).unwrap();
        let committed = store.commit().unwrap();

        assert_eq!(committed.len(), 4);
        assert_eq!(store.len(), 4);
        assert!(store.pending().is_empty());
        assert_eq!(
            OidMarshaller::marshal_root(&committed[3]),
            "CUS:1^1:sven:"
        );

        let record = store.get(graph.oid(cus).unwrap().root()).unwrap();
        assert_eq!(record.version(), Some(&Version::new(1, Some("sven".into()), None)));
        let orders: Vec<String> = record
            .references
            .iter()
            .filter(|r| r.association == "orders")
            .map(|r| r.target.to_string())
            .collect();
        assert_eq!(orders, vec!["ORD:1", "ORD:2"]);
    }

    #[test]
    fn commit_stamps_time_when_configured() {
        let mut store = InMemoryStore::new(StoreConfig::default());
        store
            .add_create_object_command(CreateObjectCommand::new(
                RootOid::persistent("CUS", "1").unwrap(),
            ))
            .unwrap();
        let committed = store.commit().unwrap();
        let version = committed[0].version().unwrap();
        assert_eq!(version.sequence, 1);
        assert!(version.utc_timestamp.is_some());
    }

    #[test]
    fn rollback_discards_queue_but_not_counters() {
        let (mut graph, cus) = customer_graph();
        let mut store = store();
        make_persistent(&mut graph, cus, &mut store).unwrap();
        assert_eq!(store.rollback(), 4);
        assert!(store.pending().is_empty());
        assert!(store.is_empty());

        let (mut graph, cus) = customer_graph();
        make_persistent(&mut graph, cus, &mut store).unwrap();
        assert_eq!(graph.oid(cus).unwrap().to_string(), "CUS:2");
    }

    #[test]
    fn committed_objects_cannot_be_created_again() {
        let mut store = store();
        let oid = RootOid::persistent("CUS", "1").unwrap();
        store
            .add_create_object_command(CreateObjectCommand::new(oid.clone()))
            .unwrap();
        store.commit().unwrap();
        assert!(store
            .add_create_object_command(CreateObjectCommand::new(oid))
            .is_err());
    }

    // -----------------------------------------------------------------------
    // Lookup and versioning
    // -----------------------------------------------------------------------

    #[test]
    fn get_ignores_state_and_version() {
        let mut store = store();
        store
            .add_create_object_command(CreateObjectCommand::new(
                RootOid::persistent("CUS", "1").unwrap(),
            ))
            .unwrap();
        store.commit().unwrap();

        let lookup = RootOid::transient("CUS", "1")
            .unwrap()
            .with_version(Version::sequence_only(99))
            .unwrap();
        assert!(store.get(&lookup).is_some());
        assert!(store.get(&RootOid::persistent("CUS", "2").unwrap()).is_none());
    }

    #[test]
    fn touch_bumps_sequence() {
        let mut store = store();
        let oid = RootOid::persistent("CUS", "1").unwrap();
        store
            .add_create_object_command(CreateObjectCommand::new(oid.clone()))
            .unwrap();
        let committed = store.commit().unwrap();

        let next = store.touch(&committed[0]).unwrap();
        assert_eq!(next.sequence, 2);
        let again = store.touch(&oid).unwrap();
        assert_eq!(again.sequence, 3);
        assert_eq!(store.get(&oid).unwrap().version(), Some(&again));
    }

    #[test]
    fn touch_with_stale_version_conflicts() {
        let mut store = store();
        store
            .add_create_object_command(CreateObjectCommand::new(
                RootOid::persistent("CUS", "1").unwrap(),
            ))
            .unwrap();
        let committed = store.commit().unwrap();
        store.touch(&committed[0]).unwrap();

        let err = store.touch(&committed[0]).unwrap_err();
        match err {
            StoreError::Concurrency { held, stored, .. } => {
                assert_eq!(held.sequence, 1);
                assert_eq!(stored.sequence, 2);
            }
            other => panic!("unexpected {other:?}"),
        }
        let stale = committed[0].compare_against(&store.get(&committed[0]).unwrap().oid);
        assert_eq!(stale, reach_oid::Equivalence::EquivalentButChanged);
    }

    #[test]
    fn record_serializes_versioned_identity() {
        let record = StoredRecord {
            oid: RootOid::persistent("CUS", "1")
                .unwrap()
                .with_version(Version::sequence_only(2))
                .unwrap(),
            references: Vec::new(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["oid"], "CUS:1^2::");
        let back: StoredRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back.version(), Some(&Version::sequence_only(2)));
    }

    #[test]
    fn touch_at_sequence_limit_is_refused() {
        let mut store = InMemoryStore::new(StoreConfig {
            initial_sequence: i64::MAX,
            ..StoreConfig::deterministic()
        });
        let oid = RootOid::persistent("CUS", "1").unwrap();
        store
            .add_create_object_command(CreateObjectCommand::new(oid.clone()))
            .unwrap();
        let committed = store.commit().unwrap();

        let err = store.touch(&committed[0]).unwrap_err();
        assert!(matches!(err, StoreError::SequenceExhausted(ref o) if o == "CUS:1"));
        assert_eq!(
            store.get(&oid).unwrap().version(),
            Some(&Version::sequence_only(i64::MAX))
        );
    }

    #[test]
    fn touch_unknown_is_not_found() {
        let err = store()
            .touch(&RootOid::persistent("CUS", "1").unwrap())
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    proptest! {
        #[test]
        fn allocated_keys_never_collide(
            types in proptest::collection::vec(prop_oneof![Just("CUS"), Just("ORD"), Just("ADR")], 1..40),
            use_uuid in any::<bool>(),
        ) {
            let strategy = if use_uuid { IdentifierStrategy::Uuid } else { IdentifierStrategy::Sequence };
            let mut store = InMemoryStore::new(StoreConfig {
                identifier_strategy: strategy,
                ..StoreConfig::deterministic()
            });
            let mut graph = ObjectGraph::new();
            for object_type in &types {
                let id = graph.add_transient(TypeSpec::entity(*object_type).shared()).unwrap();
                let oid = store.remap_as_persistent(graph.get(id).unwrap()).unwrap();
                prop_assert!(store.add_create_object_command(CreateObjectCommand::new(oid)).is_ok());
            }
            let committed = store.commit().unwrap();
            prop_assert_eq!(committed.len(), types.len());
            prop_assert_eq!(store.len(), types.len());
        }
    }
}
