//! Mock instantiation of the abstract [`DataSource`] interface.
//!
//! This instantiation is built on a simple in-memory store. It is useful for testing the request
//! pipeline in isolation from an actual database. It counts the round trips a real database would
//! need to answer each query, so tests can check how relations are loaded.
#![cfg(any(test, feature = "mocks"))]

use super::{DataSource, Query, RelationStorage, Search};
use crate::{
    query::{Filter, FilterOp, FilterValue, SortField},
    relation::{Relation, RelationshipField},
    resource::{Record, Registry, Related},
};
use derive_more::From;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use snafu::Snafu;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Errors returned by the in-memory data source.
#[derive(Debug, Snafu, From)]
#[snafu(display("mock data source error: {}", message))]
pub struct Error {
    message: String,
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        s.to_string().into()
    }
}

/// The address of a stored record: its concrete resource and its id.
type Key = (String, String);

/// A stored record.
#[derive(Clone, Debug, Default)]
struct Row {
    attributes: Map<String, Value>,
    relations: HashMap<String, Vec<Key>>,
}

/// The in-memory store.
#[derive(Debug, Default)]
struct Db {
    rows: IndexMap<Key, Row>,
    queries: usize,
}

/// Relations to load along with a record, derived from a [`Query`].
#[derive(Debug, Default)]
struct Plan<'q> {
    /// The resource queried for, or [`None`] for a joined relation, which applies to any record.
    resource: Option<&'q str>,
    only: Option<&'q [String]>,
    /// The plans for each relation. A polymorphic relation may have one plan per target.
    nested: HashMap<&'q str, Vec<Plan<'q>>>,
}

impl<'q> Plan<'q> {
    fn of(query: &'q Query) -> Self {
        let mut plan = Plan {
            resource: Some(&query.resource),
            only: query.only.as_deref(),
            nested: HashMap::new(),
        };
        for path in &query.select_related {
            let mut node = &mut plan;
            for segment in path.split("__") {
                let plans = node.nested.entry(segment).or_default();
                if plans.is_empty() {
                    plans.push(Plan::default());
                }
                node = &mut plans[0];
            }
        }
        for prefetch in &query.prefetch_related {
            plan.nested
                .entry(prefetch.lookup.as_str())
                .or_default()
                .push(Plan::of(&prefetch.query));
        }
        plan
    }
}

/// A data source backed by an in-memory store.
///
/// Clones share the same store.
#[derive(Clone, Debug)]
pub struct MockDataSource {
    db: Arc<RwLock<Db>>,
    registry: Arc<Registry>,
    storage: HashMap<(String, String), RelationStorage>,
}

impl MockDataSource {
    /// Create an empty store for the resources in `registry`.
    ///
    /// Relations are stored as forward references held by their owner, except polymorphic and
    /// computed relations, which are generic.
    pub fn new(registry: &Registry) -> Self {
        Self {
            db: Default::default(),
            registry: Arc::new(registry.clone()),
            storage: HashMap::new(),
        }
    }

    /// Override how a relation is reported to be stored.
    pub fn with_storage(
        mut self,
        resource: impl Into<String>,
        field: impl Into<String>,
        storage: RelationStorage,
    ) -> Self {
        self.storage.insert((resource.into(), field.into()), storage);
        self
    }

    /// Store records, returning them as stored.
    pub fn insert(&self, records: impl IntoIterator<Item = Record>) -> Result<Vec<Record>, Error> {
        records.into_iter().map(|record| self.save(record)).collect()
    }

    /// The number of round trips executed so far.
    pub fn queries(&self) -> usize {
        self.db.read().map(|db| db.queries).unwrap_or_default()
    }

    pub fn reset_queries(&self) {
        if let Ok(mut db) = self.db.write() {
            db.queries = 0;
        }
    }

    fn id_field(&self, resource: &str) -> &str {
        self.registry
            .get(resource)
            .map(|d| d.id_field_name())
            .unwrap_or("id")
    }

    /// The keys of all records matching `query`, in order, ignoring the window.
    fn select(&self, db: &Db, query: &Query) -> Vec<Key> {
        let resources = match self.registry.get(&query.resource) {
            Some(descriptor) => self
                .registry
                .concrete(descriptor)
                .into_iter()
                .map(|d| d.name().to_string())
                .collect(),
            None => vec![query.resource.clone()],
        };
        let mut keys = db
            .rows
            .keys()
            .filter(|(resource, _)| resources.contains(resource))
            .filter(|(_, id)| {
                query
                    .ids
                    .as_ref()
                    .map(|ids| ids.contains(id))
                    .unwrap_or(true)
            })
            .filter(|key| query.filters.iter().all(|f| self.matches(db, key, f)))
            .filter(|key| {
                query
                    .search
                    .as_ref()
                    .map(|search| self.matches_search(db, key, search))
                    .unwrap_or(true)
            })
            .cloned()
            .collect::<Vec<_>>();
        keys.sort_by(|a, b| {
            query
                .ordering
                .iter()
                .map(|field| self.compare(db, a, b, field))
                .find(|ord| *ord != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
        keys
    }

    /// The values at the end of the relationship chain `path`, starting from the record `key`.
    fn values_at(&self, db: &Db, key: &Key, path: &[String]) -> Vec<Value> {
        let Some(row) = db.rows.get(key) else {
            return vec![];
        };
        match path {
            [] => vec![],
            [field] if field == self.id_field(&key.0) => vec![Value::String(key.1.clone())],
            [field] => row.attributes.get(field).cloned().into_iter().collect(),
            [field, rest @ ..] => row
                .relations
                .get(field)
                .into_iter()
                .flatten()
                .flat_map(|related| self.values_at(db, related, rest))
                .collect(),
        }
    }

    fn matches(&self, db: &Db, key: &Key, filter: &Filter) -> bool {
        let values = self.values_at(db, key, &filter.path);
        match (&filter.op, &filter.value) {
            (FilterOp::IsNull, FilterValue::Bool(is_null)) => {
                values.iter().all(Value::is_null) == *is_null
            }
            (op, operand) => values.iter().any(|value| test(value, *op, operand)),
        }
    }

    fn matches_search(&self, db: &Db, key: &Key, search: &Search) -> bool {
        let term = search.term.to_lowercase();
        search.fields.iter().any(|path| {
            self.values_at(db, key, path)
                .iter()
                .filter_map(as_text)
                .any(|text| text.to_lowercase().contains(&term))
        })
    }

    fn compare(&self, db: &Db, a: &Key, b: &Key, field: &SortField) -> Ordering {
        let a = self.values_at(db, a, &field.path).into_iter().next();
        let b = self.values_at(db, b, &field.path).into_iter().next();
        let ord = compare_values(a.as_ref(), b.as_ref());
        if field.descending {
            ord.reverse()
        } else {
            ord
        }
    }

    /// The first of `plans` which loads records of the concrete resource `resource`.
    fn plan_for<'p, 'q>(&self, plans: &'p [Plan<'q>], resource: &str) -> Option<&'p Plan<'q>> {
        plans.iter().find(|plan| match plan.resource {
            None => true,
            Some(name) if name == resource => true,
            Some(name) => self
                .registry
                .get(name)
                .map(|d| self.registry.concrete(d).iter().any(|c| c.name() == resource))
                .unwrap_or(false),
        })
    }

    /// Materialize the record `key`, loading the relations named in `plan`.
    fn load(&self, db: &Db, key: &Key, plan: &Plan) -> Result<Record, Error> {
        let row = db
            .rows
            .get(key)
            .ok_or_else(|| Error::from(format!("no such record {}:{}", key.0, key.1)))?;
        let mut record = Record::new(&key.0, &key.1);
        for (name, value) in &row.attributes {
            if plan.only.map(|only| only.contains(name)).unwrap_or(true) {
                record.attributes.insert(name.clone(), value.clone());
            }
        }

        let Some(descriptor) = self.registry.get(&key.0) else {
            return Ok(record);
        };
        for (field, relation) in descriptor.relationships() {
            if relation.is_computed() {
                continue;
            }
            let nested = plan
                .nested
                .get(field.name.as_str())
                .map(Vec::as_slice)
                .unwrap_or_default();
            let related = row
                .relations
                .get(&field.name)
                .into_iter()
                .flatten()
                .map(|related| match self.plan_for(nested, &related.0) {
                    Some(plan) => self.load(db, related, plan),
                    None => Ok(Record::stub(&related.0, &related.1)),
                })
                .collect::<Result<Vec<_>, _>>()?;
            let related = if relation.is_to_many() {
                Related::Many(related)
            } else {
                Related::One(related.into_iter().next().map(Box::new))
            };
            record.relations.insert(field.name.clone(), related);
        }
        Ok(record)
    }
}

impl DataSource for MockDataSource {
    type Error = Error;

    fn relation(&self, resource: &str, field: &str) -> RelationStorage {
        if let Some(storage) = self.storage.get(&(resource.to_string(), field.to_string())) {
            return *storage;
        }
        let relation = self
            .registry
            .get(resource)
            .and_then(|d| d.field(field))
            .and_then(|f| f.relation());
        match relation {
            Some(Relation::Polymorphic(_) | Relation::Computed(_)) | None => {
                RelationStorage::Generic
            }
            Some(relation) if relation.is_to_many() => RelationStorage::ForwardMany,
            Some(_) => RelationStorage::ForwardOne,
        }
    }

    fn count(&self, query: &Query) -> Result<usize, Error> {
        let mut db = self.db.write().map_err(|_| Error::from("lock poisoned"))?;
        db.queries += 1;
        tracing::info!("SELECT COUNT(*) FROM {}", query.resource);
        Ok(self.select(&db, query).len())
    }

    fn fetch(&self, query: &Query) -> Result<Vec<Record>, Error> {
        let mut db = self.db.write().map_err(|_| Error::from("lock poisoned"))?;
        db.queries += query.round_trips();
        tracing::info!(
            "SELECT {} FROM {} JOIN {:?}",
            query
                .only
                .as_ref()
                .map(|only| only.join(", "))
                .unwrap_or_else(|| "*".into()),
            query.resource,
            query.select_related
        );
        for prefetch in &query.prefetch_related {
            tracing::info!("PREFETCH {} FROM {}", prefetch.lookup, prefetch.query.resource);
        }

        let keys = self.select(&db, query);
        let keys = match query.window {
            Some(window) => keys
                .into_iter()
                .skip(window.offset)
                .take(window.limit.unwrap_or(usize::MAX))
                .collect(),
            None => keys,
        };
        let plan = Plan::of(query);
        keys.iter().map(|key| self.load(&db, key, &plan)).collect()
    }

    fn save(&self, record: Record) -> Result<Record, Error> {
        let mut db = self.db.write().map_err(|_| Error::from("lock poisoned"))?;
        let id = match record.id {
            Some(id) => id,
            None => {
                let max = db
                    .rows
                    .keys()
                    .filter(|(resource, _)| *resource == record.resource)
                    .filter_map(|(_, id)| id.parse::<u64>().ok())
                    .max()
                    .unwrap_or(0);
                (max + 1).to_string()
            }
        };
        let key = (record.resource, id);
        tracing::info!("UPSERT {}:{}", key.0, key.1);

        let row = db.rows.entry(key.clone()).or_default();
        row.attributes.extend(record.attributes);
        for (field, related) in record.relations {
            row.relations.insert(field, keys_of(&related));
        }
        self.load(&db, &key, &Plan::default())
    }

    fn delete(&self, resource: &str, id: &str) -> Result<bool, Error> {
        let mut db = self.db.write().map_err(|_| Error::from("lock poisoned"))?;
        let key = (resource.to_string(), id.to_string());
        tracing::info!("DELETE {}:{}", key.0, key.1);
        let existed = db.rows.shift_remove(&key).is_some();
        for row in db.rows.values_mut() {
            for related in row.relations.values_mut() {
                related.retain(|k| *k != key);
            }
        }
        Ok(existed)
    }

    fn set_relation(
        &self,
        resource: &str,
        id: &str,
        field: &str,
        related: Related,
    ) -> Result<(), Error> {
        let mut db = self.db.write().map_err(|_| Error::from("lock poisoned"))?;
        let row = db
            .rows
            .get_mut(&(resource.to_string(), id.to_string()))
            .ok_or_else(|| Error::from(format!("no such record {resource}:{id}")))?;
        tracing::info!("UPDATE {resource}:{id} SET {field}");
        row.relations.insert(field.to_string(), keys_of(&related));
        Ok(())
    }
}

fn keys_of(related: &Related) -> Vec<Key> {
    related
        .records()
        .filter_map(|r| Some((r.resource.clone(), r.id.clone()?)))
        .collect()
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let (a, b) = match (a.filter(|v| !v.is_null()), b.filter(|v| !v.is_null())) {
        (None, None) => return Ordering::Equal,
        (None, Some(_)) => return Ordering::Less,
        (Some(_), None) => return Ordering::Greater,
        (Some(a), Some(b)) => (a, b),
    };
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => as_text(a).cmp(&as_text(b)),
    }
}

/// Compare `value` to a textual operand.
fn compare_to(value: &Value, operand: &str) -> Option<Ordering> {
    match (as_number(value), operand.parse::<f64>()) {
        (Some(x), Ok(y)) => x.partial_cmp(&y),
        _ => as_text(value).map(|text| text.as_str().cmp(operand)),
    }
}

fn test(value: &Value, op: FilterOp, operand: &FilterValue) -> bool {
    let Some(text) = as_text(value) else {
        return false;
    };
    let lower = text.to_lowercase();
    match (op, operand) {
        (FilterOp::Exact, FilterValue::Single(s)) => text == *s,
        (FilterOp::IExact, FilterValue::Single(s)) => lower == s.to_lowercase(),
        (FilterOp::Contains, FilterValue::Single(s)) => text.contains(s.as_str()),
        (FilterOp::IContains | FilterOp::Search, FilterValue::Single(s)) => {
            lower.contains(&s.to_lowercase())
        }
        (FilterOp::StartsWith, FilterValue::Single(s)) => text.starts_with(s.as_str()),
        (FilterOp::IStartsWith, FilterValue::Single(s)) => lower.starts_with(&s.to_lowercase()),
        (FilterOp::EndsWith, FilterValue::Single(s)) => text.ends_with(s.as_str()),
        (FilterOp::IEndsWith, FilterValue::Single(s)) => lower.ends_with(&s.to_lowercase()),
        (FilterOp::In, FilterValue::List(items)) => items.contains(&text),
        (FilterOp::Gt, FilterValue::Single(s)) => compare_to(value, s) == Some(Ordering::Greater),
        (FilterOp::Gte, FilterValue::Single(s)) => {
            matches!(compare_to(value, s), Some(Ordering::Greater | Ordering::Equal))
        }
        (FilterOp::Lt, FilterValue::Single(s)) => compare_to(value, s) == Some(Ordering::Less),
        (FilterOp::Lte, FilterValue::Single(s)) => {
            matches!(compare_to(value, s), Some(Ordering::Less | Ordering::Equal))
        }
        (FilterOp::Range, FilterValue::List(bounds)) => match bounds.as_slice() {
            [lo, hi] => {
                matches!(compare_to(value, lo), Some(Ordering::Greater | Ordering::Equal))
                    && matches!(compare_to(value, hi), Some(Ordering::Less | Ordering::Equal))
            }
            _ => false,
        },
        (op, operand) => {
            tracing::warn!("unsupported filter {op} {operand:?}");
            false
        }
    }
}
