//! The abstract data layer.
//!
//! Storage and query execution are delegated to a [`DataSource`]. The rest of the crate describes
//! what it needs in terms of a [`Query`]: the resource to read, the filters, ordering and window to
//! apply, and which relations to load eagerly, either by joining ([`Query::select_related`]) or by
//! separate queries ([`Query::prefetch_related`]).

use crate::{
    query::{Filter, SortField},
    resource::{Record, Related},
};
use std::error::Error as StdError;

pub mod mock;

/// How a relation is stored, which determines how it can be loaded eagerly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RelationStorage {
    /// A single-valued reference held by the owner, e.g. a foreign key column.
    ForwardOne,
    /// A many-valued reference held by the owner, e.g. a join table.
    ForwardMany,
    /// A single-valued reference held by the related resource.
    ReverseOne,
    /// A many-valued reference held by the related resources.
    ReverseMany,
    /// Anything else, such as generic or computed references.
    Generic,
}

impl RelationStorage {
    /// Whether the relation can be loaded by joining it to the owner's query.
    pub fn is_joinable(self) -> bool {
        self == Self::ForwardOne
    }
}

/// A window into an ordered result set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Window {
    pub offset: usize,
    pub limit: Option<usize>,
}

/// A case-insensitive substring search over several fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Search {
    /// The searched fields, as relationship chains.
    pub fields: Vec<Vec<String>>,
    pub term: String,
}

/// A separately loaded relation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prefetch {
    /// The name of the relation on the owning resource.
    pub lookup: String,
    /// How to load the related records.
    pub query: Query,
}

/// An abstract request for records of one resource.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Query {
    pub resource: String,
    /// Relation chains to load by joining, in `__` form.
    pub select_related: Vec<String>,
    pub prefetch_related: Vec<Prefetch>,
    /// Attributes to load. All attributes are loaded if this is [`None`].
    pub only: Option<Vec<String>>,
    pub filters: Vec<Filter>,
    pub search: Option<Search>,
    pub ordering: Vec<SortField>,
    /// Restrict the result to these primary keys.
    pub ids: Option<Vec<String>>,
    pub window: Option<Window>,
}

impl Query {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            ..Default::default()
        }
    }

    /// Restrict the query to the record with primary key `id`.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.ids = Some(vec![id.into()]);
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, field: SortField) -> Self {
        self.ordering.push(field);
        self
    }

    pub fn window(mut self, offset: usize, limit: Option<usize>) -> Self {
        self.window = Some(Window { offset, limit });
        self
    }

    /// The number of round trips needed to execute this query with all of its prefetches.
    pub fn round_trips(&self) -> usize {
        1 + self
            .prefetch_related
            .iter()
            .map(|p| p.query.round_trips())
            .sum::<usize>()
    }
}

/// A source of records.
///
/// Implementations decide for themselves how relations are stored and which relations can be
/// joined; the [prefetch planner](crate::prefetch) asks via [`relation`](Self::relation).
/// Records returned by [`fetch`](Self::fetch) must carry their concrete resource name and must
/// carry every relation of the resource, as loaded records where the query asked for the relation
/// and as [stubs](Record::stub) otherwise.
pub trait DataSource {
    type Error: StdError + Send + Sync + 'static;

    /// How the relation `field` of `resource` is stored.
    fn relation(&self, resource: &str, field: &str) -> RelationStorage;

    /// The number of records matching `query`, ignoring its window.
    fn count(&self, query: &Query) -> Result<usize, Self::Error>;

    fn fetch(&self, query: &Query) -> Result<Vec<Record>, Self::Error>;

    /// Insert a record (if it has no id) or update an existing one, returning the stored record.
    fn save(&self, record: Record) -> Result<Record, Self::Error>;

    /// Delete a record, returning whether it existed.
    fn delete(&self, resource: &str, id: &str) -> Result<bool, Self::Error>;

    /// Replace the members of the relation `field` of a record.
    fn set_relation(
        &self,
        resource: &str,
        id: &str,
        field: &str,
        related: Related,
    ) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_round_trips() {
        let mut query = Query::new("Entry");
        query.select_related.push("blog".into());
        assert_eq!(query.round_trips(), 1);

        let mut comments = Query::new("Comment");
        comments.prefetch_related.push(Prefetch {
            lookup: "author".into(),
            query: Query::new("Author"),
        });
        query.prefetch_related.push(Prefetch {
            lookup: "comments".into(),
            query: comments,
        });
        assert_eq!(query.round_trips(), 3);
    }

    #[test]
    fn test_joinable() {
        assert!(RelationStorage::ForwardOne.is_joinable());
        assert!(!RelationStorage::ReverseOne.is_joinable());
        assert!(!RelationStorage::Generic.is_joinable());
    }
}
