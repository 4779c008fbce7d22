//! The `include` parameter.

use crate::{
    context::Context,
    relation::{Relation, RelationshipField},
    resource::ResourceDescriptor,
    Error, Result,
};
use indexmap::IndexMap;
use itertools::Itertools;

/// A tree of relation paths to include in a compound document.
///
/// Each key is the declared name of a relation; its subtree holds the paths to include from the
/// related resources. `include=blog,authors.bio` produces `{blog: {}, authors: {bio: {}}}`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IncludeTree(IndexMap<String, IncludeTree>);

impl IncludeTree {
    /// Parse the value of an `include` parameter, converting wire field names to declared names.
    pub fn parse(value: &str, ctx: &Context) -> Self {
        let mut tree = Self::default();
        for path in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            tree.insert(path.split('.').map(|segment| ctx.unformat_field(segment)));
        }
        tree
    }

    /// Build a tree from dotted paths of declared names.
    pub fn from_paths<S: AsRef<str>>(paths: impl IntoIterator<Item = S>) -> Self {
        let mut tree = Self::default();
        for path in paths {
            tree.insert(path.as_ref().split('.').map(String::from));
        }
        tree
    }

    /// Add a path, given as a sequence of declared relation names.
    pub fn insert(&mut self, path: impl IntoIterator<Item = String>) {
        let mut node = self;
        for segment in path {
            node = node.0.entry(segment).or_default();
        }
    }

    /// The subtree for `field`, if `field` or any path through it was requested.
    pub fn get(&self, field: &str) -> Option<&IncludeTree> {
        self.0.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &IncludeTree)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// All complete paths in the tree, dotted.
    pub fn paths(&self) -> Vec<String> {
        self.iter()
            .flat_map(|(field, sub)| {
                if sub.is_empty() {
                    vec![field.to_string()]
                } else {
                    sub.paths()
                        .into_iter()
                        .map(|path| format!("{field}.{path}"))
                        .collect()
                }
            })
            .collect()
    }

    /// Check that every path passes through includable relations of `resource`.
    ///
    /// For polymorphic resources, a path is valid if it is valid for any of the subtypes.
    pub fn validate(&self, resource: &ResourceDescriptor, ctx: &Context) -> Result<()> {
        self.validate_any(&[resource], ctx)
    }

    /// Check that every path passes through includable relations of any of `resources`.
    pub fn validate_any(&self, resources: &[&ResourceDescriptor], ctx: &Context) -> Result<()> {
        let mut concrete: Vec<&ResourceDescriptor> = vec![];
        for resource in resources {
            for resource in ctx.registry.concrete(resource) {
                if !concrete.iter().any(|r| r.name() == resource.name()) {
                    concrete.push(resource);
                }
            }
        }
        self.validate_in(&concrete, &[], ctx)
    }

    /// The top-level paths of this tree which start with a field of one of `resources`.
    pub(crate) fn restrict(&self, resources: &[&ResourceDescriptor]) -> IncludeTree {
        IncludeTree(
            self.0
                .iter()
                .filter(|(field, _)| resources.iter().any(|r| r.field(field).is_some()))
                .map(|(field, sub)| (field.clone(), sub.clone()))
                .collect(),
        )
    }

    fn validate_in(
        &self,
        resources: &[&ResourceDescriptor],
        prefix: &[&str],
        ctx: &Context,
    ) -> Result<()> {
        for (field, sub) in self.iter() {
            let path = prefix.iter().copied().chain([field]).collect::<Vec<_>>();
            let relations = resources
                .iter()
                .filter_map(|r| r.field(field))
                .filter(|f| f.includable)
                .filter_map(|f| f.relation())
                .collect::<Vec<_>>();
            if relations.is_empty() {
                let path = path.iter().map(|segment| ctx.format_field(segment)).join(".");
                tracing::debug!(path, "rejecting include path");
                return Err(Error::InvalidInclude {
                    detail: format!(
                        "This endpoint does not support the include parameter for path {path}"
                    ),
                });
            }
            if !sub.is_empty() {
                let targets = related_resources(&relations, ctx)?;
                sub.validate_in(&targets, &path, ctx)?;
            }
        }
        Ok(())
    }
}

/// The concrete resources targeted by any of `relations`.
pub(crate) fn related_resources<'a>(
    relations: &[&Relation],
    ctx: &Context<'a>,
) -> Result<Vec<&'a ResourceDescriptor>> {
    let mut resources: Vec<&ResourceDescriptor> = vec![];
    for relation in relations {
        // Only relations rendered with data can be included.
        if relation.skip_data() {
            continue;
        }
        for target in relation.targets() {
            for resource in ctx.registry.concrete(ctx.resource(target)?) {
                if !resources.iter().any(|r| r.name() == resource.name()) {
                    resources.push(resource);
                }
            }
        }
    }
    Ok(resources)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fixtures::Fixture;

    #[test]
    fn test_parse() {
        let fixture = Fixture::new();
        let ctx = fixture.context();
        let tree = IncludeTree::parse("blog, authors.entries,comments.author,,featured", &ctx);
        assert_eq!(
            tree.paths(),
            ["blog", "authors.entries", "comments.author", "featured"]
        );
        assert!(tree.get("authors").unwrap().contains("entries"));
        assert!(tree.get("blog").unwrap().is_empty());
        assert!(!tree.contains("suggested"));

        let tree = IncludeTree::parse("currentProject", &ctx);
        assert!(tree.contains("current_project"));
    }

    #[test]
    fn test_validate() {
        let fixture = Fixture::new();
        let ctx = fixture.context();
        let entry = fixture.registry.resource("Entry").unwrap();

        IncludeTree::parse("blog,authors.entries.comments,featured.blog", &ctx)
            .validate(entry, &ctx)
            .unwrap();

        for (include, path) in [
            ("headline", "headline"),
            ("nonesuch", "nonesuch"),
            ("suggested", "suggested"),
            ("blog.entries", "blog.entries"),
            ("comments.author.nonesuch", "comments.author.nonesuch"),
            ("bodyText", "bodyText"),
        ] {
            let err = IncludeTree::parse(include, &ctx)
                .validate(entry, &ctx)
                .unwrap_err();
            assert_eq!(err.status(), 400);
            assert_eq!(
                err.to_string(),
                format!("This endpoint does not support the include parameter for path {path}")
            );
        }
    }

    #[test]
    fn test_validate_polymorphic() {
        let fixture = Fixture::new();
        let ctx = fixture.context();
        let company = fixture.registry.resource("Company").unwrap();
        IncludeTree::parse("currentProject,futureProjects", &ctx)
            .validate(company, &ctx)
            .unwrap();
        IncludeTree::parse("currentProject.nonesuch", &ctx)
            .validate(company, &ctx)
            .unwrap_err();
    }

    #[test]
    fn test_from_paths() {
        let tree = IncludeTree::from_paths(["blog", "comments.author", "comments.entry"]);
        assert_eq!(tree.paths(), ["blog", "comments.author", "comments.entry"]);
    }
}
