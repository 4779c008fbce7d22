//! Per-request access to the registry, configuration and routes.

use crate::{
    config::Config,
    inflection::{format_resource_type, format_value, undo_format_field_name},
    links::Routes,
    resource::{Registry, ResourceDescriptor},
    Error, Result,
};

/// Everything the renderer, parser and query layer need to know about the API.
///
/// A context is a bundle of shared references and is cheap to copy.
#[derive(Clone, Copy, Debug)]
pub struct Context<'a> {
    pub registry: &'a Registry,
    pub config: &'a Config,
    pub routes: &'a Routes,
}

impl<'a> Context<'a> {
    pub fn new(registry: &'a Registry, config: &'a Config, routes: &'a Routes) -> Self {
        Self {
            registry,
            config,
            routes,
        }
    }

    /// The wire type name of `resource`.
    ///
    /// An explicit type name on the descriptor wins; otherwise the name is derived from the model
    /// name using the configured format and pluralization.
    pub fn type_name(&self, resource: &ResourceDescriptor) -> String {
        match resource.explicit_type_name() {
            Some(ty) => ty.to_string(),
            None => format_resource_type(
                resource.name(),
                self.config.type_names,
                self.config.pluralize_types,
            ),
        }
    }

    /// The wire type name of the resource named `name`.
    pub fn type_of(&self, name: &str) -> Result<String> {
        Ok(self.type_name(self.resource(name)?))
    }

    /// The wire type names a record of `resource` may carry.
    ///
    /// For a polymorphic resource these are the names of its subtypes.
    pub fn type_names(&self, resource: &ResourceDescriptor) -> Vec<String> {
        self.registry
            .concrete(resource)
            .into_iter()
            .map(|d| self.type_name(d))
            .collect()
    }

    pub fn resource(&self, name: &str) -> Result<&'a ResourceDescriptor> {
        self.registry.resource(name)
    }

    /// Find the resource whose wire type name is `ty`.
    pub fn resource_by_type(&self, ty: &str) -> Option<&'a ResourceDescriptor> {
        self.registry.iter().find(|d| self.type_name(d) == ty)
    }

    /// Convert a declared field name to its wire form.
    pub fn format_field(&self, name: &str) -> String {
        format_value(name, self.config.field_names)
    }

    /// Convert a wire field name to its declared form.
    pub fn unformat_field(&self, name: &str) -> String {
        undo_format_field_name(name, self.config.field_names)
    }

    /// Convert a relationship name to its form in URL segments.
    pub fn format_link_segment(&self, name: &str) -> String {
        format_value(name, self.config.related_links)
    }

    /// The descriptor of the concrete resource named by a record.
    pub fn concrete(&self, name: &str) -> Result<&'a ResourceDescriptor> {
        self.resource(name).map_err(|_| {
            Error::server(format!("record of unregistered resource {name}"))
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::inflection::Format;

    #[test]
    fn test_type_names() {
        let registry = Registry::builder()
            .add(
                ResourceDescriptor::new("Project")
                    .subtype("ArtProject")
                    .subtype("ResearchProject"),
            )
            .add(ResourceDescriptor::new("ArtProject"))
            .add(ResourceDescriptor::new("ResearchProject"))
            .add(ResourceDescriptor::new("BlogEntry").type_name("posts"))
            .build()
            .unwrap();
        let config = Config::default().with_type_names(Format::Camelize, true);
        let routes = Routes::new();
        let ctx = Context::new(&registry, &config, &routes);

        assert_eq!(ctx.type_of("ArtProject").unwrap(), "artProjects");
        assert_eq!(ctx.type_of("BlogEntry").unwrap(), "posts");
        assert_eq!(
            ctx.type_names(registry.resource("Project").unwrap()),
            ["artProjects", "researchProjects"]
        );
        assert_eq!(
            ctx.resource_by_type("researchProjects").unwrap().name(),
            "ResearchProject"
        );
        assert!(ctx.resource_by_type("nonesuch").is_none());
    }

    #[test]
    fn test_field_formatting() {
        let registry = Registry::default();
        let config = Config::default()
            .with_field_names(Format::Dasherize)
            .with_related_links(Format::Camelize);
        let routes = Routes::new();
        let ctx = Context::new(&registry, &config, &routes);
        assert_eq!(ctx.format_field("body_text"), "body-text");
        assert_eq!(ctx.unformat_field("body-text"), "body_text");
        assert_eq!(ctx.format_link_segment("featured_entry"), "featuredEntry");
    }
}
