//! The collection of all resources of an API.

use super::{Resource, ResourceDescriptor};
use crate::{Error, Result};
use indexmap::IndexMap;

/// Builder for a [`Registry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    resources: Vec<ResourceDescriptor>,
}

impl RegistryBuilder {
    /// Register the resource `T`.
    pub fn register<T: Resource>(self) -> Self {
        self.add(T::descriptor())
    }

    /// Register a hand-written resource descriptor.
    pub fn add(mut self, descriptor: ResourceDescriptor) -> Self {
        self.resources.push(descriptor);
        self
    }

    /// Resolve all relation targets and freeze the registry.
    ///
    /// Fails if a resource is registered twice, or if a relation, polymorphic subtype or
    /// polymorphic relation names a resource which is not registered.
    pub fn build(self) -> Result<Registry> {
        let mut resources = IndexMap::new();
        for mut descriptor in self.resources {
            let owner = descriptor.name().to_string();
            for field in descriptor.fields_mut() {
                if let Some(relation) = field.relation_mut() {
                    relation.resolve(&owner);
                }
            }
            if resources.insert(owner.clone(), descriptor).is_some() {
                return Err(Error::configuration(format!(
                    "resource {owner} is registered more than once"
                )));
            }
        }

        for descriptor in resources.values() {
            for subtype in descriptor.subtypes() {
                if !resources.contains_key(subtype) {
                    return Err(Error::configuration(format!(
                        "unknown subtype {subtype} of resource {}",
                        descriptor.name()
                    )));
                }
            }
            for (field, relation) in descriptor.relationships() {
                for target in relation.targets() {
                    if !resources.contains_key(target) {
                        return Err(Error::configuration(format!(
                            "unknown resource {target} targeted by field {}.{}",
                            descriptor.name(),
                            field.name
                        )));
                    }
                }
            }
        }

        tracing::debug!("registered resources: {:?}", resources.keys());
        Ok(Registry { resources })
    }
}

/// All resources of an API, with relation targets resolved.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    resources: IndexMap<String, ResourceDescriptor>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Look up a resource by model name.
    pub fn get(&self, name: &str) -> Option<&ResourceDescriptor> {
        self.resources.get(name)
    }

    /// Look up a resource by model name, failing with a configuration error if it is unknown.
    pub fn resource(&self, name: &str) -> Result<&ResourceDescriptor> {
        self.get(name)
            .ok_or_else(|| Error::configuration(format!("unknown resource {name}")))
    }

    /// All resources, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ResourceDescriptor> {
        self.resources.values()
    }

    /// The concrete resources a record of `descriptor` may be.
    ///
    /// This is the list of subtypes for a polymorphic resource, and the resource itself otherwise.
    pub fn concrete<'a>(
        &'a self,
        descriptor: &'a ResourceDescriptor,
    ) -> Vec<&'a ResourceDescriptor> {
        if descriptor.is_polymorphic() {
            descriptor
                .subtypes()
                .iter()
                .filter_map(|name| self.get(name))
                .collect()
        } else {
            vec![descriptor]
        }
    }
}
