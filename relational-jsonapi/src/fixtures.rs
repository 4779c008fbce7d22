//! Resources and records shared by the unit tests.
#![cfg(test)]

use crate::{
    config::Config,
    context::Context,
    inflection::Format,
    links::Routes,
    relation::{HyperlinkedRelation, LinkSpec, PolymorphicRelation, ResourceRelation, Target},
    resource::{AttrType, FieldDescriptor, Record, Registry, ResourceDescriptor},
};
use serde_json::{json, Map};

/// A small blogging API with a polymorphic project hierarchy.
pub struct Fixture {
    pub registry: Registry,
    pub config: Config,
    pub routes: Routes,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(
            Config::default()
                .with_field_names(Format::Camelize)
                .with_type_names(Format::Camelize, true),
        )
    }

    pub fn with_config(config: Config) -> Self {
        crate::init_logging();
        Self {
            registry: registry(),
            config,
            routes: routes(),
        }
    }

    pub fn context(&self) -> Context<'_> {
        Context::new(&self.registry, &self.config, &self.routes)
    }
}

fn entry_links() -> LinkSpec {
    LinkSpec::new()
        .self_route("entry-relationships")
        .related_route("entry-related")
}

pub fn registry() -> Registry {
    Registry::builder()
        .add(
            ResourceDescriptor::new("Blog")
                .self_route("blog-detail")
                .attribute("id", AttrType::Integer)
                .attribute("name", AttrType::String)
                .attribute("tagline", AttrType::String)
                .root_meta(|records, many| {
                    if many {
                        Map::from_iter([("blogCount".into(), json!(records.len()))])
                    } else {
                        Map::new()
                    }
                }),
        )
        .add(
            ResourceDescriptor::new("Author")
                .attribute("id", AttrType::Integer)
                .attribute("name", AttrType::String)
                .attribute("email", AttrType::String)
                .add_field(
                    FieldDescriptor::relationship(
                        "entries",
                        ResourceRelation::new(Target::named("Entry"), true).into(),
                    )
                    .include(),
                ),
        )
        .add(
            ResourceDescriptor::new("Entry")
                .self_route("entry-detail")
                .attribute("id", AttrType::Integer)
                .attribute("headline", AttrType::String)
                .attribute("body_text", AttrType::String)
                .add_field(FieldDescriptor::attribute("pub_date", AttrType::String).nullable())
                .add_field(FieldDescriptor::attribute("secret", AttrType::String).write_only())
                .add_field(FieldDescriptor::attribute("created", AttrType::String).read_only())
                .add_field(FieldDescriptor::attribute("rating", AttrType::Number).meta())
                .add_field(
                    FieldDescriptor::relationship(
                        "blog",
                        ResourceRelation::new(Target::named("Blog"), false)
                            .with_links(entry_links())
                            .into(),
                    )
                    .include(),
                )
                .add_field(
                    FieldDescriptor::relationship(
                        "authors",
                        ResourceRelation::new(Target::named("Author"), true).into(),
                    )
                    .include(),
                )
                .add_field(
                    FieldDescriptor::relationship(
                        "comments",
                        ResourceRelation::new(Target::named("Comment"), true).into(),
                    )
                    .include(),
                )
                .add_field(
                    FieldDescriptor::relationship(
                        "featured",
                        ResourceRelation::new(Target::SelfRef, false).into(),
                    )
                    .nullable()
                    .include(),
                )
                .add_field(FieldDescriptor::relationship(
                    "suggested",
                    HyperlinkedRelation::new(Target::SelfRef, true, entry_links()).into(),
                ))
                .meta(|record| {
                    Map::from_iter([(
                        "bodyLength".into(),
                        json!(record
                            .attribute("body_text")
                            .and_then(|v| v.as_str())
                            .map(str::len)
                            .unwrap_or(0)),
                    )])
                }),
        )
        .add(
            ResourceDescriptor::new("Comment")
                .attribute("id", AttrType::Integer)
                .attribute("body", AttrType::String)
                .add_field(
                    FieldDescriptor::relationship(
                        "entry",
                        ResourceRelation::new(Target::named("Entry"), false).into(),
                    )
                    .include(),
                )
                .add_field(
                    FieldDescriptor::relationship(
                        "author",
                        ResourceRelation::new(Target::named("Author"), false).into(),
                    )
                    .nullable()
                    .include(),
                ),
        )
        .add(
            ResourceDescriptor::new("Project")
                .subtype("ArtProject")
                .subtype("ResearchProject")
                .attribute("id", AttrType::Integer)
                .attribute("topic", AttrType::String),
        )
        .add(
            ResourceDescriptor::new("ArtProject")
                .attribute("id", AttrType::Integer)
                .attribute("topic", AttrType::String)
                .attribute("artist", AttrType::String),
        )
        .add(
            ResourceDescriptor::new("ResearchProject")
                .attribute("id", AttrType::Integer)
                .attribute("topic", AttrType::String)
                .attribute("supervisor", AttrType::String),
        )
        .add(
            ResourceDescriptor::new("Company")
                .attribute("id", AttrType::Integer)
                .attribute("name", AttrType::String)
                .add_field(
                    FieldDescriptor::relationship(
                        "current_project",
                        PolymorphicRelation::new([Target::named("Project")], false).into(),
                    )
                    .nullable()
                    .include(),
                )
                .add_field(
                    FieldDescriptor::relationship(
                        "future_projects",
                        PolymorphicRelation::new([Target::named("Project")], true).into(),
                    )
                    .include(),
                )
                .add_field(
                    FieldDescriptor::relationship(
                        "portfolio",
                        PolymorphicRelation::new(
                            [Target::named("ArtProject"), Target::named("ResearchProject")],
                            true,
                        )
                        .into(),
                    )
                    .include(),
                ),
        )
        .build()
        .unwrap()
}

pub fn routes() -> Routes {
    Routes::new()
        .route("entry-list", "/entries")
        .route("entry-detail", "/entries/{pk}")
        .route("entry-relationships", "/entries/{pk}/relationships/{related_field}")
        .route("entry-related", "/entries/{pk}/{related_field}")
        .route("blog-list", "/blogs")
        .route("blog-detail", "/blogs/{pk}")
}

pub fn blog(id: u32) -> Record {
    Record::new("Blog", id.to_string())
        .with_attribute("name", format!("Blog {id}"))
        .with_attribute("tagline", format!("Tagline {id}"))
}

pub fn author(id: u32) -> Record {
    Record::new("Author", id.to_string())
        .with_attribute("name", format!("Author {id}"))
        .with_attribute("email", format!("author{id}@example.com"))
}

pub fn comment(id: u32, author: Option<Record>) -> Record {
    Record::new("Comment", id.to_string())
        .with_attribute("body", format!("Comment {id}"))
        .with_one("author", author)
}

/// An entry of `blog` by `authors`, with no comments and no featured entry.
pub fn entry(id: u32, blog: Option<Record>, authors: Vec<Record>) -> Record {
    Record::new("Entry", id.to_string())
        .with_attribute("headline", format!("Headline {id}"))
        .with_attribute("body_text", format!("Body {id}"))
        .with_attribute("pub_date", serde_json::Value::Null)
        .with_attribute("secret", "hunter2")
        .with_attribute("created", "2020-01-01")
        .with_attribute("rating", 3)
        .with_one("blog", blog)
        .with_many("authors", authors)
        .with_many("comments", vec![])
        .with_one("featured", None)
}
