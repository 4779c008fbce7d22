//! Derive macros for the `relational_jsonapi` crate.

use proc_macro::TokenStream;
use syn::parse_macro_input;

mod helpers;
mod resource;

/// Derive an implementation of `Resource` for a struct.
///
/// The generated implementation describes the struct as a resource named after the struct, with one
/// field per struct field, in declaration order. It also converts instances of the struct into
/// records for rendering.
///
/// Each struct field becomes one of:
/// * The resource identifier, if the field is named `id` or carries the
///   [`id`](#field-attributes) attribute. The identifier is rendered with its `Display`
///   implementation.
/// * A relationship, if its type is `ToOne<T>` or `ToMany<T>`, where `T` is itself a `Resource`.
/// * An attribute otherwise. Attribute values are serialized with `serde`, so the field type must
///   implement `Serialize`. The JSON type advertised for the attribute in generated API
///   descriptions is inferred from the field type, and `Option<T>` fields are nullable.
///
/// Documentation on a field is propagated to its descriptor and appears in generated API
/// descriptions.
///
/// # Examples
///
/// ```
/// use relational_jsonapi::prelude::*;
///
/// #[derive(Clone, Debug, Resource)]
/// struct Author {
///     id: u64,
///     name: String,
/// }
///
/// #[derive(Clone, Debug, Resource)]
/// #[resource(resource_name("posts"))]
/// struct Entry {
///     id: u64,
///     /// The title of the entry.
///     headline: String,
///     pub_date: Option<String>,
///     #[resource(read_only)]
///     created: String,
///     #[resource(include)]
///     authors: ToMany<Author>,
///     #[resource(skip)]
///     cache: Vec<u8>,
/// }
///
/// let descriptor = Entry::descriptor();
/// assert_eq!(descriptor.explicit_type_name(), Some("posts"));
/// assert!(descriptor.field("pub_date").unwrap().nullable);
/// assert!(descriptor.field("authors").unwrap().includable);
/// assert!(descriptor.field("cache").is_none());
///
/// let record = Entry {
///     id: 1,
///     headline: "Hello".into(),
///     pub_date: None,
///     created: "today".into(),
///     authors: ToMany::Ids(vec!["2".into()]),
///     cache: vec![],
/// }
/// .to_record();
/// assert_eq!(record.id.as_deref(), Some("1"));
/// assert_eq!(record.related("authors").unwrap().count(), 1);
/// ```
///
/// # Struct attributes
///
/// | Attribute     | Description                                             | Arg     | Required |
/// |---------------|---------------------------------------------------------|---------|----------|
/// | resource_name | Override the wire type name of the resource. By default the type name is derived from the struct name by the configured inflection. | string | no |
///
/// # Field attributes
///
/// | Attribute     | Description                                             | Arg    | Required |
/// |---------------|---------------------------------------------------------|---------|----------|
/// | id            | Use this field as the identifier of the resource. Each resource must have exactly one identifier. This attribute can be omitted if the field is named `id`. | n/a | no |
/// | read_only     | Render the field but never accept it on writes. | n/a | no |
/// | write_only    | Accept the field on writes but never render it. | n/a | no |
/// | nullable      | Allow the field to be `null`. Implied for `Option` fields. | n/a | no |
/// | meta          | Render the field under the resource object's `meta` rather than `attributes`. | n/a | no |
/// | include       | Allow the relationship to be named in the `include` query parameter. | n/a | no |
/// | skip          | Do not expose this field at all. | n/a | no |
#[proc_macro_derive(Resource, attributes(resource))]
pub fn derive_resource(input: TokenStream) -> TokenStream {
    resource::derive(parse_macro_input!(input)).into()
}
