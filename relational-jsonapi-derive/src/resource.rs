//! Derive macro for `Resource`.

use crate::helpers::{parse_docs, type_constructor, AttrParser};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, Ident, LitStr, Type};

const FIELD_ATTRS: &[&str] = &[
    "id",
    "read_only",
    "write_only",
    "nullable",
    "meta",
    "include",
    "skip",
];
const STRUCT_ATTRS: &[&str] = &["resource_name"];

/// The path of the `relational_jsonapi` crate in the scope invoking a procedural macro.
fn crate_path() -> TokenStream {
    quote!(relational_jsonapi)
}

/// Generate a `Resource` implementation for a struct.
pub fn derive(
    DeriveInput {
        ident,
        generics,
        data,
        attrs,
        ..
    }: DeriveInput,
) -> TokenStream {
    if !generics.params.is_empty() {
        panic!("Resource cannot be derived on generic types");
    }
    match data {
        Data::Struct(s) => match s.fields {
            Fields::Named(fields) => {
                generate_struct(ident, attrs, fields.named.into_iter().collect())
            }
            _ => panic!("Resource can only be derived for structs with named fields"),
        },
        _ => panic!("Resource can only be derived for structs"),
    }
}

/// How a struct field is exposed.
enum Kind {
    Id,
    Attribute(TokenStream),
    Relation,
}

struct ResourceField {
    ident: Ident,
    ty: Type,
    kind: Kind,
    read_only: bool,
    write_only: bool,
    nullable: bool,
    meta: bool,
    include: bool,
    doc: String,
}

fn generate_struct(name: Ident, attrs: Vec<Attribute>, fields: Vec<syn::Field>) -> TokenStream {
    let jsonapi = crate_path();
    let p = AttrParser::new("resource");
    p.check(&attrs, STRUCT_ATTRS);

    let name_str = name.to_string();
    let type_name = p
        .get_arg::<LitStr>(&attrs, "resource_name")
        .map(|ty| quote!(.type_name(#ty)));

    let fields = fields
        .into_iter()
        .filter_map(|field| {
            p.check(&field.attrs, FIELD_ATTRS);
            if p.has_bool(&field.attrs, "skip") {
                return None;
            }
            let ident = field.ident.clone()?;
            let id = p.has_bool(&field.attrs, "id") || ident == "id";
            let (kind, optional) = if id {
                (Kind::Id, false)
            } else if is_relation(&field.ty) {
                (Kind::Relation, false)
            } else {
                let (ty, optional) = attr_type(&field.ty);
                (Kind::Attribute(ty), optional)
            };
            Some(ResourceField {
                ident,
                ty: field.ty.clone(),
                kind,
                read_only: p.has_bool(&field.attrs, "read_only"),
                write_only: p.has_bool(&field.attrs, "write_only"),
                nullable: optional || p.has_bool(&field.attrs, "nullable"),
                meta: p.has_bool(&field.attrs, "meta"),
                include: p.has_bool(&field.attrs, "include"),
                doc: parse_docs(&field.attrs),
            })
        })
        .collect::<Vec<_>>();

    let ids = fields
        .iter()
        .filter(|f| matches!(f.kind, Kind::Id))
        .collect::<Vec<_>>();
    let id = match ids.as_slice() {
        [id] => &id.ident,
        [] => panic!("Resource {name} must have an id field"),
        _ => panic!("Resource {name} has more than one id field"),
    };
    let id_str = id.to_string();

    let descriptors = fields.iter().map(|field| {
        let field_name = field.ident.to_string();
        let base = match &field.kind {
            Kind::Id => {
                let ty = attr_type(&field.ty).0;
                quote!(#jsonapi::resource::FieldDescriptor::attribute(#field_name, #ty))
            }
            Kind::Attribute(ty) => {
                quote!(#jsonapi::resource::FieldDescriptor::attribute(#field_name, #ty))
            }
            Kind::Relation => {
                let ty = &field.ty;
                quote! {
                    #jsonapi::resource::FieldDescriptor::relationship(
                        #field_name,
                        <#ty as #jsonapi::resource::IntoRelated>::relation(),
                    )
                }
            }
        };
        let flags = [
            (field.read_only, quote!(.read_only())),
            (field.write_only, quote!(.write_only())),
            (field.nullable, quote!(.nullable())),
            (field.meta, quote!(.meta())),
            (field.include, quote!(.include())),
        ]
        .into_iter()
        .filter_map(|(set, flag)| set.then_some(flag));
        let doc = &field.doc;
        let description = (!doc.is_empty()).then(|| quote!(.description(#doc)));
        quote! {
            let descriptor = descriptor.add_field(#base #(#flags)* #description);
        }
    });

    let values = fields.iter().filter_map(|field| {
        let ident = &field.ident;
        let field_name = ident.to_string();
        match field.kind {
            Kind::Id => None,
            Kind::Attribute(_) => Some(quote! {
                record.attributes.insert(
                    #field_name.into(),
                    #jsonapi::serde_json::to_value(&self.#ident)
                        .unwrap_or(#jsonapi::serde_json::Value::Null),
                );
            }),
            Kind::Relation => Some(quote! {
                record.relations.insert(
                    #field_name.into(),
                    #jsonapi::resource::IntoRelated::to_related(&self.#ident),
                );
            }),
        }
    });

    quote! {
        impl #jsonapi::resource::Resource for #name {
            const NAME: &'static str = #name_str;

            fn descriptor() -> #jsonapi::resource::ResourceDescriptor {
                let descriptor = #jsonapi::resource::ResourceDescriptor::new(#name_str)
                    #type_name
                    .id_field(#id_str);
                #(#descriptors)*
                descriptor
            }

            fn to_record(&self) -> #jsonapi::resource::Record {
                let mut record = #jsonapi::resource::Record::new(
                    #name_str,
                    #jsonapi::resource::id_string(&self.#id),
                );
                #(#values)*
                record
            }
        }
    }
}

fn is_relation(ty: &Type) -> bool {
    matches!(type_constructor(ty), Some((name, _)) if name == "ToOne" || name == "ToMany")
}

/// The JSON type of an attribute field, and whether the field is optional.
fn attr_type(ty: &Type) -> (TokenStream, bool) {
    let jsonapi = crate_path();
    let Some((name, args)) = type_constructor(ty) else {
        return (quote!(#jsonapi::resource::AttrType::Any), false);
    };
    if name == "Option" {
        if let Some(inner) = args.first() {
            return (attr_type(inner).0, true);
        }
    }
    let variant = match name.as_str() {
        "String" | "str" | "char" | "Cow" => quote!(String),
        "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8" | "u16" | "u32" | "u64" | "u128"
        | "usize" => quote!(Integer),
        "f32" | "f64" => quote!(Number),
        "bool" => quote!(Boolean),
        "Vec" | "VecDeque" | "HashSet" | "BTreeSet" | "IndexSet" => quote!(Array),
        "HashMap" | "BTreeMap" | "IndexMap" | "Map" => quote!(Object),
        _ => quote!(Any),
    };
    (quote!(#jsonapi::resource::AttrType::#variant), false)
}
