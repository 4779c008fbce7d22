//! Sparse fieldsets: the `fields[type]` parameters.

use super::QueryParams;
use crate::context::Context;
use std::collections::HashMap;

/// Requested fieldsets, keyed by wire type name.
///
/// Field names are stored in their declared form. Names which do not correspond to any field are
/// kept but never match, so they are silently ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SparseFieldsets(HashMap<String, Vec<String>>);

impl SparseFieldsets {
    pub fn parse(params: &QueryParams, ctx: &Context) -> Self {
        Self(
            params
                .bracketed("fields")
                .map(|(ty, value, _)| {
                    let fields = value
                        .split(',')
                        .map(str::trim)
                        .filter(|f| !f.is_empty())
                        .map(|f| ctx.unformat_field(f))
                        .collect();
                    (ty.to_string(), fields)
                })
                .collect(),
        )
    }

    /// Restrict the resource type `ty` to `fields`.
    pub fn insert(&mut self, ty: impl Into<String>, fields: Vec<String>) {
        self.0.insert(ty.into(), fields);
    }

    /// The requested fields for the type `ty`, or [`None`] if all fields are to be rendered.
    pub fn get(&self, ty: &str) -> Option<&[String]> {
        self.0.get(ty).map(Vec::as_slice)
    }

    /// Whether `field` of the type `ty` is to be rendered.
    pub fn allows(&self, ty: &str, field: &str) -> bool {
        self.get(ty)
            .map(|fields| fields.iter().any(|f| f == field))
            .unwrap_or(true)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
