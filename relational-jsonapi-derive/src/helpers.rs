//! Helper functions for implementing procedural macros.

use itertools::Itertools;
use proc_macro2::TokenStream;
use syn::{
    parenthesized,
    parse::{Parse, Parser},
    Attribute, Expr, GenericArgument, Ident, Lit, Meta, PathArguments, Type,
};

/// Convenient parsing interface for helper attributes.
///
/// Attributes in a scope take the form `#[scope(name, other(arg), ...)]`: a comma-separated list of
/// boolean attributes (`name`) and argument attributes (`other(arg)`).
pub struct AttrParser(String);

impl AttrParser {
    pub fn new(scope: impl Into<String>) -> Self {
        Self(scope.into())
    }

    /// Check if a list of attributes has a certain boolean attribute.
    ///
    /// # Panics
    ///
    /// Panics if an attribute in this scope is malformed.
    pub fn has_bool(&self, attrs: &[Attribute], name: &str) -> bool {
        self.items(attrs)
            .any(|(attr_name, param)| attr_name == name && param.is_none())
    }

    /// Check if a list of attributes has a certain argument attribute and parse its argument.
    ///
    /// # Panics
    ///
    /// Panics if an attribute in this scope is malformed, or if the argument does not parse as a
    /// `T`.
    pub fn get_arg<T: Parse>(&self, attrs: &[Attribute], name: &str) -> Option<T> {
        self.items(attrs).find_map(|(attr_name, param)| {
            if attr_name != name {
                return None;
            }
            let param = param.unwrap_or_else(|| panic!("{name} attribute requires an argument"));
            Some(T::parse.parse2(param).unwrap_or_else(|_| {
                panic!(
                    "argument to {} must be a {}",
                    name,
                    std::any::type_name::<T>(),
                )
            }))
        })
    }

    /// Check that every attribute in this scope is one of `known`.
    ///
    /// # Panics
    ///
    /// Panics on the first unknown attribute.
    pub fn check(&self, attrs: &[Attribute], known: &[&str]) {
        for (name, _) in self.items(attrs) {
            if !known.iter().any(|k| name == k) {
                panic!(
                    "unknown {} attribute {name}, expected one of {}",
                    self.0,
                    known.iter().join(", ")
                );
            }
        }
    }

    /// All the items of all the attributes in this scope, with their arguments.
    fn items<'a>(
        &'a self,
        attrs: &'a [Attribute],
    ) -> impl 'a + Iterator<Item = (Ident, Option<TokenStream>)> {
        attrs.iter().flat_map(|a| self.parse_attr(a))
    }

    /// Parse an attribute in this scope into its items.
    ///
    /// For example, `#[scope(foo(bar), baz)]` yields `[("foo", Some(bar)), ("baz", None)]`. If `a`
    /// is not in scope, the result is empty.
    ///
    /// # Panics
    ///
    /// Panics if `a` is in scope but malformed (e.g. an item does not start with an identifier).
    fn parse_attr(&self, a: &Attribute) -> Vec<(Ident, Option<TokenStream>)> {
        let mut parsed = vec![];
        if a.path().is_ident(&self.0) {
            a.parse_nested_meta(|meta| {
                let name = meta.path.get_ident().unwrap_or_else(|| {
                    panic!("{} attribute must start with an identifier", self.0)
                });
                let content = if meta.input.peek(syn::token::Paren) {
                    let content;
                    parenthesized!(content in meta.input);
                    Some(content.parse()?)
                } else {
                    None
                };
                parsed.push((name.clone(), content));
                Ok(())
            })
            .unwrap_or_else(|err| panic!("malformed {} attribute: {err}", self.0));
        }
        parsed
    }
}

/// Extract documentation from the attributes on an item.
///
/// The documentation is constructed by taking all the `#[doc = "..."]` attributes and concatenating
/// their arguments, separated by newlines.
pub fn parse_docs(attrs: &[Attribute]) -> String {
    attrs
        .iter()
        .filter_map(|attr| {
            let Meta::NameValue(nv) = &attr.meta else { return None; };
            if !nv.path.is_ident("doc") {
                return None;
            }
            let Expr::Lit(lit) = &nv.value else { return None; };
            let Lit::Str(s) = &lit.lit else { return None; };
            Some(s.value().trim().to_string())
        })
        .join("\n")
}

/// The name of the outermost type constructor of `ty` and its type arguments.
///
/// For `std::collections::Vec<String>` this is `("Vec", [String])`. References are looked through.
/// Types which are not paths, other than arrays and slices, have no name.
pub fn type_constructor(ty: &Type) -> Option<(String, Vec<&Type>)> {
    match ty {
        Type::Reference(r) => type_constructor(&r.elem),
        Type::Array(_) | Type::Slice(_) => Some(("Vec".into(), vec![])),
        Type::Path(path) => {
            let last = path.path.segments.last()?;
            let args = match &last.arguments {
                PathArguments::AngleBracketed(args) => args
                    .args
                    .iter()
                    .filter_map(|arg| match arg {
                        GenericArgument::Type(ty) => Some(ty),
                        _ => None,
                    })
                    .collect(),
                _ => vec![],
            };
            Some((last.ident.to_string(), args))
        }
        _ => None,
    }
}
