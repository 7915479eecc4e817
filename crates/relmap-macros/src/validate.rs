//! Compile-time validation for the Entity derive macro.
//!
//! Problems are collected and reported together, each pointing at the
//! offending struct or field.

use std::collections::HashSet;

use proc_macro2::Span;
use syn::Error;

use crate::parse::EntityDef;

/// Validate a parsed entity definition.
pub fn validate_entity(entity: &EntityDef) -> Result<(), Error> {
    let mut errors = Vec::new();

    validate_not_generic(entity, &mut errors);
    validate_has_persistent_fields(entity, &mut errors);
    validate_name(&entity.table_name, "table", entity.name.span(), &mut errors);
    for field in entity.persistent_fields() {
        validate_name(&field.column_name, "column", field.name.span(), &mut errors);
    }
    validate_no_duplicate_columns(entity, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        let mut combined = errors.remove(0);
        for err in errors {
            combined.combine(err);
        }
        Err(combined)
    }
}

fn validate_not_generic(entity: &EntityDef, errors: &mut Vec<Error>) {
    if !entity.generics.params.is_empty() {
        errors.push(Error::new(
            entity.name.span(),
            "Entity cannot be derived for generic structs",
        ));
    }
}

fn validate_has_persistent_fields(entity: &EntityDef, errors: &mut Vec<Error>) {
    if entity.persistent_fields().is_empty() {
        errors.push(Error::new(
            entity.name.span(),
            "Entity struct must have at least one non-transient field",
        ));
    }
}

/// Table and column names end up in SQL text.
fn validate_name(name: &str, what: &str, span: Span, errors: &mut Vec<Error>) {
    const DANGEROUS_CHARS: &[char] = &[';', '\'', '"', '`', '/', '*', '\\', '\0', '\n', '\r'];

    if name.trim().is_empty() {
        errors.push(Error::new(span, format!("{what} name cannot be empty or whitespace")));
        return;
    }
    if let Some(ch) = name.chars().find(|c| DANGEROUS_CHARS.contains(c)) {
        errors.push(Error::new(
            span,
            format!("{what} name '{name}' contains invalid character '{ch}'"),
        ));
    }
}

/// Unquoted names compare case-insensitively, so `Name` and `name` clash.
fn validate_no_duplicate_columns(entity: &EntityDef, errors: &mut Vec<Error>) {
    let mut seen: HashSet<String> = HashSet::new();
    for field in entity.persistent_fields() {
        let key = if field.quoted {
            format!("\"{}\"", field.column_name)
        } else {
            field.column_name.to_ascii_lowercase()
        };
        if !seen.insert(key) {
            errors.push(Error::new(
                field.name.span(),
                format!("duplicate column name '{}'", field.column_name),
            ));
        }
    }
}
