//! Parsing logic for the Entity derive macro.
//!
//! This module extracts struct-level and field-level `#[relmap(...)]`
//! attributes from the derive input to build `EntityDef` and `FieldDef`
//! structures used for code generation.

use proc_macro2::Span;
use syn::{Attribute, Data, DeriveInput, Error, Field, Fields, Generics, Ident, Lit, Result, Type};

/// Parsed entity definition from a struct with `#[derive(Entity)]`.
#[derive(Debug)]
pub struct EntityDef {
    /// The struct name (e.g., `Person`).
    pub name: Ident,
    /// The SQL table name (e.g., `"person"`).
    pub table_name: String,
    /// Whether the table name is rendered quoted.
    pub quoted: bool,
    /// Parsed field definitions, transient fields included.
    pub fields: Vec<FieldDef>,
    /// Generic parameters from the struct.
    pub generics: Generics,
}

/// Parsed field definition from a struct field.
#[derive(Debug)]
pub struct FieldDef {
    /// The Rust field name (e.g., `first_name`).
    pub name: Ident,
    /// The SQL column name (field name or override).
    pub column_name: String,
    /// The Rust type of the field.
    pub ty: Type,
    /// Whether this field is (part of) the identifier.
    pub id: bool,
    /// Whether the column name is rendered quoted.
    pub quoted: bool,
    /// Not persisted; filled with `Default::default()` when reading.
    pub transient: bool,
}

impl EntityDef {
    /// Fields that map to a column, in declaration order.
    pub fn persistent_fields(&self) -> Vec<&FieldDef> {
        self.fields.iter().filter(|f| !f.transient).collect()
    }

    pub fn transient_fields(&self) -> Vec<&FieldDef> {
        self.fields.iter().filter(|f| f.transient).collect()
    }
}

/// Parse a `DeriveInput` into an `EntityDef`.
///
/// Returns an error if:
/// - The input is not a struct
/// - The struct uses tuple or unit syntax (must have named fields)
/// - Unknown attributes are present
/// - Attribute values are invalid
pub fn parse_entity(input: &DeriveInput) -> Result<EntityDef> {
    let name = input.ident.clone();
    let generics = input.generics.clone();

    let StructAttrs { table_name, quoted } = parse_struct_attrs(&input.attrs)?;

    let fields = match &input.data {
        Data::Struct(data) => parse_fields(&data.fields)?,
        Data::Enum(_) => {
            return Err(Error::new_spanned(
                input,
                "Entity can only be derived for structs, not enums",
            ));
        }
        Data::Union(_) => {
            return Err(Error::new_spanned(
                input,
                "Entity can only be derived for structs, not unions",
            ));
        }
    };

    Ok(EntityDef {
        table_name: table_name.unwrap_or_else(|| to_snake_case(&name.to_string())),
        name,
        quoted,
        fields,
        generics,
    })
}

struct StructAttrs {
    table_name: Option<String>,
    quoted: bool,
}

/// Parse struct-level `#[relmap(...)]` attributes.
///
/// Supported keys:
/// - `table = "name"` (overrides the snake_case struct name)
/// - `quoted` (render the table name quoted)
fn parse_struct_attrs(attrs: &[Attribute]) -> Result<StructAttrs> {
    let mut result = StructAttrs {
        table_name: None,
        quoted: false,
    };

    for attr in attrs {
        if !attr.path().is_ident("relmap") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                if result.table_name.is_some() {
                    return Err(Error::new_spanned(
                        &meta.path,
                        "duplicate relmap attribute: table",
                    ));
                }
                result.table_name = Some(string_value(&meta, "table name")?);
            } else if meta.path.is_ident("quoted") {
                result.quoted = true;
            } else {
                let key = meta
                    .path
                    .get_ident()
                    .map_or_else(|| "?".to_string(), ToString::to_string);
                return Err(Error::new_spanned(
                    &meta.path,
                    format!("unknown relmap struct attribute `{key}`; expected `table` or `quoted`"),
                ));
            }
            Ok(())
        })?;
    }

    Ok(result)
}

fn string_value(meta: &syn::meta::ParseNestedMeta<'_>, what: &str) -> Result<String> {
    let value: Lit = meta.value()?.parse()?;
    match value {
        Lit::Str(lit_str) => Ok(lit_str.value()),
        other => Err(Error::new_spanned(
            other,
            format!("expected string literal for {what}"),
        )),
    }
}

/// Convert PascalCase to snake_case.
///
/// Examples:
/// - `Person` -> `person`
/// - `LegoSet` -> `lego_set`
/// - `HTTPRequest` -> `http_request`
fn to_snake_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    let chars: Vec<char> = s.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                let prev = chars[i - 1];
                let next = chars.get(i + 1).copied();
                let should_underscore = prev.is_lowercase()
                    || (prev.is_uppercase() && next.is_some_and(char::is_lowercase));
                if should_underscore {
                    result.push('_');
                }
            }
            result.push(c.to_ascii_lowercase());
        } else {
            result.push(c);
        }
    }

    result
}

fn parse_fields(fields: &Fields) -> Result<Vec<FieldDef>> {
    match fields {
        Fields::Named(named) => named.named.iter().map(parse_field).collect(),
        Fields::Unnamed(_) => Err(Error::new(
            Span::call_site(),
            "Entity requires a struct with named fields, not a tuple struct",
        )),
        Fields::Unit => Err(Error::new(
            Span::call_site(),
            "Entity requires a struct with fields, not a unit struct",
        )),
    }
}

#[derive(Default)]
struct FieldAttrs {
    column: Option<String>,
    id: bool,
    quoted: bool,
    transient: bool,
}

fn parse_field(field: &Field) -> Result<FieldDef> {
    let name = field
        .ident
        .clone()
        .ok_or_else(|| Error::new_spanned(field, "expected named field"))?;
    let attrs = parse_field_attrs(&field.attrs)?;

    if attrs.transient && (attrs.id || attrs.column.is_some()) {
        return Err(Error::new_spanned(
            &name,
            "a transient field cannot also be `id` or carry a `column` name",
        ));
    }

    Ok(FieldDef {
        column_name: attrs.column.unwrap_or_else(|| name.to_string()),
        name,
        ty: field.ty.clone(),
        id: attrs.id,
        quoted: attrs.quoted,
        transient: attrs.transient,
    })
}

/// Parse all `#[relmap(...)]` attributes on a field.
fn parse_field_attrs(attrs: &[Attribute]) -> Result<FieldAttrs> {
    let mut result = FieldAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("relmap") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            let path = &meta.path;
            if path.is_ident("id") {
                result.id = true;
            } else if path.is_ident("quoted") {
                result.quoted = true;
            } else if path.is_ident("transient") {
                result.transient = true;
            } else if path.is_ident("column") {
                result.column = Some(string_value(&meta, "column name")?);
            } else {
                let key = path
                    .get_ident()
                    .map_or_else(|| "?".to_string(), ToString::to_string);
                return Err(Error::new_spanned(
                    path,
                    format!(
                        "unknown relmap field attribute `{key}`; expected `id`, `column`, `quoted` or `transient`"
                    ),
                ));
            }
            Ok(())
        })?;
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_to_snake_case() {
        assert_eq!(to_snake_case("Person"), "person");
        assert_eq!(to_snake_case("LegoSet"), "lego_set");
        assert_eq!(to_snake_case("HTTPRequest"), "http_request");
        assert_eq!(to_snake_case("UserID"), "user_id");
    }

    #[test]
    fn test_parse_entity_defaults() {
        let input: DeriveInput = parse_quote! {
            struct LegoSet {
                #[relmap(id)]
                id: Option<i64>,
                name: String,
            }
        };

        let def = parse_entity(&input).unwrap();
        assert_eq!(def.table_name, "lego_set");
        assert!(!def.quoted);
        assert_eq!(def.fields.len(), 2);
        assert!(def.fields[0].id);
        assert_eq!(def.fields[1].column_name, "name");
    }

    #[test]
    fn test_parse_entity_attributes() {
        let input: DeriveInput = parse_quote! {
            #[relmap(table = "people", quoted)]
            struct Person {
                #[relmap(id, column = "person_id")]
                id: i64,
                #[relmap(quoted)]
                name: String,
                #[relmap(transient)]
                cached: u32,
            }
        };

        let def = parse_entity(&input).unwrap();
        assert_eq!(def.table_name, "people");
        assert!(def.quoted);
        assert_eq!(def.fields[0].column_name, "person_id");
        assert!(def.fields[1].quoted);
        assert_eq!(def.persistent_fields().len(), 2);
        assert_eq!(def.transient_fields()[0].name, "cached");
    }

    #[test]
    fn test_unknown_attribute_errors() {
        let input: DeriveInput = parse_quote! {
            #[relmap(schema = "x")]
            struct Event {
                id: i64,
            }
        };
        let err = parse_entity(&input).unwrap_err();
        assert!(err.to_string().contains("unknown relmap struct attribute"), "{err}");

        let input: DeriveInput = parse_quote! {
            struct Event {
                #[relmap(primary_key)]
                id: i64,
            }
        };
        let err = parse_entity(&input).unwrap_err();
        assert!(err.to_string().contains("unknown relmap field attribute"), "{err}");
    }

    #[test]
    fn test_transient_id_is_rejected() {
        let input: DeriveInput = parse_quote! {
            struct Event {
                #[relmap(id, transient)]
                id: i64,
            }
        };
        assert!(parse_entity(&input).is_err());
    }

    #[test]
    fn test_enums_are_rejected() {
        let input: DeriveInput = parse_quote! {
            enum Status { Active }
        };
        let err = parse_entity(&input).unwrap_err();
        assert!(err.to_string().contains("not enums"));
    }
}
