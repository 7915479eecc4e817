//! Procedural macros for relmap.
//!
//! `relmap-macros` is the **compile-time codegen layer**. `#[derive(Entity)]`
//! turns a plain struct into a mapped entity: table and column metadata plus
//! the property accessors the row mapper and the outbound row builder use.
//!
//! These macros are used by application crates via the `relmap` facade.

use proc_macro::TokenStream;
use quote::quote;

mod parse;
mod validate;

use parse::{EntityDef, parse_entity};

/// Derive macro for the `Entity` trait.
///
/// This macro generates implementations for:
/// - Table name and field metadata
/// - Property extraction (`to_properties`, `get_property`)
/// - Construction from read values (`from_properties`)
/// - Property assignment (`set_property`), used to populate generated ids
///
/// # Attributes
///
/// - `#[relmap(table = "name")]` - Override table name (defaults to snake_case struct name)
/// - `#[relmap(quoted)]` on the struct - Render the table name quoted
/// - `#[relmap(id)]` - Mark field as (part of) the identifier
/// - `#[relmap(column = "name")]` - Override column name
/// - `#[relmap(quoted)]` on a field - Render the column name quoted
/// - `#[relmap(transient)]` - Not persisted; filled with `Default::default()` on read
///
/// Field types must implement `TypeInfo`, `FromValue` and `Clone`, and
/// `Value: From<T>`.
///
/// # Example
///
/// ```ignore
/// use relmap::Entity;
///
/// #[derive(Entity, Clone)]
/// #[relmap(table = "legoset")]
/// struct LegoSet {
///     #[relmap(id)]
///     id: Option<i64>,
///     name: String,
///     #[relmap(column = "manual_id")]
///     manual: Option<i32>,
///     #[relmap(transient)]
///     dirty: bool,
/// }
/// ```
#[proc_macro_derive(Entity, attributes(relmap))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as syn::DeriveInput);

    let entity = match parse_entity(&input) {
        Ok(e) => e,
        Err(e) => return e.to_compile_error().into(),
    };

    if let Err(e) = validate::validate_entity(&entity) {
        return e.to_compile_error().into();
    }

    generate_entity_impl(&entity).into()
}

/// Generate the Entity trait implementation from a parsed definition.
fn generate_entity_impl(entity: &EntityDef) -> proc_macro2::TokenStream {
    let name = &entity.name;
    let table_name = &entity.table_name;
    let table_quoted = entity.quoted;
    let persistent = entity.persistent_fields();

    let field_infos = persistent.iter().map(|f| {
        let ty = &f.ty;
        let field_name = f.name.to_string();
        let column = &f.column_name;
        let id = f.id;
        let quoted = f.quoted;
        quote! {
            relmap_core::FieldInfo::of::<#ty>(#field_name)
                .column(#column)
                .primary_key(#id)
                .quoted(#quoted)
        }
    });

    let to_properties = persistent.iter().map(|f| {
        let ident = &f.name;
        let field_name = ident.to_string();
        quote! {
            (#field_name, relmap_core::Value::from(::core::clone::Clone::clone(&self.#ident)))
        }
    });

    let read_fields = persistent.iter().map(|f| {
        let ident = &f.name;
        let ty = &f.ty;
        let field_name = ident.to_string();
        quote! { #ident: values.get_as::<#ty>(#field_name)? }
    });
    let default_fields = entity.transient_fields().into_iter().map(|f| {
        let ident = &f.name;
        quote! { #ident: ::core::default::Default::default() }
    });

    let get_arms = persistent.iter().map(|f| {
        let ident = &f.name;
        let field_name = ident.to_string();
        quote! {
            #field_name => ::core::option::Option::Some(
                relmap_core::Value::from(::core::clone::Clone::clone(&self.#ident))
            ),
        }
    });

    let set_arms = persistent.iter().map(|f| {
        let ident = &f.name;
        let ty = &f.ty;
        let field_name = ident.to_string();
        let column = &f.column_name;
        quote! {
            #field_name => {
                self.#ident = <#ty as relmap_core::FromValue>::from_value(&value)
                    .map_err(|e| e.with_column(#column))?;
                ::core::result::Result::Ok(())
            }
        }
    });

    quote! {
        impl relmap_core::Entity for #name {
            const TABLE_NAME: &'static str = #table_name;
            const QUOTED: bool = #table_quoted;

            fn fields() -> ::std::vec::Vec<relmap_core::FieldInfo> {
                ::std::vec![#(#field_infos),*]
            }

            fn to_properties(&self) -> ::std::vec::Vec<(&'static str, relmap_core::Value)> {
                ::std::vec![#(#to_properties),*]
            }

            fn from_properties(
                values: &relmap_core::PropertyValues,
            ) -> relmap_core::Result<Self> {
                ::core::result::Result::Ok(Self {
                    #(#read_fields,)*
                    #(#default_fields,)*
                })
            }

            fn get_property(&self, name: &str) -> ::core::option::Option<relmap_core::Value> {
                match name {
                    #(#get_arms)*
                    _ => ::core::option::Option::None,
                }
            }

            fn set_property(
                &mut self,
                name: &str,
                value: relmap_core::Value,
            ) -> relmap_core::Result<()> {
                match name {
                    #(#set_arms)*
                    _ => ::core::result::Result::Err(relmap_core::unknown_property::<Self>(name)),
                }
            }
        }
    }
}
