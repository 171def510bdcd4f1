// Copyright 2020 - developers of the `grammers` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! This crate gathers all the code generation logic used by the `build.rs`
//! scripts of the schema-backed crates, and coordinates it, feeding it the
//! right data.
//!
//! It is only ever used as a build-dependency; none of its output is part
//! of any public API.

mod enums;
mod grouper;
mod rustifier;
mod structs;

use std::io::{self, Write};
use tgwire_tl_parser::{Category, Definition};

/// Tweaks the generated code, mostly to help downstream crates that want to
/// opt in or out of certain conveniences.
pub struct Config {
    /// Generate a `name_for_id` lookup function mapping constructor ids back
    /// to their dotted `.tl` name. Useful for diagnostics.
    pub gen_name_for_id: bool,
    /// Also derive `Deserializable` for functions (normally only their
    /// result type needs to be deserialized).
    pub deserializable_functions: bool,
    pub impl_debug: bool,
    pub impl_from_enum: bool,
    pub impl_from_type: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gen_name_for_id: false,
            deserializable_functions: false,
            impl_debug: true,
            impl_from_enum: true,
            impl_from_type: true,
        }
    }
}

/// Generate the Rust source code corresponding to `definitions` and write it
/// into `file`. `layer` is embedded verbatim as `pub const LAYER`.
pub fn generate_rust_code<W: Write>(
    file: &mut W,
    definitions: &[Definition],
    layer: i32,
    config: &Config,
) -> io::Result<()> {
    writeln!(
        file,
        "/// The schema layer from which the definitions were generated."
    )?;
    writeln!(file, "pub const LAYER: i32 = {};", layer)?;

    if config.gen_name_for_id {
        writeln!(file)?;
        writeln!(
            file,
            "/// Return the name from the `.tl` definition corresponding to the provided definition identifier."
        )?;
        writeln!(file, "pub fn name_for_id(id: u32) -> &'static str {{")?;
        writeln!(file, "    match id {{")?;
        writeln!(file, "        0x1cb5c415 => \"vector\",")?;
        for def in definitions {
            writeln!(file, "        0x{:x} => \"{}\",", def.id, def.full_name())?;
        }
        writeln!(file, "        _ => \"(unknown)\",")?;
        writeln!(file, "    }}")?;
        writeln!(file, "}}")?;
        writeln!(file)?;
    }

    structs::write_category_mod(file, Category::Types, definitions, config)?;
    structs::write_category_mod(file, Category::Functions, definitions, config)?;
    enums::write_enums_mod(file, definitions)?;

    Ok(())
}
