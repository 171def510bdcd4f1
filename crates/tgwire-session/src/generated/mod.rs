// Copyright 2020 - developers of the `grammers` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! This module re-exports the code generated by `build.rs` from the small
//! bootstrap schema defined there: the `types`, `functions` and `enums`
//! submodules, plus the `LAYER` constant (here repurposed as the session
//! file format version).

include!(concat!(env!("OUT_DIR"), "/generated.rs"));
