#![no_main]

use std::path::Path;

use libfuzzer_sys::fuzz_target;
use phasekeeper::session::{FileFormat, Script};

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = Script::parse(text, FileFormat::Yaml, Path::new("fuzz.yaml"));
        let _ = Script::parse(text, FileFormat::Json, Path::new("fuzz.json"));
    }
});
