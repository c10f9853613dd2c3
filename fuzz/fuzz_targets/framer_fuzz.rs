//! Framer fuzz target: arbitrary bytes as a Latin-1 EDI file.
//! Framing must never panic, and whatever reads back fully must re-encode.
//! Build with: cargo fuzz run framer_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    use ediframe::{EdiFile, ReadOptions, Registry};
    let lookup = Registry::standard().into_shared();
    let file = match EdiFile::open(data, lookup, ReadOptions::default()) {
        Ok(f) => f,
        Err(_) => return,
    };
    if let Ok(decoded) = file.read_all() {
        let _ = decoded.encode();
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run framer_fuzz");
}
