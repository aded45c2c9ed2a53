//! diffdelta CLI binary.
//!
//! All logic is in the library; main.rs only invokes cli::run() and maps
//! the result to a process exit code.

fn main() {
    if let Err(code) = diffdelta::cli::run() {
        std::process::exit(code.as_i32());
    }
}
