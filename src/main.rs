//! Entry point for the synform binary.
//!
//! Delegates to [`synform::run()`] and translates its `Result` into a
//! process exit code: `0` on success, `1` on any error.

fn main() {
    if synform::run().is_err() {
        std::process::exit(1);
    }
}
