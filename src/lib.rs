//! Workspace anchor crate.
//!
//! Exists so workspace-wide tooling (git hooks via cargo-husky) has a
//! package to attach to. All functionality lives in `crates/*`.
