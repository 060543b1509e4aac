//! Prefix-trie HTTP request router.
//!
//! Compiles contract path templates into a prefix trie with static, parameter
//! and greedy-wildcard segments plus per-node method sets. Supports path
//! parameter capture, static-over-param precedence, and path normalization.

pub mod trie;

pub use trie::{normalize_path, percent_decode, RouteMatch, Router};
