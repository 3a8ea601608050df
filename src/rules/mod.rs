//! Rule evaluation: destination templates, rewrite chains and redirects.
//!
//! All three are pure functions of the request path and the configuration;
//! none of them touch the filesystem.

pub mod redirect;
pub mod rewrite;
pub mod target;

pub use redirect::{Redirect, should_redirect};
pub use rewrite::apply_rewrites;
pub use target::to_target;
