//! HTML link rewriting subsystem.
//!
//! # Data Flow
//! ```text
//! buffered text/html body + target URL
//!     → html.rs (tolerant parse, select a/link/img/script)
//!     → resolve.rs (resolve href/src against the target URL)
//!     → serialized document sent to the client
//! ```
//!
//! # Design Decisions
//! - Pure and synchronous: no I/O, deterministic for a given (html, base)
//! - Any transform failure degrades to the original bytes

pub mod html;
pub mod resolve;

pub use html::{rewrite, RewriteContext, RewriteError};
pub use resolve::resolve_reference;
