//! duro assembler
//!
//! Pure assembly of the dashboard's `apps.json`:
//!
//! 1. derive one [`Entry`](duro_model::Entry) per resource (priority defaulted)
//! 2. sort by category rank, priority, display name, resource name
//! 3. render a pretty-printed JSON array with stable key order
//!
//! # Example
//!
//! ```rust
//! use duro_assembler::{Assembler, CategoryOrder};
//!
//! let assembler = Assembler::new(CategoryOrder::default());
//! let assembly = assembler.assemble(&[]).unwrap();
//! assert_eq!(assembly.document, "[]");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod assembler;
mod order;

pub use assembler::{AssembleError, Assembler, Assembly};
pub use order::CategoryOrder;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
