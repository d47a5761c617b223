//! Term model for the definitional-equality engine.
//!
//! This crate contains the data that the elaborator's equality engine operates
//! on: structurally shared expression trees, universe levels, local contexts
//! of free-variable declarations, the global environment of constants, and the
//! mutable metavariable context.  The algorithms that decide equality live in
//! the `elaborator` crate; everything here is policy-free bookkeeping.

pub mod env;
pub mod exp;
pub mod ident;
pub mod lctx;
pub mod level;
pub mod metavar;
pub mod print;

pub use env::*;
pub use exp::*;
pub use ident::*;
pub use lctx::*;
pub use level::*;
pub use metavar::*;

pub type HashMap<K, V> = fxhash::FxHashMap<K, V>;
pub type HashSet<V> = fxhash::FxHashSet<V>;
