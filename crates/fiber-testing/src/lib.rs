//! Testing utilities and harness for the fiber reconciler

pub mod testing;

// Re-export testing utilities
pub use testing::*;

pub mod prelude {
    pub use crate::testing::*;
    pub use fiber_core::{make_node, text, Component, Element, Props};
}
