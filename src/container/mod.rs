//! Container classification, validation and building

pub mod builder;
pub mod classify;
pub mod processor;
pub mod resolver;

#[cfg(test)]
pub(crate) mod test_support;

pub use builder::ContainerBuilder;
pub use classify::{classify, NodeKind};
pub use processor::ContainerProcessor;
pub use resolver::{ReferenceResolver, Resolution};
