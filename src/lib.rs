pub mod dock;
pub mod fiber;
pub mod geometry;
pub mod highlight;
pub mod hover;
pub mod ide;
pub mod logging;
pub mod overlay;
pub mod resolver;
pub mod settings;
pub mod store;
pub mod tick;
pub mod tree;
