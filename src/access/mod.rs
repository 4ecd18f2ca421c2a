pub mod capabilities;
pub mod notes;
pub mod projector;
pub mod resolver;
pub mod scope;
