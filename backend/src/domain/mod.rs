// Domain layer module
pub mod base;
pub mod value_objects;
pub mod entities;
pub mod aggregates;
pub mod similarity;

pub use base::*;
pub use value_objects::*;
pub use entities::*;
pub use aggregates::*;
