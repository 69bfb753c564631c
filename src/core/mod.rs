//! Business logic, independent of how it is exposed.

pub mod item;
