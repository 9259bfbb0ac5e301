//! Normalized entity tables and input readers.

pub mod aliases;
pub mod entity;
pub mod load;

pub use entity::{ClinicalConcept, ClinicalTable, Entity, EntityString, OntologyClass, OntologyTable, StringKind};
