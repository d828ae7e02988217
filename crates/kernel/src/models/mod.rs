//! Data models for the association query engine.

pub mod element;
pub mod relationship;

pub use element::{
    ContentTable, Domain, Element, ElementStatus, PUBLIC_POST_STATUS, Role,
    UNAVAILABLE_POST_STATUSES,
};
pub use relationship::{
    Association, Cardinality, RelationshipDefinition, RelationshipOrigin, RoleDescriptor,
};
