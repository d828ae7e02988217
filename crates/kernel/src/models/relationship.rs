//! Relationship definitions and associations.
//!
//! Definitions are owned by the host; the engine only reads them.

use serde::{Deserialize, Serialize};

use super::element::{Domain, Role};

/// How many elements may sit on each side of a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    OneToOne,
    OneToMany,
    ManyToMany,
}

/// Where a relationship definition came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipOrigin {
    /// Created through the relationship wizard.
    Wizard,
    /// Backs a post reference field.
    PostReferenceField,
    /// Backs a repeatable field group.
    RepeatableGroup,
}

impl RelationshipOrigin {
    /// Value stored in the relationships table.
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipOrigin::Wizard => "wizard",
            RelationshipOrigin::PostReferenceField => "post_reference_field",
            RelationshipOrigin::RepeatableGroup => "repeatable_group",
        }
    }
}

/// Domain and allowed types of one side of a relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDescriptor {
    pub domain: Domain,
    #[serde(default)]
    pub types: Vec<String>,
}

impl RoleDescriptor {
    /// Posts descriptor with the given post types.
    pub fn posts(types: &[&str]) -> Self {
        Self {
            domain: Domain::Posts,
            types: types.iter().map(|t| (*t).to_string()).collect(),
        }
    }
}

/// Immutable relationship definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipDefinition {
    /// Row id in the relationships table.
    pub id: i64,
    pub slug: String,
    pub parent: RoleDescriptor,
    pub child: RoleDescriptor,
    /// Post type of intermediary posts, if the relationship has them.
    pub intermediary_type: Option<String>,
    pub cardinality: Cardinality,
    pub origin: RelationshipOrigin,
    pub is_active: bool,
    #[serde(default)]
    pub needs_legacy_support: bool,
}

impl RelationshipDefinition {
    /// Domain of the element in `role`. Intermediaries are always posts.
    pub fn domain(&self, role: Role) -> Domain {
        match role {
            Role::Parent => self.parent.domain,
            Role::Child => self.child.domain,
            Role::Intermediary => Domain::Posts,
        }
    }
}

/// One association row, with its definition resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Association {
    /// Association row id.
    pub uid: i64,
    pub relationship: RelationshipDefinition,
    pub parent_id: i64,
    pub child_id: i64,
    pub intermediary_id: Option<i64>,
}

impl Association {
    /// Element id in the given role.
    pub fn element_id(&self, role: Role) -> Option<i64> {
        match role {
            Role::Parent => Some(self.parent_id),
            Role::Child => Some(self.child_id),
            Role::Intermediary => self.intermediary_id,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn book_author() -> RelationshipDefinition {
        RelationshipDefinition {
            id: 1,
            slug: "book-author".to_string(),
            parent: RoleDescriptor::posts(&["book"]),
            child: RoleDescriptor::posts(&["author"]),
            intermediary_type: None,
            cardinality: Cardinality::ManyToMany,
            origin: RelationshipOrigin::Wizard,
            is_active: true,
            needs_legacy_support: false,
        }
    }

    #[test]
    fn intermediary_is_always_posts() {
        let mut def = book_author();
        def.child.domain = Domain::Users;
        assert_eq!(def.domain(Role::Child), Domain::Users);
        assert_eq!(def.domain(Role::Intermediary), Domain::Posts);
    }

    #[test]
    fn association_element_ids() {
        let assoc = Association {
            uid: 7,
            relationship: book_author(),
            parent_id: 42,
            child_id: 43,
            intermediary_id: None,
        };
        assert_eq!(assoc.element_id(Role::Parent), Some(42));
        assert_eq!(assoc.element_id(Role::Child), Some(43));
        assert_eq!(assoc.element_id(Role::Intermediary), None);
    }

    #[test]
    fn definition_deserializes_from_json() {
        let json = r#"{
            "id": 3,
            "slug": "event-speaker",
            "parent": {"domain": "posts", "types": ["event"]},
            "child": {"domain": "users"},
            "intermediary_type": null,
            "cardinality": "one_to_many",
            "origin": "post_reference_field",
            "is_active": false
        }"#;
        let def: RelationshipDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(def.child.domain, Domain::Users);
        assert!(def.child.types.is_empty());
        assert_eq!(def.origin, RelationshipOrigin::PostReferenceField);
        assert!(!def.needs_legacy_support);
    }
}
