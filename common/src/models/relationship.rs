//! Table relationship models.
//!
//! Relationships are declared by the user and only drive the related-data
//! lookup. They are never checked against the live schema.

use std::collections::BTreeMap;

use serde_json::Value;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Cardinality of a declared relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum RelationshipType {
    #[serde(rename = "one-to-one")]
    OneToOne,
    #[serde(rename = "one-to-many")]
    OneToMany,
    #[serde(rename = "many-to-one")]
    ManyToOne,
}

/// Link from a local table to a foreign table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    /// Table holding the related rows.
    #[validate(length(min = 1, message = "foreignTable is required"))]
    pub foreign_table: String,
    /// Column of the foreign table matched against the row id.
    #[validate(length(min = 1, message = "foreignKey is required"))]
    pub foreign_key: String,
    /// Column of the local table the id comes from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_type: Option<RelationshipType>,
    /// Any other keys of the entry, stored as given.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Local table name → ordered relationship list.
pub type RelationshipMap = BTreeMap<String, Vec<Relationship>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        let json = r#"{
            "users": [
                {"foreignTable": "orders", "foreignKey": "user_id", "localKey": "id", "relationshipType": "one-to-many"}
            ]
        }"#;
        let map: RelationshipMap = serde_json::from_str(json).unwrap();
        let rel = &map["users"][0];
        assert_eq!(rel.foreign_table, "orders");
        assert_eq!(rel.relationship_type, Some(RelationshipType::OneToMany));

        let back = serde_json::to_value(&map).unwrap();
        assert_eq!(back["users"][0]["relationshipType"], "one-to-many");
        assert_eq!(back["users"][0]["localKey"], "id");
    }

    #[test]
    fn test_optional_fields_round_trip_absent() {
        let json = serde_json::json!({"orders": [{"foreignTable": "items", "foreignKey": "order_id"}]});
        let map: RelationshipMap = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(serde_json::to_value(&map).unwrap(), json);
    }

    #[test]
    fn test_unknown_relationship_type_rejected() {
        let json = r#"{"t": [{"foreignTable": "a", "foreignKey": "b", "relationshipType": "many-to-many"}]}"#;
        assert!(serde_json::from_str::<RelationshipMap>(json).is_err());
    }

    #[test]
    fn test_empty_foreign_table_fails_validation() {
        let rel = Relationship {
            foreign_table: String::new(),
            foreign_key: "id".into(),
            local_key: None,
            relationship_type: None,
            extra: BTreeMap::new(),
        };
        assert!(rel.validate().is_err());
    }

    #[test]
    fn test_extra_keys_round_trip() {
        let json = serde_json::json!({
            "users": [{
                "foreignTable": "orders",
                "foreignKey": "user_id",
                "label": "Orders",
                "display": {"columns": ["id", "total"]}
            }]
        });
        let map: RelationshipMap = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(map["users"][0].extra["label"], "Orders");
        assert_eq!(serde_json::to_value(&map).unwrap(), json);
    }
}
