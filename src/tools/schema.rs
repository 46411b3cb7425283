// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Tool schema helpers
//!
//! Builder for the JSON Schemas advertised to the model.

use serde_json::Value;

use crate::llm::provider::ToolInputSchema;

/// Helper to create a tool input schema
pub struct SchemaBuilder {
    properties: serde_json::Map<String, Value>,
    required: Vec<String>,
}

impl SchemaBuilder {
    /// Create a new schema builder
    pub fn new() -> Self {
        Self {
            properties: serde_json::Map::new(),
            required: vec![],
        }
    }

    /// Add a string property
    pub fn string(mut self, name: &str, description: &str, required: bool) -> Self {
        self.properties.insert(
            name.to_string(),
            serde_json::json!({
                "type": "string",
                "description": description
            }),
        );
        if required {
            self.required.push(name.to_string());
        }
        self
    }

    /// Build the schema
    pub fn build(self) -> ToolInputSchema {
        ToolInputSchema {
            schema_type: "object".to_string(),
            properties: Value::Object(self.properties),
            required: self.required,
        }
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_builder_empty() {
        let schema = SchemaBuilder::new().build();
        assert_eq!(schema.schema_type, "object");
        assert!(schema.required.is_empty());
    }

    #[test]
    fn test_schema_builder_string_required() {
        let schema = SchemaBuilder::new()
            .string("flight_number", "IATA flight number", true)
            .build();

        assert_eq!(schema.required, vec!["flight_number"]);
        assert_eq!(
            schema.properties["flight_number"]["type"],
            serde_json::json!("string")
        );
    }

    #[test]
    fn test_schema_builder_optional_property() {
        let schema = SchemaBuilder::new()
            .string("origin", "Origin city or code", true)
            .string("date", "Travel date", false)
            .build();

        assert_eq!(schema.required, vec!["origin"]);
        assert!(schema.properties.get("date").is_some());
    }
}
