//! Tool Schema Normalization
//!
//! Providers disagree about which JSON-Schema shapes they accept for tool
//! parameters. Gemini rejects empty `required` arrays and object schemas with
//! no properties; both providers require an object at the root. Every adapter
//! runs declarations through `normalize_tool` before serializing them.

use std::collections::HashMap;

use crate::types::{ParameterSchema, ToolDefinition};

/// Property injected into parameterless tools.
pub const PLACEHOLDER_PROPERTY: &str = "reason";

/// Normalize a tool declaration for transmission.
pub fn normalize_tool(tool: &ToolDefinition) -> ToolDefinition {
    ToolDefinition {
        name: tool.name.clone(),
        description: tool.description.clone(),
        input_schema: normalize_root(&tool.input_schema),
    }
}

/// Root rules: type forced to object, then the recursive rules, then a
/// placeholder property when nothing is declared.
pub fn normalize_root(schema: &ParameterSchema) -> ParameterSchema {
    let mut root = normalize_nested(schema);
    root.schema_type = "object".to_string();
    root.items = None;
    root.enum_values = None;

    let empty = root.properties.as_ref().map_or(true, |p| p.is_empty());
    if empty {
        let mut properties = HashMap::new();
        properties.insert(
            PLACEHOLDER_PROPERTY.to_string(),
            ParameterSchema::string(Some("Optional note; may be omitted.")),
        );
        root.properties = Some(properties);
        root.required = None;
    }
    root
}

fn normalize_nested(schema: &ParameterSchema) -> ParameterSchema {
    let mut out = schema.clone();

    if out.required.as_ref().map_or(false, |r| r.is_empty()) {
        out.required = None;
    }

    // Drop required names that do not correspond to a declared property.
    if let (Some(required), Some(properties)) = (&out.required, &out.properties) {
        let kept: Vec<String> = required
            .iter()
            .filter(|name| properties.contains_key(*name))
            .cloned()
            .collect();
        out.required = if kept.is_empty() { None } else { Some(kept) };
    }

    if let Some(properties) = &schema.properties {
        out.properties = Some(
            properties
                .iter()
                .map(|(name, prop)| (name.clone(), normalize_nested(prop)))
                .collect(),
        );
    }
    if let Some(items) = &schema.items {
        out.items = Some(Box::new(normalize_nested(items)));
    }
    out
}
