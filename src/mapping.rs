// Index mapping provider
//
// The control plane treats index schemas as opaque: a mapping provider hands
// over a mappings document at index-creation time and that is the full extent
// of the coupling. Changing a mapping means running a new deployment, never
// mutating an index in place.

use serde_json::{json, Value};

/// Source of the mappings document attached to every index this service
/// creates.
pub trait MappingProvider: Send + Sync {
    fn mapping(&self) -> Value;
}

/// Mapping for the product catalog domain.
pub struct ProductMapping;

impl MappingProvider for ProductMapping {
    fn mapping(&self) -> Value {
        json!({
            "properties": {
                "recordId":    { "type": "keyword" },
                "name":        { "type": "text", "analyzer": "standard",
                                 "fields": { "keyword": { "type": "keyword", "ignore_above": 256 } } },
                "description": { "type": "text", "analyzer": "standard" },
                "sku":         { "type": "keyword" },
                "brand":       { "type": "keyword" },
                "category":    { "type": "keyword" },
                "price":       { "type": "double" },
                "currency":    { "type": "keyword" },
                "inStock":     { "type": "boolean" },
                "quantity":    { "type": "integer" },
                "tags":        { "type": "keyword" },
                "attributes":  { "type": "object", "dynamic": true },
                "createdAt":   { "type": "date" },
                "updatedAt":   { "type": "date" }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_mapping_shape() {
        let mapping = ProductMapping.mapping();
        let props = mapping["properties"].as_object().unwrap();
        assert_eq!(props["name"]["type"], "text");
        assert_eq!(props["price"]["type"], "double");
        assert_eq!(props["recordId"]["type"], "keyword");
    }
}
