//! Property listing query over the ERP custom record resource
//!
//! Fetches the raw custom record payload and shapes `items[].values` into
//! listing rows, applying the parsed chat criteria. Shaping is a pure
//! function over the payload so it can be tested without a network.

use anyhow::Result;
use serde_json::Value;

use super::client::ErpClient;

/// Listings shown when the message names no explicit count.
pub const DEFAULT_LIMIT: usize = 5;

/// Filter criteria parsed from a chat message.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Filters {
    pub max_price: Option<f64>,
    pub location: Option<String>,
}

/// One shaped listing row.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub location: String,
    pub price: f64,
    pub area: String,
    pub bedrooms: i64,
    pub bathrooms: i64,
}

/// Query the property custom record and shape the result.
pub async fn fetch_properties(
    client: &ErpClient,
    record_type: &str,
    filters: &Filters,
    limit: usize,
    sort_by_price: bool,
) -> Result<Vec<Property>> {
    let path = format!("/services/rest/record/v1/{}", record_type);
    let payload = client.get_json(&path).await?;
    Ok(shape_properties(&payload, filters, limit, sort_by_price))
}

/// Shape, filter, sort, and truncate the raw record payload.
pub fn shape_properties(
    payload: &Value,
    filters: &Filters,
    limit: usize,
    sort_by_price: bool,
) -> Vec<Property> {
    let items = payload
        .get("items")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    let mut properties = Vec::new();
    for item in items {
        let values = item.get("values").cloned().unwrap_or(Value::Null);
        let property = Property {
            name: str_field(&values, "custrecord_collab_prop_name"),
            location: str_field(&values, "custrecord_collab_prop_loc"),
            price: values
                .get("custrecord_collab_prop_baseprice")
                .and_then(Value::as_f64)
                .unwrap_or(0.0),
            area: str_field(&values, "custrecord_collab_prop_area"),
            bedrooms: int_field(&values, "custrecord_collab_prop_bedrooms"),
            bathrooms: int_field(&values, "custrecord_collab_prop_bathroom"),
        };

        if let Some(max_price) = filters.max_price {
            if property.price > max_price {
                continue;
            }
        }
        if let Some(ref location) = filters.location {
            if !property
                .location
                .to_lowercase()
                .contains(&location.to_lowercase())
            {
                continue;
            }
        }
        properties.push(property);
    }

    if sort_by_price {
        properties.sort_by(|a, b| a.price.total_cmp(&b.price));
    }
    properties.truncate(limit);
    properties
}

fn str_field(values: &Value, key: &str) -> String {
    match values.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => "N/A".to_string(),
    }
}

fn int_field(values: &Value, key: &str) -> i64 {
    values.get(key).and_then(Value::as_i64).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_payload() -> Value {
        json!({
            "items": [
                { "values": {
                    "custrecord_collab_prop_name": "Sea View Villa",
                    "custrecord_collab_prop_loc": "Dubai Marina",
                    "custrecord_collab_prop_baseprice": 950000.0,
                    "custrecord_collab_prop_area": "240",
                    "custrecord_collab_prop_bedrooms": 4,
                    "custrecord_collab_prop_bathroom": 3
                }},
                { "values": {
                    "custrecord_collab_prop_name": "City Loft",
                    "custrecord_collab_prop_loc": "Downtown Dubai",
                    "custrecord_collab_prop_baseprice": 420000.0,
                    "custrecord_collab_prop_area": "95",
                    "custrecord_collab_prop_bedrooms": 2,
                    "custrecord_collab_prop_bathroom": 2
                }},
                { "values": {
                    "custrecord_collab_prop_name": "Garden Townhouse",
                    "custrecord_collab_prop_loc": "Abu Dhabi",
                    "custrecord_collab_prop_baseprice": 610000.0,
                    "custrecord_collab_prop_area": "180",
                    "custrecord_collab_prop_bedrooms": 3,
                    "custrecord_collab_prop_bathroom": 2
                }}
            ]
        })
    }

    #[test]
    fn shapes_all_rows_without_filters() {
        let props =
            shape_properties(&sample_payload(), &Filters::default(), DEFAULT_LIMIT, false);
        assert_eq!(props.len(), 3);
        assert_eq!(props[0].name, "Sea View Villa");
        assert_eq!(props[0].bedrooms, 4);
    }

    #[test]
    fn max_price_filter_drops_expensive_listings() {
        let filters = Filters {
            max_price: Some(500000.0),
            ..Filters::default()
        };
        let props = shape_properties(&sample_payload(), &filters, DEFAULT_LIMIT, false);
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].name, "City Loft");
    }

    #[test]
    fn location_filter_matches_case_insensitive_substring() {
        let filters = Filters {
            location: Some("dubai".into()),
            ..Filters::default()
        };
        let props = shape_properties(&sample_payload(), &filters, DEFAULT_LIMIT, false);
        assert_eq!(props.len(), 2);
    }

    #[test]
    fn price_sort_and_limit_apply_in_order() {
        let props = shape_properties(&sample_payload(), &Filters::default(), 2, true);
        assert_eq!(props.len(), 2);
        assert_eq!(props[0].name, "City Loft");
        assert_eq!(props[1].name, "Garden Townhouse");
    }

    #[test]
    fn missing_values_fall_back_to_placeholders() {
        let payload = json!({ "items": [ { "values": {} } ] });
        let props = shape_properties(&payload, &Filters::default(), DEFAULT_LIMIT, false);
        assert_eq!(props[0].name, "N/A");
        assert_eq!(props[0].price, 0.0);
        assert_eq!(props[0].bedrooms, 0);
    }

    #[test]
    fn empty_or_malformed_payload_yields_no_rows() {
        let props =
            shape_properties(&json!({}), &Filters::default(), DEFAULT_LIMIT, false);
        assert!(props.is_empty());
    }
}
