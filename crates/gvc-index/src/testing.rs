//! Fixtures shared by the unit tests.

use gvc_store::{AttributeDescriptor, Geometry, RevFeature, RevFeatureType, Value, ValueKind};

pub fn park_type() -> RevFeatureType {
    RevFeatureType::new(
        "park",
        vec![
            AttributeDescriptor::new("name", ValueKind::Text, false),
            AttributeDescriptor::new("geom", ValueKind::Geometry, true),
        ],
    )
}

pub fn park(name: &str, x: f64, y: f64) -> RevFeature {
    RevFeature::new(vec![
        Value::Text(name.to_string()),
        Value::Geometry(Geometry::point(x, y)),
    ])
}

pub fn five_parks() -> Vec<(String, RevFeature)> {
    (1..=5)
        .map(|i| (i.to_string(), park(&format!("park {i}"), f64::from(i), 0.0)))
        .collect()
}
