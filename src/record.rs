//! Financial-ratio records and the boundary that validates them

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

use crate::error::DataError;

/// Number of numeric features carried by every record.
pub const FEATURE_COUNT: usize = 8;

/// The eight financial ratios, in feature-vector order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Return on assets
    Roa,
    /// Return on equity
    Roe,
    /// Earnings per share
    Eps,
    /// Net profit margin
    Npm,
    /// Book value
    Bv,
    /// Price to book value
    PriceToBv,
    /// Price to earnings
    PeRatio,
    /// Debt to equity
    DeRatio,
}

impl Metric {
    pub const ALL: [Metric; FEATURE_COUNT] = [
        Metric::Roa,
        Metric::Roe,
        Metric::Eps,
        Metric::Npm,
        Metric::Bv,
        Metric::PriceToBv,
        Metric::PeRatio,
        Metric::DeRatio,
    ];

    /// Canonical snake_case field name.
    pub fn name(self) -> &'static str {
        match self {
            Metric::Roa => "roa",
            Metric::Roe => "roe",
            Metric::Eps => "eps",
            Metric::Npm => "npm",
            Metric::Bv => "bv",
            Metric::PriceToBv => "price_to_bv",
            Metric::PeRatio => "pe_ratio",
            Metric::DeRatio => "de_ratio",
        }
    }

    /// camelCase spelling accepted from request payloads.
    pub fn alias(self) -> Option<&'static str> {
        match self {
            Metric::PriceToBv => Some("priceToBv"),
            Metric::PeRatio => Some("peRatio"),
            Metric::DeRatio => Some("deRatio"),
            _ => None,
        }
    }

    /// Position of this metric in a feature vector.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One company's financial ratios. Immutable once built; all features are finite.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: String,
    stock_name: String,
    features: [f64; FEATURE_COUNT],
}

impl Record {
    /// Build a record from features given in [`Metric::ALL`] order.
    pub fn new(
        id: impl Into<String>,
        stock_name: impl Into<String>,
        features: [f64; FEATURE_COUNT],
    ) -> Result<Self, DataError> {
        let id = id.into();
        for (metric, &value) in Metric::ALL.iter().zip(features.iter()) {
            if !value.is_finite() {
                return Err(DataError::NonFinite {
                    record: id,
                    metric: metric.name(),
                    value,
                });
            }
        }

        Ok(Self {
            id,
            stock_name: stock_name.into(),
            features,
        })
    }

    /// Validate a loosely-typed JSON object into a record.
    ///
    /// Features may be numbers or numeric strings, under their snake_case name
    /// or camelCase alias. The id is taken from `_id` (plain or `{"$oid": ..}`)
    /// or `id`, falling back to `fallback_id`.
    pub fn from_json(fallback_id: impl Into<String>, value: &Value) -> Result<Self, DataError> {
        let fallback_id = fallback_id.into();
        let Some(object) = value.as_object() else {
            return Err(DataError::NotAnObject {
                record: fallback_id,
            });
        };

        let id = object
            .get("_id")
            .or_else(|| object.get("id"))
            .and_then(json_id)
            .unwrap_or(fallback_id);

        let stock_name = match object.get("stockname") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };

        let mut features = [0.0; FEATURE_COUNT];
        for metric in Metric::ALL {
            let raw = object
                .get(metric.name())
                .or_else(|| metric.alias().and_then(|alias| object.get(alias)));
            features[metric.index()] = json_feature(&id, metric, raw)?;
        }

        Self::new(id, stock_name, features)
    }

    /// Validate a JSON array of record objects, preserving order.
    pub fn from_json_array(value: &Value) -> Result<Vec<Self>, DataError> {
        let items = value.as_array().ok_or(DataError::NotAnArray)?;
        items
            .iter()
            .enumerate()
            .map(|(index, item)| Self::from_json(index.to_string(), item))
            .collect()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn stock_name(&self) -> &str {
        &self.stock_name
    }

    pub fn value(&self, metric: Metric) -> f64 {
        self.features[metric.index()]
    }

    pub fn features(&self) -> &[f64; FEATURE_COUNT] {
        &self.features
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(FEATURE_COUNT + 2))?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("stockname", &self.stock_name)?;
        for metric in Metric::ALL {
            map.serialize_entry(metric.name(), &self.value(metric))?;
        }
        map.end()
    }
}

fn json_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(o) => o.get("$oid").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

fn json_feature(record: &str, metric: Metric, raw: Option<&Value>) -> Result<f64, DataError> {
    match raw {
        None | Some(Value::Null) => Err(DataError::MissingFeature {
            record: record.to_string(),
            metric: metric.name(),
        }),
        Some(Value::Number(n)) => n.as_f64().ok_or_else(|| DataError::NonNumeric {
            record: record.to_string(),
            metric: metric.name(),
            value: n.to_string(),
        }),
        Some(Value::String(s)) => s.trim().parse::<f64>().map_err(|_| DataError::NonNumeric {
            record: record.to_string(),
            metric: metric.name(),
            value: s.clone(),
        }),
        Some(other) => Err(DataError::NonNumeric {
            record: record.to_string(),
            metric: metric.name(),
            value: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_report() -> Value {
        json!({
            "_id": {"$oid": "65a1f0c2"},
            "stockname": "BBCA",
            "roa": 3.1,
            "roe": "18.5",
            "eps": 412.0,
            "npm": 45.2,
            "bv": 1720.0,
            "priceToBv": 4.9,
            "peRatio": 22.4,
            "de_ratio": 5.6
        })
    }

    #[test]
    fn test_metric_order_matches_index() {
        for (i, metric) in Metric::ALL.iter().enumerate() {
            assert_eq!(metric.index(), i);
        }
        assert_eq!(Metric::PriceToBv.name(), "price_to_bv");
        assert_eq!(serde_json::to_string(&Metric::PeRatio).unwrap(), "\"pe_ratio\"");
    }

    #[test]
    fn test_from_json_accepts_aliases_and_numeric_strings() {
        let record = Record::from_json("0", &full_report()).unwrap();
        assert_eq!(record.id(), "65a1f0c2");
        assert_eq!(record.stock_name(), "BBCA");
        assert_eq!(record.value(Metric::Roe), 18.5);
        assert_eq!(record.value(Metric::PriceToBv), 4.9);
        assert_eq!(record.value(Metric::DeRatio), 5.6);
    }

    #[test]
    fn test_from_json_missing_eps() {
        let mut value = full_report();
        value.as_object_mut().unwrap().remove("eps");

        let err = Record::from_json("3", &value).unwrap_err();
        assert_eq!(
            err,
            DataError::MissingFeature {
                record: "65a1f0c2".to_string(),
                metric: "eps"
            }
        );
    }

    #[test]
    fn test_from_json_non_numeric() {
        let mut value = full_report();
        value["npm"] = json!("n/a");

        let err = Record::from_json("0", &value).unwrap_err();
        assert!(matches!(err, DataError::NonNumeric { metric: "npm", .. }));

        value["npm"] = json!(true);
        assert!(Record::from_json("0", &value).is_err());
    }

    #[test]
    fn test_from_json_rejects_nan_string() {
        let mut value = full_report();
        value["bv"] = json!("NaN");

        let err = Record::from_json("0", &value).unwrap_err();
        assert!(matches!(err, DataError::NonFinite { metric: "bv", .. }));
    }

    #[test]
    fn test_from_json_array_uses_position_as_fallback_id() {
        let mut first = full_report();
        first.as_object_mut().unwrap().remove("_id");
        let records = Record::from_json_array(&json!([first, full_report()])).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id(), "0");
        assert_eq!(records[1].id(), "65a1f0c2");

        assert_eq!(
            Record::from_json_array(&json!({"roa": 1.0})).unwrap_err(),
            DataError::NotAnArray
        );
    }

    #[test]
    fn test_serialize_uses_snake_case_fields() {
        let record = Record::new("1", "TLKM", [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]).unwrap();
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["stockname"], "TLKM");
        assert_eq!(value["price_to_bv"], 6.0);
        assert_eq!(value["de_ratio"], 8.0);
    }
}
