//! Brew orders: a named mash plan of temperature/duration steps.

use serde::{Deserialize, Serialize};

use crate::error::OrderError;

/// One rest of the mash plan: hold `temperature` (°C) for `duration` minutes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MashStep {
    pub temperature: f64,
    pub duration: f64,
}

impl MashStep {
    pub fn new(temperature: f64, duration: f64) -> Self {
        Self {
            temperature,
            duration,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrewOrder {
    pub name: String,
    pub steps: Vec<MashStep>,
}

impl BrewOrder {
    pub fn new(name: impl Into<String>, steps: Vec<MashStep>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }

    pub fn validate(&self) -> Result<(), OrderError> {
        if self.name.trim().is_empty() {
            return Err(OrderError::EmptyName);
        }
        if self.steps.is_empty() {
            return Err(OrderError::NoSteps);
        }
        for (index, step) in self.steps.iter().enumerate() {
            if !step.temperature.is_finite() || step.temperature < 0.0 {
                return Err(OrderError::InvalidStep {
                    index,
                    reason: "temperature must be a finite, non-negative number",
                });
            }
            if !step.duration.is_finite() || step.duration < 0.0 {
                return Err(OrderError::InvalidStep {
                    index,
                    reason: "duration must be a finite, non-negative number",
                });
            }
        }
        Ok(())
    }

    /// Parse and validate an order document.
    ///
    /// Accepts the native form
    /// `{"name": "IPA", "steps": [{"temperature": 65, "duration": 30}]}`
    /// and the legacy webservice form
    /// `{"BrauOrder": {"name": "IPA", "MaischePlan": [{"temp": 65, "duration": "30"}]}}`.
    pub fn from_json(text: &str) -> Result<Self, OrderError> {
        let doc: OrderDoc =
            serde_json::from_str(text).map_err(|e| OrderError::Malformed(e.to_string()))?;
        doc.into_order()
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, OrderError> {
        let doc: OrderDoc =
            serde_json::from_value(value).map_err(|e| OrderError::Malformed(e.to_string()))?;
        doc.into_order()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OrderDoc {
    Legacy {
        #[serde(rename = "BrauOrder")]
        brau_order: LegacyOrder,
    },
    Native(BrewOrder),
}

#[derive(Deserialize)]
struct LegacyOrder {
    name: String,
    #[serde(rename = "MaischePlan")]
    plan: Vec<LegacyStep>,
}

#[derive(Deserialize)]
struct LegacyStep {
    temp: Number,
    duration: Number,
}

/// Legacy documents carry numbers either as JSON numbers or as strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum Number {
    Num(f64),
    Text(String),
}

impl Number {
    fn value(&self, index: usize, field: &'static str) -> Result<f64, OrderError> {
        match self {
            Number::Num(v) => Ok(*v),
            Number::Text(s) => s.trim().parse::<f64>().map_err(|_| OrderError::InvalidStep {
                index,
                reason: field,
            }),
        }
    }
}

impl OrderDoc {
    fn into_order(self) -> Result<BrewOrder, OrderError> {
        let order = match self {
            OrderDoc::Native(order) => order,
            OrderDoc::Legacy { brau_order } => {
                let steps = brau_order
                    .plan
                    .iter()
                    .enumerate()
                    .map(|(i, s)| {
                        Ok(MashStep {
                            temperature: s.temp.value(i, "temp is not a number")?,
                            duration: s.duration.value(i, "duration is not a number")?,
                        })
                    })
                    .collect::<Result<Vec<_>, OrderError>>()?;
                BrewOrder {
                    name: brau_order.name,
                    steps,
                }
            }
        };
        order.validate()?;
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn parses_native_document() {
        let o = BrewOrder::from_json(
            r#"{"name":"IPA","steps":[{"temperature":65,"duration":30},{"temperature":70,"duration":15}]}"#,
        )
        .unwrap();
        assert_eq!(o.name, "IPA");
        assert_eq!(o.steps, vec![MashStep::new(65.0, 30.0), MashStep::new(70.0, 15.0)]);
    }

    #[test]
    fn parses_legacy_document_with_string_numbers() {
        let o = BrewOrder::from_json(
            r#"{"BrauOrder":{"name":"Weizen","MaischePlan":[{"temp":45,"duration":"10"},{"temp":"63.5","duration":40}]}}"#,
        )
        .unwrap();
        assert_eq!(o.name, "Weizen");
        assert_eq!(o.steps, vec![MashStep::new(45.0, 10.0), MashStep::new(63.5, 40.0)]);
    }

    #[rstest]
    #[case(r#"{"name":"IPA","steps":[]}"#, OrderError::NoSteps)]
    #[case(r#"{"name":"  ","steps":[{"temperature":65,"duration":30}]}"#, OrderError::EmptyName)]
    #[case(
        r#"{"name":"IPA","steps":[{"temperature":65,"duration":-1}]}"#,
        OrderError::InvalidStep { index: 0, reason: "duration must be a finite, non-negative number" }
    )]
    #[case(
        r#"{"BrauOrder":{"name":"X","MaischePlan":[{"temp":"hot","duration":"10"}]}}"#,
        OrderError::InvalidStep { index: 0, reason: "temp is not a number" }
    )]
    fn rejects_invalid_orders(#[case] doc: &str, #[case] expected: OrderError) {
        assert_eq!(BrewOrder::from_json(doc).unwrap_err(), expected);
    }

    #[test]
    fn malformed_json_is_reported() {
        assert!(matches!(
            BrewOrder::from_json("{not json"),
            Err(OrderError::Malformed(_))
        ));
        assert!(matches!(
            BrewOrder::from_json(r#"{"title":"IPA"}"#),
            Err(OrderError::Malformed(_))
        ));
    }
}
