use serde::{Deserialize, Deserializer, Serialize};

pub const GENERATE_ITINERARY_PATH: &str = "generate-itinerary";

/// Body of `POST /generate-itinerary`.
///
/// A non-finite `budget` (the result of unparsable input) serializes as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItineraryRequest {
    pub destination: String,
    #[serde(deserialize_with = "budget_or_nan")]
    pub budget: f64,
    pub interests: Vec<String>,
}

fn budget_or_nan<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItineraryResponse {
    #[serde(default)]
    pub itinerary: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::FormState;

    #[test]
    fn request_serializes_to_wire_shape() {
        let request = FormState::new("Paris", "800", " Paris ,  food, ").to_request();
        let body = serde_json::to_value(&request).expect("serialize");
        assert_eq!(
            body,
            json!({
                "destination": "Paris",
                "budget": 800.0,
                "interests": ["Paris", "food", ""],
            })
        );
    }

    #[test]
    fn nan_budget_is_sent_as_null() {
        let request = FormState::new("Oslo", "abc", "fjords").to_request();
        assert!(request.budget.is_nan());
        let body = serde_json::to_value(&request).expect("serialize");
        assert!(body["budget"].is_null());

        let decoded: ItineraryRequest = serde_json::from_value(body).expect("decode");
        assert!(decoded.budget.is_nan());
    }

    #[test]
    fn response_without_itinerary_field_still_decodes() {
        let response: ItineraryResponse =
            serde_json::from_str(r#"{"plan": "Day 1"}"#).expect("decode");
        assert_eq!(response.itinerary, None);

        let response: ItineraryResponse =
            serde_json::from_str(r#"{"itinerary": "Day 1: Louvre"}"#).expect("decode");
        assert_eq!(response.itinerary.as_deref(), Some("Day 1: Louvre"));
    }
}
