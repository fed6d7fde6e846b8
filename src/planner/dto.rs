use serde::{Deserialize, Serialize};

use crate::ai::normalize::{lenient_f64, lenient_string, text_or_empty};
use crate::ai::LatLng;

#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub location: Option<LatLng>,
}

/// A venue as the model writes it. Map links only come from grounding
/// references, so any link in the model's own JSON is ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VenueDraft {
    #[serde(default, deserialize_with = "text_or_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub rating: Option<f64>,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub description: String,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub address: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub website: Option<String>,
}

/// One stored venue suggestion. Text the model leaves out is empty, a missing rating is `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Venue {
    #[serde(default, deserialize_with = "text_or_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub rating: Option<f64>,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub description: String,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub address: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub website: Option<String>,
    #[serde(default, alias = "maps_uri", deserialize_with = "lenient_string")]
    pub maps_uri: Option<String>,
}

impl From<VenueDraft> for Venue {
    fn from(d: VenueDraft) -> Self {
        Self {
            name: d.name,
            rating: d.rating,
            description: d.description,
            address: d.address,
            website: d.website,
            maps_uri: None,
        }
    }
}
