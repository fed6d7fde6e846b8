pub mod gemini;
pub mod normalize;
pub mod provider;

pub use normalize::{NormalizeError, NormalizeMode};
pub use provider::{
    GenerateRequest, GenerateResponse, GenerativeModel, GroundingReference, LatLng, MapsGrounding,
    Part, ProviderError,
};
