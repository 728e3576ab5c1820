pub mod request_descriptor;
pub mod api_response;
pub mod challenge_image;

pub use request_descriptor::{HttpMethod, RequestDescriptor, ResponseMode};
pub use api_response::{ApiResponse, Payload};
pub use challenge_image::{ChallengeImage, ImageHandle};
