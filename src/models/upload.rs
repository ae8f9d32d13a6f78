use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response returned after a document was stored
#[derive(Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub url: String,
}
