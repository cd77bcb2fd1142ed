use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MdxRequest {
    #[validate(length(min = 1, message = "Missing file path"))]
    pub file_path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PeriodQuery {
    pub period: Option<String>,
}
