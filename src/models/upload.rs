use serde::{Deserialize, Serialize};

/// Message sent back with every successful upload.
pub const UPLOAD_SUCCESS_MESSAGE: &str = "File uploaded to Google Drive successfully";

/// Metadata of a single file part as declared by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingFile {
    pub field_name: String,
    pub original_name: String,
    pub content_type: String,
}

/// What the storage provider hands back after a successful transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteUploadResult {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub web_view_link: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub file_id: String,
    pub file_name: String,
    pub web_view_link: String,
    pub message: String,
}

impl From<RemoteUploadResult> for UploadResponse {
    fn from(result: RemoteUploadResult) -> Self {
        Self {
            success: true,
            file_id: result.id,
            file_name: result.name,
            web_view_link: result.web_view_link,
            message: UPLOAD_SUCCESS_MESSAGE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_remote_result_from_drive_json() {
        let result: RemoteUploadResult = serde_json::from_value(json!({
            "id": "1AbC",
            "name": "cat.png",
            "webViewLink": "https://drive.google.com/file/d/1AbC/view"
        }))
        .unwrap();

        assert_eq!(result.id, "1AbC");
        assert_eq!(result.web_view_link, "https://drive.google.com/file/d/1AbC/view");
    }

    #[test]
    fn test_upload_response_uses_camel_case() {
        let response = UploadResponse::from(RemoteUploadResult {
            id: "1AbC".to_string(),
            name: "cat.png".to_string(),
            web_view_link: "https://drive.google.com/file/d/1AbC/view".to_string(),
        });

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["success"], json!(true));
        assert_eq!(value["fileId"], json!("1AbC"));
        assert_eq!(value["fileName"], json!("cat.png"));
        assert_eq!(value["webViewLink"], json!("https://drive.google.com/file/d/1AbC/view"));
        assert_eq!(value["message"], json!(UPLOAD_SUCCESS_MESSAGE));
    }
}
