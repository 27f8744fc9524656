//! Upload operation types.
//!
//! `create-upload` returns a presigned URL that the local file is PUT to;
//! `get-upload` reports the processing status afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role an uploaded file plays in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadRole {
    /// The application under test.
    AppPackage,
    /// The compiled test bundle.
    TestPackage,
    /// The test spec (YAML) driving the test host.
    TestSpec,
}

impl fmt::Display for UploadRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AppPackage => write!(f, "app package"),
            Self::TestPackage => write!(f, "test package"),
            Self::TestSpec => write!(f, "test spec"),
        }
    }
}

/// Remote upload type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UploadType {
    IosApp,
    XctestTestPackage,
    XctestUiTestPackage,
    XctestUiTestSpec,
    AppiumNodeTestPackage,
    AppiumNodeTestSpec,
    /// Any type this client does not submit itself.
    #[serde(other)]
    Other,
}

impl UploadType {
    /// Wire name, as passed to `--type`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IosApp => "IOS_APP",
            Self::XctestTestPackage => "XCTEST_TEST_PACKAGE",
            Self::XctestUiTestPackage => "XCTEST_UI_TEST_PACKAGE",
            Self::XctestUiTestSpec => "XCTEST_UI_TEST_SPEC",
            Self::AppiumNodeTestPackage => "APPIUM_NODE_TEST_PACKAGE",
            Self::AppiumNodeTestSpec => "APPIUM_NODE_TEST_SPEC",
            Self::Other => "OTHER",
        }
    }

    /// Role this type fills in a run request.
    pub fn role(&self) -> Option<UploadRole> {
        match self {
            Self::IosApp => Some(UploadRole::AppPackage),
            Self::XctestTestPackage | Self::XctestUiTestPackage | Self::AppiumNodeTestPackage => {
                Some(UploadRole::TestPackage)
            }
            Self::XctestUiTestSpec | Self::AppiumNodeTestSpec => Some(UploadRole::TestSpec),
            Self::Other => None,
        }
    }
}

impl fmt::Display for UploadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upload record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Upload {
    pub arn: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub upload_type: Option<UploadType>,
    pub status: String,
    /// Presigned PUT target; only present on `create-upload`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Service-side processing message, typically set on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// `create-upload` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUploadResponse {
    pub upload: Upload,
}

/// `get-upload` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetUploadResponse {
    pub upload: Upload,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_upload_response_parses() {
        let value = json!({
            "upload": {
                "arn": "arn:aws:devicefarm:us-west-2:111:upload:p/u",
                "name": "App.ipa",
                "type": "IOS_APP",
                "status": "INITIALIZED",
                "url": "https://uploads.example/put",
                "created": 1700000000.0
            }
        });
        let response: CreateUploadResponse = serde_json::from_value(value).unwrap();
        assert_eq!(response.upload.upload_type, Some(UploadType::IosApp));
        assert_eq!(response.upload.status, "INITIALIZED");
        assert_eq!(response.upload.url.as_deref(), Some("https://uploads.example/put"));
    }

    #[test]
    fn test_unknown_upload_type_is_other() {
        let upload: Upload = serde_json::from_value(json!({
            "arn": "a", "type": "ANDROID_APP", "status": "SUCCEEDED"
        }))
        .unwrap();
        assert_eq!(upload.upload_type, Some(UploadType::Other));
    }

    #[test]
    fn test_upload_type_roles() {
        assert_eq!(UploadType::IosApp.role(), Some(UploadRole::AppPackage));
        assert_eq!(UploadType::XctestUiTestPackage.role(), Some(UploadRole::TestPackage));
        assert_eq!(UploadType::AppiumNodeTestSpec.role(), Some(UploadRole::TestSpec));
        assert_eq!(UploadType::Other.role(), None);
    }

    #[test]
    fn test_wire_name_matches_serde() {
        let value = serde_json::to_value(UploadType::XctestUiTestSpec).unwrap();
        assert_eq!(value, json!(UploadType::XctestUiTestSpec.as_str()));
    }
}
