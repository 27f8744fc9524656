//! Project and device pool listings.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DevicePoolType {
    Curated,
    Private,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevicePool {
    pub arn: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub pool_type: DevicePoolType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDevicePoolsResponse {
    #[serde(default)]
    pub device_pools: Vec<DevicePool>,
}

impl ListDevicePoolsResponse {
    /// First pool of the given type, in listing order.
    pub fn first_of_type(&self, pool_type: DevicePoolType) -> Option<&DevicePool> {
        self.device_pools.iter().find(|p| p.pool_type == pool_type)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub arn: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListProjectsResponse {
    #[serde(default)]
    pub projects: Vec<Project>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_private_pool() {
        let response: ListDevicePoolsResponse = serde_json::from_value(json!({
            "devicePools": [
                {"arn": "curated-1", "name": "Top Devices", "type": "CURATED"},
                {"arn": "private-1", "name": "iPhones", "type": "PRIVATE"},
                {"arn": "private-2", "name": "iPads", "type": "PRIVATE"}
            ]
        }))
        .unwrap();
        let pool = response.first_of_type(DevicePoolType::Private).unwrap();
        assert_eq!(pool.arn, "private-1");
    }

    #[test]
    fn test_no_private_pool() {
        let response: ListDevicePoolsResponse = serde_json::from_value(json!({
            "devicePools": [{"arn": "curated-1", "type": "CURATED"}]
        }))
        .unwrap();
        assert!(response.first_of_type(DevicePoolType::Private).is_none());
    }
}
