use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use agriweather_backend::{DeviceRecord, DeviceRegistry, Location, RegistryError};

/// Device registry backed by a DynamoDB table keyed on `device_id`
#[derive(Debug, Clone)]
pub struct DynamoDbDeviceRegistry {
    client: DynamoDbClient,
    table_name: String,
}

impl DynamoDbDeviceRegistry {
    pub fn new(client: DynamoDbClient, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    /// Build a client from the ambient AWS configuration
    pub async fn from_env(table_name: impl Into<String>) -> Self {
        let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await;

        let dynamodb_config = aws_sdk_dynamodb::config::Builder::from(&aws_config)
            .timeout_config(
                aws_sdk_dynamodb::config::timeout::TimeoutConfig::builder()
                    .operation_timeout(Duration::from_secs(25))
                    .operation_attempt_timeout(Duration::from_secs(10))
                    .build(),
            )
            .build();

        Self::new(DynamoDbClient::from_conf(dynamodb_config), table_name)
    }
}

#[async_trait]
impl DeviceRegistry for DynamoDbDeviceRegistry {
    fn backend_name(&self) -> &'static str {
        "dynamodb"
    }

    async fn list_device_ids(&self) -> Result<Vec<String>, RegistryError> {
        Ok(self
            .list_devices()
            .await?
            .into_iter()
            .map(|device| device.device_id)
            .collect())
    }

    /// Scan the whole table, following `LastEvaluatedKey` across pages
    async fn list_devices(&self) -> Result<Vec<DeviceRecord>, RegistryError> {
        let mut devices = Vec::new();
        let mut start_key: Option<HashMap<String, AttributeValue>> = None;

        loop {
            let result = self
                .client
                .scan()
                .table_name(&self.table_name)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| RegistryError::Backend(format!("{:?}", e)))?;

            for item in result.items() {
                devices.push(item_to_device(item)?);
            }

            match result.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        debug!(table = %self.table_name, count = devices.len(), "Scanned devices table");
        devices.sort_by(|a, b| a.device_id.cmp(&b.device_id));
        Ok(devices)
    }

    async fn get_device(&self, device_id: &str) -> Result<Option<DeviceRecord>, RegistryError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("device_id", AttributeValue::S(device_id.to_string()))
            .send()
            .await
            .map_err(|e| RegistryError::Backend(format!("{:?}", e)))?;

        match result.item {
            Some(item) => Ok(Some(item_to_device(&item)?)),
            None => Ok(None),
        }
    }

    async fn put_device(&self, device: DeviceRecord) -> Result<(), RegistryError> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(device_to_item(&device)))
            .send()
            .await
            .map_err(|e| RegistryError::Backend(format!("{:?}", e)))?;

        Ok(())
    }
}

fn device_to_item(device: &DeviceRecord) -> HashMap<String, AttributeValue> {
    let mut item = HashMap::new();

    // Partition key
    item.insert(
        "device_id".to_string(),
        AttributeValue::S(device.device_id.clone()),
    );
    item.insert("name".to_string(), AttributeValue::S(device.name.clone()));
    item.insert("location".to_string(), location_to_attribute_value(&device.location));
    item.insert(
        "registered_at".to_string(),
        AttributeValue::S(device.registered_at.clone()),
    );
    item.insert("status".to_string(), AttributeValue::S(device.status.clone()));

    item
}

fn item_to_device(item: &HashMap<String, AttributeValue>) -> Result<DeviceRecord, RegistryError> {
    let string_attr = |name: &str| -> Result<String, RegistryError> {
        item.get(name)
            .and_then(|v| v.as_s().ok())
            .cloned()
            .ok_or_else(|| RegistryError::Serialization(format!("Missing {}", name)))
    };

    let device_id = string_attr("device_id")?;
    let name = string_attr("name").unwrap_or_else(|_| format!("Device {}", device_id));

    // Older records may lack a location
    let location = match item.get("location") {
        Some(attr) => attribute_value_to_location(attr)?,
        None => Location::default(),
    };

    Ok(DeviceRecord {
        device_id,
        name,
        location,
        registered_at: string_attr("registered_at")?,
        status: string_attr("status").unwrap_or_else(|_| "online".to_string()),
    })
}

fn location_to_attribute_value(location: &Location) -> AttributeValue {
    let mut map = HashMap::new();
    map.insert(
        "latitude".to_string(),
        AttributeValue::N(location.latitude.to_string()),
    );
    map.insert(
        "longitude".to_string(),
        AttributeValue::N(location.longitude.to_string()),
    );
    AttributeValue::M(map)
}

fn attribute_value_to_location(attr: &AttributeValue) -> Result<Location, RegistryError> {
    let map = attr
        .as_m()
        .map_err(|_| RegistryError::Serialization("location is not a map".to_string()))?;

    let coordinate = |name: &str| -> Result<f64, RegistryError> {
        map.get(name)
            .and_then(|v| v.as_n().ok())
            .and_then(|n| n.parse::<f64>().ok())
            .ok_or_else(|| RegistryError::Serialization(format!("Invalid location.{}", name)))
    };

    Ok(Location {
        latitude: coordinate("latitude")?,
        longitude: coordinate("longitude")?,
    })
}
