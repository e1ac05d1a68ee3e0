// Integration tests for device registration
//
// These tests verify the registration logic through the service facade:
// - Defaults for name, location and status
// - Re-registration overwrites the stored record
// - Validation errors leave the registry untouched
// - Seeding only adds unknown devices
// - Device details expose the cached reading timestamp

use std::sync::Arc;
use std::time::Duration;

use agriweather_backend::test_utils::helpers;
use agriweather_backend::{
    DeviceRegistry, InMemoryDeviceRegistry, Location, Reading, RegisterDeviceRequest,
    ServiceError, WeatherService,
};

fn setup() -> (WeatherService, Arc<InMemoryDeviceRegistry>) {
    let registry = Arc::new(InMemoryDeviceRegistry::new());
    let service = WeatherService::new(
        None,
        registry.clone(),
        helpers::clock_at("2024-01-15T10:30:00Z"),
        Duration::from_secs(30),
    );
    (service, registry)
}

fn request(device_id: &str) -> RegisterDeviceRequest {
    RegisterDeviceRequest {
        device_id: Some(device_id.to_string()),
        ..RegisterDeviceRequest::default()
    }
}

#[tokio::test]
async fn test_new_device_defaults() {
    let (service, registry) = setup();

    let device = service.register_device(request("field-north")).await.unwrap();

    assert_eq!(device.device_id, "field-north");
    assert_eq!(device.name, "Device field-north");
    assert_eq!(device.location, Location::default());
    assert_eq!(device.status, "online");
    assert!(device.registered_at.starts_with("2024-01-15T10:30:00"));

    let stored = registry.get_device("field-north").await.unwrap().unwrap();
    assert_eq!(stored, device);
}

#[tokio::test]
async fn test_reregistration_overwrites() {
    let (service, registry) = setup();
    service.register_device(request("field-north")).await.unwrap();

    let updated = RegisterDeviceRequest {
        device_id: Some("field-north".to_string()),
        name: Some("North field station".to_string()),
        location: Some(Location {
            latitude: 49.9,
            longitude: 19.1,
        }),
    };
    service.register_device(updated).await.unwrap();

    let devices = registry.list_devices().await.unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].name, "North field station");
    assert_eq!(devices[0].location.latitude, 49.9);
}

#[tokio::test]
async fn test_validation_rejects_before_mutation() {
    let (service, registry) = setup();

    let cases = vec![
        RegisterDeviceRequest::default(),
        request(""),
        request(".hidden"),
        request("has space"),
        RegisterDeviceRequest {
            device_id: Some("dev-1".to_string()),
            name: Some(String::new()),
            location: None,
        },
        RegisterDeviceRequest {
            device_id: Some("dev-1".to_string()),
            name: None,
            location: Some(Location {
                latitude: 91.0,
                longitude: 0.0,
            }),
        },
    ];

    for case in cases {
        let err = service.register_device(case).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)), "{:?}", err);
    }

    assert!(registry.list_device_ids().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_registration_request_from_json() {
    let (service, _) = setup();

    let body = r#"{"device_id":"orchard-2","location":{"latitude":50.1,"longitude":20.2}}"#;
    let parsed: RegisterDeviceRequest = serde_json::from_str(body).unwrap();
    let device = service.register_device(parsed).await.unwrap();

    assert_eq!(device.location.longitude, 20.2);
    assert_eq!(device.name, "Device orchard-2");
}

#[tokio::test]
async fn test_seed_devices() {
    let (service, _) = setup();
    service.register_device(request("dev-a")).await.unwrap();

    let added = service
        .seed_devices(&["dev-a".to_string(), "dev-b".to_string()])
        .await
        .unwrap();
    assert_eq!(added, 1);

    let ids: Vec<String> = service
        .list_devices()
        .await
        .unwrap()
        .into_iter()
        .map(|d| d.device_id)
        .collect();
    assert_eq!(ids, ["dev-a", "dev-b"]);
}

#[tokio::test]
async fn test_device_details() {
    let (service, _) = setup();

    assert!(matches!(
        service.get_device("ghost").await,
        Err(ServiceError::DeviceNotFound(_))
    ));

    service.register_device(request("dev-a")).await.unwrap();
    assert_eq!(service.get_device("dev-a").await.unwrap().last_reading, None);

    service
        .monitor()
        .observe("dev-a", Reading::new("dev-a", "2024-01-15T10:29:00Z"));
    let details = service.get_device("dev-a").await.unwrap();
    assert_eq!(details.last_reading.as_deref(), Some("2024-01-15T10:29:00Z"));
    assert_eq!(details.device.device_id, "dev-a");
}
