use fastwatch_devkit::{Step, TestHarness};
use fastwatch_kernel::{build_sensors, RateSensor, BYTES_RECEIVED, BYTES_SENT};
use fastwatch_devkit::MockDeviceClient;

fn split(mut sensors: Vec<RateSensor<MockDeviceClient>>) -> (RateSensor<MockDeviceClient>, RateSensor<MockDeviceClient>) {
    let upload = sensors.pop().unwrap();
    let download = sensors.pop().unwrap();
    (download, upload)
}

#[tokio::test]
async fn test_sensors_unavailable_before_first_cycle() {
    let harness = TestHarness::new();
    let (mut download, upload) = split(build_sensors(&harness.coordinator));

    assert_eq!(download.unique_id(), "download");
    assert_eq!(upload.unique_id(), "upload");
    assert!(!download.available());
    assert_eq!(download.native_value(), None);
    assert!(download.extra_state_attributes().is_empty());
}

#[tokio::test]
async fn test_download_and_upload_rates() {
    let harness = TestHarness::new();
    let (mut download, mut upload) = split(build_sensors(&harness.coordinator));

    harness.set_traffic(1_000, 500);
    harness.refresh_after(10).await.unwrap();
    assert!(download.available());
    assert_eq!(download.native_value(), None);
    assert_eq!(upload.native_value(), None);

    harness.set_traffic(2_000, 1_500);
    harness.refresh_after(10).await.unwrap();
    assert_eq!(download.native_value(), Some(100.0));
    assert_eq!(upload.native_value(), Some(100.0));

    // repeated reads between polls are stable
    assert_eq!(download.native_value(), Some(100.0));

    assert_eq!(download.extra_state_attributes()[BYTES_RECEIVED], 2_000);
    assert_eq!(upload.extra_state_attributes()[BYTES_SENT], 1_500);
}

#[tokio::test]
async fn test_estimators_are_independent() {
    let harness = TestHarness::new();
    let (mut download, mut upload) = split(build_sensors(&harness.coordinator));

    harness.set_traffic(0, 0);
    harness.refresh_after(10).await.unwrap();
    download.native_value();

    harness.set_traffic(3_000_000, 0);
    harness.refresh_after(10).await.unwrap();

    // upload takes its first sample now, download its second
    assert_eq!(upload.native_value(), None);
    assert_eq!(download.native_value(), Some(300_000.0));
    assert_eq!(download.display_value(), Some(0.3));
}

#[tokio::test]
async fn test_failed_cycle_serves_stale_rate() {
    let harness = TestHarness::new();
    let (mut download, _) = split(build_sensors(&harness.coordinator));

    harness.set_traffic(1_000, 0);
    harness.refresh_after(10).await.unwrap();
    download.native_value();
    harness.set_traffic(6_000, 0);
    harness.refresh_after(10).await.unwrap();
    assert_eq!(download.native_value(), Some(500.0));

    harness.client.fail(Step::Login, "busy");
    assert!(harness.refresh_after(10).await.is_err());

    assert!(download.available());
    assert_eq!(download.native_value(), Some(500.0));
    assert_eq!(download.extra_state_attributes()[BYTES_RECEIVED], 6_000);
}
