use super::*;

#[test]
fn test_decode_full_payload() {
    let payload = br#"{"timestamp":1000,"moisture":25.0,"temperature":22.0}"#;

    let event = decode("plant/7/telemetry", payload).unwrap();

    assert_eq!(event.plant_id, 7);
    assert_eq!(event.data.timestamp, Some(1000));
    assert_eq!(event.data.moisture, Some(25.0));
    assert_eq!(event.data.temperature, Some(22.0));
}

#[test]
fn test_decode_partial_payload() {
    // missing fields are typed absence, not a decode failure
    let event = decode("plant/3/telemetry", br#"{"moisture":45.5}"#).unwrap();

    assert_eq!(event.plant_id, 3);
    assert_eq!(event.data.timestamp, None);
    assert_eq!(event.data.moisture, Some(45.5));
    assert_eq!(event.data.temperature, None);
}

#[test]
fn test_decode_invalid_topic() {
    let payload = br#"{"timestamp":1000,"moisture":25.0,"temperature":22.0}"#;

    assert!(matches!(
        decode("plant/7", payload),
        Err(MQTTError::Path(_))
    ));
    assert!(matches!(
        decode("garden/7/telemetry", payload),
        Err(MQTTError::Path(_))
    ));
    assert!(matches!(
        decode("plant/7/cmd/water", payload),
        Err(MQTTError::Path(_))
    ));
    assert!(matches!(
        decode("plant/fern/telemetry", payload),
        Err(MQTTError::Path(_))
    ));
}

#[test]
fn test_decode_invalid_payload() {
    assert!(matches!(
        decode("plant/7/telemetry", b"{moisture:"),
        Err(MQTTError::Parse(_))
    ));
    assert!(matches!(
        decode("plant/7/telemetry", &[0xff, 0xfe]),
        Err(MQTTError::Payload(_))
    ));
}

#[test]
fn test_water_cmd_topic() {
    assert_eq!(water_cmd_topic(7), "plant/7/cmd/water");
}

#[tokio::test]
async fn test_publish_water_cmd() {
    let (tx, _rx) = tokio::sync::mpsc::channel(16);
    let client = MqttPlantClient::new(tx);

    // queued on the request channel even while disconnected
    client.publish_water_cmd(7, 5000).await.unwrap();
}

#[tokio::test]
async fn test_on_plant_message_forwards_event() {
    let (tx, mut rx) = tokio::sync::mpsc::channel(16);
    let msg = Publish::new(
        "plant/7/telemetry",
        QoS::AtLeastOnce,
        br#"{"timestamp":1000,"moisture":25.0,"temperature":22.0}"#.to_vec(),
    );

    MqttPlantClient::on_plant_message(&tx, msg);

    let event = rx.try_recv().unwrap();
    assert_eq!(event.plant_id, 7);
    assert_eq!(event.data.timestamp, Some(1000));
}

#[tokio::test]
async fn test_on_plant_message_drops_when_full() {
    let (tx, mut rx) = tokio::sync::mpsc::channel(1);
    let payload = br#"{"timestamp":1000,"moisture":25.0,"temperature":22.0}"#.to_vec();

    for _ in 0..3 {
        let msg = Publish::new("plant/7/telemetry", QoS::AtLeastOnce, payload.clone());
        MqttPlantClient::on_plant_message(&tx, msg);
    }

    // drop-newest: exactly the first event survives
    assert!(rx.try_recv().is_ok());
    assert!(rx.try_recv().is_err());
}
