use dongle_relay::channels::telegram::parse_telegram_update;
use serde_json::json;

#[test]
fn test_parse_telegram_private_message() {
    let payload = json!({
        "update_id": 123456789,
        "message": {
            "message_id": 1,
            "from": {
                "id": 123456789_i64,
                "is_bot": false,
                "first_name": "Test",
                "username": "testuser"
            },
            "chat": {
                "id": 123456789_i64,
                "type": "private",
                "first_name": "Test",
                "username": "testuser"
            },
            "date": 1609459200,
            "text": "/sendsms\n+14155552671\n\nHello there"
        }
    });
    let event = parse_telegram_update(&payload).unwrap();
    assert_eq!(event.chat_id, 123456789);
    assert_eq!(event.sender_id, Some(123456789));
    assert!(event.is_private);
    assert_eq!(event.sender_name, Some("testuser".to_string()));
    assert_eq!(
        event.text,
        Some("/sendsms\n+14155552671\n\nHello there".to_string())
    );
}

#[test]
fn test_parse_telegram_group_message() {
    let payload = json!({
        "update_id": 123456789,
        "message": {
            "message_id": 1,
            "from": {
                "id": 123456789_i64,
                "is_bot": false,
                "first_name": "Test"
            },
            "chat": {
                "id": -1001234567890_i64,
                "type": "supergroup",
                "title": "Test Group"
            },
            "date": 1609459200,
            "text": "/start"
        }
    });
    let event = parse_telegram_update(&payload).unwrap();
    assert_eq!(event.chat_id, -1001234567890);
    assert_eq!(event.sender_id, Some(123456789));
    assert!(!event.is_private);
}

#[test]
fn test_ignore_telegram_channel_posts() {
    let payload = json!({
        "update_id": 123456789,
        "channel_post": {
            "message_id": 1,
            "chat": {
                "id": -1001234567890_i64,
                "type": "channel"
            },
            "date": 1609459200,
            "text": "Channel post"
        }
    });
    assert!(parse_telegram_update(&payload).is_none());
}

#[test]
fn test_ignore_telegram_callback_query() {
    let payload = json!({
        "update_id": 123456789,
        "callback_query": {
            "id": "callback123",
            "from": {
                "id": 123456789_i64,
                "is_bot": false,
                "first_name": "Test"
            },
            "data": "button_clicked"
        }
    });
    assert!(parse_telegram_update(&payload).is_none());
}

#[test]
fn test_parse_telegram_photo_has_no_text() {
    let payload = json!({
        "update_id": 123456789,
        "message": {
            "message_id": 1,
            "from": {
                "id": 123456789_i64,
                "is_bot": false,
                "first_name": "Test"
            },
            "chat": {
                "id": 123456789_i64,
                "type": "private"
            },
            "date": 1609459200,
            "photo": [
                {"file_id": "photo123", "width": 320, "height": 320}
            ],
            "caption": "Photo caption"
        }
    });
    let event = parse_telegram_update(&payload).unwrap();
    assert!(event.text.is_none());
}

#[test]
fn test_parse_telegram_service_message_without_sender() {
    let payload = json!({
        "update_id": 123456789,
        "message": {
            "message_id": 1,
            "chat": {
                "id": 123456789_i64,
                "type": "private"
            },
            "date": 1609459200,
            "new_chat_participant": {
                "id": 987654321_i64,
                "is_bot": true,
                "first_name": "Bot"
            }
        }
    });
    let event = parse_telegram_update(&payload).unwrap();
    assert!(event.sender_id.is_none());
    assert!(event.text.is_none());
}

#[test]
fn test_parse_telegram_missing_chat() {
    let payload = json!({
        "update_id": 1,
        "message": {
            "message_id": 1,
            "text": "orphan"
        }
    });
    assert!(parse_telegram_update(&payload).is_none());
}
