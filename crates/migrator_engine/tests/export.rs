use migrator_core::{FileRef, MediaKind, MessageKind, PhotoRef, TextSpan};
use migrator_engine::{load_export, parse_export, MigrateError};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const EXPORT: &str = r##"{
  "name": "My channel",
  "type": "public_channel",
  "messages": [
    {
      "id": 1,
      "type": "service",
      "date": "2023-01-01T00:00:00",
      "date_unixtime": "1672531200",
      "actor": "My channel",
      "action": "create_channel",
      "text": "",
      "text_entities": []
    },
    {
      "id": 2,
      "type": "message",
      "date": "2023-01-02T10:00:00",
      "from": "My channel",
      "photo": "photos/photo_1.jpg",
      "width": 1280,
      "height": 720,
      "text_entities": [
        {"type": "plain", "text": "See "},
        {"type": "text_link", "text": "this", "href": "https://example.com"},
        {"type": "hashtag", "text": "#news"}
      ]
    },
    {
      "id": 3,
      "type": "message",
      "date_unixtime": 1672700000,
      "photo": "photos/ignored.jpg",
      "photos": [
        {"photo": "photos/a.jpg", "width": 10, "height": 20},
        {"photo": "photos/b.jpg"}
      ],
      "file": "voice_messages/audio_1.ogg",
      "mime_type": "audio/ogg",
      "media_type": "voice_message",
      "text_entities": [{"type": "bold", "text": "loud"}]
    }
  ]
}"##;

#[test]
fn parses_service_and_content_messages() {
    let messages = parse_export(EXPORT).unwrap();
    assert_eq!(messages.len(), 3);

    let service = &messages[0];
    assert_eq!(service.kind, MessageKind::Service);
    assert_eq!(service.timestamp, 1_672_531_200);
    assert_eq!(service.action.as_deref(), Some("create_channel"));
    assert_eq!(service.sender.as_deref(), Some("My channel"));

    let content = &messages[1];
    assert_eq!(content.kind, MessageKind::Content);
    assert_eq!(
        content.photos,
        vec![PhotoRef {
            address: "photos/photo_1.jpg".to_string(),
            width: Some(1280),
            height: Some(720),
        }]
    );
    assert_eq!(
        content.text,
        vec![
            TextSpan::Plain("See ".to_string()),
            TextSpan::TextLink {
                text: "this".to_string(),
                href: "https://example.com".to_string(),
            },
            TextSpan::Other {
                kind: "hashtag".to_string(),
                text: "#news".to_string(),
            },
        ]
    );
}

#[test]
fn date_falls_back_to_local_timestamp_text() {
    let messages = parse_export(EXPORT).unwrap();
    assert_eq!(messages[1].timestamp, 1_672_653_600);
    assert_eq!(messages[2].timestamp, 1_672_700_000);
}

#[test]
fn photo_list_takes_precedence_and_file_is_typed() {
    let messages = parse_export(EXPORT).unwrap();
    let message = &messages[2];

    let addresses: Vec<&str> = message.photos.iter().map(|p| p.address.as_str()).collect();
    assert_eq!(addresses, vec!["photos/a.jpg", "photos/b.jpg"]);
    assert_eq!(message.photos[0].width, Some(10));
    assert_eq!(message.photos[1].height, None);
    assert_eq!(
        message.file,
        Some(FileRef {
            address: "voice_messages/audio_1.ogg".to_string(),
            mime_type: Some("audio/ogg".to_string()),
            media_kind: MediaKind::Audio,
        })
    );
}

#[test]
fn malformed_export_is_a_load_error() {
    assert!(matches!(parse_export("{\"chats\": []}"), Err(MigrateError::Load(_))));
    assert!(matches!(parse_export("not json"), Err(MigrateError::Load(_))));
}

#[test]
fn load_export_reads_from_disk() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("result.json");
    std::fs::write(&path, EXPORT).unwrap();

    assert_eq!(load_export(&path).unwrap().len(), 3);

    let err = load_export(&temp.path().join("missing.json")).unwrap_err();
    assert!(err.to_string().starts_with("failed to load export:"));
}
