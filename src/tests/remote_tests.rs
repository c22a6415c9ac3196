use super::*;

#[test]
fn error_message_prefers_backend_fields() {
    assert_eq!(
        error_message(StatusCode::BAD_REQUEST, r#"{"error": "name taken"}"#),
        "name taken"
    );
    assert_eq!(
        error_message(
            StatusCode::UNAUTHORIZED,
            r#"{"detail": "No active account found with the given credentials"}"#
        ),
        "No active account found with the given credentials"
    );
}

#[test]
fn error_message_falls_back_to_body_then_reason() {
    assert_eq!(
        error_message(StatusCode::BAD_GATEWAY, "upstream down\n"),
        "upstream down"
    );
    assert_eq!(
        error_message(StatusCode::SERVICE_UNAVAILABLE, ""),
        "Service Unavailable"
    );
}

#[test]
fn auth_endpoints_are_exempt_from_refresh() {
    assert!(ApiRequest::post(LOGIN_PATH).is_auth_endpoint());
    assert!(ApiRequest::post(REFRESH_PATH).is_auth_endpoint());
    assert!(!ApiRequest::get(ME_PATH).is_auth_endpoint());
    assert!(!ApiRequest::get(WORKSPACES_PATH).is_auth_endpoint());
}

#[test]
fn logs_payload_accepts_both_shapes() {
    let bare: LogsPayload = serde_json::from_str(r#"["a", "b"]"#).unwrap();
    assert_eq!(bare.into_lines(), vec!["a".to_string(), "b".to_string()]);

    let wrapped: LogsPayload = serde_json::from_str(r#"{"logs": ["c"]}"#).unwrap();
    assert_eq!(wrapped.into_lines(), vec!["c".to_string()]);

    let empty: LogsPayload = serde_json::from_str("{}").unwrap();
    assert!(empty.into_lines().is_empty());
}

#[test]
fn logs_payload_splits_container_output() {
    let text: LogsPayload = serde_json::from_str(
        r#"{"logs": "[2024-01-01T00:00:00Z] INFO Booting\r\n  at frame\n\n[2024-01-01T00:00:01Z] done\n"}"#,
    )
    .unwrap();
    assert_eq!(
        text.into_lines(),
        vec![
            "[2024-01-01T00:00:00Z] INFO Booting".to_string(),
            "  at frame".to_string(),
            String::new(),
            "[2024-01-01T00:00:01Z] done".to_string(),
        ]
    );
}

#[test]
fn request_body_is_kept_for_replay() {
    let req = ApiRequest::post(WORKSPACES_PATH)
        .json(&serde_json::json!({"name": "demo"}))
        .unwrap();
    let replay = req.clone();
    assert_eq!(replay.method(), &Method::POST);
    assert_eq!(replay.path(), WORKSPACES_PATH);
    assert_eq!(replay.body, req.body);
}
