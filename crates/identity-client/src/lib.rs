//! Identity backend REST client.
//!
//! Covers the outbound calls made while provisioning a self-registered
//! identity: password hashing, UIN issuance, identity activation, status
//! lookup and SMS delivery.

mod client;
mod error;
mod types;

pub use client::{Endpoints, IdentityClient};
pub use error::IdentityError;
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_client(mock_server: &MockServer) -> IdentityClient {
        IdentityClient::new(mock_server.uri(), Duration::from_secs(5)).unwrap()
    }

    fn sample_identity() -> AddIdentityRequest {
        AddIdentityRequest {
            registration_id: "app-123".into(),
            identity: Identity {
                full_name: vec![LanguageTaggedValue {
                    language: "eng".into(),
                    value: "Jane Doe".into(),
                }],
                phone: "+14155551234".into(),
                preferred_lang: Some("eng".into()),
                id_schema_version: 0.1,
                registration_type: "L1".into(),
                uin: "1234567890".into(),
                password: Password {
                    hash: "hash".into(),
                    salt: "salt".into(),
                },
                selected_handles: vec!["phone".into()],
            },
        }
    }

    #[test]
    fn test_request_envelope_serialization() {
        let time = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let request = RestRequest::at(
            SmsRequest {
                number: "+14155551234".into(),
                message: "hi".into(),
            },
            time,
        );

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["requesttime"], "2024-01-02T03:04:05.000Z");
        assert_eq!(json["request"]["number"], "+14155551234");
        assert!(json.get("id").is_none());

        let json = serde_json::to_value(request.with_id("mosip.id.create", "v1")).unwrap();
        assert_eq!(json["id"], "mosip.id.create");
        assert_eq!(json["version"], "v1");
    }

    #[test]
    fn test_identity_serialization() {
        let json = serde_json::to_value(sample_identity()).unwrap();

        assert_eq!(json["registrationId"], "app-123");
        assert_eq!(json["identity"]["UIN"], "1234567890");
        assert_eq!(json["identity"]["registrationType"], "L1");
        assert_eq!(json["identity"]["selectedHandles"][0], "phone");
        assert_eq!(json["identity"]["fullName"][0]["language"], "eng");
        assert_eq!(json["identity"]["password"]["salt"], "salt");
    }

    #[test]
    fn test_response_envelope_with_null_errors() {
        let json = r#"{"response": {"UIN": "42"}, "errors": null}"#;
        let envelope: RestResponse<UinResponse> = serde_json::from_str(json).unwrap();

        assert_eq!(envelope.response.as_ref().unwrap().uin.as_deref(), Some("42"));
        assert!(envelope.errors.is_empty());
        assert!(envelope.first_error_code().is_none());
    }

    #[test]
    fn test_response_envelope_first_error_code() {
        let json = r#"{"response": null, "errors": [{"errorCode": "IDR-001", "message": "bad"}, {"errorCode": "IDR-002"}]}"#;
        let envelope: RestResponse<UinResponse> = serde_json::from_str(json).unwrap();

        assert!(envelope.response.is_none());
        assert_eq!(envelope.first_error_code(), Some("IDR-001"));
    }

    #[test]
    fn test_password_plaintext_debug_is_redacted() {
        let plaintext = PasswordPlaintext {
            input_data: "hunter2".into(),
        };
        assert!(!format!("{:?}", plaintext).contains("hunter2"));
    }

    #[tokio::test]
    async fn test_generate_hash() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/keymanager/generate-hash"))
            .and(body_partial_json(serde_json::json!({
                "request": {"inputData": "s3cret"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": {"hashValue": "abc", "salt": "xyz"},
                "errors": []
            })))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let request = RestRequest::new(PasswordPlaintext {
            input_data: "s3cret".into(),
        });
        let envelope = client.generate_hash(&request).await.unwrap();

        let hash = envelope.response.unwrap();
        assert_eq!(hash.hash_value.as_deref(), Some("abc"));
        assert_eq!(hash.salt.as_deref(), Some("xyz"));
    }

    #[tokio::test]
    async fn test_get_uin() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/idgenerator/uin"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": {"UIN": "9876543210"}
            })))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let envelope = client.get_uin().await.unwrap();

        assert_eq!(envelope.response.unwrap().uin.as_deref(), Some("9876543210"));
    }

    #[tokio::test]
    async fn test_add_identity() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/idrepository/v1/identity"))
            .and(body_partial_json(serde_json::json!({
                "request": {"registrationId": "app-123"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": {"status": "ACTIVATED"}
            })))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let envelope = client
            .add_identity(&RestRequest::new(sample_identity()))
            .await
            .unwrap();

        assert_eq!(envelope.response.unwrap().status.as_deref(), Some("ACTIVATED"));
    }

    #[tokio::test]
    async fn test_get_registration_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/idrepository/v1/identity/status/app-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": {"statusCode": "STORED"}
            })))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let envelope = client.get_registration_status("app-123").await.unwrap();

        assert_eq!(
            envelope.response.unwrap().status_code.as_deref(),
            Some("STORED")
        );
    }

    #[tokio::test]
    async fn test_send_sms() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/notifier/sms/send"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": {"status": "success"}
            })))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let request = RestRequest::new(SmsRequest {
            number: "+14155551234".into(),
            message: "Your code is 123456".into(),
        });
        let envelope = client.send_sms(&request).await.unwrap();

        assert_eq!(envelope.response.unwrap().status.as_deref(), Some("success"));
    }

    #[tokio::test]
    async fn test_error_envelope_on_failure_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/idgenerator/uin"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "response": null,
                "errors": [{"errorCode": "IDG-500", "message": "pool exhausted"}]
            })))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let envelope = client.get_uin().await.unwrap();

        assert_eq!(envelope.first_error_code(), Some("IDG-500"));
    }

    #[tokio::test]
    async fn test_non_envelope_failure_is_api_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/idgenerator/uin"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let result = client.get_uin().await;

        match result {
            Err(IdentityError::Api { status, message }) => {
                assert_eq!(status, 503);
                assert_eq!(message, "unavailable");
            }
            other => panic!("Expected API error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_unparseable_success_body_is_json_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/idgenerator/uin"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let result = client.get_uin().await;

        assert!(matches!(result, Err(IdentityError::Json(_))));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = IdentityClient::new("http://localhost:8088/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8088");
    }
}
