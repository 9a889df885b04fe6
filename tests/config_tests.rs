//! Integration tests for client configuration.

use std::time::Duration;

use harbor_rest::{BaseUrl, ClientConfig, ConfigError, ContentConfig, RestClient, Transport};

#[test]
fn test_base_url_normalization() {
    let cases = [
        ("https://harbor.example.com", "https://harbor.example.com/"),
        ("https://harbor.example.com/", "https://harbor.example.com/"),
        ("https://harbor.example.com/registry//", "https://harbor.example.com/registry/"),
        ("http://10.0.0.5:8080/api?debug=1#top", "http://10.0.0.5:8080/api/"),
    ];

    for (input, expected) in cases {
        let base = BaseUrl::parse(input).unwrap();
        assert_eq!(base.as_str(), expected, "input {input}");
        assert!(base.as_url().query().is_none());
        assert!(base.as_url().fragment().is_none());
    }
}

#[test]
fn test_base_url_must_be_absolute_http() {
    assert!(matches!(
        BaseUrl::parse("harbor.example.com"),
        Err(ConfigError::InvalidBaseUrl { .. })
    ));
    assert!(matches!(
        BaseUrl::parse("ftp://harbor.example.com"),
        Err(ConfigError::InvalidBaseUrl { .. })
    ));
}

#[test]
fn test_non_json_content_type_is_rejected() {
    let result = ClientConfig::builder()
        .base_url("https://harbor.example.com")
        .content_config(ContentConfig::new().with_content_type("application/xml"))
        .build();

    assert!(matches!(
        result,
        Err(ConfigError::UnsupportedContentType { content_type }) if content_type == "application/xml"
    ));
}

#[test]
fn test_vendor_json_content_type_is_accepted() {
    let config = ClientConfig::builder()
        .base_url("https://harbor.example.com")
        .content_config(ContentConfig::new().with_content_type("application/vnd.oci.image.index.v1+json"))
        .build()
        .unwrap();

    let client = RestClient::new(config).unwrap();
    assert_eq!(
        client.content_config().accept_content_types(),
        "application/vnd.oci.image.index.v1+json"
    );
}

#[test]
fn test_client_construction_performs_no_io() {
    // Nothing listens on this address; construction must still succeed.
    let config = ClientConfig::builder()
        .base_url("http://127.0.0.1:1/")
        .api_path("api/v2.0")
        .transport(Transport::custom(reqwest::Client::new()).with_timeout(Duration::from_secs(3)))
        .build()
        .unwrap();

    let client = RestClient::new(config).unwrap();
    assert_eq!(client.api_path(), "api/v2.0");
    assert_eq!(client.timeout(), Some(Duration::from_secs(3)));
    assert_eq!(
        client.get().path("health").url().as_str(),
        "http://127.0.0.1:1/api/v2.0/health"
    );
}

#[test]
fn test_config_error_messages_are_actionable() {
    let error = ClientConfig::builder().build().unwrap_err();
    assert!(error.to_string().contains("base_url"));
}
