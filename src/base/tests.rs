use crate::base::consenterror::ConsentError;

#[test]
fn test_configuration_classification() {
    assert!(ConsentError::unknown_handler("videoEmbed").is_configuration());
    assert!(ConsentError::UnknownItemKind {
        tag: "object".into()
    }
    .is_configuration());
    assert!(!ConsentError::StorageLocked.is_configuration());
    assert!(!ConsentError::beacon_failed("timeout").is_configuration());
}

#[test]
fn test_network_classification() {
    assert!(ConsentError::beacon_failed("reset").is_network());
    assert!(ConsentError::NoRuntime.is_network());
    assert!(!ConsentError::unknown_handler("x").is_network());
}

#[test]
fn test_display_messages() {
    let err = ConsentError::UnknownAlternative {
        category: "stats".into(),
        name: "beacon".into(),
    };
    assert_eq!(
        err.to_string(),
        "Unknown alternative handler 'beacon' bound to category 'stats'"
    );
}

#[test]
fn test_url_parse_conversion() {
    let err: ConsentError = url::Url::parse("not a url").unwrap_err().into();
    assert!(matches!(err, ConsentError::InvalidUrl(_)));
}

#[test]
fn test_rejected_items_message() {
    let err = ConsentError::RejectedItems {
        registered: 3,
        rejected: vec![ConsentError::unknown_handler("leaflet")],
    };
    assert!(err.is_configuration());
    assert_eq!(err.to_string(), "3 deferred items registered, 1 rejected");
}
