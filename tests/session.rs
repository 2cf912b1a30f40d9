use groundlink::{
    ClientConfig, DomainName, MappingKind, MemoryBackend, NoticeFilter, NoticeQueue, RawEdit,
    SaveOutcome, SaveScope, Session, Severity,
};
use serde_json::json;

fn backend(config: &ClientConfig) -> MemoryBackend {
    let backend = MemoryBackend::new();
    backend.set_document(
        &config.endpoints.controls,
        json!({
            "AvailableControllerButtons": ["TriggerL", "TriggerR"],
            "AvailableControllerAxes": ["X"],
            "AvailableControlActions": ["Throttle"],
            "AvailablePlaneAxes": ["Rudder"],
            "ControlActionsRestrictions": { "Throttle": [["TriggerR"]] },
            "ControlActionsSettings": { "Pilot": { "Throttle": "None" } },
            "PlaneAxesSettings": { "Pilot": { "Rudder": null } }
        }),
    );
    backend.set_document(
        &config.endpoints.radio,
        json!({ "Channel": 76, "PALevel": 2, "IsPlaneFeedbackEnabled": true }),
    );
    backend.set_document(
        &config.endpoints.trim,
        json!({ "AvailableSurfaces": ["Aileron"], "TrimValues": { "Aileron": 0 } }),
    );
    backend.set_document(
        &config.endpoints.max_surface_angles,
        json!({ "AvailableSurfaces": ["Aileron"], "MaxSurfaceAngles": { "Aileron": 25 } }),
    );
    backend.set_document(
        &config.endpoints.serial_port,
        json!({ "SerialPortParameters": null, "AvailablePorts": [] }),
    );
    backend
}

#[tokio::test]
async fn test_full_session_cycle() {
    let config = ClientConfig::default();
    let mut session = Session::new(&config, backend(&config));
    let queue = NoticeQueue::new();
    session
        .notices_mut()
        .add_listener(queue.clone(), NoticeFilter::All, None);

    let loaded = session.load(None).await;
    assert!(loaded.values().all(|ok| *ok), "{loaded:?}");
    assert!(queue.is_empty());
    assert!(!session.pending_changes_exist(None));

    // Rejected edit is published with the whitelist.
    let rejected = session.edit_control(
        "Pilot",
        "Throttle",
        MappingKind::Button,
        RawEdit::button("TriggerL"),
    );
    assert!(rejected.is_err());
    let notices = queue.drain();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].severity, Severity::Warning);
    assert_eq!(
        notices[0].allowed,
        Some(vec![vec!["TriggerR".to_string()], vec!["unbound".to_string()]])
    );

    session
        .edit_control("Pilot", "Throttle", MappingKind::Button, RawEdit::button("TriggerR"))
        .unwrap();
    session.trim_mut().stage("Aileron", 3).unwrap();
    assert!(session.pending_changes_exist(Some(&[DomainName::Controls])));
    assert!(session.pending_changes_exist(Some(&[DomainName::Trim])));
    assert!(!session.pending_changes_exist(Some(&[DomainName::Radio])));

    let saved = session.save(None).await;
    assert!(saved.values().all(|ok| *ok), "{saved:?}");
    assert!(!session.pending_changes_exist(None));

    let sources: Vec<String> = queue.drain().into_iter().map(|n| n.source).collect();
    assert_eq!(sources, ["controls", "trim"]);
}

#[tokio::test]
async fn test_save_controls_reports_failure() {
    let config = ClientConfig::default();
    let backend = backend(&config);
    backend.queue_post_reply(
        &config.endpoints.controls,
        Err(groundlink::BackendError::Timeout { ms: 5000 }),
    );
    let mut session = Session::new(&config, backend);
    let queue = NoticeQueue::new();
    session
        .notices_mut()
        .add_listener(queue.clone(), NoticeFilter::ErrorsOnly, None);
    session.load(Some(&[DomainName::Controls])).await;

    session
        .edit_control("Pilot", "Throttle", MappingKind::Button, RawEdit::button("TriggerR"))
        .unwrap();
    assert!(session.save_controls(&SaveScope::AllRoles).await.is_err());
    assert_eq!(queue.len(), 1);
    assert!(session.controls().has_pending_changes(&SaveScope::AllRoles));

    let outcome = session.save_controls(&SaveScope::AllRoles).await.unwrap();
    assert_eq!(outcome, SaveOutcome::Saved);
    session.discard_controls(&SaveScope::AllRoles).unwrap();
}
