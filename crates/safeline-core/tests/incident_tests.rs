//! Incident lifecycle tests against in-memory collaborators

use chrono::{Duration as ChronoDuration, Utc};
use pretty_assertions::assert_eq;
use safeline_core::error::{IncidentError, TokenError};
use safeline_core::{
    CreateOutcome, IncidentDraft, IncidentId, IncidentStore, ShareRequest, UserId,
};
use safeline_test_utils::{draft, draft_json, FailingGeocoder, Harness, RecordingSms, TEST_PLACE};
use std::sync::Arc;

fn user(id: &str) -> UserId {
    UserId::from(id)
}

#[tokio::test]
async fn delivered_incident_is_stored_with_success_flag() {
    let harness = Harness::new();

    let outcome = harness.service.create(&user("alice"), draft("alice")).await.unwrap();

    let CreateOutcome::Delivered { incident, provider_response } = outcome else {
        panic!("expected delivery, got {outcome:?}");
    };
    assert!(incident.send_success);
    assert_eq!(incident.location.name, TEST_PLACE);
    assert_eq!(incident.user, user("alice"));
    assert_eq!(provider_response["message-count"], "1");
    assert_eq!(harness.store.incident_count(), 1);

    let sent = harness.sms.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "+15550100");
    assert_eq!(sent[0].from, "+15550101");
    assert!(sent[0].body.contains("Alice Liddell"));
    assert!(sent[0].body.contains("query=51.5237,-0.1585"));
}

#[tokio::test]
async fn failed_delivery_still_stores_one_incident() {
    let harness = Harness::with(
        RecordingSms::failing(),
        Arc::new(safeline_test_utils::FixedGeocoder(TEST_PLACE.to_string())),
    );

    let outcome = harness.service.create(&user("alice"), draft("alice")).await.unwrap();

    let CreateOutcome::Undelivered { incident } = outcome else {
        panic!("expected undelivered, got {outcome:?}");
    };
    assert!(!incident.send_success);
    assert_eq!(harness.store.incident_count(), 1);
    assert_eq!(harness.sms.sent().len(), 1);
}

#[tokio::test]
async fn unregistered_owner_sends_and_stores_nothing() {
    let harness = Harness::new();

    let outcome = harness.service.create(&user("ghost"), draft("ghost")).await.unwrap();

    assert_eq!(outcome, CreateOutcome::NotRegistered);
    assert!(harness.sms.sent().is_empty());
    assert_eq!(harness.store.incident_count(), 0);
}

#[tokio::test]
async fn reporting_for_someone_else_is_unauthorized() {
    let harness = Harness::new();

    let err = harness.service.create(&user("bob"), draft("alice")).await.unwrap_err();

    assert!(matches!(err, IncidentError::Unauthorized(_)));
    assert!(harness.sms.sent().is_empty());
    assert_eq!(harness.store.incident_count(), 0);
}

#[tokio::test]
async fn schema_violations_are_rejected_before_anything_else() {
    let harness = Harness::new();

    let mut body = draft_json("alice");
    body["contact"]["phone"] = "".into();
    let err = harness
        .service
        .create(&user("bob"), IncidentDraft::from_json(body).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, IncidentError::Validation(m) if m == "contact.phone is required"));

    let mut body = draft_json("alice");
    body["location"]["latitude"] = 91.0.into();
    let err = harness
        .service
        .create(&user("alice"), IncidentDraft::from_json(body).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, IncidentError::Validation(_)));

    let mut body = draft_json("alice");
    body.as_object_mut().unwrap().remove("location");
    assert!(matches!(
        IncidentDraft::from_json(body),
        Err(IncidentError::Validation(_))
    ));

    assert!(harness.sms.sent().is_empty());
}

#[tokio::test]
async fn geocoding_failure_aborts_creation() {
    let harness = Harness::with(RecordingSms::succeeding(), Arc::new(FailingGeocoder));

    let err = harness.service.create(&user("alice"), draft("alice")).await.unwrap_err();

    assert!(matches!(err, IncidentError::Upstream(_)));
    assert!(harness.sms.sent().is_empty());
    assert_eq!(harness.store.incident_count(), 0);
}

#[tokio::test]
async fn listing_is_owner_only() {
    let harness = Harness::new();
    harness.seed_incident("alice").await;
    harness.seed_incident("alice").await;
    harness.seed_incident("bob").await;

    let listed = harness
        .service
        .list_incidents(&user("alice"), &user("alice"))
        .await
        .unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|i| i.user == user("alice")));

    let err = harness
        .service
        .list_incidents(&user("bob"), &user("alice"))
        .await
        .unwrap_err();
    assert!(matches!(err, IncidentError::Unauthorized(m) if m == "unauthorized access"));
}

#[tokio::test]
async fn reading_one_incident_checks_stored_owner() {
    let harness = Harness::new();
    let alices = harness.seed_incident("alice").await;

    let found = harness
        .service
        .get_incident(&user("alice"), &user("alice"), &alices.id)
        .await
        .unwrap();
    assert_eq!(found.id, alices.id);

    // Path claims bob, record belongs to alice
    let err = harness
        .service
        .get_incident(&user("bob"), &user("bob"), &alices.id)
        .await
        .unwrap_err();
    assert!(matches!(err, IncidentError::Unauthorized(_)));

    let err = harness
        .service
        .get_incident(&user("alice"), &user("alice"), &IncidentId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, IncidentError::NotFound(_)));
}

#[tokio::test]
async fn deleting_video_keeps_incident() {
    let harness = Harness::new();
    let incident = harness.seed_incident("alice").await;
    harness.attach_video(&incident, "clip.mp4", b"frames").await;

    let updated = harness
        .service
        .delete_video(&user("alice"), &incident.id)
        .await
        .unwrap();

    assert!(updated.video_file.is_none());
    assert!(!harness.video_dir.path().join("clip.mp4").exists());
    let stored = harness.store.find_incident(&incident.id).await.unwrap().unwrap();
    assert!(stored.video_file.is_none());

    // Nothing left to delete
    let again = harness
        .service
        .delete_video(&user("alice"), &incident.id)
        .await
        .unwrap();
    assert!(again.video_file.is_none());
}

#[tokio::test]
async fn deleting_video_tolerates_missing_file() {
    let harness = Harness::new();
    let incident = harness.seed_incident("alice").await;
    harness.attach_video(&incident, "clip.mp4", b"frames").await;
    std::fs::remove_file(harness.video_dir.path().join("clip.mp4")).unwrap();

    let updated = harness
        .service
        .delete_video(&user("alice"), &incident.id)
        .await
        .unwrap();
    assert!(updated.video_file.is_none());
}

#[tokio::test]
async fn deleting_someone_elses_video_is_forbidden() {
    let harness = Harness::new();
    let incident = harness.seed_incident("alice").await;
    harness.attach_video(&incident, "clip.mp4", b"frames").await;

    let err = harness
        .service
        .delete_video(&user("bob"), &incident.id)
        .await
        .unwrap_err();
    assert!(matches!(err, IncidentError::Forbidden(m) if m == "Unauthorized operation."));
    assert!(harness.video_dir.path().join("clip.mp4").exists());

    let err = harness
        .service
        .delete_video(&user("alice"), &IncidentId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, IncidentError::NotFound(_)));
}

#[tokio::test]
async fn sharing_requires_recipient_and_ownership() {
    let harness = Harness::new();
    let incident = harness.seed_incident("alice").await;

    let err = harness
        .service
        .create_share(&user("alice"), &incident.id, ShareRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, IncidentError::Validation(m) if m == "'shareTo' is required."));

    let to_carol = ShareRequest {
        share_to: Some(user("carol")),
    };
    let err = harness
        .service
        .create_share(&user("bob"), &incident.id, to_carol.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, IncidentError::Unauthorized(m) if m == "Unauthorized operation."));

    let share = harness
        .service
        .create_share(&user("alice"), &incident.id, to_carol)
        .await
        .unwrap();
    assert_eq!(share.user, user("alice"));
    assert_eq!(share.share_to, user("carol"));
    assert_eq!(share.incident, incident.id);
    assert_eq!(harness.store.share_count(), 1);
}

#[tokio::test]
async fn shares_listed_for_creator_and_recipient_only() {
    let harness = Harness::new();
    let incident = harness.seed_incident("alice").await;
    harness
        .service
        .create_share(
            &user("alice"),
            &incident.id,
            ShareRequest {
                share_to: Some(user("bob")),
            },
        )
        .await
        .unwrap();

    for who in ["alice", "bob"] {
        let shares = harness.service.list_shares(&user(who), &user(who)).await.unwrap();
        assert_eq!(shares.len(), 1, "{who}");
    }

    let err = harness
        .service
        .list_shares(&user("bob"), &user("alice"))
        .await
        .unwrap_err();
    assert!(matches!(err, IncidentError::Unauthorized(m) if m == "Unauthorized access."));
}

#[tokio::test]
async fn video_token_opens_owned_and_shared_recordings() {
    let harness = Harness::new();
    let incident = harness.seed_incident("alice").await;
    harness.attach_video(&incident, "clip.mp4", b"frames").await;

    let owner_token = harness.service.issue_video_token(&user("alice"));
    let payload = harness
        .service
        .open_video(Some(&owner_token.token), "clip.mp4")
        .await
        .unwrap();
    assert_eq!(payload.bytes, b"frames");
    assert_eq!(payload.content_type, "video/mp4");

    let bob_token = harness.service.issue_video_token(&user("bob"));
    let err = harness
        .service
        .open_video(Some(&bob_token.token), "clip.mp4")
        .await
        .unwrap_err();
    assert!(matches!(err, IncidentError::Forbidden(_)));

    harness
        .service
        .create_share(
            &user("alice"),
            &incident.id,
            ShareRequest {
                share_to: Some(user("bob")),
            },
        )
        .await
        .unwrap();
    let shared = harness
        .service
        .open_video(Some(&bob_token.token), "clip.mp4")
        .await
        .unwrap();
    assert_eq!(shared.bytes, b"frames");
}

#[tokio::test]
async fn video_rejects_bad_tokens_before_lookup() {
    let harness = Harness::new();

    let err = harness.service.open_video(None, "missing.mp4").await.unwrap_err();
    assert!(matches!(err, IncidentError::Token(TokenError::Invalid)));

    let err = harness
        .service
        .open_video(Some("not-a-token"), "missing.mp4")
        .await
        .unwrap_err();
    assert!(matches!(err, IncidentError::Token(TokenError::Invalid)));

    let stale = harness
        .service
        .tokens()
        .issue_at(&user("alice"), Utc::now() - ChronoDuration::hours(1));
    let err = harness
        .service
        .open_video(Some(&stale.token), "missing.mp4")
        .await
        .unwrap_err();
    assert!(matches!(err, IncidentError::Token(TokenError::Expired)));
}

#[tokio::test]
async fn video_lookup_failures() {
    let harness = Harness::new();
    let token = harness.service.issue_video_token(&user("alice"));

    let err = harness
        .service
        .open_video(Some(&token.token), "../etc/passwd")
        .await
        .unwrap_err();
    assert!(matches!(err, IncidentError::Validation(_)));

    let err = harness
        .service
        .open_video(Some(&token.token), "unknown.mp4")
        .await
        .unwrap_err();
    assert!(matches!(err, IncidentError::NotFound(_)));
}
