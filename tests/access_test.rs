//! Access resolution through the service surface: who gets which level,
//! and who is turned away.

mod common;

use common::*;
use shepherd::access::resolver::AccessLevel;
use shepherd::errors::AppError;
use shepherd::models::meeting::types::{MeetingDraft, PersonDraft};
use shepherd::service::meetings;

fn draft(sector_id: &str, name: &str) -> MeetingDraft {
    MeetingDraft {
        sector_id: sector_id.to_string(),
        name: name.to_string(),
        day: "Friday".to_string(),
        time: "18:00".to_string(),
        ..Default::default()
    }
}

fn linked(user_id: &str) -> PersonDraft {
    PersonDraft {
        user_id: Some(user_id.to_string()),
        name: None,
    }
}

#[test]
fn trusted_internal_caller_gets_full_access() {
    let (_dir, conn) = setup_test_db();
    let created =
        meetings::create_meeting(&conn, &draft(&uid(), "Youth meeting"), None, &caps("")).unwrap();

    let view = meetings::get_meeting_by_id(&conn, &created.id, None, &caps("")).unwrap();
    assert_eq!(view.viewer_context.access_level, AccessLevel::Full);
    assert!(view.viewer_context.can_view_all_details);
}

#[test]
fn manage_capability_grants_full_access_without_relationship() {
    let (_dir, conn) = setup_test_db();
    let created =
        meetings::create_meeting(&conn, &draft(&uid(), "Youth meeting"), None, &caps("")).unwrap();

    let outsider = uid();
    let view = meetings::get_meeting_by_id(
        &conn,
        &created.id,
        Some(&outsider),
        &caps("meetings.view"),
    )
    .unwrap();
    assert_eq!(view.viewer_context.access_level, AccessLevel::Full);
}

#[test]
fn no_capabilities_and_no_relationship_is_forbidden() {
    let (_dir, conn) = setup_test_db();
    let created =
        meetings::create_meeting(&conn, &draft(&uid(), "Youth meeting"), None, &caps("")).unwrap();

    let outsider = uid();
    let err =
        meetings::get_meeting_by_id(&conn, &created.id, Some(&outsider), &caps("")).unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[test]
fn weak_capability_without_relationship_is_forbidden() {
    let (_dir, conn) = setup_test_db();
    let created =
        meetings::create_meeting(&conn, &draft(&uid(), "Youth meeting"), None, &caps("")).unwrap();

    let outsider = uid();
    let err = meetings::get_meeting_by_id(
        &conn,
        &created.id,
        Some(&outsider),
        &caps("meetings.own.view"),
    )
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[test]
fn service_secretary_resolves_to_full_despite_weak_capability() {
    let (_dir, conn) = setup_test_db();
    let secretary = add_user(&conn, "Mariam Habib");

    let mut d = draft(&uid(), "Sunday school");
    d.service_secretary = Some(linked(&secretary));
    let created = meetings::create_meeting(&conn, &d, None, &caps("")).unwrap();

    let view = meetings::get_meeting_by_id(
        &conn,
        &created.id,
        Some(&secretary),
        &caps("meetings.own.view"),
    )
    .unwrap();
    assert_eq!(view.viewer_context.access_level, AccessLevel::Full);
    assert!(view.viewer_context.can_view_committees);
}

#[test]
fn assistant_secretary_also_resolves_to_full() {
    let (_dir, conn) = setup_test_db();
    let assistant = add_user(&conn, "Karim Fahmy");

    let mut d = draft(&uid(), "Sunday school");
    d.assistant_secretaries = vec![linked(&assistant)];
    let created = meetings::create_meeting(&conn, &d, None, &caps("")).unwrap();

    let view = meetings::get_meeting_by_id(
        &conn,
        &created.id,
        Some(&assistant),
        &caps("meetings.members.view"),
    )
    .unwrap();
    assert_eq!(view.viewer_context.access_level, AccessLevel::Full);
}

#[test]
fn leadership_without_any_weak_capability_is_denied() {
    let (_dir, conn) = setup_test_db();
    let secretary = add_user(&conn, "Mariam Habib");

    let mut d = draft(&uid(), "Sunday school");
    d.service_secretary = Some(linked(&secretary));
    let created = meetings::create_meeting(&conn, &d, None, &caps("")).unwrap();

    let err =
        meetings::get_meeting_by_id(&conn, &created.id, Some(&secretary), &caps("")).unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[test]
fn named_servant_resolves_to_servant_level() {
    let (_dir, conn) = setup_test_db();
    let servant_user = add_user(&conn, "Bishoy Nader");
    let member = uid();

    let mut d = draft(&uid(), "Preparatory meeting");
    d.servants = vec![servant(&servant_user, &["Scouts"], vec![assignment("Scouts", &[&member])])];
    let created = meetings::create_meeting(&conn, &d, None, &caps("")).unwrap();

    let view = meetings::get_meeting_by_id(
        &conn,
        &created.id,
        Some(&servant_user),
        &caps("meetings.own.view"),
    )
    .unwrap();
    assert_eq!(view.viewer_context.access_level, AccessLevel::Servant);
    assert!(!view.viewer_context.can_view_all_details);
}

#[test]
fn served_member_resolves_to_member_level() {
    let (_dir, conn) = setup_test_db();
    let member = add_user(&conn, "Youssef Adel");

    let mut d = draft(&uid(), "Preparatory meeting");
    d.served_user_ids = vec![member.clone()];
    let created = meetings::create_meeting(&conn, &d, None, &caps("")).unwrap();

    let view = meetings::get_meeting_by_id(
        &conn,
        &created.id,
        Some(&member),
        &caps("meetings.members.view"),
    )
    .unwrap();
    assert_eq!(view.viewer_context.access_level, AccessLevel::Member);
}

#[test]
fn member_inside_servant_assignment_closure_is_recognized() {
    let (_dir, conn) = setup_test_db();
    let servant_user = add_user(&conn, "Bishoy Nader");
    let member = add_user(&conn, "Youssef Adel");

    // The member appears only inside a servant's group assignment, not in
    // any meeting-level roster.
    let mut d = draft(&uid(), "Preparatory meeting");
    d.servants = vec![servant(&servant_user, &[], vec![assignment("Choir", &[&member])])];
    let created = meetings::create_meeting(&conn, &d, None, &caps("")).unwrap();

    let view = meetings::get_meeting_by_id(
        &conn,
        &created.id,
        Some(&member),
        &caps("meetings.own.view"),
    )
    .unwrap();
    assert_eq!(view.viewer_context.access_level, AccessLevel::Member);
}

#[test]
fn malformed_meeting_id_is_a_validation_error() {
    let (_dir, conn) = setup_test_db();
    let err = meetings::get_meeting_by_id(&conn, "not-a-uuid", None, &caps("")).unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));
}

#[test]
fn unknown_meeting_is_not_found() {
    let (_dir, conn) = setup_test_db();
    let err = meetings::get_meeting_by_id(&conn, &uid(), None, &caps("")).unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
