//! Meeting lifecycle through the service layer: create, patch, replace
//! sections, list, soft delete, and responsibility tracking.

mod common;

use common::*;
use shepherd::errors::AppError;
use shepherd::models::meeting::queries::MeetingListFilter;
use shepherd::models::meeting::types::{MeetingDraft, MeetingPatch, ServantDraft};
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

fn responsible(user_id: &str, responsibility: &str) -> ServantDraft {
    ServantDraft {
        user_id: Some(user_id.to_string()),
        responsibility: responsibility.to_string(),
        ..Default::default()
    }
}

#[test]
fn create_merges_duplicate_group_names_case_insensitively() {
    let (_dir, conn) = setup_test_db();
    let (a, b) = (uid(), uid());

    let mut d = draft(&uid(), "Youth meeting");
    d.groups = vec!["Choir".to_string(), "choir ".to_string()];
    d.group_assignments = vec![assignment("Choir", &[&a]), assignment(" CHOIR", &[&b, &a])];

    let view = meetings::create_meeting(&conn, &d, None, &caps("")).unwrap();

    // First-seen casing wins; rosters are unioned without duplicates.
    assert_eq!(view.groups, ["Choir"]);
    assert_eq!(view.group_assignments.len(), 1);
    assert_eq!(view.group_assignments[0].group, "Choir");
    assert_eq!(view.group_assignments[0].served_users.len(), 2);
}

#[test]
fn create_requires_the_update_capability_for_external_actors() {
    let (_dir, conn) = setup_test_db();
    let actor = uid();
    let err = meetings::create_meeting(
        &conn,
        &draft(&uid(), "Youth meeting"),
        Some(&actor),
        &caps("meetings.view"),
    )
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[test]
fn create_with_servants_requires_the_servants_capability() {
    let (_dir, conn) = setup_test_db();
    let servant_user = add_user(&conn, "Bishoy Nader");
    let actor = uid();

    let mut d = draft(&uid(), "Youth meeting");
    d.servants = vec![servant(&servant_user, &["Choir"], vec![])];

    let err = meetings::create_meeting(&conn, &d, Some(&actor), &caps("meetings.update"))
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    // With both capabilities the same draft goes through.
    let view = meetings::create_meeting(
        &conn,
        &d,
        Some(&actor),
        &caps("meetings.update,meetings.servants.manage"),
    )
    .unwrap();
    assert_eq!(view.servants.len(), 1);
}

#[test]
fn create_rejects_malformed_sector_id() {
    let (_dir, conn) = setup_test_db();
    let err =
        meetings::create_meeting(&conn, &draft("sector-1", "Youth meeting"), None, &caps(""))
            .unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));
}

#[test]
fn create_rejects_unknown_linked_servant() {
    let (_dir, conn) = setup_test_db();
    let mut d = draft(&uid(), "Youth meeting");
    d.servants = vec![responsible(&uid(), "Treasurer")];

    let err = meetings::create_meeting(&conn, &d, None, &caps("")).unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));
}

#[test]
fn list_filters_by_sector_and_drops_invisible_meetings() {
    let (_dir, conn) = setup_test_db();
    let sector_a = uid();
    let sector_b = uid();

    for name in ["Alpha", "Beta", "Gamma"] {
        meetings::create_meeting(&conn, &draft(&sector_a, name), None, &caps("")).unwrap();
    }
    meetings::create_meeting(&conn, &draft(&sector_b, "Delta"), None, &caps("")).unwrap();

    let filter = MeetingListFilter {
        sector_id: Some(sector_a.clone()),
        ..Default::default()
    };

    let all = meetings::list_meetings(&conn, &filter, None, &caps("")).unwrap();
    assert_eq!(all.len(), 3);

    // An actor with no relationship to any of them sees an empty page.
    let outsider = uid();
    let none = meetings::list_meetings(
        &conn,
        &filter,
        Some(&outsider),
        &caps("meetings.own.view"),
    )
    .unwrap();
    assert!(none.is_empty());
}

#[test]
fn list_returns_only_meetings_the_member_belongs_to() {
    let (_dir, conn) = setup_test_db();
    let sector = uid();
    let me = add_user(&conn, "Youssef Adel");

    for i in 0..10 {
        let mut d = draft(&sector, &format!("Meeting {i}"));
        if i < 3 {
            d.served_user_ids = vec![me.clone()];
        }
        meetings::create_meeting(&conn, &d, None, &caps("")).unwrap();
    }

    let filter = MeetingListFilter {
        sector_id: Some(sector),
        limit: Some(50),
        ..Default::default()
    };
    let visible = meetings::list_meetings(
        &conn,
        &filter,
        Some(&me),
        &caps("meetings.members.view"),
    )
    .unwrap();

    assert_eq!(visible.len(), 3);
    for view in &visible {
        assert_eq!(
            view.viewer_context.access_level,
            shepherd::access::resolver::AccessLevel::Member
        );
    }
}

#[test]
fn list_search_matches_name_case_insensitively() {
    let (_dir, conn) = setup_test_db();
    let sector = uid();
    meetings::create_meeting(&conn, &draft(&sector, "Sunday School"), None, &caps("")).unwrap();
    meetings::create_meeting(&conn, &draft(&sector, "Servants prep"), None, &caps("")).unwrap();

    let filter = MeetingListFilter {
        search: Some("SUNDAY".to_string()),
        ..Default::default()
    };
    let found = meetings::list_meetings(&conn, &filter, None, &caps("")).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "Sunday School");
}

#[test]
fn basic_update_patches_scalars_and_rosters() {
    let (_dir, conn) = setup_test_db();
    let member = uid();
    let created =
        meetings::create_meeting(&conn, &draft(&uid(), "Old name"), None, &caps("")).unwrap();

    let patch = MeetingPatch {
        name: Some("New name".to_string()),
        group_assignments: Some(vec![assignment("Choir", &[&member])]),
        ..Default::default()
    };
    let view =
        meetings::update_meeting_basic(&conn, &created.id, &patch, None, &caps("")).unwrap();

    assert_eq!(view.name, "New name");
    assert_eq!(view.groups, ["Choir"]);
    // The derived meeting roster picks up the new assignment member.
    assert!(view.served_users.iter().any(|u| u.id == member));
}

#[test]
fn basic_update_requires_the_update_capability() {
    let (_dir, conn) = setup_test_db();
    let created =
        meetings::create_meeting(&conn, &draft(&uid(), "Youth meeting"), None, &caps("")).unwrap();

    let actor = uid();
    let patch = MeetingPatch {
        name: Some("Renamed".to_string()),
        ..Default::default()
    };
    let err = meetings::update_meeting_basic(
        &conn,
        &created.id,
        &patch,
        Some(&actor),
        &caps("meetings.servants.manage"),
    )
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[test]
fn servant_update_replaces_the_list_wholesale() {
    let (_dir, conn) = setup_test_db();
    let first = add_user(&conn, "Bishoy Nader");
    let second = add_user(&conn, "Marina Samir");

    let mut d = draft(&uid(), "Youth meeting");
    d.servants = vec![servant(&first, &["Choir"], vec![])];
    let created = meetings::create_meeting(&conn, &d, None, &caps("")).unwrap();
    assert_eq!(created.servants.len(), 1);

    let view = meetings::update_meeting_servants(
        &conn,
        &created.id,
        &[servant(&second, &["Scouts"], vec![])],
        None,
        &caps(""),
    )
    .unwrap();

    assert_eq!(view.servants.len(), 1);
    assert_eq!(view.servants[0].name, "Marina Samir");
    assert_eq!(view.servants[0].groups_managed, ["Scouts"]);
}

#[test]
fn responsibility_labels_feed_suggestions_by_usage() {
    let (_dir, conn) = setup_test_db();
    let (a, b) = (add_user(&conn, "Bishoy Nader"), add_user(&conn, "Marina Samir"));

    let mut d1 = draft(&uid(), "First");
    d1.servants = vec![responsible(&a, "Treasurer"), responsible(&b, "Usher")];
    meetings::create_meeting(&conn, &d1, None, &caps("")).unwrap();

    let mut d2 = draft(&uid(), "Second");
    d2.servants = vec![responsible(&a, "treasurer")];
    meetings::create_meeting(&conn, &d2, None, &caps("")).unwrap();

    let suggestions =
        meetings::list_responsibility_suggestions(&conn, None, 10).unwrap();
    assert_eq!(suggestions.len(), 2);
    assert_eq!(suggestions[0].label.to_lowercase(), "treasurer");
    assert_eq!(suggestions[0].usage_count, 2);
    assert_eq!(suggestions[1].usage_count, 1);

    let filtered =
        meetings::list_responsibility_suggestions(&conn, Some("ush"), 10).unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].label, "Usher");
}

#[test]
fn servant_history_collects_meetings_newest_first() {
    let (_dir, conn) = setup_test_db();
    let servant_user = add_user(&conn, "Bishoy Nader");

    let mut d1 = draft(&uid(), "First meeting");
    d1.servants = vec![responsible(&servant_user, "Treasurer")];
    meetings::create_meeting(&conn, &d1, None, &caps("")).unwrap();

    std::thread::sleep(std::time::Duration::from_millis(5));
    let mut d2 = draft(&uid(), "Second meeting");
    d2.servants = vec![responsible(&servant_user, "treasurer")];
    meetings::create_meeting(&conn, &d2, None, &caps("")).unwrap();

    // Unrelated meeting stays out of the history.
    meetings::create_meeting(&conn, &draft(&uid(), "Third meeting"), None, &caps("")).unwrap();

    let result = meetings::get_servant_history(
        &conn,
        Some(&servant_user),
        None,
        None,
        None,
        &caps(""),
    )
    .unwrap();

    assert_eq!(result.history.len(), 2);
    assert_eq!(result.history[0].meeting_name, "Second meeting");
    assert_eq!(result.history[1].meeting_name, "First meeting");
    assert_eq!(result.history[0].servant_entries.len(), 1);
    assert_eq!(result.history[0].servant_entries[0].name, "Bishoy Nader");
    // The two casings collapse into one responsibility label.
    assert_eq!(result.responsibilities.len(), 1);
    assert_eq!(result.responsibilities[0].to_lowercase(), "treasurer");
}

#[test]
fn servant_history_matches_freeform_names_case_insensitively() {
    let (_dir, conn) = setup_test_db();

    let mut d = draft(&uid(), "Youth meeting");
    d.servants = vec![ServantDraft {
        name: Some("Mina Gerges".to_string()),
        responsibility: "Usher".to_string(),
        ..Default::default()
    }];
    meetings::create_meeting(&conn, &d, None, &caps("")).unwrap();

    let result = meetings::get_servant_history(
        &conn,
        None,
        Some("  MINA GERGES "),
        None,
        None,
        &caps(""),
    )
    .unwrap();

    assert_eq!(result.history.len(), 1);
    assert_eq!(result.history[0].servant_entries[0].responsibility, "Usher");
}

#[test]
fn servant_history_requires_a_criterion() {
    let (_dir, conn) = setup_test_db();
    let err =
        meetings::get_servant_history(&conn, None, Some("   "), None, None, &caps("")).unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));
}

#[test]
fn servant_history_requires_a_manage_capability() {
    let (_dir, conn) = setup_test_db();
    let actor = uid();
    let err = meetings::get_servant_history(
        &conn,
        Some(&uid()),
        None,
        None,
        Some(&actor),
        &caps("meetings.own.view"),
    )
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[test]
fn soft_deleted_meetings_disappear_from_reads_and_lists() {
    let (_dir, conn) = setup_test_db();
    let sector = uid();
    let created =
        meetings::create_meeting(&conn, &draft(&sector, "Youth meeting"), None, &caps("")).unwrap();

    meetings::delete_meeting(&conn, &created.id, None, &caps("")).unwrap();

    let err = meetings::get_meeting_by_id(&conn, &created.id, None, &caps("")).unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let filter = MeetingListFilter {
        sector_id: Some(sector),
        ..Default::default()
    };
    let listed = meetings::list_meetings(&conn, &filter, None, &caps("")).unwrap();
    assert!(listed.is_empty());
}

#[test]
fn delete_requires_full_access() {
    let (_dir, conn) = setup_test_db();
    let servant_user = add_user(&conn, "Bishoy Nader");

    let mut d = draft(&uid(), "Youth meeting");
    d.servants = vec![servant(&servant_user, &["Choir"], vec![])];
    let created = meetings::create_meeting(&conn, &d, None, &caps("")).unwrap();

    let err = meetings::delete_meeting(
        &conn,
        &created.id,
        Some(&servant_user),
        &caps("meetings.own.view"),
    )
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}
