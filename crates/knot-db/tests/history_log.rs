use chrono::{Days, Utc};
use knot_db::{ContactInput, DbError, HistoryFilter, KnotDb, actions};

async fn db() -> KnotDb {
    KnotDb::in_memory().await.expect("in-memory database")
}

fn input(first: &str, last: &str, email: &str, phone: &str) -> ContactInput {
    ContactInput {
        first_name: first.to_string(),
        last_name: last.to_string(),
        email: email.to_string(),
        phone: phone.to_string(),
    }
}

/// Two contacts; Doe has been updated once by "alice".
async fn seeded() -> (KnotDb, i64, i64) {
    let db = db().await;
    let doe = db
        .create_contact(&input("John", "Doe", "john@example.com", "555-0100"), None)
        .await
        .expect("create doe");
    let smith = db
        .create_contact(&input("Jane", "Smith", "jane@smith.com", "555-0200"), None)
        .await
        .expect("create smith");
    db.update_contact(
        doe.id,
        &input("John", "Doe", "john@example.com", "555-0300"),
        Some("alice"),
    )
    .await
    .expect("update doe");
    (db, doe.id, smith.id)
}

#[tokio::test]
async fn list_returns_entries_with_their_contact_newest_first() {
    let (db, doe_id, _) = seeded().await;

    let page = db
        .list_history(&HistoryFilter::default(), 1, 15)
        .await
        .expect("list");

    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 3);
    // The update came last.
    assert_eq!(page.items[0].entry.action, actions::UPDATED);
    assert_eq!(page.items[0].entry.contact_id, doe_id);
    assert_eq!(page.items[0].contact.email, "john@example.com");
}

#[tokio::test]
async fn filter_by_action() {
    let (db, _, _) = seeded().await;

    let filter = HistoryFilter {
        action: Some(actions::UPDATED.to_string()),
        ..Default::default()
    };
    let page = db.list_history(&filter, 1, 15).await.expect("list");

    assert_eq!(page.total, 1);
    assert!(page.items.iter().all(|h| h.entry.action == actions::UPDATED));
}

#[tokio::test]
async fn filter_by_contact_and_user() {
    let (db, doe_id, smith_id) = seeded().await;

    let filter = HistoryFilter {
        contact_id: Some(smith_id),
        ..Default::default()
    };
    let page = db.list_history(&filter, 1, 15).await.expect("by contact");
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].entry.action, actions::CREATED);

    let filter = HistoryFilter {
        user_id: Some("alice".to_string()),
        ..Default::default()
    };
    let page = db.list_history(&filter, 1, 15).await.expect("by user");
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].entry.contact_id, doe_id);
}

#[tokio::test]
async fn free_text_search_spans_contact_fields_and_action() {
    let (db, doe_id, _) = seeded().await;

    // Matches the contact's last name.
    let filter = HistoryFilter {
        search: Some("doe".to_string()),
        ..Default::default()
    };
    let page = db.list_history(&filter, 1, 15).await.expect("by name");
    assert_eq!(page.total, 2);
    assert!(page.items.iter().all(|h| h.entry.contact_id == doe_id));

    // Matches the action column.
    let filter = HistoryFilter {
        search: Some("updat".to_string()),
        ..Default::default()
    };
    let page = db.list_history(&filter, 1, 15).await.expect("by action");
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].entry.action, actions::UPDATED);
}

#[tokio::test]
async fn date_range_bounds_are_inclusive_days() {
    let (db, _, _) = seeded().await;
    let today = Utc::now().date_naive();
    let yesterday = today.checked_sub_days(Days::new(1)).expect("yesterday");
    let tomorrow = today.checked_add_days(Days::new(1)).expect("tomorrow");

    let filter = HistoryFilter {
        date_from: Some(today),
        date_to: Some(today),
        ..Default::default()
    };
    assert_eq!(db.list_history(&filter, 1, 15).await.expect("today").total, 3);

    let filter = HistoryFilter {
        date_from: Some(tomorrow),
        ..Default::default()
    };
    assert_eq!(db.list_history(&filter, 1, 15).await.expect("future").total, 0);

    let filter = HistoryFilter {
        date_to: Some(yesterday),
        ..Default::default()
    };
    assert_eq!(db.list_history(&filter, 1, 15).await.expect("past").total, 0);
}

#[tokio::test]
async fn combined_filters_intersect() {
    let (db, doe_id, _) = seeded().await;

    let filter = HistoryFilter {
        contact_id: Some(doe_id),
        action: Some(actions::CREATED.to_string()),
        ..Default::default()
    };
    let page = db.list_history(&filter, 1, 15).await.expect("list");
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].entry.action, actions::CREATED);
    assert_eq!(page.items[0].entry.contact_id, doe_id);
}

#[tokio::test]
async fn pagination_applies_after_filtering() {
    let (db, _, _) = seeded().await;

    let page = db
        .list_history(&HistoryFilter::default(), 1, 2)
        .await
        .expect("page 1");
    assert_eq!(page.total, 3);
    assert_eq!(page.last_page, 2);
    assert_eq!(page.items.len(), 2);

    let page2 = db
        .list_history(&HistoryFilter::default(), 2, 2)
        .await
        .expect("page 2");
    assert_eq!(page2.items.len(), 1);
}

#[tokio::test]
async fn single_entry_lookup_carries_the_contact() {
    let (db, doe_id, _) = seeded().await;
    let histories = db.history_for_contact(doe_id).await.expect("history");
    let update = &histories[0];

    let detail = db.get_history_entry(update.id).await.expect("lookup");
    assert_eq!(detail.entry.id, update.id);
    assert_eq!(detail.entry.field.as_deref(), Some("phone"));
    assert_eq!(detail.contact.id, doe_id);
    assert_eq!(detail.contact.last_name, "Doe");
}

#[tokio::test]
async fn single_entry_lookup_unknown_id_is_not_found() {
    let (db, _, _) = seeded().await;
    let err = db.get_history_entry(9999).await.expect_err("unknown id");
    assert!(matches!(err, DbError::HistoryEntryNotFound(9999)));
}

#[tokio::test]
async fn stats_count_per_action_and_recent_window() {
    let (db, _, smith_id) = seeded().await;
    db.delete_contact(smith_id, None).await.expect("delete");

    // Smith's entries cascaded away with the row; Doe keeps created+updated.
    let stats = db.history_stats().await.expect("stats");
    assert_eq!(stats.total_entries, 2);
    assert_eq!(stats.created_actions, 1);
    assert_eq!(stats.updated_actions, 1);
    assert_eq!(stats.deleted_actions, 0);
    assert_eq!(stats.recent_activity, 2);
}
