use super::*;
use crate::domain::user::CounterDelta;

fn store() -> SqliteForumStore {
    SqliteForumStore::open_in_memory().expect("open in-memory store")
}

fn user(name: &str) -> User {
    User::new(name, format!("{name}@example.org"), "hash".to_owned())
}

async fn seed_user(store: &SqliteForumStore, name: &str) -> User {
    let user = user(name);
    store.insert_user(&user).await.expect("insert user");
    user
}

async fn seed_question(store: &SqliteForumStore, owner: &User) -> Question {
    let question = Question::new("title", "body", vec!["tag".to_owned()], owner.id);
    store
        .insert_question(
            &question,
            &[CounterAdjustment::new(
                owner.id,
                CounterDelta::questions_posted(1),
            )],
        )
        .await
        .expect("insert question");
    question
}

#[tokio::test]
async fn user_round_trip_and_unique_fields() {
    let store = store();
    let ada = seed_user(&store, "ada").await;

    let fetched = store
        .find_user(&ada.id)
        .await
        .expect("find user")
        .expect("user exists");
    assert_eq!(fetched, ada);

    let by_email = store
        .find_user_by_email("ada@example.org")
        .await
        .expect("find by email");
    assert_eq!(by_email.map(|u| u.id), Some(ada.id));

    let mut clash = user("ada");
    clash.email = "other@example.org".to_owned();
    let err = store.insert_user(&clash).await.expect_err("username taken");
    assert_eq!(err, StoreError::duplicate("username"));

    let mut clash = user("grace");
    clash.email = ada.email.clone();
    let err = store.insert_user(&clash).await.expect_err("email taken");
    assert_eq!(err, StoreError::duplicate("email"));
}

#[tokio::test]
async fn update_user_rejects_taken_username() {
    let store = store();
    let _ada = seed_user(&store, "ada").await;
    let mut grace = seed_user(&store, "grace").await;

    grace.username = "ada".to_owned();
    let err = store.update_user(&grace).await.expect_err("username taken");
    assert_eq!(err, StoreError::duplicate("username"));
}

#[tokio::test]
async fn insert_question_applies_counter_adjustments() {
    let store = store();
    let ada = seed_user(&store, "ada").await;
    seed_question(&store, &ada).await;

    let ada = store
        .find_user(&ada.id)
        .await
        .expect("find user")
        .expect("user exists");
    assert_eq!(ada.counters.questions_posted, 1);
}

#[tokio::test]
async fn versioned_writes_reject_stale_versions() {
    let store = store();
    let ada = seed_user(&store, "ada").await;
    let mut question = seed_question(&store, &ada).await;

    question.title = "first edit".to_owned();
    store
        .save_question(&question, 0)
        .await
        .expect("first save succeeds");

    question.title = "stale edit".to_owned();
    let err = store
        .save_question(&question, 0)
        .await
        .expect_err("stale version");
    assert_eq!(err, StoreError::VersionConflict { entity: "question" });

    let stored = store
        .find_question(&question.id)
        .await
        .expect("find question")
        .expect("question exists");
    assert_eq!(stored.title, "first edit");
    assert_eq!(stored.version, 1);
}

#[tokio::test]
async fn insert_answer_links_question_and_dedupes_notification() {
    let store = store();
    let ada = seed_user(&store, "ada").await;
    let grace = seed_user(&store, "grace").await;
    let question = seed_question(&store, &ada).await;

    let answer = Answer::new("body", grace.id, question.id, false);
    let notification = Notification::new(ada.id, question.id, answer.id);
    store
        .insert_answer(
            &answer,
            0,
            Some(&notification),
            &[CounterAdjustment::new(
                grace.id,
                CounterDelta::questions_answered(1),
            )],
        )
        .await
        .expect("insert answer");

    let stored = store
        .find_question(&question.id)
        .await
        .expect("find question")
        .expect("question exists");
    assert_eq!(stored.answers, vec![answer.id]);
    assert_eq!(stored.version, 1);

    // A second insert with the same triple leaves a single notification.
    let duplicate = Notification::new(ada.id, question.id, answer.id);
    let other = Answer::new("again", grace.id, question.id, false);
    store
        .insert_answer(&other, 1, Some(&duplicate), &[])
        .await
        .expect("insert second answer");

    let inbox = store
        .notifications_for_recipient(&ada.id)
        .await
        .expect("list notifications");
    let for_first: Vec<_> = inbox.iter().filter(|n| n.answer == answer.id).collect();
    assert_eq!(for_first.len(), 1);

    let grace = store
        .find_user(&grace.id)
        .await
        .expect("find user")
        .expect("user exists");
    assert_eq!(grace.counters.questions_answered, 1);
}

#[tokio::test]
async fn delete_question_cascades() {
    let store = store();
    let ada = seed_user(&store, "ada").await;
    let grace = seed_user(&store, "grace").await;
    let question = seed_question(&store, &ada).await;

    let answer = Answer::new("body", grace.id, question.id, false);
    let notification = Notification::new(ada.id, question.id, answer.id);
    store
        .insert_answer(&answer, 0, Some(&notification), &[])
        .await
        .expect("insert answer");

    store
        .delete_question(
            &question.id,
            1,
            &[CounterAdjustment::new(
                ada.id,
                CounterDelta::questions_posted(-1),
            )],
        )
        .await
        .expect("delete question");

    assert!(store
        .find_question(&question.id)
        .await
        .expect("find question")
        .is_none());
    assert!(store
        .find_answer(&answer.id)
        .await
        .expect("find answer")
        .is_none());
    assert!(store
        .notifications_for_recipient(&ada.id)
        .await
        .expect("list notifications")
        .is_empty());
    let ada = store
        .find_user(&ada.id)
        .await
        .expect("find user")
        .expect("user exists");
    assert_eq!(ada.counters.questions_posted, 0);
}

#[tokio::test]
async fn delete_answer_unlinks_parent_and_notifications() {
    let store = store();
    let ada = seed_user(&store, "ada").await;
    let grace = seed_user(&store, "grace").await;
    let question = seed_question(&store, &ada).await;

    let answer = Answer::new("body", grace.id, question.id, false);
    let notification = Notification::new(ada.id, question.id, answer.id);
    store
        .insert_answer(&answer, 0, Some(&notification), &[])
        .await
        .expect("insert answer");

    store
        .delete_answer(&answer.id, 0, &[])
        .await
        .expect("delete answer");

    let stored = store
        .find_question(&question.id)
        .await
        .expect("find question")
        .expect("question exists");
    assert!(stored.answers.is_empty());
    assert!(store
        .notifications_for_recipient(&ada.id)
        .await
        .expect("list notifications")
        .is_empty());
    assert!(!store
        .user_has_answer(&question.id, &grace.id, None)
        .await
        .expect("membership check"));
}

#[tokio::test]
async fn mark_notifications_read_scopes_to_recipient_and_ids() {
    let store = store();
    let ada = seed_user(&store, "ada").await;
    let grace = seed_user(&store, "grace").await;
    let question = seed_question(&store, &ada).await;

    let first = Answer::new("one", grace.id, question.id, false);
    store
        .insert_answer(
            &first,
            0,
            Some(&Notification::new(ada.id, question.id, first.id)),
            &[],
        )
        .await
        .expect("insert first answer");
    let second = Answer::new("two", grace.id, question.id, false);
    store
        .insert_answer(
            &second,
            1,
            Some(&Notification::new(ada.id, question.id, second.id)),
            &[],
        )
        .await
        .expect("insert second answer");

    let inbox = store
        .notifications_for_recipient(&ada.id)
        .await
        .expect("list notifications");
    assert_eq!(inbox.len(), 2);
    let target = inbox[0].id;

    let changed = store
        .mark_notifications_read(&ada.id, Some(&[target]))
        .await
        .expect("mark one read");
    assert_eq!(changed, 1);

    // Other users' inboxes are untouched by a blanket mark.
    let changed = store
        .mark_notifications_read(&grace.id, None)
        .await
        .expect("mark none");
    assert_eq!(changed, 0);

    let changed = store
        .mark_notifications_read(&ada.id, None)
        .await
        .expect("mark rest read");
    assert_eq!(changed, 1);
    let inbox = store
        .notifications_for_recipient(&ada.id)
        .await
        .expect("list notifications");
    assert!(inbox.iter().all(|n| n.read));
}

#[tokio::test]
async fn documents_survive_reopen() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("forum.db");

    let ada = {
        let store = SqliteForumStore::open(&path).expect("open store");
        seed_user(&store, "ada").await
    };

    let store = SqliteForumStore::open(&path).expect("reopen store");
    let fetched = store
        .find_user(&ada.id)
        .await
        .expect("find user")
        .expect("user persisted");
    assert_eq!(fetched.username, "ada");
}
