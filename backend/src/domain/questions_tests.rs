use std::sync::Arc;

use chrono::Duration;
use rstest::rstest;

use super::*;
use crate::domain::error::ErrorCode;
use crate::domain::user::User;
use crate::domain::votes::VoteSets;
use crate::outbound::persistence::MemoryForumStore;

fn service() -> (Arc<MemoryForumStore>, QuestionsService<MemoryForumStore>) {
    let store = Arc::new(MemoryForumStore::new());
    (Arc::clone(&store), QuestionsService::new(store))
}

async fn seed_user(store: &MemoryForumStore, name: &str) -> User {
    let user = User::new(name, format!("{name}@example.org"), "hash".to_owned());
    store.insert_user(&user).await.expect("insert user");
    user
}

fn new_question() -> NewQuestion {
    NewQuestion {
        title: "How do borrows end?".to_owned(),
        body: "body".to_owned(),
        tags: vec!["rust".to_owned()],
    }
}

async fn counters_of(store: &MemoryForumStore, user: &User) -> crate::domain::user::UserCounters {
    store
        .find_user(&user.id)
        .await
        .expect("find user")
        .expect("user exists")
        .counters
}

#[tokio::test]
async fn create_stores_question_and_increments_posted_counter() {
    let (store, service) = service();
    let ada = seed_user(&store, "ada").await;

    let question = service
        .create(&ada.id, new_question())
        .await
        .expect("create");
    assert_eq!(question.owner, ada.id);
    assert!(!question.locked);
    assert_eq!(question.version, 0);
    assert_eq!(counters_of(&store, &ada).await.questions_posted, 1);
}

#[tokio::test]
async fn create_by_unknown_account_is_unauthorized() {
    let (_store, service) = service();
    let err = service
        .create(&UserId::random(), new_question())
        .await
        .expect_err("unknown account");
    assert_eq!(err.code(), ErrorCode::Unauthorized);
}

#[rstest]
#[case("  ", "body")]
#[case("title", "")]
#[tokio::test]
async fn create_rejects_blank_text(#[case] title: &str, #[case] body: &str) {
    let (store, service) = service();
    let ada = seed_user(&store, "ada").await;
    let err = service
        .create(
            &ada.id,
            NewQuestion {
                title: title.to_owned(),
                body: body.to_owned(),
                tags: Vec::new(),
            },
        )
        .await
        .expect_err("blank text");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[tokio::test]
async fn list_orders_newest_first_and_scopes_to_owner() {
    let (store, service) = service();
    let ada = seed_user(&store, "ada").await;
    let grace = seed_user(&store, "grace").await;

    let mut older = Question::new("older", "b", Vec::new(), ada.id);
    older.created_at -= Duration::hours(1);
    store.insert_question(&older, &[]).await.expect("insert");
    let newer = Question::new("newer", "b", Vec::new(), ada.id);
    store.insert_question(&newer, &[]).await.expect("insert");
    let other = Question::new("other", "b", Vec::new(), grace.id);
    store.insert_question(&other, &[]).await.expect("insert");

    let all = service.list(QuestionView::All).await.expect("list all");
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].title, "other");

    let owned = service
        .list(QuestionView::Owned(ada.id))
        .await
        .expect("list owned");
    let titles: Vec<_> = owned.iter().map(|q| q.title.as_str()).collect();
    assert_eq!(titles, vec!["newer", "older"]);
}

#[tokio::test]
async fn get_returns_question_with_answers() {
    let (store, service) = service();
    let ada = seed_user(&store, "ada").await;
    let grace = seed_user(&store, "grace").await;
    let question = service
        .create(&ada.id, new_question())
        .await
        .expect("create");
    let answer = Answer::new("a", grace.id, question.id, false);
    store
        .insert_answer(&answer, 0, None, &[])
        .await
        .expect("insert answer");

    let detail = service.get(&question.id).await.expect("get");
    assert_eq!(detail.question.id, question.id);
    assert_eq!(detail.answers.len(), 1);

    let err = service
        .get(&QuestionId::random())
        .await
        .expect_err("missing question");
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn update_replaces_text_and_bumps_version() {
    let (store, service) = service();
    let ada = seed_user(&store, "ada").await;
    let question = service
        .create(&ada.id, new_question())
        .await
        .expect("create");

    let updated = service
        .update(
            &ada.id,
            &question.id,
            QuestionUpdate {
                title: "edited".to_owned(),
                body: "edited body".to_owned(),
                tags: vec!["rust".to_owned(), "borrowck".to_owned()],
            },
        )
        .await
        .expect("update");
    assert_eq!(updated.title, "edited");
    assert_eq!(updated.version, 1);
}

#[tokio::test]
async fn update_respects_ownership_and_lock() {
    let (store, service) = service();
    let ada = seed_user(&store, "ada").await;
    let grace = seed_user(&store, "grace").await;
    let question = service
        .create(&ada.id, new_question())
        .await
        .expect("create");

    let update = QuestionUpdate {
        title: "edited".to_owned(),
        body: "edited body".to_owned(),
        tags: Vec::new(),
    };
    let err = service
        .update(&grace.id, &question.id, update.clone())
        .await
        .expect_err("not the owner");
    assert_eq!(err.code(), ErrorCode::Forbidden);

    service
        .set_locked(&ada.id, &question.id, true)
        .await
        .expect("lock");
    let err = service
        .update(&ada.id, &question.id, update)
        .await
        .expect_err("locked");
    assert_eq!(err.code(), ErrorCode::Forbidden);
}

#[tokio::test]
async fn delete_reverses_owner_counters() {
    let (store, service) = service();
    let ada = seed_user(&store, "ada").await;
    let grace = seed_user(&store, "grace").await;
    let question = service
        .create(&ada.id, new_question())
        .await
        .expect("create");
    service
        .vote(&grace.id, &question.id, VoteDirection::Up)
        .await
        .expect("upvote");
    assert_eq!(counters_of(&store, &ada).await.upvotes_received, 1);

    service.delete(&ada.id, &question.id).await.expect("delete");

    let counters = counters_of(&store, &ada).await;
    assert_eq!(counters.questions_posted, 0);
    assert_eq!(counters.upvotes_received, 0);
    assert!(store
        .find_question(&question.id)
        .await
        .expect("find")
        .is_none());
}

#[tokio::test]
async fn delete_is_owner_only_but_ignores_lock() {
    let (store, service) = service();
    let ada = seed_user(&store, "ada").await;
    let grace = seed_user(&store, "grace").await;
    let question = service
        .create(&ada.id, new_question())
        .await
        .expect("create");
    service
        .set_locked(&ada.id, &question.id, true)
        .await
        .expect("lock");

    let err = service
        .delete(&grace.id, &question.id)
        .await
        .expect_err("not the owner");
    assert_eq!(err.code(), ErrorCode::Forbidden);

    service
        .delete(&ada.id, &question.id)
        .await
        .expect("owner may delete despite lock");
}

#[tokio::test]
async fn vote_toggle_adjusts_both_counters() {
    let (store, service) = service();
    let ada = seed_user(&store, "ada").await;
    let grace = seed_user(&store, "grace").await;
    let question = service
        .create(&ada.id, new_question())
        .await
        .expect("create");

    let voted = service
        .vote(&grace.id, &question.id, VoteDirection::Up)
        .await
        .expect("upvote");
    assert!(voted.votes.has_upvoted(&grace.id));
    assert_eq!(voted.version, 1);
    assert_eq!(counters_of(&store, &ada).await.upvotes_received, 1);
    assert_eq!(counters_of(&store, &grace).await.votes_given, 1);

    // Switching direction keeps votesGivenCount flat.
    service
        .vote(&grace.id, &question.id, VoteDirection::Down)
        .await
        .expect("switch to down");
    assert_eq!(counters_of(&store, &ada).await.upvotes_received, 0);
    assert_eq!(counters_of(&store, &grace).await.votes_given, 1);

    // Retracting releases the votes-given slot.
    service
        .vote(&grace.id, &question.id, VoteDirection::Down)
        .await
        .expect("retract");
    assert_eq!(counters_of(&store, &grace).await.votes_given, 0);
}

#[tokio::test]
async fn vote_rejects_owner_and_locked_questions() {
    let (store, service) = service();
    let ada = seed_user(&store, "ada").await;
    let grace = seed_user(&store, "grace").await;
    let question = service
        .create(&ada.id, new_question())
        .await
        .expect("create");

    let err = service
        .vote(&ada.id, &question.id, VoteDirection::Up)
        .await
        .expect_err("own question");
    assert_eq!(err.code(), ErrorCode::Forbidden);

    service
        .set_locked(&ada.id, &question.id, true)
        .await
        .expect("lock");
    let err = service
        .vote(&grace.id, &question.id, VoteDirection::Up)
        .await
        .expect_err("locked question");
    assert_eq!(err.code(), ErrorCode::Forbidden);
}

#[tokio::test]
async fn vote_on_corrupted_sets_fails_without_writing() {
    let (store, service) = service();
    let ada = seed_user(&store, "ada").await;
    let grace = seed_user(&store, "grace").await;

    let mut question = Question::new("t", "b", Vec::new(), ada.id);
    question.votes = VoteSets {
        up: vec![grace.id],
        down: vec![grace.id],
    };
    store
        .insert_question(&question, &[])
        .await
        .expect("insert corrupted question");

    let err = service
        .vote(&grace.id, &question.id, VoteDirection::Up)
        .await
        .expect_err("corrupted sets");
    assert_eq!(err.code(), ErrorCode::InvariantViolation);

    let stored = store
        .find_question(&question.id)
        .await
        .expect("find")
        .expect("question exists");
    assert_eq!(stored.votes, question.votes);
    assert_eq!(stored.version, 0);
}

#[tokio::test]
async fn lock_toggle_is_idempotent() {
    let (store, service) = service();
    let ada = seed_user(&store, "ada").await;
    let question = service
        .create(&ada.id, new_question())
        .await
        .expect("create");

    let locked = service
        .set_locked(&ada.id, &question.id, true)
        .await
        .expect("lock");
    assert!(locked.locked);
    assert_eq!(locked.version, 1);

    // Re-locking is a no-op and must not burn a version.
    let again = service
        .set_locked(&ada.id, &question.id, true)
        .await
        .expect("lock again");
    assert_eq!(again.version, 1);

    let unlocked = service
        .set_locked(&ada.id, &question.id, false)
        .await
        .expect("unlock");
    assert!(!unlocked.locked);
    assert_eq!(unlocked.version, 2);
}
