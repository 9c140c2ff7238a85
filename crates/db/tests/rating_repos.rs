//! Repository-level integration tests for the ratings tables.

use assert_matches::assert_matches;
use moodbase_core::moderation::{ReviewDecision, ReviewState};
use moodbase_core::rating::ScoreSet;
use moodbase_db::models::rating::CreateStagedRating;
use moodbase_db::repositories::staged_rating_repo::PENDING_UNIQUE_INDEX;
use moodbase_db::repositories::{AggregateSource, StagedRatingRepo, UserRatingRepo};
use moodbase_db::{is_undefined_table, is_unique_violation, SchemaCapabilities};
use sqlx::PgPool;
use uuid::Uuid;

fn new_rating(offering_id: i64, user_id: Uuid, overall: f64, comment: Option<&str>) -> CreateStagedRating {
    CreateStagedRating {
        offering_id,
        user_id,
        scores: ScoreSet {
            overall,
            access: 4.0,
            treatment: 3.0,
            helpful: 5.0,
            effectiveness: 2.0,
        },
        comment: comment.map(str::to_string),
        ip_address: Some("203.0.113.1".into()),
        user_agent: None,
    }
}

/// Stage, approve and publish a rating in one go.
async fn publish(pool: &PgPool, input: &CreateStagedRating) -> i64 {
    let staged = StagedRatingRepo::create(pool, input).await.unwrap();
    let mut tx = pool.begin().await.unwrap();
    StagedRatingRepo::mark_reviewed(&mut tx, staged.id, &ReviewDecision::Approved, "mod1")
        .await
        .unwrap();
    assert!(UserRatingRepo::publish_from_staging(&mut tx, staged.id).await.unwrap());
    tx.commit().await.unwrap();
    staged.id
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn staged_rating_starts_unreviewed(pool: PgPool) {
    let user_id = Uuid::new_v4();
    let staged = StagedRatingRepo::create(&pool, &new_rating(42, user_id, 4.0, Some("ok")))
        .await
        .unwrap();

    assert_eq!(staged.state(), ReviewState::Unreviewed);
    assert_eq!(staged.scores().overall, 4.0);
    assert_eq!(staged.ip_address.as_deref(), Some("203.0.113.1"));
    assert!(StagedRatingRepo::has_pending(&pool, 42, user_id).await.unwrap());
    assert!(!StagedRatingRepo::has_pending(&pool, 43, user_id).await.unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn pending_index_rejects_second_unreviewed_row(pool: PgPool) {
    let user_id = Uuid::new_v4();
    StagedRatingRepo::create(&pool, &new_rating(42, user_id, 4.0, None))
        .await
        .unwrap();

    let err = StagedRatingRepo::create(&pool, &new_rating(42, user_id, 3.0, None))
        .await
        .unwrap_err();
    assert!(is_unique_violation(&err, PENDING_UNIQUE_INDEX));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn reviewed_row_no_longer_blocks_submission(pool: PgPool) {
    let user_id = Uuid::new_v4();
    publish(&pool, &new_rating(42, user_id, 4.0, None)).await;

    assert!(!StagedRatingRepo::has_pending(&pool, 42, user_id).await.unwrap());
    StagedRatingRepo::create(&pool, &new_rating(42, user_id, 3.0, None))
        .await
        .unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn rejection_is_recorded_with_reason(pool: PgPool) {
    let staged = StagedRatingRepo::create(&pool, &new_rating(42, Uuid::new_v4(), 1.0, None))
        .await
        .unwrap();
    let decision = ReviewDecision::new(false, Some("off-topic")).unwrap();

    let mut tx = pool.begin().await.unwrap();
    let locked = StagedRatingRepo::lock_for_review(&mut tx, staged.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(locked.state(), ReviewState::Unreviewed);
    let updated = StagedRatingRepo::mark_reviewed(&mut tx, staged.id, &decision, "mod2")
        .await
        .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(updated.state(), ReviewState::Rejected);
    assert_eq!(updated.rejection_reason.as_deref(), Some("off-topic"));
    assert_eq!(updated.reviewed_by.as_deref(), Some("mod2"));
    assert!(updated.reviewed_at.is_some());

    let pending = StagedRatingRepo::list_pending(&pool, 50, 0).await.unwrap();
    assert!(pending.is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn rolled_back_review_leaves_row_pending(pool: PgPool) {
    let staged = StagedRatingRepo::create(&pool, &new_rating(42, Uuid::new_v4(), 4.0, None))
        .await
        .unwrap();

    let mut tx = pool.begin().await.unwrap();
    StagedRatingRepo::mark_reviewed(&mut tx, staged.id, &ReviewDecision::Approved, "mod1")
        .await
        .unwrap();
    UserRatingRepo::publish_from_staging(&mut tx, staged.id).await.unwrap();
    tx.rollback().await.unwrap();

    let pending = StagedRatingRepo::list_pending(&pool, 50, 0).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, staged.id);
    assert_eq!(pending[0].state(), ReviewState::Unreviewed);
    let published = UserRatingRepo::find_by_offering_and_user(&pool, 42, staged.user_id)
        .await
        .unwrap();
    assert!(published.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn publishing_twice_keeps_first_rating(pool: PgPool) {
    let user_id = Uuid::new_v4();
    let first = publish(&pool, &new_rating(42, user_id, 4.0, None)).await;

    let second = StagedRatingRepo::create(&pool, &new_rating(42, user_id, 2.0, None))
        .await
        .unwrap();
    let mut tx = pool.begin().await.unwrap();
    let inserted = UserRatingRepo::publish_from_staging(&mut tx, second.id).await.unwrap();
    tx.commit().await.unwrap();
    assert!(!inserted);

    let published = UserRatingRepo::find_by_offering_and_user(&pool, 42, user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(published.staging_id, Some(first));
    assert_eq!(published.overall, 4.0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn view_and_table_aggregates_agree(pool: PgPool) {
    for overall in [5.0, 4.0, 4.0] {
        publish(&pool, &new_rating(42, Uuid::new_v4(), overall, None)).await;
    }
    publish(&pool, &new_rating(43, Uuid::new_v4(), 2.0, None)).await;

    let from_view = UserRatingRepo::averages(&pool, AggregateSource::View, 42)
        .await
        .unwrap()
        .unwrap();
    let from_table = UserRatingRepo::averages(&pool, AggregateSource::Table, 42)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(from_view.review_count, 3);
    assert_eq!(from_view.review_count, from_table.review_count);
    assert_eq!(from_view.avg_overall, from_table.avg_overall);
    assert_eq!(from_view.avg_helpful, Some(5.0));

    for source in [AggregateSource::View, AggregateSource::Table] {
        let mut scores = UserRatingRepo::overall_by_offering(&pool, source, &[42, 43, 44])
            .await
            .unwrap();
        scores.sort_by_key(|s| s.offering_id);
        let ids: Vec<i64> = scores.iter().map(|s| s.offering_id).collect();
        assert_eq!(ids, vec![42, 43]);
        assert_eq!(scores[1].score, Some(2.0));
    }

    let none = UserRatingRepo::averages(&pool, AggregateSource::Table, 99).await.unwrap();
    assert!(none.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn recent_comments_skip_blank_and_are_newest_first(pool: PgPool) {
    for comment in [Some("first"), None, Some("   "), Some("second"), Some("third"), Some("fourth")] {
        publish(&pool, &new_rating(42, Uuid::new_v4(), 4.0, comment)).await;
    }

    let comments = UserRatingRepo::recent_comments(&pool, 42, 3).await.unwrap();
    let texts: Vec<&str> = comments.iter().map(|c| c.comment.as_str()).collect();
    assert_eq!(texts, vec!["fourth", "third", "second"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn missing_relation_is_reported_as_undefined_table(pool: PgPool) {
    sqlx::query("DROP VIEW rating_aggregations")
        .execute(&pool)
        .await
        .unwrap();

    let err = UserRatingRepo::averages(&pool, AggregateSource::View, 42)
        .await
        .unwrap_err();
    assert!(is_undefined_table(&err));
    assert_matches!(err, sqlx::Error::Database(_));

    let caps = SchemaCapabilities::probe(&pool).await.unwrap();
    assert!(!caps.aggregation_view);
    assert!(caps.staging_table && caps.ratings_table && caps.platform_table);
}
