//! services/api/tests/db_conformance.rs
//!
//! Exercises the PostgreSQL adapter against a real database. Ignored by
//! default; run with `cargo test -- --ignored` and a `DATABASE_URL` pointing
//! at a disposable database.

use api_lib::adapters::db::DbAdapter;
use pintarai_core::domain::{ChatSession, IdentitySnapshot};
use pintarai_core::ports::{ChatStore, CreditOutcome, PortError, TokenLedger};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

async fn adapter() -> DbAdapter {
    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for ignored db tests");
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("failed to connect");
    let adapter = DbAdapter::new(pool, 10);
    adapter.run_migrations().await.expect("migrations failed");
    adapter
}

#[tokio::test]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn session_documents_round_trip() {
    let db = adapter().await;
    let user_id = format!("it-{}", Uuid::new_v4());

    let mut session = ChatSession::new(
        Uuid::new_v4().to_string(),
        &user_id,
        "SMA Kelas 10",
        "Kimia",
        "Setarakan reaksi redoks",
    );
    let pair_id = session.append_pending("Setarakan reaksi redoks", None, None);
    session.resolve(&pair_id, "Langkah-langkahnya begini.");

    db.save_session(&session).await.unwrap();
    let loaded = db.get_session(&session.id).await.unwrap();
    assert_eq!(loaded, session);

    // Upsert with a changed message list replaces the document in place.
    session.append_pending("Lanjutan", None, None);
    db.save_session(&session).await.unwrap();
    assert_eq!(db.get_session(&session.id).await.unwrap(), session);

    db.delete_sessions_for_user(&user_id).await.unwrap();
    assert!(matches!(
        db.get_session(&session.id).await,
        Err(PortError::NotFound(_))
    ));
}

#[tokio::test]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn ledger_guards_and_credits_atomically() {
    let db = adapter().await;
    let user_id = format!("it-{}", Uuid::new_v4());

    let profile = db
        .get_or_create_profile(&IdentitySnapshot::new(&user_id))
        .await
        .unwrap();
    assert_eq!(profile.token_balance, 10);

    for expected in (0..10).rev() {
        assert_eq!(db.spend_token(&user_id).await.unwrap(), expected);
    }
    assert!(matches!(
        db.spend_token(&user_id).await,
        Err(PortError::InsufficientBalance)
    ));

    let order_id = format!("PINTARAI-{user_id}-student-1");
    let outcome = db.credit_order(&order_id, &user_id, 250).await.unwrap();
    assert_eq!(outcome, CreditOutcome::Credited { new_balance: 250 });
    let replay = db.credit_order(&order_id, &user_id, 250).await.unwrap();
    assert_eq!(replay, CreditOutcome::AlreadyProcessed);

    db.delete_profile(&user_id).await.unwrap();
}
