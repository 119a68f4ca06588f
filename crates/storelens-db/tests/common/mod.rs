//! Behavioural checks shared by every `CatalogStore` backend.
//!
//! Each check takes an empty store and panics on the first violation, so the
//! same contract runs against the in-memory store and against a fresh
//! `#[sqlx::test]` database.

#![allow(dead_code)]

use chrono::NaiveDate;
use rust_decimal::Decimal;
use storelens_core::{AnalyticsRecord, FieldMatch, Page, Product, ProductFilter, ProductPatch};
use storelens_db::{CatalogStore, DbError, UpsertOutcome};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn product(id: &str, category: &str, price: i64, rating_tenths: i64) -> Product {
    let mut p = Product::new(
        id,
        format!("{id} item"),
        category,
        Decimal::from(price),
        Decimal::new(rating_tenths, 1),
    );
    p.profit_margin = Decimal::from(10);
    p.estimated_demand = 5;
    p
}

pub fn analytics(product_id: &str, day: u32, location: Option<&str>) -> AnalyticsRecord {
    let date = NaiveDate::from_ymd_opt(2024, 6, day).expect("valid date");
    AnalyticsRecord {
        id: AnalyticsRecord::derive_id(product_id, date, location),
        product_id: product_id.to_string(),
        date,
        sales: 3,
        revenue: Decimal::new(4_500, 2),
        views: 60,
        conversions: 3,
        location: location.map(str::to_string),
    }
}

fn ids(products: &[Product]) -> Vec<&str> {
    products.iter().map(|p| p.product_id.as_str()).collect()
}

async fn seed(store: &dyn CatalogStore) {
    store
        .upsert_batch(vec![
            product("B", "Tools", 30, 45),
            product("a", "Garden", 5, 20),
            product("A10", "Tools", 10, 40),
            product("A2", "Kitchen", 20, 35),
        ])
        .await
        .expect("seed upsert failed");
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

pub async fn get_missing_is_none(store: &dyn CatalogStore) {
    assert!(store.get("nope").await.expect("get failed").is_none());
    assert_eq!(store.count().await.expect("count failed"), 0);
}

pub async fn create_then_get(store: &dyn CatalogStore) {
    let created = store
        .create(product("P1", "Tools", 12, 42))
        .await
        .expect("create failed");
    assert_eq!(created.product_id, "P1");

    let fetched = store.get("P1").await.expect("get failed");
    assert_eq!(fetched, Some(created));
}

pub async fn create_generates_missing_id(store: &dyn CatalogStore) {
    let created = store
        .create(product("  ", "Tools", 12, 42))
        .await
        .expect("create failed");
    assert!(uuid::Uuid::parse_str(&created.product_id).is_ok());
    assert!(store
        .get(&created.product_id)
        .await
        .expect("get failed")
        .is_some());
}

pub async fn create_rejects_existing_id(store: &dyn CatalogStore) {
    store
        .create(product("P1", "Tools", 12, 42))
        .await
        .expect("first create failed");

    let err = store
        .create(product("P1", "Garden", 99, 10))
        .await
        .expect_err("duplicate create should fail");
    assert!(matches!(err, DbError::AlreadyExists(ref id) if id == "P1"));

    let kept = store.get("P1").await.expect("get failed").expect("row kept");
    assert_eq!(kept.category, "Tools");
}

pub async fn create_rejects_invalid_product(store: &dyn CatalogStore) {
    let err = store
        .create(product("P1", "Tools", -1, 42))
        .await
        .expect_err("negative price should fail");
    assert!(matches!(err, DbError::Invalid(_)));
    assert_eq!(store.count().await.expect("count failed"), 0);
}

pub async fn upsert_is_idempotent(store: &dyn CatalogStore) {
    let batch = vec![product("A1", "Tools", 100, 40), product("A2", "Tools", 50, 30)];

    let first = store
        .upsert_batch(batch.clone())
        .await
        .expect("first upsert failed");
    assert_eq!(first, UpsertOutcome { inserted: 2, updated: 0 });
    let snapshot = store.scan().await.expect("scan failed");

    let second = store.upsert_batch(batch).await.expect("second upsert failed");
    assert_eq!(second, UpsertOutcome { inserted: 0, updated: 2 });
    assert_eq!(store.scan().await.expect("scan failed"), snapshot);
    assert_eq!(store.count().await.expect("count failed"), 2);
}

pub async fn upsert_last_duplicate_wins(store: &dyn CatalogStore) {
    let outcome = store
        .upsert_batch(vec![
            product("A1", "Tools", 100, 40),
            product("A1", "Tools", 120, 40),
        ])
        .await
        .expect("upsert failed");
    assert_eq!(outcome.total(), 1);

    let a1 = store.get("A1").await.expect("get failed").expect("A1 exists");
    assert_eq!(a1.price, Decimal::from(120));
}

pub async fn upsert_rejects_whole_batch_on_invalid_row(store: &dyn CatalogStore) {
    let mut bad = product("A2", "Tools", 10, 40);
    bad.rating = Decimal::from(6);

    let err = store
        .upsert_batch(vec![product("A1", "Tools", 100, 40), bad])
        .await
        .expect_err("invalid row should fail the batch");
    assert!(matches!(err, DbError::Invalid(_)));
    assert_eq!(store.count().await.expect("count failed"), 0);
}

pub async fn upsert_empty_batch_is_noop(store: &dyn CatalogStore) {
    let outcome = store.upsert_batch(Vec::new()).await.expect("upsert failed");
    assert_eq!(outcome, UpsertOutcome::default());
}

pub async fn scan_uses_bytewise_id_order(store: &dyn CatalogStore) {
    seed(store).await;
    let all = store.scan().await.expect("scan failed");
    assert_eq!(ids(&all), ["A10", "A2", "B", "a"]);
}

pub async fn list_filters_then_paginates(store: &dyn CatalogStore) {
    seed(store).await;

    let tools = ProductFilter {
        category: Some("Tools".to_string()),
        ..ProductFilter::default()
    };
    let listed = store.list(&tools, Page::default()).await.expect("list failed");
    assert_eq!(ids(&listed), ["A10", "B"]);

    let priced = ProductFilter {
        min_price: Some(Decimal::from(10)),
        max_price: Some(Decimal::from(20)),
        ..ProductFilter::default()
    };
    let listed = store.list(&priced, Page::default()).await.expect("list failed");
    assert_eq!(ids(&listed), ["A10", "A2"]);

    let rated = ProductFilter {
        min_rating: Some(Decimal::new(40, 1)),
        ..ProductFilter::default()
    };
    let listed = store.list(&rated, Page::default()).await.expect("list failed");
    assert_eq!(ids(&listed), ["A10", "B"]);

    let page = store
        .list(&ProductFilter::default(), Page::new(2, 1))
        .await
        .expect("list failed");
    assert_eq!(ids(&page), ["A2", "B"]);

    let past_end = store
        .list(&ProductFilter::default(), Page::new(10, 10))
        .await
        .expect("list failed");
    assert!(past_end.is_empty());
}

pub async fn list_every_result_satisfies_filter(store: &dyn CatalogStore) {
    seed(store).await;
    let filter = ProductFilter {
        category: Some("Tools".to_string()),
        min_price: Some(Decimal::from(15)),
        ..ProductFilter::default()
    };

    let listed = store.list(&filter, Page::default()).await.expect("list failed");
    assert_eq!(ids(&listed), ["B"]);
    assert!(listed.iter().all(|p| filter.matches(p, None)));
}

pub async fn list_by_location_uses_analytics(store: &dyn CatalogStore) {
    seed(store).await;
    store
        .record_analytics_batch(vec![
            analytics("A2", 1, Some("Berlin")),
            analytics("B", 1, Some("Paris")),
            analytics("ghost", 1, Some("Berlin")),
        ])
        .await
        .expect("record analytics failed");

    let berlin = ProductFilter {
        location: Some("Berlin".to_string()),
        ..ProductFilter::default()
    };
    let listed = store.list(&berlin, Page::default()).await.expect("list failed");
    assert_eq!(ids(&listed), ["A2"]);
}

pub async fn search_is_case_insensitive(store: &dyn CatalogStore) {
    seed(store).await;

    let hits = store.search("TOOLS").await.expect("search failed");
    assert_eq!(ids(&hits), ["A10", "B"]);

    let hits = store.search("a2 it").await.expect("search failed");
    assert_eq!(ids(&hits), ["A2"]);

    let everything = store.search("").await.expect("search failed");
    assert_eq!(everything.len(), 4);

    let literal = store.search("%").await.expect("search failed");
    assert!(literal.is_empty());
}

pub async fn get_by_field_returns_first_match(store: &dyn CatalogStore) {
    seed(store).await;

    let first_tool = store
        .get_by_field(&FieldMatch::Category("Tools".to_string()))
        .await
        .expect("get_by_field failed")
        .expect("a Tools product exists");
    assert_eq!(first_tool.product_id, "A10");

    let by_title = store
        .get_by_field(&FieldMatch::Title("B item".to_string()))
        .await
        .expect("get_by_field failed");
    assert_eq!(by_title.map(|p| p.product_id), Some("B".to_string()));

    let missing = store
        .get_by_field(&FieldMatch::EventName("Black Friday".to_string()))
        .await
        .expect("get_by_field failed");
    assert!(missing.is_none());
}

pub async fn update_merges_supplied_fields(store: &dyn CatalogStore) {
    let mut original = product("P1", "Tools", 10, 40);
    original.cost_price = Some(Decimal::from(6));
    store.create(original).await.expect("create failed");

    let patch = ProductPatch {
        price: Some(Decimal::from(15)),
        cost_price: Some(None),
        event_name: Some(Some("Summer Sale".to_string())),
        ..ProductPatch::default()
    };
    let updated = store
        .update("P1", &patch)
        .await
        .expect("update failed")
        .expect("P1 exists");

    assert_eq!(updated.price, Decimal::from(15));
    assert_eq!(updated.category, "Tools");
    assert!(updated.cost_price.is_none());
    assert_eq!(updated.event_name.as_deref(), Some("Summer Sale"));
    assert_eq!(store.get("P1").await.expect("get failed"), Some(updated));
}

pub async fn update_unknown_is_none(store: &dyn CatalogStore) {
    let result = store
        .update("missing", &ProductPatch::default())
        .await
        .expect("update failed");
    assert!(result.is_none());
}

pub async fn update_rejects_invalid_merge(store: &dyn CatalogStore) {
    store
        .create(product("P1", "Tools", 10, 40))
        .await
        .expect("create failed");

    let patch = ProductPatch {
        rating: Some(Decimal::from(9)),
        ..ProductPatch::default()
    };
    let err = store
        .update("P1", &patch)
        .await
        .expect_err("rating 9 should fail");
    assert!(matches!(err, DbError::Invalid(_)));

    let kept = store.get("P1").await.expect("get failed").expect("P1 exists");
    assert_eq!(kept.rating, Decimal::new(40, 1));
}

pub async fn analytics_upsert_by_id(store: &dyn CatalogStore) {
    let first = store
        .record_analytics(analytics("A1", 2, None))
        .await
        .expect("record failed");
    assert_eq!(first.inserted, 1);

    let mut revised = analytics("A1", 2, None);
    revised.revenue = Decimal::from(99);
    let second = store
        .record_analytics_batch(vec![revised, analytics("A1", 1, Some("Berlin"))])
        .await
        .expect("record failed");
    assert_eq!(second, UpsertOutcome { inserted: 1, updated: 1 });

    let all = store.list_analytics(Some("A1")).await.expect("list failed");
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].date.to_string(), "2024-06-01");
    assert_eq!(all[1].revenue, Decimal::from(99));

    assert!(store
        .list_analytics(Some("other"))
        .await
        .expect("list failed")
        .is_empty());
}

pub async fn ping_succeeds(store: &dyn CatalogStore) {
    store.ping().await.expect("ping failed");
}
