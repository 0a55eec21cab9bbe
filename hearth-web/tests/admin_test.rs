/// Integration tests for login and the back office
///
/// - the login guard on `/admin`
/// - login, failed login and logout
/// - reservation review: edit, process, delete
/// - owner blocks on the calendar

mod common;

use axum::http::StatusCode;
use common::{TestContext, ADMIN_EMAIL};
use hearth_shared::models::RestrictionKind;

async fn book(ctx: &TestContext, last_name: &str, start: &str, end: &str) -> i32 {
    let response = ctx
        .post_form(
            "/make-reservation",
            &[
                ("first_name", "John"),
                ("last_name", last_name),
                ("email", "john@smith.com"),
                ("phone", "555-0199"),
                ("start_date", start),
                ("end_date", end),
                ("room_id", "1"),
            ],
        )
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    ctx.repo
        .reservations()
        .into_iter()
        .find(|r| r.last_name == last_name)
        .map(|r| r.id)
        .unwrap()
}

#[tokio::test]
async fn test_admin_requires_login() {
    let ctx = TestContext::new();

    for path in [
        "/admin/dashboard",
        "/admin/reservations-new",
        "/admin/reservations-all",
        "/admin/reservations-calendar",
        "/admin/reservations/new/1/show",
    ] {
        let response = ctx.get(path).await;
        assert_eq!(response.status, StatusCode::SEE_OTHER, "GET {}", path);
        assert_eq!(response.location.as_deref(), Some("/user/login"));
    }

    let login = ctx.get("/user/login").await;
    assert!(login.body.contains("Log in first!"));
}

#[tokio::test]
async fn test_login_and_logout() {
    let ctx = TestContext::new();

    let response = ctx.login().await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location.as_deref(), Some("/admin/dashboard"));

    let dashboard = ctx.get("/admin/dashboard").await;
    assert_eq!(dashboard.status, StatusCode::OK);
    assert!(dashboard.body.contains("Dashboard"));
    assert!(dashboard.body.contains("Logged in successfully"));
    assert!(dashboard.body.contains("/user/logout"));

    let logout = ctx.get("/user/logout").await;
    assert_eq!(logout.status, StatusCode::SEE_OTHER);
    assert_eq!(logout.location.as_deref(), Some("/user/login"));

    let login_page = ctx.get("/user/login").await;
    assert!(login_page.body.contains("Logged out"));

    let again = ctx.get("/admin/dashboard").await;
    assert_eq!(again.status, StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_login_email_is_case_insensitive() {
    let ctx = TestContext::new();
    let shouted = ADMIN_EMAIL.to_uppercase();
    let response = ctx
        .post_form(
            "/user/login",
            &[("email", shouted.as_str()), ("password", common::ADMIN_PASSWORD)],
        )
        .await;
    assert_eq!(response.location.as_deref(), Some("/admin/dashboard"));
}

#[tokio::test]
async fn test_failed_login() {
    let ctx = TestContext::new();

    let wrong = ctx
        .post_form("/user/login", &[("email", ADMIN_EMAIL), ("password", "guess")])
        .await;
    assert_eq!(wrong.status, StatusCode::SEE_OTHER);
    assert_eq!(wrong.location.as_deref(), Some("/user/login"));
    let page = ctx.get("/user/login").await;
    assert!(page.body.contains("Invalid login credentials"));

    let malformed = ctx
        .post_form("/user/login", &[("email", "admin"), ("password", "")])
        .await;
    assert_eq!(malformed.status, StatusCode::OK);
    assert!(malformed.body.contains("Invalid email address"));
    assert!(malformed.body.contains("This field cannot be blank"));

    assert_eq!(ctx.get("/admin/dashboard").await.status, StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_reservation_listings() {
    let ctx = TestContext::new();
    let first = book(&ctx, "Early", "2050-01-01", "2050-01-03").await;
    book(&ctx, "Later", "2050-02-01", "2050-02-03").await;
    ctx.login().await;

    let dashboard = ctx.get("/admin/dashboard").await;
    assert!(dashboard.body.contains("2 new reservations"));

    let processed = ctx
        .get(&format!("/admin/process-reservation/new/{}/do", first))
        .await;
    assert_eq!(processed.status, StatusCode::SEE_OTHER);
    assert_eq!(processed.location.as_deref(), Some("/admin/reservations-new"));

    let new = ctx.get("/admin/reservations-new").await;
    assert_eq!(new.status, StatusCode::OK);
    assert!(new.body.contains("Reservation marked as processed"));
    assert!(new.body.contains("Later"));
    assert!(!new.body.contains("Early"));

    let all = ctx.get("/admin/reservations-all").await;
    assert!(all.body.contains("Later"));
    assert!(all.body.contains("Early"));
    // newest arrival first
    assert!(all.body.find("Later") < all.body.find("Early"));
}

#[tokio::test]
async fn test_edit_reservation() {
    let ctx = TestContext::new();
    let id = book(&ctx, "Smith", "2050-01-01", "2050-01-03").await;
    ctx.login().await;

    let show = ctx.get(&format!("/admin/reservations/all/{}/show", id)).await;
    assert_eq!(show.status, StatusCode::OK);
    assert!(show.body.contains("value=\"Smith\""));

    let invalid = ctx
        .post_form(
            &format!("/admin/reservations/all/{}", id),
            &[("first_name", "Jane"), ("last_name", ""), ("email", "jane@")],
        )
        .await;
    assert_eq!(invalid.status, StatusCode::OK);
    assert!(invalid.body.contains("This field cannot be blank"));
    assert_eq!(ctx.repo.reservations()[0].first_name, "John");

    let saved = ctx
        .post_form(
            &format!("/admin/reservations/all/{}", id),
            &[
                ("first_name", "Jane"),
                ("last_name", "Smith"),
                ("email", "jane@smith.com"),
                ("phone", "555-0100"),
            ],
        )
        .await;
    assert_eq!(saved.status, StatusCode::SEE_OTHER);
    assert_eq!(saved.location.as_deref(), Some("/admin/reservations-all"));

    let stored = &ctx.repo.reservations()[0];
    assert_eq!(stored.first_name, "Jane");
    assert_eq!(stored.email, "jane@smith.com");
}

#[tokio::test]
async fn test_unknown_reservation_and_listing() {
    let ctx = TestContext::new();
    let id = book(&ctx, "Smith", "2050-01-01", "2050-01-03").await;
    ctx.login().await;

    let missing = ctx.get("/admin/reservations/all/999/show").await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let bad_source = ctx.get(&format!("/admin/reservations/elsewhere/{}/show", id)).await;
    assert_eq!(bad_source.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_reservation_frees_room() {
    let ctx = TestContext::new();
    let id = book(&ctx, "Smith", "2050-01-01", "2050-01-03").await;
    ctx.login().await;

    let deleted = ctx
        .get(&format!("/admin/delete-reservation/cal/{}/do?y=2050&m=1", id))
        .await;
    assert_eq!(deleted.status, StatusCode::SEE_OTHER);
    assert_eq!(
        deleted.location.as_deref(),
        Some("/admin/reservations-calendar?y=2050&m=1")
    );

    assert!(ctx.repo.reservations().is_empty());
    assert!(ctx.repo.room_restrictions().is_empty());
}

#[tokio::test]
async fn test_calendar_owner_blocks() {
    let ctx = TestContext::new();
    let id = book(&ctx, "Smith", "2050-01-01", "2050-01-03").await;
    ctx.login().await;

    let calendar = ctx.get("/admin/reservations-calendar?y=2050&m=1").await;
    assert_eq!(calendar.status, StatusCode::OK);
    assert!(calendar.body.contains("January 2050"));
    assert!(calendar.body.contains(&format!("/admin/reservations/cal/{}/show", id)));
    assert!(calendar.body.contains("add_block_1_2050-01-05"));
    assert!(!calendar.body.contains("add_block_1_2050-01-02"));
    assert!(calendar.body.contains("y=2049&m=12"));
    assert!(calendar.body.contains("y=2050&m=2"));

    let added = ctx
        .post_form(
            "/admin/reservations-calendar",
            &[("y", "2050"), ("m", "1"), ("add_block_2_2050-01-05", "on")],
        )
        .await;
    assert_eq!(added.status, StatusCode::SEE_OTHER);
    assert_eq!(
        added.location.as_deref(),
        Some("/admin/reservations-calendar?y=2050&m=1")
    );

    let block = ctx
        .repo
        .room_restrictions()
        .into_iter()
        .find(|r| r.kind() == Some(RestrictionKind::OwnerBlock))
        .unwrap();
    assert_eq!(block.room_id, 2);
    assert_eq!(block.start_date.to_string(), "2050-01-05");
    assert_eq!(block.end_date.to_string(), "2050-01-06");

    let calendar = ctx.get("/admin/reservations-calendar?y=2050&m=1").await;
    let remove_key = format!("remove_block_{}", block.id);
    assert!(calendar.body.contains(&remove_key));

    let removed = ctx
        .post_form(
            "/admin/reservations-calendar",
            &[("y", "2050"), ("m", "1"), (remove_key.as_str(), "on")],
        )
        .await;
    assert_eq!(removed.status, StatusCode::SEE_OTHER);
    assert!(ctx
        .repo
        .room_restrictions()
        .iter()
        .all(|r| r.kind() != Some(RestrictionKind::OwnerBlock)));
}

#[tokio::test]
async fn test_unusable_calendar_month_returns_to_current_month() {
    let ctx = TestContext::new();
    let id = book(&ctx, "Smith", "2050-01-01", "2050-01-03").await;
    ctx.login().await;

    let processed = ctx
        .get(&format!("/admin/process-reservation/cal/{}/do?y=%01&m=1", id))
        .await;
    assert_eq!(processed.status, StatusCode::SEE_OTHER);
    assert_eq!(
        processed.location.as_deref(),
        Some("/admin/reservations-calendar")
    );
    assert!(ctx.repo.reservations()[0].processed);

    let show = ctx
        .get(&format!("/admin/reservations/cal/{}/show?y=%0D%0A&m=13", id))
        .await;
    assert_eq!(show.status, StatusCode::OK);

    let saved = ctx
        .post_form(
            "/admin/reservations-calendar",
            &[("y", "\u{1}"), ("m", "1\r\nX-Injected: yes")],
        )
        .await;
    assert_eq!(saved.status, StatusCode::SEE_OTHER);
    assert_eq!(saved.location.as_deref(), Some("/admin/reservations-calendar"));
}

#[tokio::test]
async fn test_calendar_skips_stale_block_removals() {
    let ctx = TestContext::new();
    book(&ctx, "Smith", "2050-01-01", "2050-01-03").await;
    let booked = ctx.repo.room_restrictions()[0].id;
    ctx.login().await;

    let removed = ctx
        .post_form(
            "/admin/reservations-calendar",
            &[
                ("y", "2050"),
                ("m", "1"),
                ("remove_block_999", "on"),
                (format!("remove_block_{}", booked).as_str(), "on"),
                ("add_block_2_2050-01-07", "on"),
            ],
        )
        .await;
    assert_eq!(removed.status, StatusCode::SEE_OTHER);

    let restrictions = ctx.repo.room_restrictions();
    assert_eq!(restrictions.len(), 2);
    assert!(restrictions.iter().any(|r| r.id == booked));
}
