//! Staff administration calls over the authenticated client, plus the role gates
//! the staff screens sit behind.

mod common;

use anyhow::Result;
use serde_json::json;

use serveline::error::ClientError;
use serveline::identity::{
    guard_route, permit, RouteDecision, Role, ADMIN_ROLES, LOGIN_ROUTE, PROFILE_PATH, REFRESH_PATH,
};
use serveline::staff::{CreateStaff, StaffFilter, UpdateStaffStatus, STAFF_PATH};
use serveline::transport::ApiResponse;

use common::{resumed_context, tokens_reply, user_json, MockTransport};

#[tokio::test]
async fn list_sends_filters_and_decodes_staff() -> Result<()> {
    let mock = MockTransport::new("A1");
    mock.reply(
        "/auth/staff?role=WAITER&isActive=true",
        ApiResponse::new(200, json!([user_json(11, "WAITER"), user_json(12, "WAITER")])),
    );
    let ctx = resumed_context(&mock, "A1", "R1");

    let staff = ctx.staff.list(StaffFilter { role: Some(Role::Waiter), is_active: Some(true) }).await?;
    assert_eq!(staff.len(), 2);
    assert!(staff.iter().all(|s| s.role == Role::Waiter && s.restaurant_id == 1));
    assert_eq!(staff[0].name, "User 11");
    Ok(())
}

#[tokio::test]
async fn create_and_update_status_hit_the_right_endpoints() -> Result<()> {
    let mock = MockTransport::new("A1");
    mock.reply(STAFF_PATH, ApiResponse::new(201, user_json(20, "CHEF")));
    let mut disabled = user_json(20, "CHEF");
    disabled["canLogin"] = json!(false);
    mock.reply("/auth/staff/20/status", ApiResponse::new(200, disabled));
    let ctx = resumed_context(&mock, "A1", "R1");

    let created = ctx
        .staff
        .create(&CreateStaff {
            name: "User 20".into(),
            email: "user20@bistro.test".into(),
            password: "hunter22".into(),
            role: Role::Chef,
            phone: None,
        })
        .await?;
    assert_eq!(created.id, 20);
    let sent = &mock.requests_to(STAFF_PATH)[0];
    assert_eq!(sent.method, "POST");
    assert_eq!(
        sent.body,
        Some(json!({"name": "User 20", "email": "user20@bistro.test", "password": "hunter22", "role": "CHEF"}))
    );

    let updated = ctx.staff.update_status(20, &UpdateStaffStatus { is_active: None, can_login: Some(false) }).await?;
    assert!(!updated.can_login);
    let sent = &mock.requests_to("/auth/staff/20/status")[0];
    assert_eq!(sent.method, "PATCH");
    assert_eq!(sent.body, Some(json!({"canLogin": false})));
    Ok(())
}

#[tokio::test]
async fn staff_calls_ride_the_refresh_path() -> Result<()> {
    let mock = MockTransport::new("A2");
    mock.reply_refresh(tokens_reply("A2", "R2"));
    mock.reply("/auth/staff/5", ApiResponse::new(200, user_json(5, "OWNER")));
    let ctx = resumed_context(&mock, "A1", "R1");

    let owner = ctx.staff.get(5).await?;
    assert_eq!(owner.role, Role::Owner);
    assert_eq!(mock.requests_to(REFRESH_PATH).len(), 1);
    Ok(())
}

#[tokio::test]
async fn missing_staff_member_is_an_http_error() -> Result<()> {
    let mock = MockTransport::new("A1");
    mock.reply("/auth/staff/404", ApiResponse::new(404, json!({"message": "Staff member not found"})));
    let ctx = resumed_context(&mock, "A1", "R1");

    let err = ctx.staff.get(404).await.unwrap_err();
    assert_eq!(err, ClientError::Http { status: 404, message: "Staff member not found".into() });
    assert!(!err.requires_reauth());
    Ok(())
}

#[tokio::test]
async fn only_admins_and_owners_reach_staff_screens() -> Result<()> {
    assert!(permit(Role::Admin, ADMIN_ROLES));
    assert!(permit(Role::Owner, ADMIN_ROLES));
    for role in [Role::Manager, Role::Waiter, Role::Chef] {
        assert!(!permit(role, ADMIN_ROLES));
    }

    let mock = MockTransport::new("A1");
    mock.reply(PROFILE_PATH, ApiResponse::new(200, user_json(3, "WAITER")));
    let ctx = resumed_context(&mock, "A1", "R1");
    assert_eq!(guard_route(&ctx.auth.session(), "/staff"), RouteDecision::NeedsProfile);
    ctx.auth.fetch_profile().await?;
    assert_eq!(guard_route(&ctx.auth.session(), "/staff"), RouteDecision::Denied);
    assert_eq!(guard_route(&ctx.auth.session(), "/orders"), RouteDecision::Allow);

    ctx.auth.logout();
    assert_eq!(guard_route(&ctx.auth.session(), "/staff"), RouteDecision::Redirect(LOGIN_ROUTE));
    Ok(())
}
