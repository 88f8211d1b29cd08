mod common;

use axum::http::{Method, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::json;

use common::{test_app, TestApp};

async fn allowed(app: &TestApp, cookie: &str, org: i64, permission: &str) -> bool {
    let res = app
        .get(&format!("/api/organizations/{org}/permissions/{permission}"), Some(cookie))
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    res.body["allowed"].as_bool().unwrap()
}

#[tokio::test]
async fn founder_holds_every_permission() {
    let app = test_app().await;
    app.new_school("State").await;
    app.new_student("State", "ada").await;
    let ada = app.login("ada").await;

    let org = app.new_organization(&ada, "Chess Club").await;

    for permission in ["CREATE_EVENT", "EDIT_EVENT", "DELETE_EVENT", "MANAGE_MEMBERS", "MANAGE_ROLES", "CREATE_POST"] {
        assert!(allowed(&app, &ada, org, permission).await, "{permission}");
    }
}

#[tokio::test]
async fn outsiders_are_denied_and_cannot_manage() {
    let app = test_app().await;
    app.new_school("State").await;
    app.new_student("State", "ada").await;
    app.new_student("State", "bob").await;
    let ada = app.login("ada").await;
    let bob = app.login("bob").await;
    let org = app.new_organization(&ada, "Chess Club").await;

    assert!(!allowed(&app, &bob, org, "EDIT_EVENT").await);

    let res = app
        .json(
            Method::POST,
            &format!("/api/organizations/{org}/roles"),
            Some(json!({ "name": "Sneaky", "permissions": ["MANAGE_ROLES"] })),
            Some(&bob),
        )
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.body["error"], "FORBIDDEN");
}

#[tokio::test]
async fn assigned_role_grants_exactly_its_permissions() {
    let app = test_app().await;
    app.new_school("State").await;
    app.new_student("State", "ada").await;
    let bob_id = app.new_student("State", "bob").await;
    let ada = app.login("ada").await;
    let bob = app.login("bob").await;
    let org = app.new_organization(&ada, "Chess Club").await;

    let role = app
        .json(
            Method::POST,
            &format!("/api/organizations/{org}/roles"),
            Some(json!({ "name": "Editor", "permissions": ["EDIT_EVENT"] })),
            Some(&ada),
        )
        .await;
    assert_eq!(role.status, StatusCode::OK, "{}", role.body);
    let role_id = role.body["id"].as_i64().unwrap();

    let member = app
        .json(
            Method::PUT,
            &format!("/api/organizations/{org}/members/{bob_id}"),
            Some(json!({ "roleId": role_id })),
            Some(&ada),
        )
        .await;
    assert_eq!(member.status, StatusCode::OK, "{}", member.body);
    assert_eq!(member.body, json!({ "userId": bob_id, "organizationId": org, "roleId": role_id }));

    assert!(allowed(&app, &bob, org, "EDIT_EVENT").await);
    assert!(!allowed(&app, &bob, org, "CREATE_EVENT").await);
    assert!(!allowed(&app, &bob, org, "MANAGE_MEMBERS").await);
}

#[tokio::test]
async fn roles_from_other_organizations_are_not_assignable() {
    let app = test_app().await;
    app.new_school("State").await;
    app.new_student("State", "ada").await;
    let bob_id = app.new_student("State", "bob").await;
    let ada = app.login("ada").await;
    let chess = app.new_organization(&ada, "Chess Club").await;
    let choir = app.new_organization(&ada, "Choir").await;

    let role = app
        .json(
            Method::POST,
            &format!("/api/organizations/{choir}/roles"),
            Some(json!({ "name": "Alto" })),
            Some(&ada),
        )
        .await;
    let role_id = role.body["id"].as_i64().unwrap();

    let res = app
        .json(
            Method::PUT,
            &format!("/api/organizations/{chess}/members/{bob_id}"),
            Some(json!({ "roleId": role_id })),
            Some(&ada),
        )
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_permission_names_are_bad_requests() {
    let app = test_app().await;
    app.new_school("State").await;
    app.new_student("State", "ada").await;
    let ada = app.login("ada").await;
    let org = app.new_organization(&ada, "Chess Club").await;

    let res = app
        .get(&format!("/api/organizations/{org}/permissions/LAUNCH_ROCKETS"), Some(&ada))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app
        .json(
            Method::POST,
            &format!("/api/organizations/{org}/roles"),
            Some(json!({ "name": "Astronaut", "permissions": ["LAUNCH_ROCKETS"] })),
            Some(&ada),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn permission_checks_need_a_session() {
    let app = test_app().await;
    let res = app.get("/api/organizations/1/permissions/EDIT_EVENT", None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}
