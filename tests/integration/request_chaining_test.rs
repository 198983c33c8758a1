//! Request chaining: a post-response script captures a value from one
//! response, the caller applies it, and the next request picks it up.

use super::Fixture;
use rest_workbench::config::WorkbenchConfig;
use rest_workbench::environment::{Environment, EnvironmentVariable, VariableScope};
use rest_workbench::models::{HttpMethod, Request, RequestBody};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn auth_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({"username": "ada", "password": "hunter2"})))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Session", "s-9")
                .set_body_json(json!({"data": {"token": "t-123", "user": {"id": 7}}})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/7"))
        .and(header("authorization", "Bearer t-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7, "name": "Ada"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/7"))
        .respond_with(ResponseTemplate::new(401))
        .with_priority(10)
        .mount(&server)
        .await;
    server
}

fn login_request(f: &Fixture) -> Request {
    let mut login = Request::new("Login", HttpMethod::POST, "{{baseUrl}}/auth/login", &f.folder.id);
    login.set_body(RequestBody::json(
        r#"{"username": "{{username}}", "password": "{{password}}"}"#,
    ));
    login.script = Some(
        r#"
        const body = pm.response.json();
        if (pm.response.code === 200) {
            pm.environment.set("token", body.data.token);
            pm.environment.set("userId", body.data.user.id);
            console.log(`session ${pm.response.headers.get("x-session")}`);
        } else {
            console.warn("login failed", pm.response.status);
        }
        "#
        .to_string(),
    );
    f.add_request(login)
}

fn profile_request(f: &Fixture) -> Request {
    let mut profile = Request::new("Profile", HttpMethod::GET, "{{baseUrl}}/users/{{userId}}", &f.folder.id);
    profile.add_header("Authorization", "Bearer {{token}}");
    f.add_request(profile)
}

#[tokio::test]
async fn test_login_token_flows_into_next_request() {
    let server = auth_server().await;
    let mut f = Fixture::new();
    let workspace_id = f.workspace.id.clone();
    let env = f.save_environment(Environment::with_variables(
        "dev",
        vec![
            EnvironmentVariable::collection("baseUrl", server.uri(), &f.collection.id),
            EnvironmentVariable::global("username", "ada"),
            EnvironmentVariable::global("password", "hunter2"),
            EnvironmentVariable::workspace("token", "stale", &workspace_id),
        ],
    ));
    let login = login_request(&f);
    let profile = profile_request(&f);

    let run = f.workbench.send_request(&login, Some(&env)).await.unwrap();
    assert_eq!(run.response.status, 200);
    let outcome = run.script.expect("login has a script");
    assert!(outcome.is_success(), "{:?}", outcome.error);
    assert_eq!(
        outcome.logs,
        vec![
            r#"Environment variable "token" = "t-123""#,
            r#"Environment variable "userId" = "7""#,
            "session s-9",
        ]
    );

    // nothing persisted yet
    assert_eq!(
        f.stored_environment().get("token"),
        Some("stale"),
    );
    assert!(f.workbench.apply_script_result(&outcome).unwrap());

    let env = f.stored_environment();
    let token = env.variables.iter().find(|v| v.key == "token").unwrap();
    assert_eq!(token.value, "t-123");
    assert_eq!(token.scope, VariableScope::Workspace);

    let run = f.workbench.send_request(&profile, Some(&env)).await.unwrap();
    assert_eq!(run.request.url, format!("{}/users/7", server.uri()));
    assert_eq!(run.response.status, 200);
    assert_eq!(run.response.parsed_body()["name"], "Ada");
    assert!(run.script.is_none());
}

#[tokio::test]
async fn test_without_applying_next_request_uses_old_values() {
    let server = auth_server().await;
    let mut f = Fixture::new();
    let env = f.save_environment(Environment::with_variables(
        "dev",
        vec![
            EnvironmentVariable::global("baseUrl", server.uri()),
            EnvironmentVariable::global("userId", "7"),
            EnvironmentVariable::global("token", "stale"),
        ],
    ));
    let profile = profile_request(&f);

    let run = f.workbench.send_request(&profile, Some(&env)).await.unwrap();
    assert_eq!(run.response.status, 401);
    assert_eq!(run.response.status_text, "Unauthorized");
}

#[tokio::test]
async fn test_broken_script_does_not_fail_the_request() {
    let server = auth_server().await;
    let mut f = Fixture::new();
    let env = f.save_environment(Environment::with_variables(
        "dev",
        vec![
            EnvironmentVariable::global("baseUrl", server.uri()),
            EnvironmentVariable::global("username", "ada"),
            EnvironmentVariable::global("password", "hunter2"),
        ],
    ));
    let mut login = login_request(&f);
    login.script = Some(
        "pm.environment.set('before', 'yes');\nrequire('child_process').exec('rm -rf /');".to_string(),
    );

    let run = f.workbench.send_request(&login, Some(&env)).await.unwrap();
    assert_eq!(run.response.status, 200);

    let outcome = run.script.unwrap();
    assert_eq!(
        outcome.error.as_deref(),
        Some("ReferenceError: require is not defined")
    );
    assert_eq!(
        outcome.logs.last().map(String::as_str),
        Some("ERROR: ReferenceError: require is not defined")
    );

    // the partial update is still handed back and can be applied
    f.workbench.apply_script_result(&outcome).unwrap();
    assert_eq!(f.stored_environment().get("before"), Some("yes"));
}

#[tokio::test]
async fn test_runaway_script_is_stopped() {
    let server = auth_server().await;
    let config = WorkbenchConfig {
        script_step_budget: 10_000,
        ..WorkbenchConfig::default()
    };
    let mut f = Fixture::with_config(config);
    let env = f.save_environment(Environment::with_variables(
        "dev",
        vec![
            EnvironmentVariable::global("baseUrl", server.uri()),
            EnvironmentVariable::global("username", "ada"),
            EnvironmentVariable::global("password", "hunter2"),
        ],
    ));
    let mut login = login_request(&f);
    login.script = Some("for (;;) { pm.response.json(); }".to_string());

    let run = f.workbench.send_request(&login, Some(&env)).await.unwrap();
    let outcome = run.script.unwrap();
    assert_eq!(
        outcome.error.as_deref(),
        Some("Script exceeded the step budget of 10000 steps")
    );
}

#[tokio::test]
async fn test_network_failure_is_an_error() {
    let mut f = Fixture::new();
    let env = f.save_environment(Environment::with_variables(
        "dev",
        vec![EnvironmentVariable::global("baseUrl", "http://127.0.0.1:1")],
    ));
    let login = login_request(&f);

    assert!(f.workbench.send_request(&login, Some(&env)).await.is_err());
}
