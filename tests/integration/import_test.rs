//! Import-to-execution-shape tests: each importer's output is stored and
//! resolved the way the request editor would send it.

use super::Fixture;
use rest_workbench::environment::{Environment, EnvironmentVariable};
use rest_workbench::models::{BodyType, Folder, HttpMethod};
use rest_workbench::openapi::{OpenApiError, BASE_URL_VARIABLE, BEARER_TOKEN_VARIABLE};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[test]
fn test_curl_import_resolves_against_environment() {
    let mut f = Fixture::new();
    let env = f.save_environment(Environment::with_variables(
        "dev",
        vec![
            EnvironmentVariable::global("host", "https://global.example.com"),
            EnvironmentVariable::collection("host", "https://collection.example.com", &f.collection.id),
            EnvironmentVariable::global("token", "abc"),
        ],
    ));

    let request = f
        .workbench
        .import_curl(
            r#"curl -X PATCH "{{host}}/users/7?fields=name&fields=email" \
                -H 'Authorization: Bearer {{token}}' \
                -H 'Content-Type: application/json' \
                --data-raw '{"name":"{{newName}}"}'"#,
            &f.folder.id,
        )
        .unwrap();
    let request = f.add_request(request);

    assert_eq!(request.method, HttpMethod::PATCH);
    assert_eq!(request.url, "{{host}}/users/7");
    assert_eq!(request.params.len(), 2);

    let resolved = f.workbench.resolve_request(&request, Some(&env));
    assert_eq!(
        resolved.url,
        "https://collection.example.com/users/7?fields=name&fields=email"
    );
    assert_eq!(resolved.header("authorization"), Some("Bearer abc"));
    // unresolved placeholders survive verbatim
    assert!(resolved.body.unwrap().content.contains("{{newName}}"));
}

#[test]
fn test_curl_import_failure_is_reported() {
    let f = Fixture::new();
    assert!(f.workbench.import_curl("", &f.folder.id).is_err());
    assert!(f.workbench.import_curl("curl -H 'Accept: */*'", &f.folder.id).is_err());
}

#[test]
fn test_postman_collection_and_environment_round_trip() {
    let mut f = Fixture::new();
    let collection = f
        .workbench
        .import_postman_collection(&json!({
            "info": {"name": "Shop", "description": "Shop API"},
            "variable": [{"key": "version", "value": "v2"}],
            "item": [
                {
                    "name": "Orders",
                    "item": [
                        {
                            "name": "Create order",
                            "request": {
                                "method": "post",
                                "header": [
                                    {"key": "Authorization", "value": "Bearer {{token}}"},
                                    {"key": "X-Debug", "value": "1", "disabled": true}
                                ],
                                "url": "{{baseUrl}}/{{version}}/orders?dryRun=true",
                                "body": {"mode": "raw", "raw": "{\"sku\": \"{{sku}}\"}"}
                            },
                            "event": [{
                                "listen": "test",
                                "script": {"exec": [
                                    "const order = pm.response.json();",
                                    "pm.environment.set('orderId', order.id);"
                                ]}
                            }]
                        },
                        {
                            "name": "Archive",
                            "item": [{"name": "List archived", "request": {"method": "GET", "url": "{{baseUrl}}/archive"}}]
                        }
                    ]
                },
                {"name": "Health", "request": {"method": "GET", "url": "{{baseUrl}}/health"}}
            ]
        }))
        .unwrap();

    assert_eq!(collection.request_count(), 3);
    let names: Vec<&str> = collection.folders.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["Orders", "General"]);
    assert_eq!(collection.folders[0].requests[1].name, "Archive / List archived");
    assert_eq!(
        collection.folders[0].requests[0].url,
        "{{baseUrl}}/{{version}}/orders?dryRun=true"
    );

    let environment = f
        .workbench
        .import_postman_environment(&json!({
            "name": "Shop dev",
            "values": [
                {"key": "baseUrl", "value": "https://shop.example.com", "enabled": true},
                {"key": "token", "value": "t-1"},
                {"key": "sku", "value": 1234},
                {"key": "version", "value": "v1", "enabled": false}
            ]
        }))
        .unwrap()
        .into_environment();
    let mut environment = f.save_environment(environment);
    // collection variables land in the environment as collection-scoped values
    for variable in &collection.variables {
        environment.variables.push(EnvironmentVariable::collection(
            &variable.key,
            &variable.value,
            &f.collection.id,
        ));
    }
    let environment = f.save_environment(environment);

    let orders = Folder::new("Orders", &f.collection.id);
    f.workbench.store().insert_folder(orders.clone()).unwrap();
    let create = collection.folders[0].requests[0].clone().into_request(&orders.id);
    let create = f.add_request(create);

    assert_eq!(create.method, HttpMethod::POST);
    assert!(create.script.as_deref().unwrap().contains("orderId"));

    let resolved = f.workbench.resolve_request(&create, Some(&environment));
    assert_eq!(resolved.url, "https://shop.example.com/v2/orders?dryRun=true");
    assert_eq!(resolved.header("Authorization"), Some("Bearer t-1"));
    assert_eq!(resolved.header("X-Debug"), None);
    let body = resolved.body.unwrap();
    assert_eq!(body.body_type, BodyType::Json);
    assert!(body.content.contains("\"1234\""));
}

#[test]
fn test_postman_invalid_roots_are_errors() {
    let f = Fixture::new();
    assert!(f
        .workbench
        .import_postman_collection(&json!({"item": []}))
        .is_err());
    assert!(f
        .workbench
        .import_postman_collection(&json!({"info": {"name": "x"}}))
        .is_err());
    assert!(f
        .workbench
        .import_postman_environment(&json!({"name": "x"}))
        .is_err());
}

#[tokio::test]
async fn test_openapi_fetch_and_resolve() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/openapi.json"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "openapi": "3.0.3",
            "info": {"title": "Pets", "description": "Pet store"},
            "servers": [{"url": "https://pets.example.com/v1"}],
            "paths": {
                "/pets": {
                    "get": {
                        "summary": "List pets",
                        "parameters": [
                            {"name": "limit", "in": "query", "required": true, "example": 10},
                            {"name": "cursor", "in": "query"}
                        ]
                    },
                    "post": {
                        "requestBody": {"content": {"application/json": {
                            "schema": {"$ref": "#/components/schemas/Pet"}
                        }}}
                    }
                }
            },
            "components": {
                "schemas": {
                    "Pet": {
                        "type": "object",
                        "properties": {
                            "name": {"type": "string"},
                            "kind": {"type": "string", "enum": ["cat", "dog"]},
                            "age": {"type": "integer"}
                        }
                    }
                },
                "securitySchemes": {"token": {"type": "http", "scheme": "bearer"}}
            }
        })))
        .mount(&server)
        .await;

    let mut f = Fixture::new();
    let parsed = f
        .workbench
        .import_openapi(Some(&format!("{}/openapi.json", server.uri())), None)
        .await
        .unwrap();

    assert_eq!(parsed.title, "Pets");
    assert_eq!(parsed.base_url, "https://pets.example.com/v1");
    assert_eq!(parsed.requests.len(), 2);
    assert_eq!(parsed.requests[1].name, "POST /pets");

    let body: serde_json::Value =
        serde_json::from_str(&parsed.requests[1].body.as_ref().unwrap().content).unwrap();
    assert_eq!(body, json!({"name": "string", "kind": "cat", "age": 0}));

    // inferred variables and security headers become the environment
    let variables: Vec<EnvironmentVariable> = parsed
        .variables
        .iter()
        .map(|v| EnvironmentVariable::global(&v.key, &v.value))
        .collect();
    let mut env = Environment::with_variables("pets", variables);
    env.headers = parsed.headers.clone();
    env.set(BEARER_TOKEN_VARIABLE, "secret");
    let env = f.save_environment(env);
    assert_eq!(env.get(BASE_URL_VARIABLE), Some("https://pets.example.com/v1"));

    let list = parsed.requests[0].clone().into_request(&f.folder.id);
    let list = f.add_request(list);
    let resolved = f.workbench.resolve_request(&list, Some(&env));
    assert_eq!(resolved.url, "https://pets.example.com/v1/pets?limit=10");
    assert_eq!(resolved.header("Authorization"), Some("Bearer secret"));
}

#[tokio::test]
async fn test_openapi_fetch_error_carries_status_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let f = Fixture::new();
    let err = f
        .workbench
        .import_openapi(Some(&server.uri()), None)
        .await
        .unwrap_err();

    assert!(matches!(err, OpenApiError::Fetch { status: 503, .. }));
    assert!(err.to_string().contains("Service Unavailable"));
}
