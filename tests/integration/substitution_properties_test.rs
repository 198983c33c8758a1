//! Property tests for placeholder substitution.

use proptest::prelude::*;
use rest_workbench::environment::{Environment, EnvironmentVariable};
use rest_workbench::models::{Collection, Folder, HttpMethod, Request, Workspace};
use rest_workbench::storage::InMemoryStore;
use rest_workbench::variables::{has_placeholders, placeholder_names, substitute, substitute_variables};
use std::collections::HashMap;

fn name() -> impl Strategy<Value = String> {
    "[a-zA-Z_][a-zA-Z0-9_.-]{0,12}"
}

/// Values never contain braces, so substituted text has no new placeholders.
fn value() -> impl Strategy<Value = String> {
    "[^{}]{0,24}"
}

fn template(names: Vec<String>, fillers: Vec<String>) -> String {
    let mut text = String::new();
    for (i, name) in names.iter().enumerate() {
        text.push_str(fillers.get(i).map(String::as_str).unwrap_or("/"));
        text.push_str("{{");
        text.push_str(name);
        text.push_str("}}");
    }
    text
}

proptest! {
    #[test]
    fn text_without_markers_is_unchanged(text in "[^{]{0,64}") {
        prop_assert_eq!(substitute(&text, |_| Some("x".to_string())), text);
    }

    #[test]
    fn unknown_names_stay_verbatim(
        names in prop::collection::vec(name(), 1..6),
        fillers in prop::collection::vec("[^{}]{0,8}", 0..6),
    ) {
        let text = template(names, fillers);
        prop_assert_eq!(substitute(&text, |_| None), text);
    }

    #[test]
    fn substitution_is_idempotent(
        values in prop::collection::hash_map(name(), value(), 1..8),
        fillers in prop::collection::vec("[^{}]{0,8}", 0..8),
        extra in name(),
    ) {
        let mut names: Vec<String> = values.keys().cloned().collect();
        names.sort();
        names.push(format!("{}_missing", extra));
        let text = template(names, fillers);

        let lookup = |n: &str| values.get(n).cloned();
        let once = substitute(&text, lookup);
        let twice = substitute(&once, lookup);
        prop_assert_eq!(&once, &twice);
        prop_assert_eq!(placeholder_names(&once), vec![format!("{}_missing", extra)]);
    }

    #[test]
    fn every_known_placeholder_is_replaced(
        values in prop::collection::hash_map(name(), value(), 1..8),
    ) {
        let mut names: Vec<String> = values.keys().cloned().collect();
        names.sort();
        let text = template(names, Vec::new());
        let result = substitute(&text, |n| values.get(n).cloned());

        prop_assert!(!has_placeholders(&result));
        let expected: String = {
            let mut keys: Vec<&String> = values.keys().collect();
            keys.sort();
            keys.iter().map(|k| format!("/{}", values[*k])).collect()
        };
        prop_assert_eq!(result, expected);
    }

    #[test]
    fn scoped_resolution_prefers_collection(
        key in name(),
        global in value(),
        workspace in value(),
        collection in value(),
    ) {
        let store = InMemoryStore::new();
        let ws = Workspace::new("w");
        let col = Collection::new("c", &ws.id);
        let folder = Folder::new("f", &col.id);
        let request = Request::new("r", HttpMethod::GET, "/", &folder.id);
        let env = Environment::with_variables(
            "e",
            vec![
                EnvironmentVariable::global(key.clone(), global),
                EnvironmentVariable::workspace(key.clone(), workspace, &ws.id),
                EnvironmentVariable::collection(key.clone(), collection.clone(), &col.id),
            ],
        );
        store.insert_workspace(ws).unwrap();
        store.insert_collection(col).unwrap();
        store.insert_folder(folder).unwrap();
        store.insert_request(request.clone()).unwrap();

        let text = format!("{{{{{}}}}}", key);
        prop_assert_eq!(
            substitute_variables(&store, &text, &request.id, Some(&env)),
            collection
        );
    }
}

#[test]
fn repeated_tokens_share_one_lookup() {
    let mut calls: HashMap<String, usize> = HashMap::new();
    let result = substitute("{{a}}-{{a}}-{{ a }}", |n| {
        *calls.entry(n.to_string()).or_default() += 1;
        Some("1".to_string())
    });
    assert_eq!(result, "1-1-1");
    // "{{a}}" and "{{ a }}" are distinct tokens
    assert_eq!(calls.get("a"), Some(&2));
}
