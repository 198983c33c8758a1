//! Scoped variable resolution.
//!
//! A request sits inside a collection, which sits inside a workspace. When a
//! `{{key}}` is resolved for a request, the active environment is searched in
//! priority order:
//!
//! 1. enabled collection-scoped variable for the request's collection
//! 2. enabled workspace-scoped variable for the collection's workspace
//! 3. enabled global variable
//!
//! Every failure along the way (no environment, broken ownership chain,
//! unknown key) resolves to `None`; the placeholder then stays in the text.

use super::substitution::substitute;
use crate::environment::{Environment, VariableScope};
use crate::models::{HttpMethod, Request, RequestBody};
use crate::storage::WorkspaceStore;
use serde::Serialize;
use url::form_urlencoded;

/// The collection and workspace a request belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeChain {
    pub collection_id: String,
    pub workspace_id: String,
}

impl ScopeChain {
    pub fn new(collection_id: impl Into<String>, workspace_id: impl Into<String>) -> Self {
        Self {
            collection_id: collection_id.into(),
            workspace_id: workspace_id.into(),
        }
    }

    /// Walks request → folder → collection. `None` if any link is missing.
    pub fn for_request<S: WorkspaceStore + ?Sized>(store: &S, request_id: &str) -> Option<Self> {
        let request = store.get_request(request_id)?;
        Self::for_folder(store, &request.folder_id)
    }

    /// Walks folder → collection. `None` if any link is missing.
    pub fn for_folder<S: WorkspaceStore + ?Sized>(store: &S, folder_id: &str) -> Option<Self> {
        let folder = store.get_folder(folder_id)?;
        let collection = store.get_collection(&folder.collection_id)?;
        Some(Self {
            collection_id: collection.id,
            workspace_id: collection.workspace_id,
        })
    }

    /// Picks the value of `key` by scope priority.
    pub fn lookup<'e>(&self, environment: &'e Environment, key: &str) -> Option<&'e str> {
        let candidates = [
            (VariableScope::Collection, Some(self.collection_id.as_str())),
            (VariableScope::Workspace, Some(self.workspace_id.as_str())),
            (VariableScope::Global, None),
        ];

        candidates.iter().find_map(|(scope, scope_id)| {
            environment
                .variables
                .iter()
                .find(|v| v.matches(key, *scope, *scope_id))
                .map(|v| v.value.as_str())
        })
    }
}

/// Resolves a single variable for the request with id `request_id`.
pub fn resolve_variable<S: WorkspaceStore + ?Sized>(
    store: &S,
    key: &str,
    request_id: &str,
    environment: Option<&Environment>,
) -> Option<String> {
    let environment = environment?;
    let chain = ScopeChain::for_request(store, request_id)?;
    chain.lookup(environment, key).map(str::to_string)
}

/// Substitutes every `{{name}}` in `text` using the scope chain of the request.
///
/// The ownership chain is walked once per call. Unresolved tokens are left
/// verbatim.
pub fn substitute_variables<S: WorkspaceStore + ?Sized>(
    store: &S,
    text: &str,
    request_id: &str,
    environment: Option<&Environment>,
) -> String {
    let (Some(environment), Some(chain)) =
        (environment, ScopeChain::for_request(store, request_id))
    else {
        return text.to_string();
    };
    substitute_with_chain(text, &chain, environment)
}

fn substitute_with_chain(text: &str, chain: &ScopeChain, environment: &Environment) -> String {
    substitute(text, |name| chain.lookup(environment, name).map(str::to_string))
}

/// A request with every placeholder resolved and disabled entries dropped,
/// ready to hand to the executor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedRequest {
    pub method: HttpMethod,
    /// Full URL including the query string built from enabled params.
    pub url: String,
    pub headers: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<RequestBody>,
}

impl ResolvedRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Resolves URL, params, headers and body of `request` against `environment`.
///
/// Enabled environment headers are added after the request's own headers
/// unless the request already sets the same header. A body without an
/// explicit Content-Type gets the one implied by its type.
pub fn resolve_request<S: WorkspaceStore + ?Sized>(
    store: &S,
    request: &Request,
    environment: Option<&Environment>,
) -> ResolvedRequest {
    let chain = ScopeChain::for_folder(store, &request.folder_id);
    let apply = |text: &str| -> String {
        match (environment, chain.as_ref()) {
            (Some(env), Some(chain)) => substitute_with_chain(text, chain, env),
            _ => text.to_string(),
        }
    };

    let mut url = apply(&request.url);
    // params already written into the URL's own query are not repeated
    let existing: Vec<(String, String)> = url
        .split_once('?')
        .map(|(_, query)| query.split('#').next().unwrap_or_default())
        .map(|query| form_urlencoded::parse(query.as_bytes()).into_owned().collect())
        .unwrap_or_default();
    let query: Vec<(String, String)> = request
        .enabled_params()
        .map(|p| (apply(&p.key), apply(&p.value)))
        .filter(|pair| !existing.contains(pair))
        .collect();
    if !query.is_empty() {
        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(query.iter())
            .finish();
        url.push(if url.contains('?') { '&' } else { '?' });
        url.push_str(&encoded);
    }

    let mut headers: Vec<(String, String)> = request
        .enabled_headers()
        .map(|h| (apply(&h.key), apply(&h.value)))
        .collect();
    if let Some(env) = environment {
        for header in env.headers.iter().filter(|h| h.enabled) {
            let key = apply(&header.key);
            if !headers.iter().any(|(k, _)| k.eq_ignore_ascii_case(&key)) {
                headers.push((key, apply(&header.value)));
            }
        }
    }

    let body = request.body.as_ref().map(|b| RequestBody {
        body_type: b.body_type,
        content: apply(&b.content),
    });
    if let Some(b) = &body {
        if !headers
            .iter()
            .any(|(k, _)| k.eq_ignore_ascii_case("content-type"))
        {
            headers.push((
                "Content-Type".to_string(),
                b.body_type.content_type().to_string(),
            ));
        }
    }

    ResolvedRequest {
        method: request.method,
        url,
        headers,
        body,
    }
}
