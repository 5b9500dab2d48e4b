//! Dispatches an incoming request to a handler by matching its method and
//! (percent-decoded) path against a registered list of patterns.
//!
//! Each pattern is compiled once, at registration time, into a `Regex`;
//! dispatch is then a linear scan trying each route's compiled pattern in
//! registration order. Named wildcard segments (`:id`) and catch-all
//! segments (`*rest`) are rewritten into capturing groups; a request's
//! method reflection (a Qt meta-object-style named-member invocation in
//! the system this router's design was ported from) has no analogue in
//! Rust and collapses into the same `InvokeHandler` path, since handlers
//! here are already plain trait objects rather than reflected methods.

use std::cell::RefCell;
use std::rc::Weak;

use regex::Regex;
use url::percent_encoding::percent_decode;

use headers::HeaderCollection;
use status;

/// The minimal surface the router needs from an in-flight request: read
/// its method/path, bind matched params onto it, and (if no route
/// claims it, or none exists) write a synthesized response directly.
pub trait RequestContext {
    fn request_method(&self) -> &[u8];
    fn request_path(&self) -> &[u8];
    fn set_request_param(&mut self, name: &str, value: &str);
    fn write_response(&mut self, status: u16, headers: &HeaderCollection, body: &[u8]);
}

/// A registered route's target. Handlers are held weakly: if the
/// handler has since been destroyed, invocation silently fails and the
/// dispatcher behaves as though the route had not matched at all.
pub enum RouteAction {
    InvokeHandler(Weak<RefCell<dyn Handler>>),
    ServeStatic { status: u16, headers: HeaderCollection, body: Vec<u8> },
}

pub trait Handler {
    fn invoke(&mut self, ctx: &mut dyn RequestContext, params: &[(String, String)]);
}

impl RouteAction {
    /// Whether the target this action would invoke is still alive. A
    /// `ServeStatic` action, which owns its response outright, is always
    /// alive; a weakly-held handler is alive only while something else
    /// still owns it.
    fn is_alive(&self) -> bool {
        match *self {
            RouteAction::InvokeHandler(ref weak) => weak.upgrade().is_some(),
            RouteAction::ServeStatic { .. } => true,
        }
    }

    fn invoke(&self, ctx: &mut dyn RequestContext, params: &[(String, String)]) -> bool {
        match *self {
            RouteAction::InvokeHandler(ref weak) => match weak.upgrade() {
                Some(handler) => {
                    handler.borrow_mut().invoke(ctx, params);
                    true
                }
                None => false,
            },
            RouteAction::ServeStatic { status, ref headers, ref body } => {
                ctx.write_response(status, headers, body);
                true
            }
        }
    }
}

/// What to do with a request whose path matches no route at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmatchedAction {
    /// Leave the request untouched; return `false` from `dispatch`.
    Passthrough,
    /// Synthesize a 404 response.
    Return404,
}

/// What to do with a request whose path matches one or more routes, but
/// none for the request's method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodMismatchAction {
    Passthrough,
    /// Synthesize a 405 response with an `Allow` header listing the
    /// methods of every path-matched candidate.
    Return405,
}

struct Route {
    method: Option<Vec<u8>>,
    pattern: Regex,
    /// Parameter name paired with its regex capture-group index (1-based).
    /// Listed `:name` placeholders first, then `*name` placeholders,
    /// regardless of how the two kinds interleave in the source pattern;
    /// the group index is what ties each name back to the right capture.
    capture_order: Vec<(String, usize)>,
    action: RouteAction,
}

impl Route {
    fn try_match(&self, path: &str) -> Option<Vec<(String, String)>> {
        self.pattern.captures(path).map(|caps| {
            self.capture_order.iter()
                .map(|&(ref name, group)| {
                    let value = caps.get(group).map(|m| m.as_str()).unwrap_or("");
                    (name.clone(), value.to_string())
                })
                .collect()
        })
    }

    fn method_matches(&self, method: &[u8]) -> bool {
        match self.method {
            None => true,
            Some(ref m) => m.eq_ignore_ascii_case(method),
        }
    }

    fn allow_token(&self) -> Vec<u8> {
        self.method.clone().unwrap_or_else(|| b"*".to_vec())
    }
}

/// Registry of routes plus the policy for unmatched paths and method
/// mismatches. Dispatch is a linear scan in registration order.
pub struct Router {
    routes: Vec<Route>,
    pub unmatched_action: UnmatchedAction,
    pub method_mismatch_action: MethodMismatchAction,
}

impl Router {
    pub fn new() -> Router {
        Router {
            routes: Vec::new(),
            unmatched_action: UnmatchedAction::Passthrough,
            method_mismatch_action: MethodMismatchAction::Passthrough,
        }
    }

    /// Registers a route. `method` of `None` matches any method.
    /// `pattern` uses `:name` for a single path segment and `*name` for
    /// a greedy catch-all; literal text is matched and anchored exactly.
    pub fn add_route(&mut self, method: Option<&[u8]>, pattern: &str, action: RouteAction) {
        let (regex, capture_order) = compile_pattern(pattern);
        self.routes.push(Route {
            method: method.map(|m| m.to_vec()),
            pattern: regex,
            capture_order,
            action,
        });
    }

    /// Attempts to dispatch `ctx`. Returns `true` if a route handled it
    /// (including a synthesized 404/405), `false` if it was left
    /// untouched.
    pub fn dispatch(&mut self, ctx: &mut dyn RequestContext) -> bool {
        let method = ctx.request_method().to_vec();
        let decoded = percent_decode(ctx.request_path()).decode_utf8_lossy().into_owned();

        let mut path_matched: Vec<Vec<u8>> = Vec::new();
        for route in &self.routes {
            let params = match route.try_match(&decoded) {
                Some(p) => p,
                None => continue,
            };
            if !route.action.is_alive() {
                // A destroyed handler's route is as if it never existed:
                // not path-matched, not method-matched, nothing recorded.
                continue;
            }
            path_matched.push(route.allow_token());
            if !route.method_matches(&method) {
                continue;
            }
            for (name, value) in &params {
                ctx.set_request_param(name, value);
            }
            if route.action.invoke(ctx, &params) {
                return true;
            }
        }

        if path_matched.is_empty() {
            debug!("no route matched path {:?}", decoded);
            if self.unmatched_action == UnmatchedAction::Return404 {
                synthesize_status(ctx, 404, &HeaderCollection::new());
                return true;
            }
            return false;
        }

        debug!("path {:?} matched but not for method {:?}", decoded, String::from_utf8_lossy(&method));
        if self.method_mismatch_action == MethodMismatchAction::Return405 {
            let allow = path_matched.join(&b", "[..]);
            let mut headers = HeaderCollection::new();
            headers.append(&b"Allow"[..], allow);
            synthesize_status(ctx, 405, &headers);
            return true;
        }
        false
    }
}

fn synthesize_status(ctx: &mut dyn RequestContext, code: u16, headers: &HeaderCollection) {
    let body = status::reason_phrase(code).as_bytes();
    ctx.write_response(code, headers, body);
}

fn is_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Rewrites `template` into an anchored regex plus the list of captured
/// parameter names, each paired with the regex capture-group index
/// (1-based) its value lives in. Group indices follow textual order, the
/// order `Regex` numbers its groups in; but the returned name list lists
/// every `:name` placeholder first, then every `*name` placeholder, in
/// their respective source order, no matter how the two kinds interleave
/// in the pattern text.
fn compile_pattern(template: &str) -> (Regex, Vec<(String, usize)>) {
    let bytes = template.as_bytes();
    let mut out = String::from("^");
    let mut colon_names: Vec<(String, usize)> = Vec::new();
    let mut star_names: Vec<(String, usize)> = Vec::new();
    let mut literal_start = 0;
    let mut group_index = 0;
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        if c == b':' || c == b'*' {
            out.push_str(&escape(&template[literal_start..i]));
            let start = i + 1;
            let mut j = start;
            while j < bytes.len() && is_name_char(bytes[j]) {
                j += 1;
            }
            group_index += 1;
            let name = template[start..j].to_string();
            if c == b':' {
                colon_names.push((name, group_index));
                out.push_str(r"([\w-]+)");
            } else {
                star_names.push((name, group_index));
                out.push_str(r"(.*)");
            }
            i = j;
            literal_start = j;
        } else {
            i += 1;
        }
    }
    out.push_str(&escape(&template[literal_start..]));
    out.push('$');
    colon_names.extend(star_names);
    (Regex::new(&out).expect("router pattern compiles to valid regex"), colon_names)
}

fn escape(literal: &str) -> String {
    ::regex::escape(literal)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct FakeRequest {
        method: Vec<u8>,
        path: Vec<u8>,
        params: Vec<(String, String)>,
        response: Option<(u16, HeaderCollection, Vec<u8>)>,
    }

    impl RequestContext for FakeRequest {
        fn request_method(&self) -> &[u8] { &self.method }
        fn request_path(&self) -> &[u8] { &self.path }
        fn set_request_param(&mut self, name: &str, value: &str) {
            self.params.push((name.to_string(), value.to_string()));
        }
        fn write_response(&mut self, status: u16, headers: &HeaderCollection, body: &[u8]) {
            self.response = Some((status, headers.clone(), body.to_vec()));
        }
    }

    struct RecordingHandler {
        seen: Vec<Vec<(String, String)>>,
    }
    impl Handler for RecordingHandler {
        fn invoke(&mut self, ctx: &mut dyn RequestContext, params: &[(String, String)]) {
            self.seen.push(params.to_vec());
            ctx.write_response(200, &HeaderCollection::new(), b"ok");
        }
    }

    #[test]
    fn test_named_and_catchall_segments_bind_in_source_order() {
        let mut router = Router::new();
        let handler = Rc::new(RefCell::new(RecordingHandler { seen: Vec::new() }));
        router.add_route(
            Some(b"GET"),
            "/items/:id/*rest",
            RouteAction::InvokeHandler(Rc::downgrade(&handler)),
        );
        let mut ctx = FakeRequest {
            method: b"GET".to_vec(),
            path: b"/items/42/a/b/c".to_vec(),
            params: Vec::new(),
            response: None,
        };
        assert!(router.dispatch(&mut ctx));
        assert_eq!(ctx.params, vec![
            ("id".to_string(), "42".to_string()),
            ("rest".to_string(), "a/b/c".to_string()),
        ]);
    }

    #[test]
    fn test_colon_names_bind_before_star_names_regardless_of_source_order() {
        let mut router = Router::new();
        let handler = Rc::new(RefCell::new(RecordingHandler { seen: Vec::new() }));
        router.add_route(
            Some(b"GET"),
            "/*rest/items/:id",
            RouteAction::InvokeHandler(Rc::downgrade(&handler)),
        );
        let mut ctx = FakeRequest {
            method: b"GET".to_vec(),
            path: b"/a/b/items/42".to_vec(),
            params: Vec::new(),
            response: None,
        };
        assert!(router.dispatch(&mut ctx));
        assert_eq!(ctx.params, vec![
            ("id".to_string(), "42".to_string()),
            ("rest".to_string(), "a/b".to_string()),
        ]);
    }

    #[test]
    fn test_dead_handler_is_treated_as_no_match() {
        let mut router = Router::new();
        {
            let handler = Rc::new(RefCell::new(RecordingHandler { seen: Vec::new() }));
            router.add_route(Some(b"GET"), "/x", RouteAction::InvokeHandler(Rc::downgrade(&handler)));
            // handler dropped here; only a Weak remains in the route
        }
        router.unmatched_action = UnmatchedAction::Return404;
        let mut ctx = FakeRequest {
            method: b"GET".to_vec(),
            path: b"/x".to_vec(),
            params: Vec::new(),
            response: None,
        };
        assert!(router.dispatch(&mut ctx));
        assert_eq!(ctx.response.unwrap().0, 404);
    }

    #[test]
    fn test_unmatched_path_passthrough_by_default() {
        let mut router = Router::new();
        let mut ctx = FakeRequest {
            method: b"GET".to_vec(),
            path: b"/nope".to_vec(),
            params: Vec::new(),
            response: None,
        };
        assert!(!router.dispatch(&mut ctx));
        assert!(ctx.response.is_none());
    }

    #[test]
    fn test_unmatched_path_returns_404_when_configured() {
        let mut router = Router::new();
        router.unmatched_action = UnmatchedAction::Return404;
        let mut ctx = FakeRequest {
            method: b"GET".to_vec(),
            path: b"/nope".to_vec(),
            params: Vec::new(),
            response: None,
        };
        assert!(router.dispatch(&mut ctx));
        assert_eq!(ctx.response.unwrap().0, 404);
    }

    #[test]
    fn test_method_mismatch_returns_405_with_allow_header() {
        let mut router = Router::new();
        let get_handler = Rc::new(RefCell::new(RecordingHandler { seen: Vec::new() }));
        let post_handler = Rc::new(RefCell::new(RecordingHandler { seen: Vec::new() }));
        router.add_route(Some(b"GET"), "/thing", RouteAction::InvokeHandler(Rc::downgrade(&get_handler)));
        router.add_route(Some(b"POST"), "/thing", RouteAction::InvokeHandler(Rc::downgrade(&post_handler)));
        router.method_mismatch_action = MethodMismatchAction::Return405;

        let mut ctx = FakeRequest {
            method: b"DELETE".to_vec(),
            path: b"/thing".to_vec(),
            params: Vec::new(),
            response: None,
        };
        assert!(router.dispatch(&mut ctx));
        let (status, headers, _) = ctx.response.unwrap();
        assert_eq!(status, 405);
        assert_eq!(headers.get(b"allow"), Some(&b"GET, POST"[..]));
    }

    #[test]
    fn test_percent_decoded_path_is_matched() {
        let mut router = Router::new();
        let handler = Rc::new(RefCell::new(RecordingHandler { seen: Vec::new() }));
        router.add_route(Some(b"GET"), "/items/:name", RouteAction::InvokeHandler(Rc::downgrade(&handler)));
        let mut ctx = FakeRequest {
            method: b"GET".to_vec(),
            path: b"/items/hello%20world".to_vec(),
            params: Vec::new(),
            response: None,
        };
        assert!(router.dispatch(&mut ctx));
        assert_eq!(ctx.params, vec![("name".to_string(), "hello world".to_string())]);
    }

    #[test]
    fn test_any_method_route_matches_every_verb() {
        let mut router = Router::new();
        let handler = Rc::new(RefCell::new(RecordingHandler { seen: Vec::new() }));
        router.add_route(None, "/ping", RouteAction::InvokeHandler(Rc::downgrade(&handler)));
        let mut ctx = FakeRequest {
            method: b"OPTIONS".to_vec(),
            path: b"/ping".to_vec(),
            params: Vec::new(),
            response: None,
        };
        assert!(router.dispatch(&mut ctx));
    }

    #[test]
    fn test_serve_static_action() {
        let mut router = Router::new();
        let mut headers = HeaderCollection::new();
        headers.append(&b"Content-Type"[..], &b"text/plain"[..]);
        router.add_route(Some(b"GET"), "/static.txt", RouteAction::ServeStatic {
            status: 200,
            headers,
            body: b"hello".to_vec(),
        });
        let mut ctx = FakeRequest {
            method: b"GET".to_vec(),
            path: b"/static.txt".to_vec(),
            params: Vec::new(),
            response: None,
        };
        assert!(router.dispatch(&mut ctx));
        let (status, headers, body) = ctx.response.unwrap();
        assert_eq!(status, 200);
        assert_eq!(headers.get(b"content-type"), Some(&b"text/plain"[..]));
        assert_eq!(body, b"hello".to_vec());
    }
}
