//! Routing through the full two-pass pipeline.

use std::cell::RefCell;
use std::rc::Rc;

use bytes::Bytes;
use http::{Method, StatusCode};

use gospel_core::node::div;
use gospel_core::{Error, Node, Outcome, Request, Scope};
use gospel_router::{use_router, Route};
use gospel_store::Store;

fn scope(method: Method, uri: &str) -> Scope {
    let request = http::Request::builder()
        .method(method)
        .uri(uri)
        .body(Bytes::new())
        .unwrap();
    Scope::root(Request::from(request), Store::in_memory().shared())
}

fn body(outcome: Outcome) -> String {
    match outcome {
        Outcome::Render { node, .. } => node.render(),
        other => panic!("expected a rendered page, got {:?}", other),
    }
}

#[test]
fn nested_current_path() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let scope = scope(Method::GET, "/a/b");

    let outcome = scope
        .execute(|scope| {
            let seen = seen.clone();
            use_router(scope).matches(
                scope,
                &[Route::new("/a", move |scope| {
                    let router = use_router(scope);
                    let inner = router.matches(
                        scope,
                        &[Route::new("/b", |scope| {
                            Ok(Node::text(use_router(scope).current_path()))
                        })],
                    )?;
                    seen.borrow_mut().push(router.current_path());
                    Ok(div().child(inner).into())
                })],
            )
        })
        .unwrap();

    assert_eq!(body(outcome), "<div>/a/b</div>");
    assert_eq!(*seen.borrow(), vec!["/a", "/a"]);
}

#[test]
fn unmatched_branches_register_nothing() {
    let scope = scope(Method::GET, "/posts");
    let callback_keys = RefCell::new(Vec::new());

    scope
        .execute(|scope| {
            let page = use_router(scope).matches(
                scope,
                &[
                    Route::new("/users", |scope| {
                        scope.var(1u8);
                        scope.register_callback(|| {});
                        Ok(Node::text("users"))
                    }),
                    Route::new("/posts", |scope| {
                        scope.var(2u8);
                        scope.register_callback(|| {});
                        Ok(Node::text("posts"))
                    }),
                ],
            )?;
            let keys: Vec<String> = scope
                .store()
                .borrow()
                .callback_keys()
                .into_iter()
                .map(String::from)
                .collect();
            callback_keys.borrow_mut().push(keys);
            Ok(page)
        })
        .unwrap();

    assert_eq!(
        callback_keys.into_inner(),
        vec![vec!["root.route./posts"], vec!["root.route./posts"]]
    );

    let store = scope.store().borrow();
    let addresses = store.addresses();
    assert_eq!(addresses, vec!["root.route./posts.0", "router"]);
}

#[test]
fn first_match_wins() {
    let outcome = scope(Method::GET, "/items/7")
        .execute(|scope| {
            use_router(scope).matches(
                scope,
                &[
                    Route::captures1("/items/(\\d+)", |_, id| {
                        Ok(Node::text(format!("item {}", id)))
                    }),
                    Route::node("/items", "list"),
                ],
            )
        })
        .unwrap();
    assert_eq!(body(outcome), "item 7");
}

#[test]
fn broken_routes_are_skipped() {
    let outcome = scope(Method::GET, "/x/1")
        .execute(|scope| {
            use_router(scope).matches(
                scope,
                &[
                    Route::new("/x/(", |_| Ok(Node::text("never"))),
                    Route::captures2("/x/(\\d+)", |_, _, _| Ok(Node::text("never"))),
                    Route::node("/x", "fallback"),
                ],
            )
        })
        .unwrap();
    assert_eq!(body(outcome), "fallback");
}

#[test]
fn target_errors_reach_the_caller() {
    let result = scope(Method::GET, "/admin").execute(|scope| {
        use_router(scope).matches(
            scope,
            &[Route::new("/admin", |_| {
                Err(Error::status(StatusCode::FORBIDDEN, "admins only"))
            })],
        )
    });
    match result {
        Err(err) => assert_eq!(err.status_code(), StatusCode::FORBIDDEN),
        Ok(outcome) => panic!("expected an error, got {:?}", outcome),
    }
}

#[test]
fn frames_are_popped_after_errors() {
    let scope = scope(Method::GET, "/a");
    let router = use_router(&scope);
    let result = router.matches(&scope, &[Route::new("/a", |_| Err(Error::render("boom")))]);
    assert!(result.is_err());
    assert_eq!(router.depth(), 0);
}

#[test]
fn relative_redirects() {
    let outcome = scope(Method::POST, "/settings/profile")
        .execute(|scope| {
            use_router(scope).matches(
                scope,
                &[Route::new("/settings", |scope| {
                    use_router(scope).matches(
                        scope,
                        &[Route::new("/profile", |scope| {
                            use_router(scope).redirect_up(scope);
                            Ok(Node::Empty)
                        })],
                    )
                })],
            )
        })
        .unwrap();

    match outcome {
        Outcome::Redirect { location, .. } => assert_eq!(location, "/settings"),
        other => panic!("expected a redirect, got {:?}", other),
    }
}

#[test]
fn redirect_to_current_path_is_suppressed_on_get() {
    let outcome = scope(Method::GET, "/home")
        .execute(|scope| {
            use_router(scope).matches(
                scope,
                &[Route::new("/home", |scope| {
                    let router = use_router(scope);
                    router.redirect_to(scope, &router.current_path());
                    Ok(Node::text("home"))
                })],
            )
        })
        .unwrap();
    assert_eq!(body(outcome), "home");
}
