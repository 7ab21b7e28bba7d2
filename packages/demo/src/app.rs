//! The demo application.

use gospel::prelude::*;
use gospel::{Error, Result};
use http::{Method, StatusCode};

pub fn root(scope: &Scope) -> Result<Node> {
    let page = use_router(scope).matches(
        scope,
        &[
            Route::new("/counter", counter),
            Route::captures1("/greet/(\\w+)", greet),
            Route::new("/settings", settings),
            Route::new("/old-counter", |scope| {
                use_router(scope).redirect_to(scope, "/counter");
                Ok(Node::Empty)
            }),
            Route::new("/forbidden", |_| {
                Err(Error::status(StatusCode::FORBIDDEN, "not for you"))
            }),
            Route::new("^/$", home),
        ],
    )?;

    if page.is_empty() {
        scope.set_status_code(StatusCode::NOT_FOUND);
        return Ok(p().child("page not found").into());
    }
    Ok(page)
}

fn home(_: &Scope) -> Result<Node> {
    Ok(div()
        .child(a("/counter").child("counter"))
        .child(a("/greet/world").child("greeting"))
        .child(a("/settings/profile").child("settings"))
        .into())
}

fn counter(scope: &Scope) -> Result<Node> {
    let count = scope.persistent_var(0i64);

    let increment = scope.register_callback({
        let count = count.clone();
        move || {
            if let Err(err) = count.update(|n| *n += 1) {
                tracing::warn!("cannot increment counter: {}", err);
            }
        }
    });
    increment.on_submit();

    let reset = scope.register_callback({
        let scope = scope.clone();
        move || scope.clear_session()
    });
    reset.on_submit();

    Ok(div()
        .attr("class", "counter")
        .child(span().child(count.get().to_string()))
        .child(increment.form([button().child("+").into()]))
        .child(reset.form([button().child("reset").into()]))
        .into())
}

fn greet(_: &Scope, name: &str) -> Result<Node> {
    Ok(p().child(format!("hello, {}", name)).into())
}

fn settings(scope: &Scope) -> Result<Node> {
    let saved = scope.persistent_global_var("profile.name", "anonymous".to_string());
    let profile = use_router(scope).matches(
        scope,
        &[Route::new("/profile", {
            let saved = saved.clone();
            move |scope| profile(scope, &saved)
        })],
    )?;

    Ok(div()
        .child(p().child(format!("name: {}", saved.get())))
        .child(profile)
        .into())
}

fn profile(scope: &Scope, saved: &Var<String>) -> Result<Node> {
    let form = scope.form_data("profile", Method::POST);
    let name = form.var("name", saved.get())?;

    form.on_submit(|| {
        if let Err(err) = saved.set(name.get()) {
            tracing::warn!("cannot save profile: {}", err);
        }
        use_router(scope).redirect_up(scope);
    });

    Ok(form.form([
        input()
            .attr("name", "name")
            .attr("value", name.get())
            .into(),
        button().child("save").into(),
    ]))
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
    use http::{Response, StatusCode};

    use gospel::App;

    fn body(response: &Response<Bytes>) -> String {
        String::from_utf8(response.body().to_vec()).unwrap()
    }

    fn get(uri: &str) -> http::Request<Bytes> {
        http::Request::get(uri).body(Bytes::new()).unwrap()
    }

    fn post(uri: &str, form: &str) -> http::Request<Bytes> {
        http::Request::post(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Bytes::from(form.to_string()))
            .unwrap()
    }

    fn cookie(response: &Response<Bytes>) -> String {
        let header = response.headers()[SET_COOKIE].to_str().unwrap();
        header.split(';').next().unwrap().to_string()
    }

    #[test]
    fn home_links_to_pages() {
        let page = body(&App::new(super::root).handle(get("/")));
        assert!(page.contains(r#"<a href="/counter">counter</a>"#), "{}", page);
    }

    #[test]
    fn unknown_pages_are_not_found() {
        let response = App::new(super::root).handle(get("/missing"));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body(&response), "<p>page not found</p>");
    }

    #[test]
    fn greets_by_name() {
        let response = App::new(super::root).handle(get("/greet/ferris"));
        assert_eq!(body(&response), "<p>hello, ferris</p>");
    }

    #[test]
    fn counter_increments() {
        let app = App::new(super::root);
        let page = body(&app.handle(get("/counter")));
        assert!(page.contains("<span>0</span>"), "{}", page);

        let response = app.handle(post("/counter", "_gspl=root.route./counter.1"));
        assert!(body(&response).contains("<span>1</span>"));
    }

    #[test]
    fn old_counter_redirects() {
        let response = App::new(super::root).handle(get("/old-counter"));
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[LOCATION], "/counter");
    }

    #[test]
    fn forbidden_page() {
        let response = App::new(super::root).handle(get("/forbidden"));
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn saving_the_profile_redirects_to_settings() {
        let app = App::new(super::root);
        let saved = app.handle(post("/settings/profile", "_gspl=profile&name=ferris"));
        assert_eq!(saved.status(), StatusCode::FOUND);
        assert_eq!(saved.headers()[LOCATION], "/settings");

        let mut request = get("/settings");
        request
            .headers_mut()
            .insert(COOKIE, cookie(&saved).parse().unwrap());
        assert_eq!(body(&app.handle(request)), "<div><p>name: ferris</p></div>");
    }
}
