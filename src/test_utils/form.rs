//! Assertions for the htmx forms rendered by the auth, settings and transaction pages.

use scraper::{ElementRef, Html, Selector};

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|error| panic!("bad selector {css:?}: {error}"))
}

/// The first `<form>` in `html`.
#[track_caller]
pub(crate) fn must_get_form(html: &Html) -> ElementRef<'_> {
    html.select(&selector("form"))
        .next()
        .expect("want a form in the page, got none")
}

/// Check that `form` submits to `endpoint` with `hx-post`.
#[track_caller]
pub(crate) fn assert_hx_post(form: &ElementRef<'_>, endpoint: &str) {
    assert_eq!(
        form.value().attr("hx-post"),
        Some(endpoint),
        "want form to post to {endpoint}"
    );
}

#[track_caller]
fn required_input<'a>(form: &ElementRef<'a>, name: &str, type_: &str) -> ElementRef<'a> {
    let input = form
        .select(&selector(&format!("input[name=\"{name}\"]")))
        .next()
        .unwrap_or_else(|| panic!("want an input named {name:?}, got none"));

    let got_type = input.value().attr("type").unwrap_or_default();
    assert_eq!(got_type, type_, "want {name:?} to be a {type_} input");
    assert!(
        input.value().attr("required").is_some(),
        "want {name:?} to be required"
    );

    input
}

/// Check that `form` has a required input called `name` of type `type_`.
#[track_caller]
pub(crate) fn assert_required_input(form: &ElementRef<'_>, name: &str, type_: &str) {
    required_input(form, name, type_);
}

/// Like [assert_required_input], and the input is prefilled with `value`.
#[track_caller]
pub(crate) fn assert_prefilled_input(form: &ElementRef<'_>, name: &str, type_: &str, value: &str) {
    let input = required_input(form, name, type_);

    assert_eq!(
        input.value().attr("value").unwrap_or_default(),
        value,
        "want {name:?} prefilled"
    );
}

#[track_caller]
pub(crate) fn assert_submit_button(form: &ElementRef<'_>) {
    assert!(
        form.select(&selector("button[type=\"submit\"]"))
            .next()
            .is_some(),
        "want a submit button in the form"
    );
}

/// The inline error shown under the input with id `field`, if any.
pub(crate) fn field_error(html: &Html, field: &str) -> Option<String> {
    html.select(&selector(&format!("input#{field} + p.text-red-500")))
        .next()
        .map(|error| error.text().collect::<String>().trim().to_owned())
}

/// Every inline field error in `html`, in page order.
pub(crate) fn field_errors(html: &Html) -> Vec<String> {
    html.select(&selector("input + p.text-red-500"))
        .map(|error| error.text().collect::<String>().trim().to_owned())
        .collect()
}
