#![allow(missing_docs)]

pub(crate) mod form;
pub(crate) mod html;
pub(crate) mod http;
pub(crate) mod state;

pub(crate) use form::{
    assert_hx_post, assert_prefilled_input, assert_required_input, assert_submit_button,
    field_error, field_errors, must_get_form,
};
pub(crate) use html::{assert_valid_html, parse_html_document, parse_html_fragment};
pub(crate) use http::{assert_hx_redirect, assert_status_ok};
pub(crate) use state::{
    RecordingNotifier, create_test_user, get_test_app_state, get_test_app_state_with_notifier,
    get_test_store,
};
