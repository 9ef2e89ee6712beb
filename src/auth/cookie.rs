//! Defines functions for handling user authentication with cookies.

use std::cmp::max;

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use time::{Duration, OffsetDateTime};

use crate::{Error, auth::token::Token, user::UserID};

/// The name of the cookie that holds the serialized [Token].
pub(crate) const COOKIE_TOKEN: &str = "auth_token";
/// The default duration for which auth cookies are valid.
pub const DEFAULT_COOKIE_DURATION: Duration = Duration::minutes(5);

/// Add an auth cookie to the cookie jar, indicating that a user is logged in and authenticated.
///
/// Sets the initial expiry of the cookie to `duration` from the current time.
/// You can use [DEFAULT_COOKIE_DURATION] for the default duration.
///
/// Returns the cookie jar with the cookie added.
///
/// # Errors
///
/// Returns an [Error::InvalidDateFormat] if the token cannot be serialized.
pub(crate) fn set_auth_cookie(
    jar: PrivateCookieJar,
    user_id: UserID,
    duration: Duration,
) -> Result<PrivateCookieJar, Error> {
    let expires_at = OffsetDateTime::now_utc() + duration;

    set_auth_cookie_expiry(jar, Token { user_id, expires_at })
}

fn set_auth_cookie_expiry(jar: PrivateCookieJar, token: Token) -> Result<PrivateCookieJar, Error> {
    let expires_at = token.expires_at;
    let token_string =
        serde_json::to_string(&token).map_err(|error| Error::InvalidDateFormat(error.to_string()))?;

    Ok(jar.add(
        Cookie::build((COOKIE_TOKEN, token_string))
            .expires(expires_at)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    ))
}

/// Set the auth cookie to an invalid value and set its max age to zero, which
/// should delete the cookie on the client side.
pub(crate) fn invalidate_auth_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.add(
        Cookie::build((COOKIE_TOKEN, "deleted"))
            .expires(OffsetDateTime::UNIX_EPOCH)
            .max_age(Duration::ZERO)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    )
}

/// Get the token from the auth cookie in `jar`.
///
/// # Errors
///
/// Returns [Error::CookieMissing] if there is no auth cookie, it cannot be
/// decoded, or the token has expired.
pub(crate) fn get_token_from_cookies(jar: &PrivateCookieJar) -> Result<Token, Error> {
    let cookie = jar.get(COOKIE_TOKEN).ok_or(Error::CookieMissing)?;
    let token: Token =
        serde_json::from_str(cookie.value_trimmed()).map_err(|_| Error::CookieMissing)?;

    if token.is_expired(OffsetDateTime::now_utc()) {
        return Err(Error::CookieMissing);
    }

    Ok(token)
}

/// Set the expiry of the auth cookie in `jar` to the latest of UTC now
/// plus `duration` and the cookie's expiry.
///
/// # Errors
///
/// The cookie jar is not modified if an error is returned.
///
/// Returns:
/// - [Error::CookieMissing] if the auth cookie is not in the cookie jar.
/// - [Error::InvalidDateFormat] if extending the cookie by `duration` would overflow the date time.
pub(crate) fn extend_auth_cookie_duration_if_needed(
    jar: PrivateCookieJar,
    duration: Duration,
) -> Result<PrivateCookieJar, Error> {
    let token = get_token_from_cookies(&jar)?;

    let new_expiry = OffsetDateTime::now_utc()
        .checked_add(duration)
        .ok_or_else(|| Error::InvalidDateFormat("cookie expiry overflowed".to_owned()))?;

    let expires_at = max(token.expires_at, new_expiry);

    set_auth_cookie_expiry(
        jar,
        Token {
            user_id: token.user_id,
            expires_at,
        },
    )
}

#[cfg(test)]
mod cookie_tests {
    use axum_extra::extract::{PrivateCookieJar, cookie::Key};
    use sha2::{Digest, Sha512};
    use time::{Duration, OffsetDateTime};

    use crate::{
        Error,
        auth::cookie::{
            COOKIE_TOKEN, DEFAULT_COOKIE_DURATION, extend_auth_cookie_duration_if_needed,
            get_token_from_cookies, invalidate_auth_cookie, set_auth_cookie,
        },
        user::UserID,
    };

    fn get_jar() -> PrivateCookieJar {
        let hash = Sha512::digest(b"foobar");
        let key = Key::from(&hash);

        PrivateCookieJar::new(key)
    }

    /// Test helper macro to assert that two date times are within one second
    /// of each other. Used instead of a function so that the file and line
    /// number of the caller is included in the error message instead of the
    /// helper.
    macro_rules! assert_date_time_close {
        ($left:expr, $right:expr) => {
            assert!(
                ($left - $right).abs() < Duration::seconds(1),
                "got date time {:?}, want {:?}",
                $left,
                $right
            );
        };
    }

    #[test]
    fn can_set_cookie() {
        let user_id = UserID::new_random();

        let jar = set_auth_cookie(get_jar(), user_id, DEFAULT_COOKIE_DURATION).unwrap();
        let token = get_token_from_cookies(&jar).unwrap();

        assert_eq!(token.user_id, user_id);
        assert_date_time_close!(
            token.expires_at,
            OffsetDateTime::now_utc() + DEFAULT_COOKIE_DURATION
        );
    }

    #[test]
    fn missing_cookie_is_an_error() {
        assert_eq!(get_token_from_cookies(&get_jar()), Err(Error::CookieMissing));
    }

    #[test]
    fn expired_token_is_rejected() {
        let jar = set_auth_cookie(get_jar(), UserID::new_random(), Duration::seconds(-1)).unwrap();

        assert_eq!(get_token_from_cookies(&jar), Err(Error::CookieMissing));
    }

    #[test]
    fn can_extend_cookie_duration() {
        let jar =
            set_auth_cookie(get_jar(), UserID::new_random(), DEFAULT_COOKIE_DURATION).unwrap();
        let want = OffsetDateTime::now_utc() + Duration::minutes(10);

        let jar = extend_auth_cookie_duration_if_needed(jar, Duration::minutes(10)).unwrap();

        let token = get_token_from_cookies(&jar).unwrap();
        let cookie = jar.get(COOKIE_TOKEN).unwrap();
        assert_date_time_close!(token.expires_at, want);
        assert_date_time_close!(cookie.expires_datetime().unwrap(), want);
    }

    #[test]
    fn cookie_duration_does_not_shrink() {
        let jar =
            set_auth_cookie(get_jar(), UserID::new_random(), DEFAULT_COOKIE_DURATION).unwrap();
        let want = get_token_from_cookies(&jar).unwrap().expires_at;

        // The initial cookie expires in 5 minutes, so extending it by 5 seconds
        // should not change the expiry.
        let jar = extend_auth_cookie_duration_if_needed(jar, Duration::seconds(5)).unwrap();

        assert_eq!(get_token_from_cookies(&jar).unwrap().expires_at, want);
    }

    #[test]
    fn invalidate_auth_cookie_succeeds() {
        let jar =
            set_auth_cookie(get_jar(), UserID::new_random(), DEFAULT_COOKIE_DURATION).unwrap();

        let jar = invalidate_auth_cookie(jar);
        let cookie = jar.get(COOKIE_TOKEN).unwrap();

        assert_eq!(cookie.value(), "deleted");
        assert_eq!(cookie.expires_datetime(), Some(OffsetDateTime::UNIX_EPOCH));
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
        assert_eq!(get_token_from_cookies(&jar), Err(Error::CookieMissing));
    }
}
