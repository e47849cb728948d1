use http::header::LOCATION;
use http::{HeaderMap, Method, StatusCode};

/// A response is a redirect when its status is 3xx and it carries a Location.
pub fn is_redirect(status: StatusCode, headers: &HeaderMap) -> bool {
    status.is_redirection() && headers.contains_key(LOCATION)
}

/// 307 and 308 require the method and body to be replayed unchanged.
pub fn preserves_method(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TEMPORARY_REDIRECT | StatusCode::PERMANENT_REDIRECT
    )
}

/// Method for the hop that follows a redirect with `status`.
///
/// GET and HEAD are never changed. Any other method becomes GET unless the
/// status preserves it.
pub fn next_method(method: &Method, status: StatusCode) -> Method {
    if *method == Method::GET || *method == Method::HEAD || preserves_method(status) {
        method.clone()
    } else {
        Method::GET
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_redirect() {
        let mut headers = HeaderMap::new();
        assert!(!is_redirect(StatusCode::FOUND, &headers));

        headers.insert(LOCATION, "/b".parse().unwrap());
        assert!(is_redirect(StatusCode::FOUND, &headers));
        assert!(is_redirect(StatusCode::MULTIPLE_CHOICES, &headers));
        assert!(is_redirect(StatusCode::from_u16(399).unwrap(), &headers));
        assert!(!is_redirect(StatusCode::OK, &headers));
        assert!(!is_redirect(StatusCode::BAD_REQUEST, &headers));
    }

    #[test]
    fn test_get_and_head_unchanged() {
        for status in [301, 302, 303, 307, 308] {
            let status = StatusCode::from_u16(status).unwrap();
            assert_eq!(next_method(&Method::GET, status), Method::GET);
            assert_eq!(next_method(&Method::HEAD, status), Method::HEAD);
        }
    }

    #[test]
    fn test_downgrade_to_get() {
        for status in [300, 301, 302, 303] {
            let status = StatusCode::from_u16(status).unwrap();
            assert_eq!(next_method(&Method::POST, status), Method::GET);
            assert_eq!(next_method(&Method::PUT, status), Method::GET);
            assert_eq!(next_method(&Method::DELETE, status), Method::GET);
        }
    }

    #[test]
    fn test_preserved_on_307_308() {
        for status in [307, 308] {
            let status = StatusCode::from_u16(status).unwrap();
            assert!(preserves_method(status));
            assert_eq!(next_method(&Method::POST, status), Method::POST);
            assert_eq!(next_method(&Method::PATCH, status), Method::PATCH);
        }
    }
}
