//! Read access to the request `Cookie` header.

// crates.io
use ::http::{HeaderMap, header::COOKIE};
use cookie::Cookie;

/// Returns the value of the first cookie named `name`, if any.
///
/// Every `Cookie` header is scanned; unparsable pairs are skipped and empty values count as
/// absent.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
	headers
		.get_all(COOKIE)
		.iter()
		.filter_map(|value| value.to_str().ok())
		.flat_map(Cookie::split_parse)
		.filter_map(|cookie| cookie.ok())
		.find(|cookie| cookie.name() == name)
		.map(|cookie| cookie.value().to_owned())
		.filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
	// crates.io
	use ::http::HeaderValue;
	// self
	use super::*;

	#[test]
	fn finds_cookies_across_headers() {
		let mut headers = HeaderMap::new();

		headers.append(COOKIE, HeaderValue::from_static("theme=dark; lang=en"));
		headers.append(COOKIE, HeaderValue::from_static("session_user_id=abc|tag"));

		assert_eq!(cookie_value(&headers, "lang").as_deref(), Some("en"));
		assert_eq!(cookie_value(&headers, "session_user_id").as_deref(), Some("abc|tag"));
		assert_eq!(cookie_value(&headers, "missing"), None);
	}

	#[test]
	fn empty_values_are_absent() {
		let mut headers = HeaderMap::new();

		headers.insert(COOKIE, HeaderValue::from_static("csrf_token="));

		assert_eq!(cookie_value(&headers, "csrf_token"), None);
		assert_eq!(cookie_value(&HeaderMap::new(), "csrf_token"), None);
	}
}
