use std::mem;
use std::str::FromStr;

use http::uri::Authority;
use http::uri::PathAndQuery;
use http::uri::Scheme;
use http::HeaderMap;
use http::HeaderValue;
use http::Method;
use http::Uri;

use crate::{Error, Result};

/// Signing context for request.
#[derive(Debug)]
pub struct SigningRequest {
    /// HTTP method.
    pub method: Method,
    /// HTTP scheme.
    pub scheme: Scheme,
    /// HTTP authority.
    pub authority: Authority,
    /// HTTP path.
    pub path: String,
    /// HTTP query parameters.
    pub query: Vec<(String, String)>,
    /// HTTP headers.
    pub headers: HeaderMap,
}

impl SigningRequest {
    /// Build a signing context from http::request::Parts.
    pub fn build(parts: &mut http::request::Parts) -> Result<Self> {
        let uri = mem::take(&mut parts.uri).into_parts();
        let paq = uri
            .path_and_query
            .unwrap_or_else(|| PathAndQuery::from_static("/"));

        Ok(SigningRequest {
            method: parts.method.clone(),
            scheme: uri.scheme.unwrap_or(Scheme::HTTP),
            authority: uri.authority.ok_or_else(|| {
                Error::request_invalid("request without authority is invalid for signing")
            })?,
            path: paq.path().to_string(),
            query: paq
                .query()
                .map(|v| {
                    form_urlencoded::parse(v.as_bytes())
                        .map(|(k, v)| (k.into_owned(), v.into_owned()))
                        .collect()
                })
                .unwrap_or_default(),

            // Take the headers out of the request to avoid copy.
            // We will return it back when apply the context.
            headers: mem::take(&mut parts.headers),
        })
    }

    /// Apply the signing context back to http::request::Parts.
    pub fn apply(mut self, parts: &mut http::request::Parts) -> Result<()> {
        let query_size = self.query_size();

        // Return headers back.
        mem::swap(&mut parts.headers, &mut self.headers);
        parts.method = self.method;
        parts.uri = {
            let mut uri_parts = mem::take(&mut parts.uri).into_parts();
            uri_parts.scheme = Some(self.scheme);
            uri_parts.authority = Some(self.authority);
            uri_parts.path_and_query = {
                let paq = if query_size == 0 {
                    self.path
                } else {
                    let mut s = self.path;
                    s.reserve(query_size + 1);

                    s.push('?');
                    for (i, (k, v)) in self.query.iter().enumerate() {
                        if i > 0 {
                            s.push('&');
                        }

                        s.push_str(k);
                        if !v.is_empty() {
                            s.push('=');
                            s.push_str(v);
                        }
                    }

                    s
                };

                Some(PathAndQuery::from_str(&paq)?)
            };
            Uri::from_parts(uri_parts)?
        };

        Ok(())
    }

    /// Get query size.
    #[inline]
    pub fn query_size(&self) -> usize {
        self.query
            .iter()
            .map(|(k, v)| k.len() + v.len())
            .sum::<usize>()
    }

    /// Normalize header value by trimming surrounding spaces.
    pub fn header_value_normalize(v: &mut HeaderValue) {
        let bs = v.as_bytes();

        let starting_index = bs.iter().position(|b| *b != b' ').unwrap_or(0);
        let ending_offset = bs.iter().rev().position(|b| *b != b' ').unwrap_or(0);
        let ending_index = bs.len() - ending_offset;

        // Trimming spaces off a valid value always yields a valid value.
        if let Ok(mut trimmed) = HeaderValue::from_bytes(&bs[starting_index..ending_index]) {
            trimmed.set_sensitive(v.is_sensitive());
            *v = trimmed;
        }
    }

    /// Get header names as sorted vector, skipping the ones `exclude` matches.
    pub fn header_name_to_vec_sorted(&self, exclude: impl Fn(&str) -> bool) -> Vec<&str> {
        let mut h = self
            .headers
            .keys()
            .map(|k| k.as_str())
            .filter(|k| !exclude(k))
            .collect::<Vec<&str>>();
        h.sort_unstable();

        h
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_build_and_apply() -> Result<()> {
        let req = http::Request::builder()
            .method("PUT")
            .uri("https://bucket.s3.amazonaws.com/a%20b?list-type=2&prefix=x")
            .header("x-amz-meta", "  value ")
            .body(())?;
        let (mut parts, _) = req.into_parts();

        let mut signing = SigningRequest::build(&mut parts)?;
        assert!(parts.headers.is_empty());
        assert_eq!(signing.path, "/a%20b");
        assert_eq!(
            signing.query,
            vec![
                ("list-type".to_string(), "2".to_string()),
                ("prefix".to_string(), "x".to_string())
            ]
        );

        for (_, value) in signing.headers.iter_mut() {
            SigningRequest::header_value_normalize(value);
        }
        assert_eq!(signing.headers["x-amz-meta"], "value");

        signing.apply(&mut parts)?;
        assert_eq!(
            parts.uri.to_string(),
            "https://bucket.s3.amazonaws.com/a%20b?list-type=2&prefix=x"
        );
        assert_eq!(parts.headers["x-amz-meta"], "value");
        Ok(())
    }

    #[test]
    fn test_header_name_to_vec_sorted() -> Result<()> {
        let req = http::Request::builder()
            .uri("https://example.com")
            .header("x-b", "1")
            .header("connection", "keep-alive")
            .header("x-a", "2")
            .body(())?;
        let (mut parts, _) = req.into_parts();
        let signing = SigningRequest::build(&mut parts)?;

        assert_eq!(
            signing.header_name_to_vec_sorted(|k| k == "connection"),
            vec!["x-a", "x-b"]
        );
        Ok(())
    }

    #[test]
    fn test_build_without_authority() {
        let (mut parts, _) = http::Request::builder()
            .uri("/relative")
            .body(())
            .expect("request must be valid")
            .into_parts();
        let err = SigningRequest::build(&mut parts).expect_err("must fail");
        assert_eq!(err.kind(), crate::ErrorKind::RequestInvalid);
    }
}
