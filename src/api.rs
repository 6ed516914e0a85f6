//! Turning API calls into diagnostics.
//!
//! Handlers never return errors. A transport failure or an unexpected
//! status becomes an error diagnostic with one of two fixed summaries,
//! and the handler returns without writing state.

use declarative::{Diagnostics, TfValue, Value};
use serde::de::DeserializeOwned;
use smallstep::ApiResponse;

/// Summary for failures on the client side: transport, encoding, decoding.
pub const CLIENT_ERROR: &str = "Smallstep API Client Error";

/// Summary for responses with an unexpected status.
pub const RESPONSE_ERROR: &str = "Smallstep API Response Error";

/// Record a request that produced no usable response.
pub fn client_error(diags: &mut Diagnostics, action: &str, err: impl std::fmt::Display) {
    log::debug!("{action}: {err}");
    diags.add_error(CLIENT_ERROR, format!("Failed to {action}: {err}"));
}

/// Record a response with an unexpected status.
pub fn response_error(diags: &mut Diagnostics, action: &str, resp: &ApiResponse) {
    log::debug!("{action}: unexpected status {}", resp.status);
    diags.add_error(
        RESPONSE_ERROR,
        format!(
            "Request ID {}: {}: {}",
            resp.request_id_or_dash(),
            resp.status,
            resp.error_message()
        ),
    );
}

/// The response, if the call succeeded with `expected` status.
pub fn expect(
    diags: &mut Diagnostics,
    action: &str,
    result: smallstep::Result<ApiResponse>,
    expected: u16,
) -> Option<ApiResponse> {
    match result {
        Ok(resp) if resp.status == expected => Some(resp),
        Ok(resp) => {
            response_error(diags, action, &resp);
            None
        }
        Err(err) => {
            client_error(diags, action, &err);
            None
        }
    }
}

/// Like [`expect`], then decode the JSON body.
pub fn expect_json<T: DeserializeOwned>(
    diags: &mut Diagnostics,
    action: &str,
    result: smallstep::Result<ApiResponse>,
    expected: u16,
) -> Option<T> {
    let resp = expect(diags, action, result, expected)?;
    match resp.json() {
        Ok(body) => Some(body),
        Err(err) => {
            client_error(diags, &format!("parse {action} response"), &err);
            None
        }
    }
}

/// Outcome of reading a remote object
#[derive(Debug)]
pub enum Lookup<T> {
    Found(T),
    /// 404: the object was deleted outside of the provider
    Gone,
    /// A diagnostic has been recorded
    Failed,
}

/// GET and decode a remote object, telling 404 apart from failures.
pub fn lookup<T: DeserializeOwned>(
    diags: &mut Diagnostics,
    action: &str,
    result: smallstep::Result<ApiResponse>,
) -> Lookup<T> {
    match result {
        Ok(resp) if resp.status == 404 => {
            log::debug!("{action}: not found");
            Lookup::Gone
        }
        other => expect_json(diags, action, other, 200).map_or(Lookup::Failed, Lookup::Found),
    }
}

/// Decode a plan, state or configuration value into its model.
pub fn decode_model<T: TfValue>(diags: &mut Diagnostics, value: &Value) -> Option<T> {
    match T::from_value(value) {
        Ok(model) => Some(model),
        Err(err) => {
            diags.add(err.into());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallstep::Error;

    #[test]
    fn test_response_error_detail() {
        let mut diags = Diagnostics::new();
        let resp =
            ApiResponse::new(409, r#"{"message":"subdomain is taken"}"#).with_request_id("req-1");
        response_error(&mut diags, "create authority", &resp);

        let diag = diags.iter().next().unwrap();
        assert_eq!(diag.summary, RESPONSE_ERROR);
        assert_eq!(diag.detail, "Request ID req-1: 409: subdomain is taken");
        assert!(diag.path.is_none());
    }

    #[test]
    fn test_unparseable_body_passed_through() {
        let mut diags = Diagnostics::new();
        response_error(&mut diags, "read device", &ApiResponse::new(502, "Bad Gateway\n"));
        assert_eq!(diags.iter().next().unwrap().detail, "Request ID -: 502: Bad Gateway");
    }

    #[test]
    fn test_expect_classifies() {
        let mut diags = Diagnostics::new();
        assert!(expect(&mut diags, "delete", Ok(ApiResponse::new(204, "")), 204).is_some());
        assert!(diags.is_empty());

        assert!(expect(&mut diags, "delete", Ok(ApiResponse::new(200, "")), 204).is_none());
        assert_eq!(diags.iter().last().unwrap().summary, RESPONSE_ERROR);

        let err = Error::http("connection refused", None);
        assert!(expect(&mut diags, "delete", Err(err), 204).is_none());
        let diag = diags.iter().last().unwrap();
        assert_eq!(diag.summary, CLIENT_ERROR);
        assert!(diag.detail.contains("connection refused"));
    }

    #[test]
    fn test_lookup() {
        let mut diags = Diagnostics::new();
        let found: Lookup<serde_json::Value> =
            lookup(&mut diags, "read", Ok(ApiResponse::new(200, r#"{"id":"1"}"#)));
        assert!(matches!(found, Lookup::Found(v) if v["id"] == "1"));

        let gone: Lookup<serde_json::Value> =
            lookup(&mut diags, "read", Ok(ApiResponse::new(404, "")));
        assert!(matches!(gone, Lookup::Gone));
        assert!(diags.is_empty());

        let failed: Lookup<serde_json::Value> =
            lookup(&mut diags, "read", Ok(ApiResponse::new(200, "{")));
        assert!(matches!(failed, Lookup::Failed));
        assert_eq!(diags.iter().next().unwrap().summary, CLIENT_ERROR);
    }
}
