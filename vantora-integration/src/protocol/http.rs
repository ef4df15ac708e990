use crate::error::SocketError;
use crate::signer::Signer;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// HTTP verb a [`RestRequest`] is sent with.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl Method {
    pub fn as_reqwest(self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A single REST endpoint: its path, verb, query/body shape and expected response type.
///
/// Implementors are small, cheaply-constructed value types (e.g. `PlaceOrderRequest`,
/// `CancelOrderRequest`) defined in `vantora-execution` and `vantora-data`; this trait only
/// describes how to turn one into bytes on the wire and how to parse the bytes back.
pub trait RestRequest {
    type Response: DeserializeOwned;
    type QueryParams: Serialize;
    type Body: Serialize;

    fn method(&self) -> Method;
    fn path(&self) -> String;
    fn query_params(&self) -> Option<&Self::QueryParams> {
        None
    }
    fn body(&self) -> Option<&Self::Body> {
        None
    }
    /// `true` for endpoints requiring the signed-request envelope (order placement,
    /// balances); `false` for public market-data endpoints.
    fn requires_auth(&self) -> bool {
        true
    }
}

/// How a request is assembled into headers before being sent: signed with API credentials,
/// or sent unauthenticated for public endpoints.
pub trait BuildStrategy {
    fn build_headers(
        &self,
        timestamp_ms: i64,
        recv_window_ms: u64,
        payload: &str,
    ) -> Vec<(&'static str, String)>;
}

/// Attaches the exchange's signed-request header set: `X-BAPI-API-KEY`,
/// `X-BAPI-TIMESTAMP`, `X-BAPI-RECV-WINDOW`, `X-BAPI-SIGN`.
pub struct SignedBuilder<'a, S> {
    pub signer: &'a S,
}

impl<'a, S: Signer> BuildStrategy for SignedBuilder<'a, S> {
    fn build_headers(
        &self,
        timestamp_ms: i64,
        recv_window_ms: u64,
        payload: &str,
    ) -> Vec<(&'static str, String)> {
        let signature = self.signer.sign(timestamp_ms, recv_window_ms, payload);
        vec![
            ("X-BAPI-API-KEY", self.signer.api_key().to_string()),
            ("X-BAPI-TIMESTAMP", timestamp_ms.to_string()),
            ("X-BAPI-RECV-WINDOW", recv_window_ms.to_string()),
            ("X-BAPI-SIGN", signature),
        ]
    }
}

/// No-op strategy for public endpoints: no headers are attached.
pub struct PublicBuilder;

impl BuildStrategy for PublicBuilder {
    fn build_headers(&self, _: i64, _: u64, _: &str) -> Vec<(&'static str, String)> {
        Vec::new()
    }
}

/// Exchange envelope wrapping every REST response: a `retCode` of zero means `result` is
/// the actual payload, any other value is an application-level rejection that is surfaced as
/// [`SocketError::ExchangeError`] rather than squeezed into the `Ok` path.
#[derive(Debug, serde::Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(rename = "retCode")]
    pub ret_code: i64,
    #[serde(rename = "retMsg")]
    pub ret_msg: String,
    pub result: Option<T>,
}

/// Parses a raw HTTP body into `Ok(T)` or a classified [`SocketError`], trying the success
/// envelope first and falling back to error classification if `retCode` is non-zero.
pub trait HttpParser {
    fn parse<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, SocketError> {
        let envelope: ApiEnvelope<T> = serde_json::from_slice(bytes).map_err(|error| {
            SocketError::DeserialiseBinary { error, payload: bytes.to_vec() }
        })?;

        if envelope.ret_code == 0 {
            envelope.result.ok_or_else(|| SocketError::ExchangeError {
                code: envelope.ret_code,
                msg: "response carried retCode=0 but no result payload".to_string(),
                transient: false,
            })
        } else {
            Err(SocketError::ExchangeError {
                code: envelope.ret_code,
                msg: envelope.ret_msg,
                transient: is_transient_ret_code(envelope.ret_code),
            })
        }
    }
}

/// Exchange-documented codes that indicate a transient condition (rate limiting, timeouts)
/// worth retrying rather than a permanent rejection of the request as submitted.
fn is_transient_ret_code(code: i64) -> bool {
    matches!(code, 10002 | 10006 | 10016 | 130035)
}

#[derive(Debug, Default)]
pub struct BybitHttpParser;
impl HttpParser for BybitHttpParser {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Payload {
        value: u32,
    }

    #[test]
    fn parses_success_envelope_into_result() {
        let body = br#"{"retCode":0,"retMsg":"OK","result":{"value":42}}"#;
        let parsed: Payload = BybitHttpParser::parse(body).unwrap();
        assert_eq!(parsed, Payload { value: 42 });
    }

    #[test]
    fn classifies_transient_ret_codes_as_retryable() {
        let body = br#"{"retCode":10006,"retMsg":"too many visits","result":null}"#;
        let err = BybitHttpParser::parse::<Payload>(body).unwrap_err();
        assert!(err.retryable());
    }

    #[test]
    fn classifies_unknown_ret_codes_as_permanent() {
        let body = br#"{"retCode":110001,"retMsg":"order does not exist","result":null}"#;
        let err = BybitHttpParser::parse::<Payload>(body).unwrap_err();
        assert!(!err.retryable());
    }
}
