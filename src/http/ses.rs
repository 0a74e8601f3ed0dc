/*
 * Copyright Stalwart Labs Ltd. See the COPYING
 * file at the top-level directory of this distribution.
 *
 * Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
 * https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
 * <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
 * option. This file may not be copied, modified, or distributed
 * except according to those terms.
 */

use std::{borrow::Cow, time::Duration};

use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    Url,
};
use serde::{Deserialize, Serialize};

use crate::mime::MessageBuilder;

use super::{sigv4::Signer, SharedClient};

pub const DEFAULT_REGION: &str = "us-east-1";

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
#[doc(hidden)]
struct Request<'x> {
    content: Content<'x>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
#[doc(hidden)]
struct Content<'x> {
    raw: RawMessage<'x>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
#[doc(hidden)]
struct RawMessage<'x> {
    data: Cow<'x, str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
#[doc(hidden)]
struct Response {
    message_id: String,
}

/// Amazon SES v2 client for raw messages.
#[derive(Debug, Clone)]
pub struct SesClient<'x> {
    access_key_id: Cow<'x, str>,
    secret_access_key: Cow<'x, str>,
    session_token: Option<Cow<'x, str>>,
    region: Cow<'x, str>,
    endpoint: Option<Cow<'x, str>>,
    timeout: Duration,
    client: SharedClient,
}

impl<'x> SesClient<'x> {
    /// Creates a new SES client with the specified credentials and region.
    pub fn new(
        access_key_id: impl Into<Cow<'x, str>>,
        secret_access_key: impl Into<Cow<'x, str>>,
        region: impl Into<Cow<'x, str>>,
    ) -> Self {
        SesClient {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
            region: region.into(),
            endpoint: None,
            timeout: Duration::from_secs(30),
            client: SharedClient::default(),
        }
    }

    /// Creates a client from `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`,
    /// `AWS_SESSION_TOKEN` and `AWS_REGION` (or `AWS_DEFAULT_REGION`).
    /// The region defaults to `us-east-1`.
    pub fn from_env() -> crate::Result<SesClient<'static>> {
        SesClient::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> crate::Result<SesClient<'static>> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        match (var("AWS_ACCESS_KEY_ID"), var("AWS_SECRET_ACCESS_KEY")) {
            (Some(access_key_id), Some(secret_access_key)) => {
                let region = var("AWS_REGION")
                    .or_else(|| var("AWS_DEFAULT_REGION"))
                    .map(Cow::Owned)
                    .unwrap_or(Cow::Borrowed(DEFAULT_REGION));
                let mut client = SesClient::new(access_key_id, secret_access_key, region);
                client.session_token = var("AWS_SESSION_TOKEN").map(Cow::Owned);
                Ok(client)
            }
            _ => Err(crate::Error::MissingCredentials),
        }
    }

    /// Sets the session token of temporary credentials.
    pub fn session_token(mut self, session_token: impl Into<Cow<'x, str>>) -> Self {
        self.session_token = Some(session_token.into());
        self
    }

    /// Overrides the `outbound-emails` URL.
    pub fn endpoint(mut self, endpoint: impl Into<Cow<'x, str>>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn endpoint_url(&self) -> Cow<'_, str> {
        match &self.endpoint {
            Some(endpoint) => endpoint.as_ref().into(),
            None => format!(
                "https://email.{}.amazonaws.com/v2/email/outbound-emails",
                self.region
            )
            .into(),
        }
    }

    /// Builds and sends a message, returning the SES message id.
    pub async fn send(&self, message: &MessageBuilder<'_>) -> crate::Result<String> {
        let data = message.write_base64()?;
        self.send_data(data.into()).await
    }

    /// Sends a raw RFC 5322 message, returning the SES message id.
    pub async fn send_raw(&self, message: impl AsRef<[u8]>) -> crate::Result<String> {
        self.send_data(STANDARD.encode(message).into()).await
    }

    async fn send_data(&self, data: Cow<'_, str>) -> crate::Result<String> {
        let body = request_body(data)?;
        let url = Url::parse(&self.endpoint_url())
            .map_err(|err| crate::Error::Transport(err.to_string()))?;
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            _ => return Err(crate::Error::Transport(format!("Invalid endpoint {}", url))),
        };

        let mut signer = Signer::new(
            self.access_key_id.as_ref(),
            self.secret_access_key.as_ref(),
            self.region.as_ref(),
            "ses",
        );
        if let Some(session_token) = &self.session_token {
            signer = signer.session_token(session_token.as_ref());
        }
        let signed = signer.sign(
            "POST",
            &host,
            url.path(),
            "application/json",
            body.as_bytes(),
            chrono::Utc::now(),
        )?;

        log::debug!("Sending {} byte raw message to {}", body.len(), url);

        let client = self.client.get().await?;
        tokio::time::timeout(self.timeout, async {
            let mut request = client
                .post(url)
                .header(CONTENT_TYPE, "application/json")
                .header(AUTHORIZATION, signed.authorization)
                .header("x-amz-date", signed.amz_date)
                .header("x-amz-content-sha256", signed.content_sha256);
            if let Some(security_token) = signed.security_token {
                request = request.header("x-amz-security-token", security_token);
            }

            let response = request
                .body(body)
                .send()
                .await
                .map_err(|err| crate::Error::Transport(err.to_string()))?;
            let status = response.status();
            let text = response
                .text()
                .await
                .map_err(|err| crate::Error::Transport(err.to_string()))?;

            if status.is_success() {
                let response: Response = serde_json::from_str(&text)?;
                log::debug!("SES accepted message {}", response.message_id);
                Ok(response.message_id)
            } else {
                Err(crate::Error::Transport(format!("{}: {}", status, text)))
            }
        })
        .await
        .map_err(|_| crate::Error::Timeout)?
    }
}

fn request_body(data: Cow<'_, str>) -> crate::Result<String> {
    serde_json::to_string(&Request {
        content: Content {
            raw: RawMessage { data },
        },
    })
    .map_err(Into::into)
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use base64::{engine::general_purpose::STANDARD, Engine};

    use crate::{http::test::serve_once, mime::MessageBuilder, Error};

    use super::{request_body, SesClient};

    #[test]
    fn build_request() {
        assert_eq!(
            request_body("SGVsbG8=".into()).unwrap(),
            r#"{"Content":{"Raw":{"Data":"SGVsbG8="}}}"#
        );

        let client = SesClient::new("AKIDEXAMPLE", "secret", "eu-west-1");
        assert_eq!(
            client.endpoint_url(),
            "https://email.eu-west-1.amazonaws.com/v2/email/outbound-emails"
        );
        let client = client.endpoint("http://localhost:4566/v2/email/outbound-emails");
        assert_eq!(
            client.endpoint_url(),
            "http://localhost:4566/v2/email/outbound-emails"
        );
    }

    #[test]
    fn credentials_from_environment() {
        for (vars, expected) in [
            (
                vec![
                    ("AWS_ACCESS_KEY_ID", "AKIDEXAMPLE"),
                    ("AWS_SECRET_ACCESS_KEY", "secret"),
                ],
                Some(("us-east-1", None)),
            ),
            (
                vec![
                    ("AWS_ACCESS_KEY_ID", "AKIDEXAMPLE"),
                    ("AWS_SECRET_ACCESS_KEY", "secret"),
                    ("AWS_DEFAULT_REGION", "eu-central-1"),
                    ("AWS_SESSION_TOKEN", "token"),
                ],
                Some(("eu-central-1", Some("token"))),
            ),
            (
                vec![
                    ("AWS_ACCESS_KEY_ID", "AKIDEXAMPLE"),
                    ("AWS_SECRET_ACCESS_KEY", "secret"),
                    ("AWS_REGION", "ap-south-1"),
                    ("AWS_DEFAULT_REGION", "eu-central-1"),
                    ("AWS_SESSION_TOKEN", " "),
                ],
                Some(("ap-south-1", None)),
            ),
            (vec![("AWS_ACCESS_KEY_ID", "AKIDEXAMPLE")], None),
            (
                vec![("AWS_ACCESS_KEY_ID", ""), ("AWS_SECRET_ACCESS_KEY", "secret")],
                None,
            ),
        ] {
            let vars = vars.into_iter().collect::<HashMap<_, _>>();
            let result =
                SesClient::from_lookup(|name| vars.get(name).map(|value| value.to_string()));

            match (result, expected) {
                (Ok(client), Some((region, session_token))) => {
                    assert_eq!(client.region(), region);
                    assert_eq!(client.session_token.as_deref(), session_token);
                }
                (Err(Error::MissingCredentials), None) => (),
                (result, expected) => panic!("{:?} != {:?}", result, expected),
            }
        }
    }

    #[tokio::test]
    async fn send_message() {
        let _ = env_logger::try_init();

        let (url, request) = serve_once(
            "200 OK",
            r#"{"MessageId":"0100018c-8a1f-4c2b-9e1d-000000000000-000000"}"#,
        )
        .await;
        let client = SesClient::new("AKIDEXAMPLE", "secret", "us-east-1")
            .session_token("token")
            .endpoint(format!("{}/v2/email/outbound-emails", url));

        let message = MessageBuilder::new()
            .from(("John Doe", "john@example.com"))
            .to("jane@example.com")
            .subject("Hi!")
            .text_body("Hello, world!");
        assert_eq!(
            client.send(&message).await.unwrap(),
            "0100018c-8a1f-4c2b-9e1d-000000000000-000000"
        );

        let request = request.await.unwrap();
        let (headers, body) = request.split_once("\r\n\r\n").unwrap();
        let headers = headers.to_ascii_lowercase();
        assert!(headers.starts_with("post /v2/email/outbound-emails http/1.1\r\n"));
        assert!(headers.contains(
            "authorization: aws4-hmac-sha256 credential=akidexample/"
        ));
        assert!(headers.contains(
            "signedheaders=content-type;host;x-amz-content-sha256;x-amz-date;x-amz-security-token"
        ));
        assert!(headers.contains("x-amz-security-token: token\r\n"));
        assert!(headers.contains("content-type: application/json\r\n"));

        let body: serde_json::Value = serde_json::from_str(body).unwrap();
        let data = body["Content"]["Raw"]["Data"].as_str().unwrap();
        let raw = String::from_utf8(STANDARD.decode(data).unwrap()).unwrap();
        assert!(raw.starts_with("From: \"John Doe\" <john@example.com>\r\nTo: jane@example.com\r\n"));
    }

    #[tokio::test]
    async fn send_failures() {
        let (url, _request) = serve_once(
            "400 Bad Request",
            r#"{"message":"Email address is not verified."}"#,
        )
        .await;
        match SesClient::new("AKIDEXAMPLE", "secret", "us-east-1")
            .endpoint(url)
            .send_raw("From: a@example.com\r\n\r\nHi")
            .await
        {
            Err(Error::Transport(reason)) => {
                assert!(reason.starts_with("400"), "{}", reason);
                assert!(reason.contains("not verified"), "{}", reason);
            }
            other => panic!("Unexpected result {:?}", other),
        }

        let message = MessageBuilder::new().from("john@example.com").text_body("Hi");
        assert!(matches!(
            SesClient::new("AKIDEXAMPLE", "secret", "us-east-1")
                .send(&message)
                .await,
            Err(Error::Validation(_))
        ));
    }
}
