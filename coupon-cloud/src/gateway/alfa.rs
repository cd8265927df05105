//! Alfa-Bank RBS REST client (form-encoded POST, JSON responses)

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};

use super::{
    DEFAULT_CURRENCY, DEFAULT_LANGUAGE, GatewayError, GatewayOrderStatus, PaymentGateway,
    RegisterOrder, RegisteredOrder,
};

const REGISTER_PATH: &str = "/payment/rest/register.do";
const ORDER_STATUS_PATH: &str = "/payment/rest/getOrderStatus.do";

#[derive(Debug, Clone)]
pub struct AlfaBankConfig {
    /// e.g. `https://alfa.rbsuat.com`
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub timeout: Duration,
    /// Log outbound payloads and raw responses
    pub test_mode: bool,
}

#[derive(Debug, Clone)]
pub struct AlfaBankClient {
    http: reqwest::Client,
    config: AlfaBankConfig,
}

impl AlfaBankClient {
    pub fn new(config: AlfaBankConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Self { http, config })
    }

    fn credentials(&self) -> Vec<(&'static str, String)> {
        vec![
            ("userName", self.config.username.clone()),
            ("password", self.config.password.clone()),
        ]
    }

    /// POST the form and return the raw response body
    async fn post_form(
        &self,
        path: &str,
        params: &[(&'static str, String)],
    ) -> Result<String, GatewayError> {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);

        if self.config.test_mode {
            tracing::debug!(url = %url, payload = %redacted(params), "Gateway request");
        }

        let resp = self.http.post(&url).form(params).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if self.config.test_mode {
            tracing::debug!(url = %url, status = %status, body = %body, "Gateway response");
        }

        if !status.is_success() {
            return Err(GatewayError::BadResponse(format!(
                "HTTP {status}: {}",
                truncate(&body, 200)
            )));
        }
        Ok(body)
    }
}

#[async_trait]
impl PaymentGateway for AlfaBankClient {
    async fn register(&self, order: &RegisterOrder) -> Result<RegisteredOrder, GatewayError> {
        let params = register_params(self.credentials(), order);
        let body = self.post_form(REGISTER_PATH, &params).await?;
        let resp: RegisterResponse = decode(&body)?;

        if let Some(code) = resp.error_code.as_deref().filter(|c| is_error_code(c)) {
            return Err(GatewayError::Rejected {
                code: code.to_string(),
                message: resp.error_message.unwrap_or_default(),
            });
        }

        match (non_empty(resp.order_id), non_empty(resp.form_url)) {
            (Some(external_order_id), Some(form_url)) => Ok(RegisteredOrder {
                external_order_id,
                form_url,
            }),
            _ => Err(GatewayError::BadResponse(
                "register response is missing orderId or formUrl".into(),
            )),
        }
    }

    async fn order_status(
        &self,
        external_order_id: &str,
    ) -> Result<GatewayOrderStatus, GatewayError> {
        let mut params = self.credentials();
        params.push(("orderId", external_order_id.to_string()));
        params.push(("language", DEFAULT_LANGUAGE.to_string()));

        let body = self.post_form(ORDER_STATUS_PATH, &params).await?;
        let resp: StatusResponse = decode(&body)?;

        if let Some(code) = resp.error_code.as_deref().filter(|c| is_error_code(c)) {
            return Err(GatewayError::Rejected {
                code: code.to_string(),
                message: resp.error_message.unwrap_or_default(),
            });
        }

        let order_status = resp.order_status.ok_or_else(|| {
            GatewayError::BadResponse("status response is missing orderStatus".into())
        })?;

        Ok(GatewayOrderStatus {
            order_status,
            order_number: resp.order_number,
            action_code: resp.action_code,
            action_code_description: resp.action_code_description,
            amount: resp.amount,
            currency: resp.currency,
        })
    }
}

/// Wire fields of `register.do`, in the order the gateway documents them
fn register_params(
    mut params: Vec<(&'static str, String)>,
    order: &RegisterOrder,
) -> Vec<(&'static str, String)> {
    params.push(("orderNumber", order.order_number.clone()));
    params.push(("amount", order.amount.to_string()));
    params.push((
        "currency",
        order
            .currency
            .clone()
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
    ));
    params.push(("returnUrl", order.return_url.clone()));

    let optional = [
        ("failUrl", order.fail_url.clone()),
        ("description", order.description.clone()),
    ];
    params.extend(
        optional
            .into_iter()
            .filter_map(|(k, v)| v.filter(|v| !v.is_empty()).map(|v| (k, v))),
    );

    params.push((
        "language",
        order
            .language
            .clone()
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
    ));

    let optional = [
        ("clientId", order.client_id.clone()),
        ("jsonParams", order.json_params.clone()),
    ];
    params.extend(
        optional
            .into_iter()
            .filter_map(|(k, v)| v.filter(|v| !v.is_empty()).map(|v| (k, v))),
    );

    if let Some(secs) = order.session_timeout_secs.filter(|s| *s > 0) {
        params.push(("sessionTimeoutSecs", secs.to_string()));
    }
    params
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterResponse {
    #[serde(default)]
    order_id: Option<String>,
    #[serde(default)]
    form_url: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    error_code: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    #[serde(default, deserialize_with = "string_or_number")]
    error_code: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    order_number: Option<String>,
    #[serde(default)]
    order_status: Option<i32>,
    #[serde(default)]
    action_code: Option<i32>,
    #[serde(default)]
    action_code_description: Option<String>,
    #[serde(default)]
    amount: Option<i64>,
    #[serde(default, deserialize_with = "string_or_number")]
    currency: Option<String>,
}

/// The gateway sends `errorCode` as `"0"` on some endpoints and `0` on others
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

fn decode<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, GatewayError> {
    serde_json::from_str(body).map_err(|e| {
        GatewayError::BadResponse(format!("{e}; body: {}", truncate(body, 200)))
    })
}

fn is_error_code(code: &str) -> bool {
    let code = code.trim();
    !code.is_empty() && code != "0"
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// `key=value&...` with the password masked, for logs
fn redacted(params: &[(&'static str, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| {
            if *k == "password" {
                format!("{k}=***")
            } else {
                format!("{k}={v}")
            }
        })
        .collect::<Vec<_>>()
        .join("&")
}
