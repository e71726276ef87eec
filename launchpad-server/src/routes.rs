// Request handlers

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderValue};
use http::{Request, Response, StatusCode};
use http_body_util::Full;
use launchpad_campaign::{
    CampaignContent, CampaignReport, CampaignRequest, DeliveryStatus, DispatchOptions, Rejection,
};
use launchpad_mail::{Address, Tag};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{info, warn};

use crate::secrets::authorize;
use crate::{ApiError, AppState};

/// Template sent to new waitlist subscribers.
pub const WELCOME_TEMPLATE: &str = "waitlist-welcome";

type HandlerResult = Result<Response<Full<Bytes>>, ApiError>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CampaignBody {
    emails: Option<Vec<Value>>,
    #[serde(default)]
    use_subscribers: bool,
    template_id: Option<String>,
    custom_html: Option<String>,
    subject: Option<String>,
    variables: Option<Value>,
    #[serde(default)]
    tags: Vec<TagBody>,
}

#[derive(Debug, Deserialize)]
struct TagBody {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct WaitlistBody {
    email: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CampaignResponse<'a> {
    campaign_id: String,
    total: usize,
    sent: usize,
    failed: usize,
    cancelled: bool,
    results: Vec<RecipientResult<'a>>,
    rejected: &'a [Rejection],
}

#[derive(Serialize)]
struct RecipientResult<'a> {
    email: &'a str,
    success: bool,
    status: DeliveryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    attempts: u32,
}

impl<'a> From<&'a CampaignReport> for CampaignResponse<'a> {
    fn from(report: &'a CampaignReport) -> Self {
        let result = &report.result;
        Self {
            campaign_id: result.campaign_id().to_string(),
            total: result.total_recipients(),
            sent: result.sent_count(),
            failed: result.failed_count(),
            cancelled: result.cancelled(),
            results: result
                .outcomes()
                .iter()
                .map(|o| RecipientResult {
                    email: o.recipient.email(),
                    success: o.success(),
                    status: o.status,
                    id: o.message_id.as_ref().map(|id| id.as_str()),
                    error: o.error.as_deref(),
                    attempts: o.attempts,
                })
                .collect(),
            rejected: &report.rejected,
        }
    }
}

/// `POST /campaign`
pub async fn send_campaign(state: &AppState, req: Request<Bytes>) -> HandlerResult {
    authorize(state.secrets.as_ref(), req.headers())?;
    let body: CampaignBody = parse_json(req.body())?;

    let content = match (body.template_id, body.custom_html) {
        (Some(id), None) => CampaignContent::Template { id },
        (None, Some(html)) => CampaignContent::CustomHtml { html },
        (Some(_), Some(_)) => {
            return Err(ApiError::BadRequest(
                "provide either templateId or customHtml, not both".to_string(),
            ));
        }
        (None, None) => {
            return Err(ApiError::BadRequest(
                "templateId or customHtml is required".to_string(),
            ));
        }
    };

    let mut recipients = body.emails.unwrap_or_default();
    if body.use_subscribers {
        let subscribers = state.subscribers.list().await?;
        recipients.extend(subscribers.into_iter().map(|s| Value::String(s.email)));
    }
    if recipients.is_empty() {
        return Err(ApiError::BadRequest(
            "no recipients: pass emails or set useSubscribers".to_string(),
        ));
    }

    let variables = match body.variables {
        None => Value::Object(Map::new()),
        Some(v @ Value::Object(_)) => v,
        Some(_) => {
            return Err(ApiError::BadRequest(
                "variables must be a JSON object".to_string(),
            ));
        }
    };

    let tags = body
        .tags
        .into_iter()
        .map(|t| Tag::new(t.name, t.value))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let mut request = CampaignRequest::new(recipients, content)
        .variables(variables)
        .tags(tags)
        .deduplicate(true);
    if let Some(subject) = body.subject {
        request = request.subject(subject);
    }

    let report = state
        .campaigns
        .run(request, &DispatchOptions::default(), &state.shutdown)
        .await?;

    json_response(StatusCode::OK, &CampaignResponse::from(&report))
}

/// `GET /campaign`
pub async fn campaign_stats(state: &AppState) -> HandlerResult {
    let total = state.subscribers.count().await?;
    json_response(StatusCode::OK, &json!({ "totalSubscribers": total }))
}

/// `POST /waitlist`
pub async fn join_waitlist(state: &AppState, req: Request<Bytes>) -> HandlerResult {
    let body: WaitlistBody = parse_json(req.body())?;
    let address = Address::new(&body.email)
        .map_err(|_| ApiError::BadRequest("a valid email address is required".to_string()))?;

    if !state.subscribers.add(&address).await? {
        return json_response(
            StatusCode::OK,
            &json!({ "success": true, "alreadySubscribed": true }),
        );
    }

    info!(email = %address.email(), "New waitlist subscriber");

    if state.welcome_email {
        let mailer = state.campaigns.mailer().clone();
        state.tasks.spawn(async move {
            if let Err(err) = mailer
                .send_template(WELCOME_TEMPLATE, &address, &json!({}))
                .await
            {
                warn!(email = %address.email(), error = %err, "Welcome email failed");
            }
        });
    }

    json_response(StatusCode::CREATED, &json!({ "success": true }))
}

/// `GET /health`
pub fn health(state: &AppState) -> HandlerResult {
    json_response(
        StatusCode::OK,
        &json!({
            "status": "ok",
            "transport": state.campaigns.mailer().transport().name(),
        }),
    )
}

fn parse_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {e}")))
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> HandlerResult {
    let body = serde_json::to_vec(body).map_err(|e| ApiError::Internal(e.to_string()))?;

    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(response)
}
