//! Lead capture endpoints.
//!
//! Every handler sits behind the rate limit middleware, which resolves the
//! client identity. Body fields are all optional at decode time; each handler
//! checks presence itself and answers with a 400 naming what is missing.

use axum::{extract::rejection::JsonRejection, extract::State, Extension, Json};
use serde::Deserialize;

use crate::http::request::ClientIdentity;
use crate::http::response::{success, ApiError, Success};
use crate::http::server::AppState;
use crate::leads::{Lead, LeadCategory, LeadKind};
use crate::security::sanitize::{optional_text, require_text, sanitize_email, sanitize_url};

const NAME_MAX: usize = 200;
const PHONE_MAX: usize = 50;
const AMOUNT_MAX: usize = 50;
const TYPE_MAX: usize = 100;
const SOURCE_MAX: usize = 100;
const NOTES_MAX: usize = 2000;

type ApiResult = Result<Json<Success>, ApiError>;

fn yes_no(flag: Option<bool>) -> &'static str {
    if flag.unwrap_or(false) {
        "Yes"
    } else {
        "No"
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    pub email: Option<String>,
    pub source: Option<String>,
}

pub async fn subscribe(
    State(state): State<AppState>,
    Extension(ClientIdentity(client)): Extension<ClientIdentity>,
    payload: Result<Json<SubscribeRequest>, JsonRejection>,
) -> ApiResult {
    let Json(req) = payload?;

    let email = sanitize_email(req.email.as_deref().unwrap_or_default())?;
    let source = optional_text(req.source.as_deref(), SOURCE_MAX)?
        .unwrap_or_else(|| "general".to_string());
    let category = LeadCategory::from_source(&source);

    let lead = Lead::new(LeadKind::Subscribe(category), email, client).with_field("source", source);
    state.notifier.dispatch(lead);

    Ok(success("Subscribed successfully"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistSignupRequest {
    pub artist_name: Option<String>,
    pub your_name: Option<String>,
    pub email: Option<String>,
    pub music_link: Option<String>,
    pub beta_access: Option<bool>,
}

pub async fn artist_signup(
    State(state): State<AppState>,
    Extension(ClientIdentity(client)): Extension<ClientIdentity>,
    payload: Result<Json<ArtistSignupRequest>, JsonRejection>,
) -> ApiResult {
    let Json(req) = payload?;

    let email = sanitize_email(req.email.as_deref().unwrap_or_default())?;
    if is_blank(&req.artist_name) || is_blank(&req.your_name) {
        return Err(ApiError::BadRequest(
            "Artist name and your name are required".to_string(),
        ));
    }
    let artist_name = require_text("Artist name", req.artist_name.as_deref(), NAME_MAX)?;
    let your_name = require_text("Your name", req.your_name.as_deref(), NAME_MAX)?;
    let music_link = match req.music_link.as_deref().map(str::trim) {
        Some(link) if !link.is_empty() => Some(sanitize_url(link)?),
        _ => None,
    };

    let lead = Lead::new(LeadKind::Artist, email, client)
        .with_field("artistName", artist_name)
        .with_field("yourName", your_name)
        .with_optional("musicLink", music_link)
        .with_field("betaAccess", yes_no(req.beta_access));
    state.notifier.dispatch(lead);

    Ok(success("Signup successful"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListenerSignupRequest {
    pub email: Option<String>,
    pub beta_tester: Option<bool>,
    pub also_artist: Option<bool>,
}

pub async fn listener_signup(
    State(state): State<AppState>,
    Extension(ClientIdentity(client)): Extension<ClientIdentity>,
    payload: Result<Json<ListenerSignupRequest>, JsonRejection>,
) -> ApiResult {
    let Json(req) = payload?;

    let email = sanitize_email(req.email.as_deref().unwrap_or_default())?;

    let lead = Lead::new(LeadKind::Listener, email, client)
        .with_field("betaTester", yes_no(req.beta_tester))
        .with_field("alsoArtist", yes_no(req.also_artist));
    state.notifier.dispatch(lead);

    Ok(success("Signup successful"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestorInvestmentRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    pub investment_amount: Option<String>,
    pub investment_type: Option<String>,
    pub accredited_investor: Option<String>,
    pub additional_info: Option<String>,
    #[serde(default)]
    pub agree_to_terms: bool,
    #[serde(default)]
    pub agree_to_disclosures: bool,
}

pub async fn investor_investment(
    State(state): State<AppState>,
    Extension(ClientIdentity(client)): Extension<ClientIdentity>,
    payload: Result<Json<InvestorInvestmentRequest>, JsonRejection>,
) -> ApiResult {
    let Json(req) = payload?;

    let required = [
        &req.full_name,
        &req.email,
        &req.phone,
        &req.investment_amount,
        &req.investment_type,
        &req.accredited_investor,
    ];
    if required.iter().any(|field| is_blank(field)) {
        return Err(ApiError::BadRequest(
            "All required fields must be provided".to_string(),
        ));
    }
    if !req.agree_to_terms || !req.agree_to_disclosures {
        return Err(ApiError::BadRequest(
            "You must agree to the terms and disclosures".to_string(),
        ));
    }

    let email = sanitize_email(req.email.as_deref().unwrap_or_default())?;
    let full_name = require_text("Full name", req.full_name.as_deref(), NAME_MAX)?;
    let phone = require_text("Phone", req.phone.as_deref(), PHONE_MAX)?;
    let amount = require_text("Investment amount", req.investment_amount.as_deref(), AMOUNT_MAX)?;
    let investment_type = require_text("Investment type", req.investment_type.as_deref(), TYPE_MAX)?;
    let accredited = req
        .accredited_investor
        .as_deref()
        .map(|v| v.trim().eq_ignore_ascii_case("yes"));

    let lead = Lead::new(LeadKind::Investor, email, client)
        .with_field("fullName", full_name)
        .with_field("phone", phone)
        .with_optional("company", optional_text(req.company.as_deref(), NAME_MAX)?)
        .with_optional("title", optional_text(req.title.as_deref(), NAME_MAX)?)
        .with_field("investmentAmount", amount)
        .with_field("investmentType", investment_type)
        .with_field("accreditedInvestor", yes_no(accredited))
        .with_optional("additionalInfo", optional_text(req.additional_info.as_deref(), NOTES_MAX)?);
    state.notifier.dispatch(lead);

    Ok(success("Investment application submitted successfully"))
}
