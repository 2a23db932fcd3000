use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{info, warn};

use crate::config::SubsidyRule;
use crate::errors::{ApiError, ValidationError};
use crate::models::recommendation::{
    Assessment, BillResponse, BudgetCheckInfo, HealthStatus, RecommendationData,
    RecommendationDetails, SubsidyDecision, SubsidyInfo, SummarySource, round_to,
};
use crate::models::request::{BillRequest, Intake, RecommendRequest};
use crate::services::narrative::SummaryFacts;
use crate::services::tariff;
use crate::shared_state::AppState;

/// GET /api/health
/// Service liveness
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is running", body = HealthStatus)
    )
)]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let status = HealthStatus {
        timestamp: chrono::Utc::now(),
        status: "healthy".to_string(),
        message: "Recommendation engine is running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        narrative_model: state.narrator.has_model(),
    };
    (StatusCode::OK, Json(status))
}

/// POST /api/recommend
/// Size a renewable system for the submitted consumption and tariff
///
/// Computes the current slab bill, picks a technology and capacity, applies
/// any subsidy and projects savings and payback. The narrative summary comes
/// from the configured model when available, otherwise from templates.
#[utoipa::path(
    post,
    path = "/api/recommend",
    request_body = RecommendRequest,
    responses(
        (status = 200, description = "Sizing, cost and savings recommendation", body = RecommendationData),
        (status = 400, description = "Invalid or malformed input")
    )
)]
pub async fn recommend(
    State(state): State<AppState>,
    payload: Result<Json<RecommendRequest>, JsonRejection>,
) -> Result<Json<RecommendationData>, ApiError> {
    let request_id = uuid::Uuid::new_v4();
    let Json(request) = payload.map_err(|e| {
        warn!(event_name = "api.recommend.rejected", %request_id, error = %e.body_text(), "malformed body");
        ApiError::MalformedBody(e.body_text())
    })?;

    let intake = request.validate().inspect_err(|e| {
        warn!(event_name = "api.recommend.invalid", %request_id, field = %e.field, reason = %e.reason, "validation failed");
    })?;

    let assessment = state.engine.assess(&intake)?;
    let facts = summary_facts(&intake, &assessment);
    let (summary, source) = state.narrator.narrate(&facts).await;

    info!(
        event_name = "api.recommend.completed",
        %request_id,
        usage_type = intake.usage_type.as_str(),
        consumption_kwh = intake.monthly_consumption_kwh,
        system_type = assessment.system.system_type.as_str(),
        size_kw = assessment.system.recommended_size_kw,
        summary_source = ?source,
        "recommendation served"
    );

    Ok(Json(build_response(&intake, &assessment, summary, source)))
}

/// POST /api/tariff/bill
/// Slab bill for a consumption figure
#[utoipa::path(
    post,
    path = "/api/tariff/bill",
    request_body = BillRequest,
    responses(
        (status = 200, description = "Band-by-band bill", body = BillResponse),
        (status = 400, description = "Invalid or malformed input")
    )
)]
pub async fn compute_bill(payload: Result<Json<BillRequest>, JsonRejection>) -> Result<Json<BillResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::MalformedBody(e.body_text()))?;
    let slabs = request.slabs.resolve(request.allow_missing_rates)?;
    let bill = tariff::compute_bill(request.consumption, &slabs)
        .map_err(|e| ValidationError::new("consumption", e.reason))?;
    Ok(Json(BillResponse::from(&bill)))
}

/// GET /api/subsidies
/// Active subsidy rules
#[utoipa::path(
    get,
    path = "/api/subsidies",
    responses(
        (status = 200, description = "Subsidy rule table, first match wins", body = Vec<SubsidyRule>)
    )
)]
pub async fn list_subsidies(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.engine.subsidy_policy().rules.clone())
}

fn summary_facts(intake: &Intake, a: &Assessment) -> SummaryFacts {
    SummaryFacts {
        location: intake.location.clone(),
        usage_type: intake.usage_type,
        system_type: a.system.system_type,
        size_kw: a.system.recommended_size_kw,
        generation_kwh: a.system.estimated_generation_kwh,
        monthly_savings: a.projection.monthly_savings,
        system_cost: a.projection.system_cost_net,
        payback_years: a.projection.payback.years().map(|y| round_to(y, 1)),
        subsidy_scheme: match &a.subsidy {
            SubsidyDecision::Granted { scheme, .. } => Some(scheme.clone()),
            SubsidyDecision::Ineligible => None,
        },
        co2_tonnes: a.projection.co2_reduction_tonnes,
    }
}

fn build_response(
    intake: &Intake,
    a: &Assessment,
    summary: String,
    source: SummarySource,
) -> RecommendationData {
    let p = &a.projection;
    let subsidy_info = match &a.subsidy {
        SubsidyDecision::Granted { scheme, percentage, amount } => SubsidyInfo {
            available: true,
            scheme: Some(scheme.clone()),
            percentage: Some(round_to(percentage * 100.0, 2)),
            amount: Some(round_to(*amount, 2)),
            gross_cost: Some(round_to(p.system_cost_gross, 2)),
        },
        SubsidyDecision::Ineligible => SubsidyInfo {
            available: false,
            scheme: None,
            percentage: None,
            amount: None,
            gross_cost: None,
        },
    };

    RecommendationData {
        location: intake.location.clone(),
        usage_type: intake.usage_type,
        system_type: a.system.system_type,
        recommended_size_kw: a.system.recommended_size_kw,
        estimated_generation_kwh: round_to(a.system.estimated_generation_kwh, 2),
        monthly_savings: round_to(p.monthly_savings, 2),
        system_cost: round_to(p.system_cost_net, 2),
        payback_years: p.payback.years().map(|y| round_to(y, 1)),
        payback_recoverable: p.payback.years().is_some(),
        gemini_summary: summary,
        summary_source: source,
        details: RecommendationDetails {
            current_consumption: intake.monthly_consumption_kwh,
            remaining_consumption: round_to(p.remaining_consumption_kwh, 2),
            current_bill: round_to(a.current_bill.bill_amount, 2),
            new_bill: round_to(p.new_bill.bill_amount, 2),
            effective_tariff: a.current_bill.effective_rate.value().map(|r| round_to(r, 2)),
            co2_reduction: round_to(p.co2_reduction_tonnes, 2),
            slabs_used: intake.slabs_provided,
            subsidy_info,
            budget_check: a.budget_check.as_ref().map(|b| BudgetCheckInfo {
                budget: b.budget,
                within_budget: b.within_budget,
                shortfall: round_to(b.shortfall, 2),
            }),
        },
    }
}
