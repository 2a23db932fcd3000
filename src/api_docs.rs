use utoipa::OpenApi;
use crate::config;
use crate::controllers::recommend_controller;
use crate::models::{recommendation, request};

#[derive(OpenApi)]
#[openapi(
    paths(
        recommend_controller::health,
        recommend_controller::recommend,
        recommend_controller::compute_bill,
        recommend_controller::list_subsidies
    ),
    components(
        schemas(
            request::RecommendRequest,
            request::SlabRatesInput,
            request::BillRequest,
            recommendation::RecommendationData,
            recommendation::RecommendationDetails,
            recommendation::SubsidyInfo,
            recommendation::BudgetCheckInfo,
            recommendation::BillResponse,
            recommendation::BandCharge,
            recommendation::HealthStatus,
            recommendation::UsageType,
            recommendation::SystemType,
            recommendation::SummarySource,
            config::SubsidyRule
        )
    ),
    tags(
        (name = "energy-advisor", description = "Renewable energy sizing and savings API")
    )
)]
pub struct ApiDoc;
