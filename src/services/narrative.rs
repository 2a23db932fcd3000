/// Narrative summaries for a recommendation.
///
/// The model backend is any OpenAI-compatible chat-completions server
/// (LM Studio by default). It is optional: every failure path ends in the
/// deterministic template summary, so a request never fails because of it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::NarrativeConfig;
use crate::errors::NarrativeError;
use crate::models::recommendation::{SummarySource, SystemType, UsageType};

/// Computed facts handed to the summarizer.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryFacts {
    pub location: String,
    pub usage_type: UsageType,
    pub system_type: SystemType,
    pub size_kw: f64,
    pub generation_kwh: f64,
    pub monthly_savings: f64,
    pub system_cost: f64,
    pub payback_years: Option<f64>,
    pub subsidy_scheme: Option<String>,
    pub co2_tonnes: f64,
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, facts: &SummaryFacts) -> Result<String, NarrativeError>;
}

// ─── Chat-completions backend ────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Clone)]
pub struct ChatCompletionSummarizer {
    client: reqwest::Client,
    api_base: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

impl ChatCompletionSummarizer {
    pub fn new(cfg: &NarrativeConfig) -> Result<Self, NarrativeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs.max(1)))
            .build()?;
        Ok(Self {
            client,
            api_base: cfg.api_base.trim_end_matches('/').to_string(),
            model: cfg.model.clone(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
        })
    }

    /// `GET {api_base}/models`; succeeds when the server answers 2xx.
    pub async fn probe(&self) -> Result<(), NarrativeError> {
        let resp = self.client.get(format!("{}/models", self.api_base)).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NarrativeError::Status { status: status.as_u16(), body });
        }
        Ok(())
    }
}

#[async_trait]
impl Summarizer for ChatCompletionSummarizer {
    async fn summarize(&self, facts: &SummaryFacts) -> Result<String, NarrativeError> {
        let prompt = prompt(facts);
        #[cfg(feature = "verbose_log")]
        tracing::debug!(event_name = "narrative.prompt", prompt = %prompt, "sending prompt");

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: Some("You are an energy expert assistant.".to_string()),
                },
                ChatMessage { role: "user".to_string(), content: Some(prompt) },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NarrativeError::Status { status: status.as_u16(), body });
        }

        let parsed: ChatResponse = resp.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(NarrativeError::EmptyResponse)
    }
}

fn prompt(facts: &SummaryFacts) -> String {
    let payback = match facts.payback_years {
        Some(years) => format!("{years:.1} years"),
        None => "not recoverable (no monthly savings)".to_string(),
    };
    let subsidy = match &facts.subsidy_scheme {
        Some(scheme) => format!("\n- Subsidy: {scheme}"),
        None => String::new(),
    };
    format!(
        "You are an energy expert providing recommendations for renewable energy solutions.\n\n\
         Based on the following information:\n\
         - Location: {}\n\
         - Usage Type: {}\n\
         - System Type: {}\n\
         - System Size: {} kW\n\
         - Monthly Generation: {:.0} kWh\n\
         - Monthly Savings: ₹{:.0}\n\
         - Total System Cost: ₹{:.0}\n\
         - Payback Period: {}{}\n\n\
         Generate a detailed paragraph recommending this renewable energy system. \
         Include information about benefits, savings, and environmental impact.\n\
         Keep your response focused and concise (3-5 sentences only).",
        facts.location,
        facts.usage_type.as_str(),
        facts.system_type.as_str(),
        facts.size_kw,
        facts.generation_kwh,
        facts.monthly_savings,
        facts.system_cost,
        payback,
        subsidy,
    )
}

// ─── Template fallback ───────────────────────────────────────────────────────

/// Phrase-bank summary. The variant is picked from a hash of the facts, so
/// the same request always yields the same text.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateSummarizer;

impl TemplateSummarizer {
    pub fn render(&self, f: &SummaryFacts) -> String {
        let seed = variant_seed(f);
        let pick = |n: usize, salt: u64| ((seed.rotate_left(salt as u32 * 7) ^ salt) % n as u64) as usize;

        let usage = f.usage_type.as_str();
        let system = f.system_type.as_str();
        let loc = &f.location;
        let size = f.size_kw;
        let generation = format!("{:.0}", f.generation_kwh);
        let savings = format_rupees(f.monthly_savings);
        let cost = format_rupees(f.system_cost);

        let intros = [
            format!("Based on your {usage} in {loc}, we recommend a {size} kW {system} energy system."),
            format!("For your {usage} located in {loc}, a {size} kW {system} system would be optimal."),
            format!("Our analysis suggests that a {size} kW {system} system is ideal for your {usage} in {loc}."),
        ];
        let generation_phrases = [
            format!("This system will generate approximately {generation} kWh per month,"),
            format!("You can expect to generate around {generation} kWh monthly,"),
            format!("With average {loc} conditions, you'll produce about {generation} kWh each month,"),
        ];
        let savings_phrases = [
            format!("saving you {savings} on your monthly electricity bill."),
            format!("which translates to monthly savings of {savings}."),
            format!("reducing your electricity expenses by approximately {savings} per month."),
        ];
        let investment_phrases: Vec<String> = match f.payback_years {
            Some(years) => vec![
                format!("The total investment of {cost} would be recovered in {years:.1} years, making it a sound financial decision."),
                format!("With a total cost of {cost}, your investment will pay for itself in {years:.1} years."),
                format!("The system costs approximately {cost} and offers a payback period of {years:.1} years."),
            ],
            None => vec![format!(
                "At a cost of {cost}, the system does not pay for itself at your current tariff, so weigh it on its environmental value."
            )],
        };
        let benefits = benefits(f);

        format!(
            "{} {} {} {} {}",
            intros[pick(intros.len(), 1)],
            generation_phrases[pick(generation_phrases.len(), 2)],
            savings_phrases[pick(savings_phrases.len(), 3)],
            investment_phrases[pick(investment_phrases.len(), 4)],
            benefits[pick(benefits.len(), 5)],
        )
    }
}

#[async_trait]
impl Summarizer for TemplateSummarizer {
    async fn summarize(&self, facts: &SummaryFacts) -> Result<String, NarrativeError> {
        Ok(self.render(facts))
    }
}

fn benefits(f: &SummaryFacts) -> Vec<String> {
    let co2 = format!(
        "It avoids roughly {:.2} tonnes of CO2 every month.",
        f.co2_tonnes
    );
    match (f.usage_type, f.system_type) {
        (UsageType::Agriculture, SystemType::Solar) => {
            let mut list = vec![
                "Solar pumps for irrigation eliminate diesel costs and reduce dependency on grid power.".to_string(),
                "Solar-powered farming improves crop yield through consistent and reliable irrigation.".to_string(),
                "Excess generation can be sold back to the grid for additional income.".to_string(),
            ];
            if let Some(scheme) = &f.subsidy_scheme {
                list.push(format!("The {scheme} scheme offers substantial subsidies for agricultural solar installations."));
            }
            list
        }
        (UsageType::Agriculture, _) => vec![
            "Renewable energy for agricultural operations reduces operational costs significantly.".to_string(),
            "Clean energy enhances sustainability credentials for farm products.".to_string(),
        ],
        (_, SystemType::Solar) => vec![
            "This renewable energy solution will reduce your carbon footprint significantly.".to_string(),
            "Solar energy is low-maintenance and will provide clean electricity for 25+ years.".to_string(),
            co2,
        ],
        (_, SystemType::Wind) => vec![
            "Wind energy is particularly effective for industrial applications with high consumption.".to_string(),
            "This wind system will operate day and night, complementing your energy needs.".to_string(),
            co2,
        ],
        (_, SystemType::Hybrid) => vec![
            "Combining solar and wind smooths output across day, night and seasons.".to_string(),
            "A hybrid plant keeps generation steady for round-the-clock industrial loads.".to_string(),
            co2,
        ],
    }
}

fn variant_seed(f: &SummaryFacts) -> u64 {
    f.location
        .bytes()
        .chain(f.usage_type.as_str().bytes())
        .fold(f.size_kw.to_bits() ^ 0xcbf2_9ce4_8422_2325, |acc, b| {
            (acc ^ b as u64).wrapping_mul(0x0100_0000_01b3)
        })
}

/// `₹1,234,567` style amount, rounded to whole rupees.
pub fn format_rupees(amount: f64) -> String {
    let whole = amount.round() as i64;
    let digits = whole.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if whole < 0 { format!("-₹{grouped}") } else { format!("₹{grouped}") }
}

// ─── Narrator ────────────────────────────────────────────────────────────────

/// Runs the model summarizer with a deadline, substituting the template on
/// any failure.
#[derive(Clone)]
pub struct Narrator {
    primary: Option<Arc<dyn Summarizer>>,
    fallback: TemplateSummarizer,
    timeout: Duration,
}

impl Narrator {
    pub fn template_only() -> Self {
        Self { primary: None, fallback: TemplateSummarizer, timeout: Duration::ZERO }
    }

    pub fn with_model(primary: Arc<dyn Summarizer>, timeout: Duration) -> Self {
        Self { primary: Some(primary), fallback: TemplateSummarizer, timeout }
    }

    /// Builds the narrator from configuration, probing the model server once.
    /// An unreachable server disables the model for the process lifetime.
    pub async fn from_config(cfg: &NarrativeConfig) -> Self {
        if !cfg.enabled {
            info!(event_name = "narrative.disabled", "narrative model disabled; using templates");
            return Self::template_only();
        }
        let client = match ChatCompletionSummarizer::new(cfg) {
            Ok(client) => client,
            Err(e) => {
                warn!(event_name = "narrative.init_failed", error = %e, "could not build narrative client");
                return Self::template_only();
            }
        };
        if cfg.probe_on_startup {
            if let Err(e) = client.probe().await {
                warn!(
                    event_name = "narrative.unavailable",
                    api_base = %cfg.api_base,
                    error = %e,
                    "narrative model not reachable; make sure the local server is running. Using templates"
                );
                return Self::template_only();
            }
        }
        info!(event_name = "narrative.ready", api_base = %cfg.api_base, model = %cfg.model, "narrative model connected");
        Self::with_model(Arc::new(client), Duration::from_secs(cfg.timeout_secs.max(1)))
    }

    pub fn has_model(&self) -> bool {
        self.primary.is_some()
    }

    pub async fn narrate(&self, facts: &SummaryFacts) -> (String, SummarySource) {
        if let Some(primary) = &self.primary {
            let started = std::time::Instant::now();
            let outcome = match tokio::time::timeout(self.timeout, primary.summarize(facts)).await {
                Ok(Ok(text)) if !text.trim().is_empty() => Ok(text.trim().to_string()),
                Ok(Ok(_)) => Err(NarrativeError::EmptyResponse),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(NarrativeError::Timeout(self.timeout.as_secs())),
            };
            match outcome {
                Ok(text) => {
                    info!(
                        event_name = "narrative.generated",
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "summary generated by model"
                    );
                    return (text, SummarySource::Model);
                }
                Err(e) => {
                    warn!(event_name = "narrative.fallback", error = %e, "model summary failed; using template");
                }
            }
        }
        (self.fallback.render(facts), SummarySource::Template)
    }
}
