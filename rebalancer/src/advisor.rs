//! Allocation advisor: an external model proposes new target weights.
//!
//! Suggestions are never applied as-is. [`review`] normalizes and clamps
//! them and only returns a new target when some asset moves by more than
//! the configured minimum change.

use std::time::Duration;

use ballast::{Symbol, TargetAllocation};
use log::{info, warn};
use reqwest::blocking::Client;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::json;
use zeroize::Zeroizing;

use crate::config::AdvisorConfig;
use crate::error::{Error, Result};

/// A source of allocation suggestions.
pub trait Advisor {
    /// Free-form market assessment for `context` (portfolio and market data).
    fn analyze_market(&self, context: &serde_json::Value) -> Result<serde_json::Value>;

    /// Raw suggested weights; may be unnormalized or out of bounds.
    fn suggest_allocation(
        &self,
        current: &TargetAllocation,
        market_analysis: &serde_json::Value,
    ) -> Result<FxHashMap<Symbol, f64>>;
}

/// Outcome of an advisor review.
#[derive(Debug, Clone, PartialEq)]
pub enum Review {
    /// The suggestion moves some asset by more than the minimum change.
    Update {
        allocation: TargetAllocation,
        max_change: f64,
    },
    /// The suggestion is too close to the current target.
    Keep { max_change: f64 },
}

/// Ask `advisor` for a new allocation and decide whether to adopt it.
pub fn review<A: Advisor + ?Sized>(
    advisor: &A,
    current: &TargetAllocation,
    context: &serde_json::Value,
    config: &AdvisorConfig,
) -> Result<Review> {
    let analysis = advisor.analyze_market(context)?;
    let raw = advisor.suggest_allocation(current, &analysis)?;
    let suggested = TargetAllocation::from_map(&raw)?.clamped(config.min_weight, config.max_weight);
    info!("Advisor suggested allocation: {suggested}");

    let max_change = suggested.max_change(current);
    if max_change > config.min_change {
        info!("Advisor suggests significant allocation change (max: {max_change:.3})");
        Ok(Review::Update {
            allocation: suggested,
            max_change,
        })
    } else {
        info!("Advisor suggests minimal changes, keeping current allocation");
        Ok(Review::Keep { max_change })
    }
}

// ============================================================================
// OpenAI
// ============================================================================

pub const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Chat-completions advisor.
pub struct OpenAiAdvisor {
    client: Client,
    url: String,
    api_key: Zeroizing<String>,
    model: String,
    min_weight: f64,
    max_weight: f64,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f64,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiAdvisor {
    pub fn new(api_key: &str, config: &AdvisorConfig) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::Advisor("API key is empty".into()));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Advisor(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: OPENAI_CHAT_URL.to_string(),
            api_key: Zeroizing::new(api_key.to_string()),
            model: config.model.clone(),
            min_weight: config.min_weight,
            max_weight: config.max_weight,
        })
    }

    fn complete(&self, prompt: &str, temperature: f64) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature,
        };
        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(self.api_key.as_str())
            .json(&body)
            .send()
            .map_err(|e| Error::Advisor(format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            return Err(Error::Advisor(format!("HTTP {status}: {text}")));
        }
        let parsed: ChatResponse = resp
            .json()
            .map_err(|e| Error::Advisor(format!("failed to parse response: {e}")))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::Advisor("empty completion".into()))
    }
}

/// Strip a surrounding Markdown code fence, if any.
pub fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let Some(inner) = text.strip_prefix("```") else {
        return text;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// Parse a `{"SYMBOL": weight, ...}` completion.
pub fn parse_weights(text: &str) -> Result<FxHashMap<Symbol, f64>> {
    let raw: FxHashMap<String, f64> = serde_json::from_str(strip_code_fence(text))
        .map_err(|e| Error::Advisor(format!("suggestion is not a weight map: {e}")))?;
    raw.into_iter()
        .map(|(name, w)| {
            Symbol::try_new(&name)
                .map(|s| (s, w))
                .ok_or_else(|| Error::Advisor(format!("invalid symbol in suggestion: {name:?}")))
        })
        .collect()
}

impl Advisor for OpenAiAdvisor {
    fn analyze_market(&self, context: &serde_json::Value) -> Result<serde_json::Value> {
        let prompt = format!(
            "Analyze the current cryptocurrency market conditions and provide insights for \
             portfolio management.\n\nContext:\n{context:#}\n\nRespond in JSON format with keys: \
             sentiment, risk_level, recommendations, confidence (0-100), reasoning"
        );
        let text = self.complete(&prompt, 0.3)?;
        match serde_json::from_str(strip_code_fence(&text)) {
            Ok(analysis) => Ok(analysis),
            Err(_) => {
                warn!("Market analysis was not valid JSON");
                Ok(json!({ "analysis": text, "confidence": 50, "sentiment": "neutral" }))
            }
        }
    }

    fn suggest_allocation(
        &self,
        current: &TargetAllocation,
        market_analysis: &serde_json::Value,
    ) -> Result<FxHashMap<Symbol, f64>> {
        let prompt = allocation_prompt(current, market_analysis, self.min_weight, self.max_weight);
        parse_weights(&self.complete(&prompt, 0.2)?)
    }
}

fn allocation_prompt(
    current: &TargetAllocation,
    market_analysis: &serde_json::Value,
    min: f64,
    max: f64,
) -> String {
    let current_map: FxHashMap<&str, f64> =
        current.weights().iter().map(|(s, w)| (s.as_str(), *w)).collect();
    let tokens: Vec<&str> = current.weights().iter().map(|(s, _)| s.as_str()).collect();
    format!(
        "Based on current market conditions and analysis, suggest an optimal portfolio \
         allocation.\n\nCurrent Allocation:\n{current}\n\nMarket Analysis:\n{market_analysis:#}\n\n\
         Available tokens: {tokens}\n\nRules:\n- Allocations must sum to 1.0\n\
         - Minimum allocation per token: {min}\n- Maximum allocation per token: {max}\n\n\
         Respond with ONLY a JSON object with token symbols as keys and allocation \
         fractions as values.",
        current = json!(current_map),
        tokens = tokens.join(", "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usdc() -> Symbol {
        Symbol::new("USDC")
    }
    fn weth() -> Symbol {
        Symbol::new("WETH")
    }
    fn wbtc() -> Symbol {
        Symbol::new("WBTC")
    }

    struct Fixed(Vec<(Symbol, f64)>);

    impl Advisor for Fixed {
        fn analyze_market(&self, _: &serde_json::Value) -> Result<serde_json::Value> {
            Ok(json!({ "sentiment": "neutral" }))
        }

        fn suggest_allocation(
            &self,
            _: &TargetAllocation,
            _: &serde_json::Value,
        ) -> Result<FxHashMap<Symbol, f64>> {
            Ok(self.0.iter().copied().collect())
        }
    }

    fn current() -> TargetAllocation {
        TargetAllocation::new(vec![(usdc(), 0.25), (weth(), 0.5), (wbtc(), 0.25)]).unwrap()
    }

    #[test]
    fn strip_fences() {
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("  {} "), "{}");
    }

    #[test]
    fn parse_weight_map() {
        let weights = parse_weights("```json\n{\"USDC\": 0.3, \"WETH\": 0.7}\n```").unwrap();
        assert_eq!(weights[&weth()], 0.7);
        assert!(parse_weights("not json").is_err());
        assert!(parse_weights("{\"NOTATOKEN9\": 1.0}").is_err());
    }

    #[test]
    fn prompt_lists_target_tokens_and_bounds() {
        let prompt = allocation_prompt(&current(), &json!({ "sentiment": "bullish" }), 0.05, 0.7);
        assert!(prompt.contains("Available tokens: USDC, WETH, WBTC"));
        assert!(prompt.contains("Minimum allocation per token: 0.05"));
        assert!(prompt.contains("Maximum allocation per token: 0.7"));
        assert!(prompt.contains("bullish"));
    }

    #[test]
    fn large_change_updates_with_clamp() {
        let advisor = Fixed(vec![(usdc(), 0.0), (weth(), 0.9), (wbtc(), 0.1)]);
        let review = review(&advisor, &current(), &json!({}), &AdvisorConfig::default()).unwrap();

        let Review::Update { allocation, max_change } = review else {
            panic!("expected update");
        };
        assert!(max_change > 0.05);
        // clamped to [0.05, 0.70] = {0.05, 0.70, 0.10}, then renormalized over 0.85
        assert!((allocation.weight(&usdc()) - 0.05 / 0.85).abs() < 1e-9);
        assert!((allocation.weight(&weth()) - 0.70 / 0.85).abs() < 1e-9);
        assert!((allocation.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn small_change_keeps_current() {
        let advisor = Fixed(vec![(usdc(), 0.27), (weth(), 0.48), (wbtc(), 0.25)]);
        let review = review(&advisor, &current(), &json!({}), &AdvisorConfig::default()).unwrap();
        assert!(matches!(review, Review::Keep { max_change } if max_change < 0.05));
    }

    #[test]
    fn empty_suggestion_is_error() {
        let advisor = Fixed(vec![]);
        assert!(matches!(
            review(&advisor, &current(), &json!({}), &AdvisorConfig::default()),
            Err(Error::Target(_))
        ));
    }
}
