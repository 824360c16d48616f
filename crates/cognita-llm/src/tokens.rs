use cognita_core::models::cost::ModelPricing;
use cognita_core::models::token_count::{TokenCount, TokenUsage};

/// Calculate the cost for a token count given model pricing.
pub fn calculate_cost(tokens: TokenCount, pricing: &ModelPricing) -> TokenUsage {
    TokenUsage {
        tokens,
        cost_usd: pricing.estimate_cost(tokens),
    }
}

/// Price a token count for a model, costing unknown models at zero.
pub fn usage_for(model_id: &str, tokens: TokenCount) -> TokenUsage {
    match get_pricing(model_id) {
        Some(p) => calculate_cost(tokens, &p),
        None => TokenUsage {
            tokens,
            cost_usd: 0.0,
        },
    }
}

/// Known model pricing (per million tokens).
/// These are approximate and should be updated as pricing changes.
pub fn get_pricing(model_id: &str) -> Option<ModelPricing> {
    match model_id {
        // Claude 4 Opus
        id if id.contains("claude-opus-4") => Some(ModelPricing {
            input_per_million: 15.0,
            output_per_million: 75.0,
        }),
        // Claude 4 Sonnet
        id if id.contains("claude-sonnet-4") => Some(ModelPricing {
            input_per_million: 3.0,
            output_per_million: 15.0,
        }),
        // Claude 3.5 Haiku
        id if id.contains("claude-haiku") => Some(ModelPricing {
            input_per_million: 0.80,
            output_per_million: 4.0,
        }),
        // Must precede the gpt-4o arm.
        id if id.contains("gpt-4o-mini") => Some(ModelPricing {
            input_per_million: 0.15,
            output_per_million: 0.60,
        }),
        id if id.contains("gpt-4o") => Some(ModelPricing {
            input_per_million: 2.50,
            output_per_million: 10.0,
        }),
        id if id.contains("gpt-4.1-mini") => Some(ModelPricing {
            input_per_million: 0.40,
            output_per_million: 1.60,
        }),
        id if id.contains("gpt-4.1") => Some(ModelPricing {
            input_per_million: 2.0,
            output_per_million: 8.0,
        }),
        _ => None,
    }
}

/// Rough token count for pre-flight estimates: about four characters per
/// token for English prose.
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(4)
}
