use serde::{Deserialize, Serialize};

/// Per-modality token counts, split by cached vs. uncached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelTokensDetails {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub text_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cached_text_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub audio_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cached_audio_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub image_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cached_image_tokens: Option<u64>,
}

impl ModelTokensDetails {
    fn merge(&mut self, other: &ModelTokensDetails) {
        macro_rules! sum_field {
            ($field:ident) => {
                self.$field = Some(self.$field.unwrap_or(0) + other.$field.unwrap_or(0));
            };
        }
        sum_field!(text_tokens);
        sum_field!(cached_text_tokens);
        sum_field!(audio_tokens);
        sum_field!(cached_audio_tokens);
        sum_field!(image_tokens);
        sum_field!(cached_image_tokens);
    }
}

/// Token accounting record returned by a provider for one call (or, while
/// streaming, one increment of a call).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub input_tokens_details: Option<ModelTokensDetails>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub output_tokens_details: Option<ModelTokensDetails>,
}

impl ModelUsage {
    /// Component-wise sum used by the [`crate::accumulator::StreamAccumulator`]
    /// and by callers folding usage across turns.
    pub fn add(&mut self, other: &ModelUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        if let Some(details) = &other.input_tokens_details {
            self.input_tokens_details.get_or_insert_with(Default::default).merge(details);
        }
        if let Some(details) = &other.output_tokens_details {
            self.output_tokens_details.get_or_insert_with(Default::default).merge(details);
        }
    }

    /// Computes the USD cost of this usage record against `pricing`.
    ///
    /// Per-token-modality documented in §3.4/§4.4: missing detail fields are
    /// treated as zero, never as the full total; when `input_tokens_details`
    /// is entirely absent but `input_tokens` is present, all input tokens are
    /// assumed to be text for cost purposes.
    #[must_use]
    pub fn calculate_cost(&self, pricing: &Pricing) -> f64 {
        let (input_text, input_cached_text, input_audio, input_cached_audio, input_image, input_cached_image) =
            match &self.input_tokens_details {
                Some(details) => (
                    details.text_tokens.unwrap_or(0),
                    details.cached_text_tokens.unwrap_or(0),
                    details.audio_tokens.unwrap_or(0),
                    details.cached_audio_tokens.unwrap_or(0),
                    details.image_tokens.unwrap_or(0),
                    details.cached_image_tokens.unwrap_or(0),
                ),
                None => (self.input_tokens, 0, 0, 0, 0, 0),
            };

        let uncached_text = input_text.saturating_sub(input_cached_text);
        let uncached_audio = input_audio.saturating_sub(input_cached_audio);
        let uncached_image = input_image.saturating_sub(input_cached_image);

        let mut cost = 0.0;
        cost += uncached_text as f64 * pricing.text.input;
        cost += input_cached_text as f64 * pricing.cached_text.input;
        cost += uncached_audio as f64 * pricing.audio.input;
        cost += input_cached_audio as f64 * pricing.cached_audio.input;
        cost += uncached_image as f64 * pricing.image.input;
        cost += input_cached_image as f64 * pricing.cached_image.input;

        if let Some(details) = &self.output_tokens_details {
            cost += details.text_tokens.unwrap_or(0) as f64 * pricing.text.output;
            cost += details.audio_tokens.unwrap_or(0) as f64 * pricing.audio.output;
            cost += details.image_tokens.unwrap_or(0) as f64 * pricing.image.output;
        } else {
            cost += self.output_tokens as f64 * pricing.text.output;
        }

        cost
    }
}

/// Input and output per-token USD rates for one content modality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rate {
    pub input: f64,
    pub output: f64,
}

/// Per-token monetary rates, per modality, for input/output and
/// cached/uncached variants. Absent entirely ⇒ cost is always 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    pub text: Rate,
    pub cached_text: Rate,
    pub audio: Rate,
    pub cached_audio: Rate,
    pub image: Rate,
    pub cached_image: Rate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_is_zero_without_pricing() {
        let usage = ModelUsage {
            input_tokens: 1000,
            output_tokens: 500,
            ..Default::default()
        };
        assert_eq!(usage.calculate_cost(&Pricing::default()), 0.0);
    }

    #[test]
    fn cost_matches_dot_product_of_rates_and_counts() {
        let usage = ModelUsage {
            input_tokens: 100,
            output_tokens: 50,
            input_tokens_details: Some(ModelTokensDetails {
                text_tokens: Some(80),
                cached_text_tokens: Some(20),
                ..Default::default()
            }),
            output_tokens_details: Some(ModelTokensDetails {
                text_tokens: Some(50),
                ..Default::default()
            }),
        };
        let pricing = Pricing {
            text: Rate {
                input: 0.000003,
                output: 0.000015,
            },
            cached_text: Rate {
                input: 0.0000015,
                output: 0.0,
            },
            ..Default::default()
        };
        // uncached_text = 60 input tokens at 0.000003, cached 20 at 0.0000015
        let expected =
            60.0 * 0.000003 + 20.0 * 0.0000015 + 50.0 * 0.000015;
        let actual = usage.calculate_cost(&pricing);
        assert!((actual - expected).abs() < 1e-12);
    }

    #[test]
    fn missing_details_default_to_text_only_for_input() {
        let usage = ModelUsage {
            input_tokens: 10,
            output_tokens: 0,
            ..Default::default()
        };
        let pricing = Pricing {
            text: Rate {
                input: 1.0,
                output: 0.0,
            },
            ..Default::default()
        };
        assert_eq!(usage.calculate_cost(&pricing), 10.0);
    }

    #[test]
    fn usage_addition_sums_component_wise() {
        let mut total = ModelUsage {
            input_tokens: 10,
            output_tokens: 5,
            ..Default::default()
        };
        total.add(&ModelUsage {
            input_tokens: 3,
            output_tokens: 2,
            ..Default::default()
        });
        assert_eq!(total.input_tokens, 13);
        assert_eq!(total.output_tokens, 7);
    }
}
