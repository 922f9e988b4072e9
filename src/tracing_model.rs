//! Decorates any [`LanguageModel`] with a `tracing` span per call (§4.5).
//!
//! The wrapper only emits spans and fields; it does not export them. Wiring
//! an actual exporter (OTLP, Jaeger, …) is the caller's responsibility, per
//! §1's "external collaborators" note on telemetry export backends.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use async_trait::async_trait;
use futures_core::Stream;
use tracing::{Instrument, field, info_span};

use crate::accumulator::StreamAccumulator;
use crate::error::LanguageModelError;
use crate::provider::{ChatStream, DynLanguageModel, LanguageModel};
use crate::types::{LanguageModelInput, LanguageModelMetadata, ModelResponse, PartialModelResponse};

/// Wraps a [`LanguageModel`] so every `generate`/`stream` call opens a span
/// named `llm_sdk.generate` / `llm_sdk.stream` carrying provider, model id,
/// sampling parameters, usage, cost, and (stream only) time-to-first-delta.
pub struct TracingLanguageModel {
    inner: DynLanguageModel,
}

impl TracingLanguageModel {
    pub fn new(inner: DynLanguageModel) -> Self {
        Self { inner }
    }
}

fn sampling_span_fields(input: &LanguageModelInput) -> tracing::Span {
    info_span!(
        "llm_sdk.generate",
        provider = field::Empty,
        model_id = field::Empty,
        max_tokens = input.max_tokens,
        temperature = input.temperature,
        top_p = input.top_p,
        top_k = input.top_k,
        seed = input.seed,
        input_tokens = field::Empty,
        output_tokens = field::Empty,
        cost = field::Empty,
        error = field::Empty,
    )
}

#[async_trait]
impl LanguageModel for TracingLanguageModel {
    fn provider(&self) -> &'static str {
        self.inner.provider()
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    fn metadata(&self) -> LanguageModelMetadata {
        self.inner.metadata()
    }

    async fn generate(&self, input: LanguageModelInput) -> Result<ModelResponse, LanguageModelError> {
        let span = sampling_span_fields(&input);
        span.record("provider", self.inner.provider());
        span.record("model_id", self.inner.model_id());

        async move {
            let result = self.inner.generate(input).await;
            match &result {
                Ok(response) => {
                    if let Some(usage) = &response.usage {
                        tracing::Span::current().record("input_tokens", usage.input_tokens);
                        tracing::Span::current().record("output_tokens", usage.output_tokens);
                    }
                    if let Some(cost) = response.cost {
                        tracing::Span::current().record("cost", cost);
                    }
                }
                Err(err) => {
                    tracing::Span::current().record("error", field::display(err));
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn stream(&self, input: LanguageModelInput) -> Result<ChatStream, LanguageModelError> {
        let span = info_span!(
            "llm_sdk.stream",
            provider = self.inner.provider(),
            model_id = self.inner.model_id(),
            max_tokens = input.max_tokens,
            temperature = input.temperature,
            top_p = input.top_p,
            top_k = input.top_k,
            seed = input.seed,
            input_tokens = field::Empty,
            output_tokens = field::Empty,
            cost = field::Empty,
            ttft_ms = field::Empty,
            error = field::Empty,
        );

        let inner_stream = {
            let _enter = span.enter();
            self.inner.stream(input).await
        };

        match inner_stream {
            Ok(stream) => Ok(Box::pin(TracedStream {
                inner: stream,
                span,
                started_at: Instant::now(),
                first_delta_at: None,
                accumulator: StreamAccumulator::new(),
                provider: self.inner.provider(),
                finished: false,
            })),
            Err(err) => {
                span.in_scope(|| {
                    tracing::Span::current().record("error", field::display(&err));
                });
                Err(err)
            }
        }
    }
}

/// Stream wrapper that records time-to-first-delta and folds usage/cost
/// through a [`StreamAccumulator`] so the span can report final totals when
/// the stream completes.
struct TracedStream {
    inner: ChatStream,
    span: tracing::Span,
    started_at: Instant,
    first_delta_at: Option<Instant>,
    accumulator: StreamAccumulator,
    provider: &'static str,
    finished: bool,
}

impl Stream for TracedStream {
    type Item = Result<PartialModelResponse, LanguageModelError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let _enter = this.span.enter();

        match this.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(partial))) => {
                if this.first_delta_at.is_none() && partial.delta.is_some() {
                    this.first_delta_at = Some(Instant::now());
                    let ttft = this.first_delta_at.unwrap() - this.started_at;
                    tracing::Span::current().record("ttft_ms", ttft.as_millis() as u64);
                }
                if let Err(err) = this.accumulator.add_partial(this.provider, &partial) {
                    tracing::Span::current().record("error", field::display(&err));
                    this.finished = true;
                    return Poll::Ready(Some(Err(err)));
                }
                Poll::Ready(Some(Ok(partial)))
            }
            Poll::Ready(Some(Err(err))) => {
                tracing::Span::current().record("error", field::display(&err));
                this.finished = true;
                Poll::Ready(Some(Err(err)))
            }
            Poll::Ready(None) => {
                if !this.finished {
                    this.finished = true;
                    let accumulated = std::mem::take(&mut this.accumulator);
                    if let Ok(response) = accumulated.finalize(this.provider) {
                        if let Some(usage) = &response.usage {
                            tracing::Span::current().record("input_tokens", usage.input_tokens);
                            tracing::Span::current().record("output_tokens", usage.output_tokens);
                        }
                        if let Some(cost) = response.cost {
                            tracing::Span::current().record("cost", cost);
                        }
                    }
                }
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
