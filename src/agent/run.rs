//! The Run loop engine (§4.6): turns a request into a finished [`RunResponse`]
//! or a live [`AgentEventStream`], calling the model and executing tool calls
//! turn by turn until the model stops asking for tools, a toolkit session
//! fails to resolve, or `max_turns` is reached.

use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};

use futures_core::Stream;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::LanguageModelError;
use crate::provider::DynLanguageModel;
use crate::types::{LanguageModelInput, Part, ToolCallPart};

use super::config::Agent;
use super::event::{AgentStreamEvent, CancellationToken, ItemEventData, PartialEventData, ResponseEventData};
use super::items::{items_to_messages, AgentItem, ModelItem, ToolItem};
use super::tool::DynAgentTool;
use super::toolkit::ToolkitSession;

/// Input to a Run: the conversation so far (as [`AgentItem`]s, §3.5) plus the
/// caller's context value for this invocation.
#[derive(Debug, Clone)]
pub struct AgentRequest<C> {
    pub input: Vec<AgentItem>,
    pub context: C,
}

impl<C> AgentRequest<C> {
    pub fn new(input: Vec<AgentItem>, context: C) -> Self {
        Self { input, context }
    }
}

/// The terminal, non-streamed result of a Run (§4.6).
#[derive(Debug, Clone, PartialEq)]
pub struct RunResponse {
    pub output: Vec<AgentItem>,
    pub content: Vec<Part>,
}

/// Runs `agent` to completion against `request` and returns the final
/// output, per §4.6.
///
/// # Errors
/// Propagates any model error verbatim. Returns
/// [`LanguageModelError::MaxTurnsExceeded`] if the model still has
/// outstanding tool calls after `agent.max_turns` model calls have been
/// made — that variant's `items` field carries every item produced before
/// the limit was hit, so the caller does not lose the Run's progress.
pub async fn run<C>(agent: &Agent<C>, request: AgentRequest<C>) -> Result<RunResponse, LanguageModelError>
where
    C: Clone + Send + Sync + 'static,
{
    let sessions = open_toolkit_sessions(agent, request.context.clone()).await?;
    let result = run_turns_loop(agent, request.input, request.context, &sessions, None, &CancellationToken::new()).await;
    close_toolkit_sessions(sessions).await;
    result
}

/// Runs `agent` to completion, emitting [`AgentStreamEvent`]s as they occur
/// (§6.3). The Run executes on a spawned task; dropping the returned stream
/// does not cancel it — use `cancellation` for that.
pub fn run_streamed<C>(agent: Agent<C>, request: AgentRequest<C>, cancellation: CancellationToken) -> AgentEventStream
where
    C: Clone + Send + Sync + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let sessions = match open_toolkit_sessions(&agent, request.context.clone()).await {
            Ok(sessions) => sessions,
            Err(err) => {
                let _ = tx.send(Err(err));
                return;
            }
        };
        let result = run_turns_loop(
            &agent,
            request.input,
            request.context,
            &sessions,
            Some(&tx),
            &cancellation,
        )
        .await;
        close_toolkit_sessions(sessions).await;
        let event = result.map(|response| {
            AgentStreamEvent::Response(ResponseEventData {
                output: response.output,
                content: response.content,
            })
        });
        let _ = tx.send(event);
    });

    AgentEventStream { rx }
}

/// Stream of [`AgentStreamEvent`]s produced by [`run_streamed`].
pub struct AgentEventStream {
    rx: mpsc::UnboundedReceiver<Result<AgentStreamEvent, LanguageModelError>>,
}

impl Stream for AgentEventStream {
    type Item = Result<AgentStreamEvent, LanguageModelError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

struct OpenSession<C> {
    session: Box<dyn ToolkitSession<C>>,
}

async fn open_toolkit_sessions<C>(agent: &Agent<C>, context: C) -> Result<Vec<OpenSession<C>>, LanguageModelError>
where
    C: Clone + Send + Sync + 'static,
{
    let mut sessions = Vec::with_capacity(agent.toolkits.len());
    for toolkit in &agent.toolkits {
        let session = toolkit.create_session(context.clone()).await?;
        sessions.push(OpenSession { session });
    }
    Ok(sessions)
}

async fn close_toolkit_sessions<C>(sessions: Vec<OpenSession<C>>) {
    for opened in sessions {
        opened.session.close().await;
    }
}

async fn resolve_turn_system_prompt<C>(agent: &Agent<C>, context: &C, sessions: &[OpenSession<C>]) -> Option<String> {
    let mut parts: Vec<String> = agent
        .instructions
        .iter()
        .map(|instruction| instruction.resolve(context))
        .filter(|text| !text.is_empty())
        .collect();

    for opened in sessions {
        if let Some(prompt) = opened.session.system_prompt().await {
            if !prompt.is_empty() {
                parts.push(prompt);
            }
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n"))
    }
}

async fn resolve_turn_tools<C>(agent: &Agent<C>, sessions: &[OpenSession<C>]) -> Vec<DynAgentTool<C>> {
    let mut tools = agent.tools.clone();
    for opened in sessions {
        tools.extend(opened.session.tools().await);
    }
    tools
}

fn build_model_input<C>(agent: &Agent<C>, items: &[AgentItem], system_prompt: Option<String>, tools: &[DynAgentTool<C>]) -> LanguageModelInput {
    let tool_defs = tools
        .iter()
        .map(|tool| crate::types::Tool {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            parameters: tool.parameters(),
        })
        .collect();

    LanguageModelInput {
        messages: items_to_messages(items),
        system_prompt,
        tools: tool_defs,
        response_format: agent.response_format.clone(),
        temperature: agent.temperature,
        top_p: agent.top_p,
        top_k: agent.top_k,
        presence_penalty: agent.presence_penalty,
        frequency_penalty: agent.frequency_penalty,
        max_tokens: agent.max_tokens,
        seed: agent.seed,
        modalities: agent.modalities.clone(),
        audio: agent.audio.clone(),
        reasoning: agent.reasoning,
        ..Default::default()
    }
}

type EventSender = mpsc::UnboundedSender<Result<AgentStreamEvent, LanguageModelError>>;

async fn run_turns_loop<C>(
    agent: &Agent<C>,
    input: Vec<AgentItem>,
    context: C,
    sessions: &[OpenSession<C>],
    events: Option<&EventSender>,
    cancellation: &CancellationToken,
) -> Result<RunResponse, LanguageModelError>
where
    C: Clone + Send + Sync + 'static,
{
    let mut items = input;
    let mut last_content = Vec::new();

    for turn in 0..agent.max_turns {
        if cancellation.is_cancelled() {
            return Err(LanguageModelError::Cancelled("run cancelled before turn started".to_string()));
        }

        let system_prompt = resolve_turn_system_prompt(agent, &context, sessions).await;
        let tools = resolve_turn_tools(agent, sessions).await;
        let model_input = build_model_input(agent, &items, system_prompt, &tools);

        let model_item = call_model(agent.model.clone(), model_input, events, cancellation).await?;
        last_content = model_item.content.clone();
        let tool_calls = extract_tool_calls(&model_item.content);
        items.push(AgentItem::Model(model_item));
        if let Some(tx) = events {
            emit_item_event(tx, items.last().unwrap().clone());
        }

        if tool_calls.is_empty() {
            return Ok(RunResponse {
                output: items,
                content: last_content,
            });
        }

        let tool_items = execute_tool_calls(&tools, tool_calls, context.clone(), cancellation).await?;
        for tool_item in tool_items {
            items.push(AgentItem::Tool(tool_item));
            if let Some(tx) = events {
                emit_item_event(tx, items.last().unwrap().clone());
            }
        }

        if turn + 1 == agent.max_turns {
            return Err(LanguageModelError::MaxTurnsExceeded {
                max_turns: agent.max_turns,
                items,
            });
        }
    }

    Ok(RunResponse {
        output: items,
        content: last_content,
    })
}

fn emit_item_event(tx: &EventSender, item: AgentItem) {
    let _ = tx.send(Ok(AgentStreamEvent::Item(ItemEventData { item })));
}

async fn call_model(
    model: DynLanguageModel,
    input: LanguageModelInput,
    events: Option<&EventSender>,
    cancellation: &CancellationToken,
) -> Result<ModelItem, LanguageModelError> {
    let input_snapshot = input.clone();

    match events {
        None => {
            let response = model.generate(input).await?;
            Ok(ModelItem {
                content: response.content,
                usage: response.usage,
                cost: response.cost,
                input: input_snapshot,
            })
        }
        Some(tx) => {
            let mut stream = model.stream(input).await?;
            let mut accumulator = crate::accumulator::StreamAccumulator::new();
            loop {
                let next = tokio::select! {
                    biased;
                    _ = cancellation.cancelled() => {
                        return Err(LanguageModelError::Cancelled("run cancelled while streaming model response".to_string()));
                    }
                    next = futures_util::StreamExt::next(&mut stream) => next,
                };
                let Some(frame) = next else { break };
                let partial = frame?;
                if let Some(delta) = partial.delta.clone() {
                    let _ = tx.send(Ok(AgentStreamEvent::Partial(PartialEventData { delta })));
                }
                accumulator.add_partial(model.provider(), &partial)?;
            }
            let response = accumulator.finalize(model.provider())?;
            Ok(ModelItem {
                content: response.content,
                usage: response.usage,
                cost: response.cost,
                input: input_snapshot,
            })
        }
    }
}

fn extract_tool_calls(content: &[Part]) -> Vec<ToolCallPart> {
    content
        .iter()
        .filter_map(|part| match part {
            Part::ToolCall(call) => Some(call.clone()),
            _ => None,
        })
        .collect()
}

async fn execute_tool_calls<C>(
    tools: &[DynAgentTool<C>],
    calls: Vec<ToolCallPart>,
    context: C,
    cancellation: &CancellationToken,
) -> Result<Vec<ToolItem>, LanguageModelError>
where
    C: Clone + Send + Sync + 'static,
{
    let mut handles = Vec::with_capacity(calls.len());
    for call in calls {
        let context = context.clone();
        let tool = tools.iter().find(|tool| tool.name() == call.tool_name).cloned();
        let cancellation = cancellation.clone();
        handles.push(tokio::spawn(async move {
            run_one_tool_call(tool, call, context, cancellation).await
        }));
    }

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        let item = handle
            .await
            .map_err(|err| LanguageModelError::invariant("agent", format!("tool task panicked: {err}")))?;
        results.push(item);
    }
    Ok(results)
}

async fn run_one_tool_call<C>(
    tool: Option<DynAgentTool<C>>,
    call: ToolCallPart,
    context: C,
    cancellation: CancellationToken,
) -> ToolItem
where
    C: Send + Sync + 'static,
{
    let args = call.args.clone().unwrap_or(Value::Null);

    let Some(tool) = tool else {
        return ToolItem {
            tool_call_id: call.tool_call_id,
            tool_name: call.tool_name.clone(),
            input: args,
            output: vec![Part::text(format!("unknown tool: {}", call.tool_name))],
            is_error: true,
        };
    };

    let outcome = tokio::select! {
        biased;
        _ = cancellation.cancelled() => Err(LanguageModelError::Cancelled("run cancelled during tool execution".to_string())),
        outcome = tool.execute(args.clone(), context) => outcome,
    };

    match outcome {
        Ok(output) => ToolItem {
            tool_call_id: call.tool_call_id,
            tool_name: call.tool_name,
            input: args,
            output,
            is_error: false,
        },
        Err(err) => ToolItem {
            tool_call_id: call.tool_call_id,
            tool_name: call.tool_name,
            input: args,
            output: vec![Part::text(err.to_string())],
            is_error: true,
        },
    }
}
