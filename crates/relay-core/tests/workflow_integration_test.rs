//! End-to-end workflow runs against scripted model clients.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use relay_core::{
    Agent, Completion, Configuration, ContextLimit, GenerationParams, ModelClient, ProviderError,
    ProviderErrorKind, ProviderKind, RunState, StepDefinitionError, Workflow, WorkflowEvent,
    WorkflowRunError,
};
use relay_models::ScriptedClient;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn agent_with(client: Arc<ScriptedClient>) -> Arc<Agent> {
    let config = Configuration::builder(ProviderKind::Mock, "scripted").build().unwrap();
    Arc::new(Agent::with_client("tester", config, client))
}

fn renewable_energy_workflow(agent: Arc<Agent>) -> Workflow {
    let mut workflow = Workflow::new("energías", agent);
    workflow
        .add_step("investigación", "Investiga sobre energías renovables")
        .unwrap()
        .add_step("análisis", "Analiza los datos recolectados en el paso anterior")
        .unwrap()
        .add_step("conclusión", "Genera una conclusión basada en los análisis")
        .unwrap();
    workflow
}

#[tokio::test]
async fn test_three_step_example_returns_ordered_results() {
    let client = Arc::new(ScriptedClient::from_texts("scripted", ["OK-1", "OK-2", "OK-3"]));
    let workflow = renewable_energy_workflow(agent_with(client.clone()));

    let results = workflow.run().await.unwrap();

    assert_eq!(
        results.entries().collect::<Vec<_>>(),
        vec![("investigación", "OK-1"), ("análisis", "OK-2"), ("conclusión", "OK-3")]
    );
    assert_eq!(
        serde_json::to_string(&results).unwrap(),
        r#"{"investigación":"OK-1","análisis":"OK-2","conclusión":"OK-3"}"#
    );

    let prompts = client.prompts().await;
    assert_eq!(prompts.len(), 3);
    assert_eq!(prompts[0], "Investiga sobre energías renovables");
    assert!(prompts[1].contains("OK-1"));
    assert_eq!(
        prompts[1],
        "Analiza los datos recolectados en el paso anterior\n\nContext so far:\nOK-1"
    );
}

#[tokio::test]
async fn test_each_prompt_contains_all_prior_completions_in_order() {
    let client = Arc::new(ScriptedClient::from_texts("scripted", ["alpha", "beta", "gamma", "delta"]));
    let mut workflow = Workflow::new("chain", agent_with(client.clone()));
    for (name, instruction) in [("s1", "one"), ("s2", "two"), ("s3", "three"), ("s4", "four")] {
        workflow.add_step(name, instruction).unwrap();
    }

    workflow.run().await.unwrap();

    let prompts = client.prompts().await;
    assert!(!prompts[0].contains("Context so far:"));
    assert!(prompts[3].ends_with("alpha\n\nbeta\n\ngamma"));
    let a = prompts[3].find("alpha").unwrap();
    let b = prompts[3].find("beta").unwrap();
    let c = prompts[3].find("gamma").unwrap();
    assert!(a < b && b < c);
    assert!(!prompts[3].contains("delta"));
}

#[tokio::test]
async fn test_failure_halts_run_and_keeps_partial_results() {
    let client = Arc::new(ScriptedClient::new("scripted", vec![
        Ok(Completion::text("OK-1")),
        Err(ProviderError::timeout("request timed out")),
        Ok(Completion::text("never used")),
    ]));
    let workflow = renewable_energy_workflow(agent_with(client.clone()));

    let err = workflow.run().await.unwrap_err();

    assert_eq!(err.failed_step(), Some("análisis"));
    assert_eq!(err.index(), 1);
    assert_eq!(err.provider_error().map(|e| e.kind), Some(ProviderErrorKind::Timeout));
    assert_eq!(err.partial().names().collect::<Vec<_>>(), vec!["investigación"]);
    assert_eq!(err.partial().get("investigación"), Some("OK-1"));
    assert_eq!(client.call_count().await, 2);
}

#[tokio::test]
async fn test_duplicate_step_name_is_rejected_at_definition() {
    let client = Arc::new(ScriptedClient::from_texts("scripted", ["OK-1", "OK-2", "OK-3"]));
    let mut workflow = renewable_energy_workflow(agent_with(client));

    let err = workflow.add_step("análisis", "Otra instrucción").unwrap_err();

    assert_eq!(err, StepDefinitionError::DuplicateName("análisis".to_string()));
    assert_eq!(
        workflow.step_names().collect::<Vec<_>>(),
        vec!["investigación", "análisis", "conclusión"]
    );
    assert_eq!(workflow.steps()[1].instruction(), "Analiza los datos recolectados en el paso anterior");
}

#[tokio::test]
async fn test_repeated_runs_share_structure_with_fresh_context() {
    let client = Arc::new(ScriptedClient::from_texts("scripted", [
        "first-1", "first-2", "first-3", "second-1", "second-2", "second-3",
    ]));
    let workflow = renewable_energy_workflow(agent_with(client.clone()));

    let first = workflow.run().await.unwrap();
    let second = workflow.run().await.unwrap();

    assert_eq!(first.names().collect::<Vec<_>>(), second.names().collect::<Vec<_>>());
    assert_ne!(first.get("conclusión"), second.get("conclusión"));

    let prompts = client.prompts().await;
    assert_eq!(prompts[3], "Investiga sobre energías renovables");
    assert!(!prompts[4].contains("first-"));
}

/// Answers every prompt, cancelling the run's token after the first one.
struct CancelAfterFirst {
    token: CancellationToken,
    calls: AtomicUsize,
}

#[async_trait]
impl ModelClient for CancelAfterFirst {
    async fn complete(
        &self,
        _prompt: &str,
        _params: &GenerationParams,
    ) -> Result<Completion, ProviderError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.token.cancel();
        Ok(Completion::text(format!("OK-{n}")))
    }

    fn model_id(&self) -> &str {
        "cancel-after-first"
    }

    fn provider(&self) -> &str {
        "test"
    }
}

#[tokio::test]
async fn test_cancellation_between_steps() {
    let token = CancellationToken::new();
    let client = Arc::new(CancelAfterFirst { token: token.clone(), calls: AtomicUsize::new(0) });
    let config = Configuration::builder(ProviderKind::Mock, "scripted").build().unwrap();
    let agent = Arc::new(Agent::with_client("tester", config, client.clone()));
    let workflow = renewable_energy_workflow(agent);

    let mut run = workflow.runner().with_cancellation(token);
    let err = run.execute().await.unwrap_err();

    assert_eq!(run.state(), RunState::Cancelled);
    match err {
        WorkflowRunError::Cancelled { next_step, index, partial } => {
            assert_eq!(next_step, "análisis");
            assert_eq!(index, 1);
            assert_eq!(partial.get("investigación"), Some("OK-1"));
            assert_eq!(partial.len(), 1);
        }
        other @ WorkflowRunError::StepFailed { .. } => panic!("expected cancellation, got {other:?}"),
    }
    assert_eq!(client.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_events_follow_run_progress() {
    let client = Arc::new(ScriptedClient::from_texts("scripted", ["OK-1", "OK-2", "OK-3"]));
    let workflow = renewable_energy_workflow(agent_with(client));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut run = workflow.runner().with_events(tx);
    run.execute().await.unwrap();
    drop(run);

    let mut kinds = Vec::new();
    let mut aggregate = None;
    while let Some(event) = rx.recv().await {
        kinds.push(event.kind());
        if let WorkflowEvent::ChainComplete(response) = event {
            aggregate = Some(response);
        }
    }

    assert_eq!(kinds.iter().filter(|k| **k == "step_start").count(), 3);
    assert_eq!(kinds.iter().filter(|k| **k == "step_complete").count(), 3);
    assert_eq!(kinds.last(), Some(&"chain_complete"));

    let aggregate = aggregate.unwrap();
    assert_eq!(aggregate.chain, "energías");
    assert_eq!(aggregate.get("conclusión"), Some("OK-3"));
}

#[tokio::test]
async fn test_failure_emits_error_event_and_no_chain_complete() {
    let client = Arc::new(ScriptedClient::new("scripted", vec![Err(ProviderError::auth("bad key"))]));
    let workflow = renewable_energy_workflow(agent_with(client));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut run = workflow.runner().with_events(tx);
    assert!(run.execute().await.is_err());
    drop(run);

    let mut kinds = Vec::new();
    while let Some(event) = rx.recv().await {
        kinds.push(event.kind());
    }
    assert!(kinds.contains(&"error"));
    assert!(!kinds.contains(&"chain_complete"));
}

#[tokio::test]
async fn test_bounded_context_keeps_most_recent_text() {
    let client = Arc::new(ScriptedClient::from_texts("scripted", ["aaaaaaaaaa", "bbbbbbbbbb", "cccc"]));
    let mut workflow =
        Workflow::new("bounded", agent_with(client.clone())).with_context_limit(ContextLimit::MaxChars(12));
    workflow.add_step("one", "first").unwrap();
    workflow.add_step("two", "second").unwrap();
    workflow.add_step("three", "third").unwrap();

    workflow.run().await.unwrap();

    let prompts = client.prompts().await;
    assert_eq!(prompts[2], "third\n\nContext so far:\nbbbbbbbbbb");
}

#[tokio::test]
async fn test_concurrent_runs_share_one_agent() {
    let client = Arc::new(ScriptedClient::from_texts("scripted", ["x", "y", "z", "w"]));
    let agent = agent_with(client.clone());

    let mut first = Workflow::new("first", agent.clone());
    first.add_step("a", "do a").unwrap().add_step("b", "do b").unwrap();
    let mut second = Workflow::new("second", agent);
    second.add_step("c", "do c").unwrap().add_step("d", "do d").unwrap();

    let (r1, r2) = tokio::join!(first.run(), second.run());
    let (r1, r2) = (r1.unwrap(), r2.unwrap());

    assert_eq!(r1.names().collect::<Vec<_>>(), vec!["a", "b"]);
    assert_eq!(r2.names().collect::<Vec<_>>(), vec!["c", "d"]);
    assert_eq!(client.call_count().await, 4);
}
