//! Helpers for reporter tests

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use ufacter_core::{Fact, FactSink, FactValue, ReportOptions, Reporter};
use ufacter_exec::{CommandExecutor, CommandResult, ExecError};

/// Executor answering from a table of canned results
#[derive(Default)]
pub struct MockExecutor {
    responses: HashMap<String, Result<CommandResult, ExecError>>,
}

impl MockExecutor {
    pub fn with(mut self, command: &str, stdout: &str) -> Self {
        self.responses
            .insert(command.to_string(), Ok(CommandResult::from_stdout(stdout)));
        self
    }

    pub fn with_result(mut self, command: &str, result: Result<CommandResult, ExecError>) -> Self {
        self.responses.insert(command.to_string(), result);
        self
    }
}

#[async_trait]
impl CommandExecutor for MockExecutor {
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandResult, ExecError> {
        let key = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        self.responses
            .get(&key)
            .cloned()
            .unwrap_or_else(|| Err(ExecError::NotFound(key)))
    }

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        _timeout: Duration,
    ) -> Result<CommandResult, ExecError> {
        self.run(program, args).await
    }

    fn executor_type(&self) -> &'static str {
        "mock"
    }
}

/// Run one reporter outside the engine and collect what it sent
pub async fn capture(reporter: &dyn Reporter, options: ReportOptions) -> Vec<Fact> {
    let (tx, mut rx) = mpsc::channel(1024);
    let sink = FactSink::new(tx, reporter.name());
    reporter.report(&sink, options).await;
    drop(sink);

    let mut facts = Vec::new();
    while let Some(fact) = rx.recv().await {
        facts.push(fact);
    }
    facts
}

/// Value of the last fact sent for `dotted`
pub fn value_of<'a>(facts: &'a [Fact], dotted: &str) -> Option<&'a FactValue> {
    facts
        .iter()
        .rev()
        .find(|fact| fact.dotted() == dotted)
        .and_then(Fact::value)
}

/// The fact sent for `dotted`
pub fn fact<'a>(facts: &'a [Fact], dotted: &str) -> Option<&'a Fact> {
    facts.iter().rev().find(|fact| fact.dotted() == dotted)
}
