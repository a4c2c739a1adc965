//! Three-task pipeline: `auth` → `profile`, plus an independent `offers`.
//!
//! ```text
//! cargo run --example pipeline [config.toml]
//! RUST_LOG=dagrun=debug cargo run --example pipeline
//! ```

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;

use dagrun::{
    CancellationToken, FnTask, RetryPolicy, Runner, RunnerConfig, Task, TaskError, TaskIo, TaskSet,
};

struct AuthTask;

#[async_trait]
impl Task for AuthTask {
    fn name(&self) -> &str {
        "auth"
    }

    fn dependencies(&self) -> &[String] {
        &[]
    }

    async fn pre_execution(&self, _: &CancellationToken, _: &TaskIo) -> Result<(), TaskError> {
        println!("PreExecution auth");
        Ok(())
    }

    async fn execute(&self, _: &CancellationToken, _: &TaskIo) -> Result<TaskIo, TaskError> {
        println!("Executing auth");
        let mut out = TaskIo::default();
        out.insert("token".to_string(), json!("token"));
        Ok(out)
    }
}

struct ProfileTask {
    dependencies: Vec<String>,
}

#[async_trait]
impl Task for ProfileTask {
    fn name(&self) -> &str {
        "profile"
    }

    fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    async fn execute(&self, _: &CancellationToken, input: &TaskIo) -> Result<TaskIo, TaskError> {
        println!("Executing profile");
        let mut keys: Vec<&String> = input.keys().collect();
        keys.sort();
        for key in keys {
            println!("  input {} = {}", key, input[key]);
        }
        let mut out = TaskIo::default();
        out.insert("profile".to_string(), json!("hello"));
        Ok(out)
    }

    async fn post_execution(&self, _: &CancellationToken, _: &TaskIo) -> Result<(), TaskError> {
        println!("PostExecution profile");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => RunnerConfig::load(&path).with_context(|| format!("loading {}", path))?,
        None => RunnerConfig::default(),
    }
    .with_env()?;

    let offers = FnTask::new("offers", |_| async {
        println!("Executing offers");
        let mut out = TaskIo::default();
        out.insert("offers".to_string(), json!(["10% off", "free shipping"]));
        Ok(out)
    })
    .with_retry(RetryPolicy::new(3).with_interval(Duration::from_millis(200)));

    let mut tasks = TaskSet::new();
    tasks.insert(AuthTask)?;
    tasks.insert(ProfileTask {
        dependencies: vec!["auth".to_string()],
    })?;
    tasks.insert(offers)?;

    let runner = Runner::with_config(tasks, config)?;
    println!("Graph:");
    runner.print_graph();

    let results = runner.execute().await?;

    let mut names: Vec<&String> = results.keys().collect();
    names.sort();
    println!("\nResults:");
    for name in names {
        println!("  {}: {}", name, serde_json::to_string(&results[name])?);
    }
    println!("\nExecution order:\n{}", runner.execution_order());

    Ok(())
}
