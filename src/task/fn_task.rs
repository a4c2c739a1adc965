//! FnTask - closure-backed task
//!
//! Lets callers assemble a graph out of async closures instead of writing a
//! `Task` impl per node. Each stage closure receives an owned copy of its
//! input map.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use tokio_util::sync::CancellationToken;

use super::{Task, TaskError, TaskIo};
use crate::retry::RetryPolicy;

type StageFn = Arc<dyn Fn(TaskIo) -> BoxFuture<'static, Result<(), TaskError>> + Send + Sync>;
type ExecFn = Arc<dyn Fn(TaskIo) -> BoxFuture<'static, Result<TaskIo, TaskError>> + Send + Sync>;

/// Task whose lifecycle stages are closures
#[derive(Clone)]
pub struct FnTask {
    name: String,
    dependencies: Vec<String>,
    retry: Option<RetryPolicy>,
    pre: Option<StageFn>,
    exec: ExecFn,
    post: Option<StageFn>,
}

impl FnTask {
    pub fn new<F, Fut>(name: impl Into<String>, exec: F) -> Self
    where
        F: Fn(TaskIo) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<TaskIo, TaskError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            retry: None,
            pre: None,
            exec: Arc::new(move |input| exec(input).boxed()),
            post: None,
        }
    }

    /// Task that always succeeds with the same output
    pub fn constant(name: impl Into<String>, output: TaskIo) -> Self {
        Self::new(name, move |_| {
            let output = output.clone();
            async move { Ok(output) }
        })
    }

    pub fn depends_on<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies
            .extend(dependencies.into_iter().map(Into::into));
        self
    }

    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    pub fn with_pre<F, Fut>(mut self, pre: F) -> Self
    where
        F: Fn(TaskIo) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        self.pre = Some(Arc::new(move |input| pre(input).boxed()));
        self
    }

    pub fn with_post<F, Fut>(mut self, post: F) -> Self
    where
        F: Fn(TaskIo) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        self.post = Some(Arc::new(move |output| post(output).boxed()));
        self
    }
}

#[async_trait]
impl Task for FnTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    fn retry_policy(&self) -> Option<RetryPolicy> {
        self.retry.clone()
    }

    async fn pre_execution(
        &self,
        _cancel: &CancellationToken,
        input: &TaskIo,
    ) -> Result<(), TaskError> {
        match &self.pre {
            Some(pre) => pre(input.clone()).await,
            None => Ok(()),
        }
    }

    async fn execute(
        &self,
        _cancel: &CancellationToken,
        input: &TaskIo,
    ) -> Result<TaskIo, TaskError> {
        (self.exec)(input.clone()).await
    }

    async fn post_execution(
        &self,
        _cancel: &CancellationToken,
        output: &TaskIo,
    ) -> Result<(), TaskError> {
        match &self.post {
            Some(post) => post(output.clone()).await,
            None => Ok(()),
        }
    }
}

impl fmt::Debug for FnTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTask")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn stages_receive_their_maps() {
        let seen_pre = Arc::new(AtomicU32::new(0));
        let seen_post = Arc::new(AtomicU32::new(0));
        let pre_counter = Arc::clone(&seen_pre);
        let post_counter = Arc::clone(&seen_post);

        let task = FnTask::new("double", |input: TaskIo| async move {
            let n = input.get("n").and_then(|v| v.as_i64()).unwrap_or(0);
            let mut out = TaskIo::default();
            out.insert("n".into(), json!(n * 2));
            Ok(out)
        })
        .with_pre(move |input| {
            let counter = Arc::clone(&pre_counter);
            async move {
                assert!(input.contains_key("n"));
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .with_post(move |output| {
            let counter = Arc::clone(&post_counter);
            async move {
                assert_eq!(output["n"], json!(42));
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        let cancel = CancellationToken::new();
        let mut input = TaskIo::default();
        input.insert("n".into(), json!(21));

        task.pre_execution(&cancel, &input).await.unwrap();
        let out = task.execute(&cancel, &input).await.unwrap();
        task.post_execution(&cancel, &out).await.unwrap();

        assert_eq!(seen_pre.load(Ordering::SeqCst), 1);
        assert_eq!(seen_post.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn execute_errors_pass_through() {
        let task = FnTask::new("broken", |_| async { Err::<TaskIo, TaskError>("nope".into()) });
        let err = task
            .execute(&CancellationToken::new(), &TaskIo::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "nope");
    }

    #[test]
    fn builder_collects_dependencies_and_policy() {
        let task = FnTask::constant("c", TaskIo::default())
            .depends_on(["a"])
            .depends_on(vec![String::from("b")])
            .with_retry(RetryPolicy::new(3));
        assert_eq!(task.dependencies(), ["a".to_string(), "b".to_string()]);
        assert_eq!(task.retry_policy().unwrap().max_attempts, 3);
        assert!(format!("{:?}", task).contains("\"c\""));
    }
}
