//! Backend that answers or fails according to a script

use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use anyhow::{anyhow, Result};
use optibench::QueryOperation;

/// Call 0 is the warm-up; timed trials start at call 1
pub struct ScriptedBackend {
    answer: String,
    latency: Duration,
    failing_calls: HashSet<u32>,
    fail_always: bool,
    calls: AtomicU32,
}

impl ScriptedBackend {
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            latency: Duration::from_millis(2),
            failing_calls: HashSet::new(),
            fail_always: false,
            calls: AtomicU32::new(0),
        }
    }

    /// Backend whose every call fails
    pub fn offline() -> Self {
        Self {
            fail_always: true,
            ..Self::new("")
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn failing_on(mut self, calls: &[u32]) -> Self {
        self.failing_calls.extend(calls.iter().copied());
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl QueryOperation for ScriptedBackend {
    fn query(&self, _question: &str) -> impl Future<Output = Result<String>> + Send {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let fails = self.fail_always || self.failing_calls.contains(&call);
        let answer = self.answer.clone();
        let latency = self.latency;

        async move {
            tokio::time::sleep(latency).await;
            if fails {
                Err(anyhow!("scripted failure on call {}", call))
            } else {
                Ok(answer)
            }
        }
    }
}
