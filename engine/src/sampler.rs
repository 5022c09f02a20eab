//! Single timed invocation of a query operation
//!
//! A sample captures process memory and CPU utilization immediately before
//! and after the query, plus wall-clock latency of the query itself. CPU
//! readings are utilization over a short window and are only meaningful for
//! comparing runs taken on the same host.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use sysinfo::{Pid, System};
use tokio::time;

use crate::backend::QueryOperation;
use crate::error::{BenchError, Result};
use crate::utils::Timer;

/// Characters per token used to estimate throughput from answer length
pub const CHARS_PER_TOKEN: f64 = 4.0;

/// Source of process resource readings
pub trait ResourceProbe: Send {
    /// Resident set size in megabytes
    fn resident_memory_mb(&mut self) -> f64;

    /// CPU utilization percent since the previous call
    fn cpu_percent(&mut self) -> f64;
}

/// Reads the current process through sysinfo
pub struct ProcessProbe {
    system: System,
    pid: Pid,
}

impl ProcessProbe {
    pub fn current() -> Result<Self> {
        let pid = sysinfo::get_current_pid().map_err(|e| BenchError::ProbeUnavailable(e.to_string()))?;
        let mut system = System::new();
        system.refresh_process(pid);
        Ok(Self { system, pid })
    }
}

impl ResourceProbe for ProcessProbe {
    fn resident_memory_mb(&mut self) -> f64 {
        self.system.refresh_process(self.pid);
        self.system
            .process(self.pid)
            .map(|p| p.memory() as f64 / 1024.0 / 1024.0)
            .unwrap_or(0.0)
    }

    fn cpu_percent(&mut self) -> f64 {
        self.system.refresh_process(self.pid);
        self.system
            .process(self.pid)
            .map(|p| p.cpu_usage() as f64)
            .unwrap_or(0.0)
    }
}

/// One successful trial
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub latency_secs: f64,
    pub memory_delta_mb: f64,
    pub cpu_percent: f64,
    pub tokens_per_second: f64,
}

impl Sample {
    pub fn latency_ms(&self) -> f64 {
        self.latency_secs * 1000.0
    }
}

/// Estimated tokens per second for an answer produced in `latency_secs`
pub fn estimate_tokens_per_second(answer: &str, latency_secs: f64) -> f64 {
    if latency_secs <= 0.0 {
        return 0.0;
    }
    let estimated_tokens = answer.chars().count() as f64 / CHARS_PER_TOKEN;
    estimated_tokens / latency_secs
}

pub struct Sampler<P: ResourceProbe> {
    probe: P,
    cpu_window: Duration,
    trial_timeout: Option<Duration>,
}

impl<P: ResourceProbe> Sampler<P> {
    pub fn new(probe: P, cpu_window: Duration) -> Self {
        Self {
            probe,
            cpu_window,
            trial_timeout: None,
        }
    }

    /// Fail a trial whose query runs longer than `limit`
    pub fn with_trial_timeout(mut self, limit: Option<Duration>) -> Self {
        self.trial_timeout = limit;
        self
    }

    /// Run `op` once on `input` and measure it
    pub async fn sample<Q: QueryOperation>(&mut self, op: &Q, input: &str) -> Result<Sample> {
        let memory_before = self.probe.resident_memory_mb();
        let cpu_before = self.cpu_reading().await;

        let timer = Timer::start();
        let answer = self.invoke(op, input).await?;
        let latency_secs = timer.elapsed_secs();

        let memory_after = self.probe.resident_memory_mb();
        let cpu_after = self.cpu_reading().await;

        Ok(Sample {
            latency_secs,
            memory_delta_mb: memory_after - memory_before,
            cpu_percent: (cpu_before + cpu_after) / 2.0,
            tokens_per_second: estimate_tokens_per_second(&answer, latency_secs),
        })
    }

    async fn invoke<Q: QueryOperation>(&self, op: &Q, input: &str) -> Result<String> {
        let outcome = match self.trial_timeout {
            Some(limit) => time::timeout(limit, op.query(input))
                .await
                .map_err(|_| BenchError::trial(format!("deadline of {:?} exceeded", limit)))?,
            None => op.query(input).await,
        };

        outcome.map_err(|e| BenchError::trial(format!("{:#}", e)))
    }

    /// Utilization over the sampling window
    async fn cpu_reading(&mut self) -> f64 {
        self.probe.cpu_percent();
        if !self.cpu_window.is_zero() {
            time::sleep(self.cpu_window).await;
        }
        self.probe.cpu_percent()
    }
}
