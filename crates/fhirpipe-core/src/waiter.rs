//! Readiness gate for streaming runs.
//!
//! The waiter seeds OpenMRS, then polls the sink until the probe resource
//! count is nonzero and has held steady for `settle_polls` consecutive polls.
//! This is a liveness check only: a satisfied wait says the pipeline is
//! moving data, not that it has finished.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use crate::counter::ResourceCounter;
use crate::error::{Error, Result};
use crate::resource::ResourceType;
use crate::seed::SeedCommand;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitState {
    Idle,
    Seeding,
    Waiting { attempt: u32 },
    Satisfied { count: u64 },
}

#[derive(Debug, Clone)]
pub struct WaitPolicy {
    pub probe: ResourceType,
    pub interval: Duration,
    pub max_attempts: u32,
    /// Consecutive identical nonzero observations required; 1 accepts the
    /// first nonzero count.
    pub settle_polls: u32,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            probe: ResourceType::Patient,
            interval: Duration::from_secs(30),
            max_attempts: 40,
            settle_polls: 1,
        }
    }
}

pub struct PollingWaiter<'a> {
    counter: &'a dyn ResourceCounter,
    seed: Option<(SeedCommand, HashMap<&'static str, String>)>,
    policy: WaitPolicy,
    state: WaitState,
}

impl<'a> PollingWaiter<'a> {
    pub fn new(counter: &'a dyn ResourceCounter, policy: WaitPolicy) -> Self {
        Self {
            counter,
            seed: None,
            policy,
            state: WaitState::Idle,
        }
    }

    pub fn with_seed(mut self, seed: SeedCommand, vars: HashMap<&'static str, String>) -> Self {
        self.seed = Some((seed, vars));
        self
    }

    pub fn state(&self) -> WaitState {
        self.state
    }

    fn transition(&mut self, next: WaitState) {
        tracing::debug!(from = ?self.state, to = ?next, "Waiter state change");
        self.state = next;
    }

    /// Runs the gate to completion, returning the count that satisfied it.
    ///
    /// Resolving `cancel` aborts the wait with [`Error::Cancelled`]. Running out
    /// of attempts yields [`Error::Timeout`] carrying the last observed count,
    /// so a genuine zero is distinguishable from never getting an answer.
    pub async fn wait<C>(&mut self, cancel: C) -> Result<u64>
    where
        C: Future<Output = ()>,
    {
        tokio::pin!(cancel);

        self.transition(WaitState::Seeding);
        if let Some((seed, vars)) = &self.seed {
            tokio::select! {
                res = seed.run(vars) => res?,
                _ = &mut cancel => return Err(Error::Cancelled),
            }
        } else {
            tracing::info!("No seed command configured; assuming test data is already loaded");
        }

        let counter = self.counter;
        let probe = self.policy.probe;
        let settle = self.policy.settle_polls.max(1);
        let mut last_count: Option<u64> = None;
        let mut streak = 0u32;

        for attempt in 1..=self.policy.max_attempts {
            self.transition(WaitState::Waiting { attempt });

            let observed = tokio::select! {
                res = counter.count(probe) => res,
                _ = &mut cancel => return Err(Error::Cancelled),
            };

            match observed {
                Ok(count) => {
                    streak = match (count, last_count) {
                        (0, _) => 0,
                        (c, Some(prev)) if c == prev => streak + 1,
                        _ => 1,
                    };
                    last_count = Some(count);
                    tracing::info!(
                        attempt,
                        resource_type = %probe,
                        count,
                        streak,
                        "Polled sink"
                    );
                    if streak >= settle {
                        self.transition(WaitState::Satisfied { count });
                        return Ok(count);
                    }
                }
                Err(e) if e.is_transient() => {
                    tracing::warn!(attempt, error = %e, "Sink not reachable yet");
                }
                Err(e) => return Err(e),
            }

            if attempt < self.policy.max_attempts {
                tokio::select! {
                    _ = tokio::time::sleep(self.policy.interval) => {}
                    _ = &mut cancel => return Err(Error::Cancelled),
                }
            }
        }

        Err(Error::Timeout {
            attempts: self.policy.max_attempts,
            last_count,
        })
    }
}
