//! Fan commands out over a connection pool with a fixed set of workers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crossbeam_channel::Receiver;
use serde::{Deserialize, Serialize};

use crate::connection::{Connection, Connector};
use crate::error::{DispatchError, DispatchResult};
use crate::pool::ConnectionPool;

/// What to do when a single command fails. Failed commands are never retried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop taking new commands on every worker and return the failure.
    #[default]
    Abort,
    /// Log the failure, record it in the report and keep going.
    Skip,
}

/// Outcome of a dispatch run.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Replies in input order; `None` for commands that failed or never ran.
    pub responses: Vec<Option<String>>,
    /// Failed commands, ordered by input index.
    pub failures: Vec<DispatchError>,
}

impl DispatchReport {
    /// Number of commands that got a reply.
    #[must_use]
    pub fn sent(&self) -> usize {
        self.responses.iter().filter(|r| r.is_some()).count()
    }

    /// Number of commands that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

#[derive(Default)]
struct WorkerOutcome {
    responses: Vec<(usize, String)>,
    failures: Vec<(usize, DispatchError)>,
}

/// Execute every command once over `pool`.
///
/// Runs one worker thread per pooled connection (fewer if there are fewer
/// commands). Each worker takes the next command from a shared queue, checks
/// out a connection, sends, and returns the connection before taking another.
/// Replies are collected into input-order slots, but commands reach the
/// server in no particular order; use a pool of one when order matters.
pub fn dispatch<K, S>(
    pool: &ConnectionPool<'_, K>,
    commands: &[S],
    policy: FailurePolicy,
) -> DispatchResult<DispatchReport>
where
    K: Connector,
    S: AsRef<str> + Sync,
{
    let workers = pool.size().min(commands.len());
    tracing::info!(
        "Dispatching {} commands over {} workers",
        commands.len(),
        workers
    );

    let (job_tx, job_rx) = crossbeam_channel::unbounded();
    for index in 0..commands.len() {
        // The receiver is alive, so this cannot fail.
        let _ = job_tx.send(index);
    }
    drop(job_tx);

    let abort = AtomicBool::new(false);
    let outcomes: Vec<WorkerOutcome> = thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                let jobs = job_rx.clone();
                let abort = &abort;
                scope.spawn(move || run_worker(worker, pool, commands, &jobs, abort, policy))
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
            })
            .collect()
    });

    let mut report = DispatchReport {
        responses: vec![None; commands.len()],
        failures: Vec::new(),
    };
    let mut failures = Vec::new();
    for outcome in outcomes {
        for (index, response) in outcome.responses {
            report.responses[index] = Some(response);
        }
        failures.extend(outcome.failures);
    }
    failures.sort_by_key(|(index, _)| *index);
    report.failures = failures.into_iter().map(|(_, error)| error).collect();

    tracing::info!(
        "Dispatch finished: {} sent, {} failed, {} not attempted",
        report.sent(),
        report.failed(),
        commands.len() - report.sent() - report.failed()
    );

    if policy == FailurePolicy::Abort && !report.failures.is_empty() {
        return Err(report.failures.swap_remove(0));
    }
    Ok(report)
}

fn run_worker<K, S>(
    worker: usize,
    pool: &ConnectionPool<'_, K>,
    commands: &[S],
    jobs: &Receiver<usize>,
    abort: &AtomicBool,
    policy: FailurePolicy,
) -> WorkerOutcome
where
    K: Connector,
    S: AsRef<str>,
{
    let mut outcome = WorkerOutcome::default();
    while let Ok(index) = jobs.recv() {
        if abort.load(Ordering::Acquire) {
            break;
        }

        let command = commands[index].as_ref();
        // The guard is dropped at the end of this statement, returning (or
        // replacing) the connection before the result is inspected.
        let result = pool.acquire().and_then(|mut connection| connection.command(command));

        match result {
            Ok(response) => {
                tracing::trace!("Worker {} sent {:?}: {:?}", worker, command, response);
                outcome.responses.push((index, response));
            }
            Err(source) => {
                let error = DispatchError::Send {
                    index,
                    command: command.to_owned(),
                    source: Box::new(source),
                };
                match policy {
                    FailurePolicy::Skip => {
                        tracing::warn!("Worker {}: {}", worker, error);
                        outcome.failures.push((index, error));
                    }
                    FailurePolicy::Abort => {
                        tracing::error!("Worker {}: {}; aborting dispatch", worker, error);
                        abort.store(true, Ordering::Release);
                        outcome.failures.push((index, error));
                        break;
                    }
                }
            }
        }
    }
    outcome
}

/// Open a pool, dispatch `commands`, and close every connection.
///
/// Connections are closed whether or not dispatch succeeds. A dispatch error
/// takes precedence over an error while closing.
pub fn send_commands<K, S>(
    connector: &K,
    pool_size: usize,
    commands: &[S],
    policy: FailurePolicy,
) -> DispatchResult<DispatchReport>
where
    K: Connector,
    S: AsRef<str> + Sync,
{
    let pool = ConnectionPool::open(connector, pool_size)?;
    let result = dispatch(&pool, commands, policy);
    let closed = pool.close();
    let report = result?;
    closed?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testing::MockConnector;

    fn commands(count: usize) -> Vec<String> {
        (0..count)
            .map(|i| format!("setblock {i} 64 0 minecraft:stone"))
            .collect()
    }

    #[test]
    fn bounded_by_pool_size() {
        let connector = MockConnector::default().with_latency(Duration::from_millis(2));
        let commands = commands(50);
        let report = send_commands(&connector, 4, &commands, FailurePolicy::Abort).unwrap();

        assert_eq!(report.sent(), 50);
        assert!(connector.max_in_flight() <= 4);
        assert_eq!(connector.opened(), 4);
        assert_eq!(connector.closed_ids(), [0, 1, 2, 3]);
    }

    #[test]
    fn every_command_runs_exactly_once() {
        let connector = MockConnector::default();
        let commands = commands(37);
        let report = send_commands(&connector, 5, &commands, FailurePolicy::Abort).unwrap();

        let mut expected = commands.clone();
        expected.sort();
        assert_eq!(connector.received(), expected);

        // Replies land in their input slots.
        for (command, response) in commands.iter().zip(&report.responses) {
            assert_eq!(response.as_deref(), Some(format!("ok {command}").as_str()));
        }
    }

    #[test]
    fn single_worker_preserves_order() {
        let connector = MockConnector::default();
        let pool = ConnectionPool::open(&connector, 1).unwrap();
        let commands = commands(10);
        let report = dispatch(&pool, &commands, FailurePolicy::Abort).unwrap();
        pool.close().unwrap();
        assert_eq!(report.sent(), 10);
        assert_eq!(connector.received_in_order(), commands);
    }

    #[test]
    fn zero_pool_size_is_rejected() {
        let connector = MockConnector::default();
        assert!(matches!(
            send_commands(&connector, 0, &commands(3), FailurePolicy::Abort),
            Err(DispatchError::Config(_))
        ));
        assert_eq!(connector.opened(), 0);
    }

    #[test]
    fn connection_failure_aborts_before_dispatch() {
        let connector = MockConnector::default().refusing_after(1);
        let result = send_commands(&connector, 3, &commands(5), FailurePolicy::Abort);
        assert!(matches!(result, Err(DispatchError::Connect { index: 1, .. })));
        assert!(connector.received().is_empty());
        assert_eq!(connector.closed_ids(), [0]);
    }

    #[test]
    fn skip_policy_records_failures() {
        let connector = MockConnector::failing_on("bad");
        let commands = ["a", "bad", "c", "bad", "e"];
        let report = send_commands(&connector, 2, &commands, FailurePolicy::Skip).unwrap();

        assert_eq!(report.sent(), 3);
        assert_eq!(report.failed(), 2);
        assert!(report.responses[1].is_none());
        assert!(matches!(
            report.failures[0],
            DispatchError::Send { index: 1, .. }
        ));
        assert!(matches!(
            report.failures[1],
            DispatchError::Send { index: 3, .. }
        ));
        assert_eq!(connector.closed_ids(), [0, 1]);
    }

    #[test]
    fn skip_policy_survives_broken_connection() {
        let connector = MockConnector::breaking_on("bad");
        let commands = ["a", "bad", "c", "d", "e"];
        let report = send_commands(&connector, 1, &commands, FailurePolicy::Skip).unwrap();

        assert_eq!(report.sent(), 4);
        assert_eq!(report.failed(), 1);
        assert!(matches!(
            report.failures[0],
            DispatchError::Send { index: 1, .. }
        ));
        assert_eq!(connector.received_in_order(), ["a", "c", "d", "e"]);
        // The broken connection was swapped out, keeping one open at a time.
        assert_eq!(connector.opened(), 2);
        assert_eq!(connector.closed_ids(), [0, 1]);
    }

    #[test]
    fn abort_policy_returns_failure_and_closes_pool() {
        let connector = MockConnector::failing_on("bad");
        let commands = ["a", "bad", "c"];
        let result = send_commands(&connector, 1, &commands, FailurePolicy::Abort);

        assert!(matches!(result, Err(DispatchError::Send { index: 1, .. })));
        // A single worker stops at the failure, so "c" is never sent.
        assert_eq!(connector.received(), ["a"]);
        assert_eq!(connector.closed_ids(), [0]);
    }

    #[test]
    fn empty_command_list() {
        let connector = MockConnector::default();
        let report = send_commands::<_, &str>(&connector, 2, &[], FailurePolicy::Abort).unwrap();
        assert_eq!(report.sent(), 0);
        assert_eq!(connector.closed_ids(), [0, 1]);
    }

    #[test]
    fn policy_deserializes_from_snake_case() {
        #[derive(Deserialize)]
        struct Wrapper {
            policy: FailurePolicy,
        }
        let wrapper: Wrapper = serde_json::from_str(r#"{ "policy": "skip" }"#).unwrap();
        assert_eq!(wrapper.policy, FailurePolicy::Skip);
    }
}
