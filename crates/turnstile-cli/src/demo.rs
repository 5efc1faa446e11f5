//! Demo scenarios
//!
//! Each scenario builds its own queue (same name as the configured one, its
//! own concurrency) so the printed timings are predictable.

use std::time::Duration;

use clap::ValueEnum;
use eyre::Result;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::info;
use turnstile_core::{
    ActionKind, ActionRunner, App, QueueBuilder, QueueConfig, QueueError, RequestQueue,
    SubmitOptions,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// Two slots, four 100ms tasks
    Saturate,
    /// A high-priority arrival waits for running work
    NoPreempt,
    /// A waiter gives up while a long task holds the only slot
    Timeout,
    /// Failing actions release their slots
    Failures,
    /// Writes are promoted ahead of earlier reads
    Priority,
    All,
}

pub async fn run(scenario: Scenario, app: &App) -> Result<()> {
    let name = app.queue.config().name.as_str();
    match scenario {
        Scenario::Saturate => saturate(name).await,
        Scenario::NoPreempt => no_preempt(name).await,
        Scenario::Timeout => timeout(name).await,
        Scenario::Failures => failures(name).await,
        Scenario::Priority => priority(name).await,
        Scenario::All => {
            saturate(name).await?;
            no_preempt(name).await?;
            timeout(name).await?;
            failures(name).await?;
            priority(name).await
        }
    }
}

fn fresh_queue(name: &str, max_concurrency: usize) -> Result<RequestQueue> {
    let config = QueueConfig::new(max_concurrency, None).with_name(name);
    Ok(QueueBuilder::new(config).build()?)
}

fn heading(title: &str) {
    info!(scenario = title, "demo: starting scenario");
    println!();
    println!("== {title}");
}

fn offset(origin: Instant) -> u128 {
    origin.elapsed().as_millis()
}

/// Submit a task that prints when it starts and finishes.
fn spawn_timed(
    queue: &RequestQueue,
    origin: Instant,
    label: &'static str,
    options: SubmitOptions,
    work: Duration,
) -> JoinHandle<Result<(), QueueError>> {
    let queue = queue.clone();
    tokio::spawn(async move {
        queue
            .submit(
                move || async move {
                    println!("{:>6}ms  start  {label}", offset(origin));
                    tokio::time::sleep(work).await;
                    println!("{:>6}ms  done   {label}", offset(origin));
                    Ok(())
                },
                options,
            )
            .await
    })
}

async fn settle(
    label: &str,
    origin: Instant,
    handle: JoinHandle<Result<(), QueueError>>,
) -> Result<()> {
    if let Err(err) = handle.await? {
        println!("{:>6}ms  reject {label}: {err}", offset(origin));
    }
    Ok(())
}

async fn wait_for_running(queue: &RequestQueue, count: usize) {
    while queue.running() < count {
        tokio::task::yield_now().await;
    }
}

fn print_snapshot(queue: &RequestQueue) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&queue.snapshot())?);
    Ok(())
}

async fn saturate(name: &str) -> Result<()> {
    heading("saturate: max_concurrency=2, four 100ms tasks");
    let queue = fresh_queue(name, 2)?;
    let origin = Instant::now();

    let labels = ["t1", "t2", "t3", "t4"];
    let handles: Vec<_> = labels
        .into_iter()
        .map(|label| {
            spawn_timed(
                &queue,
                origin,
                label,
                SubmitOptions::new(),
                Duration::from_millis(100),
            )
        })
        .collect();
    for (label, handle) in labels.iter().zip(handles) {
        settle(label, origin, handle).await?;
    }

    print_snapshot(&queue)
}

async fn no_preempt(name: &str) -> Result<()> {
    heading("no-preempt: max_concurrency=1, priority 10 arrives during a 500ms task");
    let queue = fresh_queue(name, 1)?;
    let origin = Instant::now();

    let t1 = spawn_timed(
        &queue,
        origin,
        "t1 (priority 0)",
        SubmitOptions::new(),
        Duration::from_millis(500),
    );
    wait_for_running(&queue, 1).await;
    let t2 = spawn_timed(
        &queue,
        origin,
        "t2 (priority 10)",
        SubmitOptions::new().with_priority(10),
        Duration::from_millis(50),
    );

    settle("t1", origin, t1).await?;
    settle("t2", origin, t2).await?;
    print_snapshot(&queue)
}

async fn timeout(name: &str) -> Result<()> {
    heading("timeout: max_concurrency=1, 800ms task, waiter with a 100ms timeout");
    let queue = fresh_queue(name, 1)?;
    let origin = Instant::now();

    let t1 = spawn_timed(
        &queue,
        origin,
        "t1",
        SubmitOptions::new(),
        Duration::from_millis(800),
    );
    wait_for_running(&queue, 1).await;
    let t2 = spawn_timed(
        &queue,
        origin,
        "t2",
        SubmitOptions::new().with_timeout(Duration::from_millis(100)),
        Duration::from_millis(10),
    );

    settle("t2", origin, t2).await?;
    settle("t1", origin, t1).await?;
    print_snapshot(&queue)
}

async fn failures(name: &str) -> Result<()> {
    heading("failures: max_concurrency=3, three failing writes then a read");
    let runner = ActionRunner::new(fresh_queue(name, 3)?);

    let handles: Vec<_> = (0..3)
        .map(|i| {
            let runner = runner.clone();
            tokio::spawn(async move {
                runner
                    .write("insertRow", move || async move {
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Err::<(), _>(format!("duplicate key on row {i}"))
                    })
                    .await
            })
        })
        .collect();
    for handle in handles {
        println!("{}", serde_json::to_string(&handle.await?)?);
    }

    let read = runner
        .read("listRows", || async { Ok::<_, String>(vec!["a", "b"]) })
        .await;
    println!("{}", serde_json::to_string(&read)?);
    print_snapshot(runner.queue())
}

async fn priority(name: &str) -> Result<()> {
    heading("priority: max_concurrency=1, reads and writes queue behind a blocker");
    let queue = fresh_queue(name, 1)?;
    let origin = Instant::now();

    let blocker = spawn_timed(
        &queue,
        origin,
        "blocker",
        SubmitOptions::new(),
        Duration::from_millis(200),
    );
    wait_for_running(&queue, 1).await;

    let arrivals = [
        ("read-1", ActionKind::Read),
        ("write-1", ActionKind::Write),
        ("read-2", ActionKind::Read),
        ("write-2", ActionKind::Write),
    ];
    let mut handles = Vec::new();
    for (i, (label, kind)) in arrivals.into_iter().enumerate() {
        handles.push((
            label,
            spawn_timed(
                &queue,
                origin,
                label,
                SubmitOptions::new().with_priority(kind.priority()),
                Duration::from_millis(20),
            ),
        ));
        while queue.queued() <= i {
            tokio::task::yield_now().await;
        }
    }

    println!("{}", serde_json::to_string_pretty(&queue.queued_entries())?);

    settle("blocker", origin, blocker).await?;
    for (label, handle) in handles {
        settle(label, origin, handle).await?;
    }
    print_snapshot(&queue)
}
