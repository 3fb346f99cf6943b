// (c) Meta Platforms, Inc. and affiliates. Confidential and proprietary.

//! Scenarios for asynchronous calls. Run these with tokio's clock paused so
//! the fixed completion delay is observed deterministically.

use futures::StreamExt;
use futures::channel::mpsc::unbounded;
use testbus_api::BusError;
use testbus_api::CallContext;
use testbus_api::Flags;
use testbus_api::Value;
use testbus_api::expand;
use testbus_simple::GO_CALL_DELAY;
use tokio::time::Instant;

use crate::common::helpers::LONG_TIMEOUT;
use crate::common::helpers::SHORT_TIMEOUT;
use crate::common::helpers::go_with_timeout;
use crate::common::helpers::random_member;
use crate::fixtures::BusObjectTestFixture;

pub async fn run_test_go_delivers_after_delay<F: BusObjectTestFixture>(
    fixture: &F,
) -> anyhow::Result<()> {
    let object = fixture.create_object();
    object.on(".Double", |args| {
        Ok(args
            .iter()
            .filter_map(Value::as_i64)
            .map(|v| Value::from(v * 2))
            .collect())
    });

    let args = vec![Value::from(21i64), Value::from(-4i64)];
    let direct = object.call(".Double", Flags::NONE, args.clone());

    let (done_tx, mut done_rx) = unbounded();
    let start = Instant::now();
    let pending = object.go(".Double", Flags::NONE, done_tx, args);
    assert!(pending.is_none(), "go should never hand back a pending call");
    assert!(
        done_rx.try_next().is_err(),
        "Nothing should be delivered before the delay"
    );

    let delivered = done_rx
        .next()
        .await
        .ok_or_else(|| anyhow::anyhow!("Completion channel closed"))?;

    assert!(
        start.elapsed() >= GO_CALL_DELAY,
        "Delivered after {:?}, expected at least {:?}",
        start.elapsed(),
        GO_CALL_DELAY
    );
    assert_eq!(delivered, direct, "go should produce what call produces");

    Ok(())
}

pub async fn run_test_go_reports_failures<F: BusObjectTestFixture>(
    fixture: &F,
) -> anyhow::Result<()> {
    let object = fixture.create_object();
    let method = fixture.with_rng(|rng| random_member(rng, "Missing"));

    let (done_tx, mut done_rx) = unbounded();
    object.go_with_context(&CallContext::background(), &method, Flags::NONE, done_tx, vec![]);

    let delivered = done_rx
        .next()
        .await
        .ok_or_else(|| anyhow::anyhow!("Completion channel closed"))?;
    assert_eq!(
        delivered.err(),
        Some(&BusError::NoSuchMethod(expand(
            fixture.service().name(),
            &method
        ))),
        "Failures should arrive as part of the call result"
    );

    Ok(())
}

pub async fn run_test_go_timeouts<F: BusObjectTestFixture>(fixture: &F) -> anyhow::Result<()> {
    let object = fixture.create_object();
    object.on(".Status", |_| Ok(vec![Value::from("ready")]));

    let short = go_with_timeout(&object, ".Status", vec![], SHORT_TIMEOUT).await;
    assert!(
        short.is_err(),
        "A {:?} timeout should expire before the call completes",
        SHORT_TIMEOUT
    );

    let start = Instant::now();
    let long = go_with_timeout(&object, ".Status", vec![], LONG_TIMEOUT).await?;
    assert_eq!(long.body(), &[Value::from("ready")]);
    assert!(
        start.elapsed() < LONG_TIMEOUT,
        "A {:?} timeout should not expire",
        LONG_TIMEOUT
    );

    Ok(())
}

pub async fn run_test_go_ignores_context<F: BusObjectTestFixture>(
    fixture: &F,
) -> anyhow::Result<()> {
    let object = fixture.create_object();
    object.on(".Echo", |args| Ok(args.to_vec()));

    // A context that expired before the call was issued.
    let ctx = CallContext::with_deadline(std::time::Instant::now());
    let (done_tx, mut done_rx) = unbounded();
    let start = Instant::now();
    object.go_with_context(&ctx, ".Echo", Flags::NONE, done_tx, vec![Value::from(7u8)]);

    let delivered = done_rx
        .next()
        .await
        .ok_or_else(|| anyhow::anyhow!("Completion channel closed"))?;
    assert!(start.elapsed() >= GO_CALL_DELAY);
    assert_eq!(delivered.body(), &[Value::from(7u8)]);

    Ok(())
}

pub async fn run_test_concurrent_go_calls<F: BusObjectTestFixture>(
    fixture: &F,
) -> anyhow::Result<()> {
    const CALLS: u32 = 16;

    let object = fixture.create_object();
    object.on(".Square", |args| {
        let v = args.first().and_then(Value::as_u32).unwrap_or_default();
        Ok(vec![Value::from(v * v)])
    });

    let (done_tx, done_rx) = unbounded();
    let start = Instant::now();
    for i in 0..CALLS {
        object.go(".Square", Flags::NONE, done_tx.clone(), vec![Value::from(i)]);
    }
    drop(done_tx);

    let mut squares: Vec<u32> = done_rx
        .map(|call| call.body().first().and_then(Value::as_u32).unwrap_or_default())
        .collect()
        .await;
    squares.sort_unstable();

    let expected: Vec<u32> = (0..CALLS).map(|i| i * i).collect();
    assert_eq!(squares, expected);
    assert!(
        start.elapsed() < GO_CALL_DELAY * 2,
        "Asynchronous calls should complete concurrently"
    );

    Ok(())
}
