mod common;

use std::time::Duration;

use common::Harness;
use msgs::{message::FormulaValue, Request, Response, SyncError};

#[tokio::test]
async fn nothing_is_relayed_without_a_source() {
    let harness = Harness::start().await;
    let runtime = harness.session.host.runtime_port(harness.watch_tab);

    let result = runtime.send_message(&Request::check_formula("1+1")).await;
    assert_eq!(result, Err(SyncError::NoSourceBound));
}

#[tokio::test]
async fn formula_checks_reach_the_source_page() {
    let harness = Harness::start().await;
    harness.bind_source().await;
    let runtime = harness.session.host.runtime_port(harness.watch_tab);

    let result = runtime.send_message(&Request::check_formula("2*21")).await;
    assert_eq!(result, Ok(Response::Formula(FormulaValue::Number(42.0))));

    let result = runtime.send_message(&Request::check_formula("1/0")).await;
    assert_eq!(result, Ok(Response::Formula(FormulaValue::Infinite { negative: false })));

    let result = runtime.send_message(&Request::check_formula("2*(")).await;
    assert!(matches!(result, Err(SyncError::InvalidFormula(ref detail)) if !detail.is_empty()));
}

#[tokio::test]
async fn lifecycle_requests_are_not_relayed() {
    let harness = Harness::start().await;
    harness.bind_source().await;
    let runtime = harness.session.host.runtime_port(harness.watch_tab);

    let result = runtime.send_message(&Request::Disconnect).await;
    assert!(matches!(result, Err(SyncError::Rejected(_))));
    assert!(harness.session.store().get().game_state.is_some());
}

#[tokio::test]
async fn closing_the_source_mid_call_fails_the_caller() {
    let harness = Harness::start().await;
    harness.bind_source().await;
    harness.page.set_responsive(false);
    let runtime = harness.session.host.runtime_port(harness.watch_tab);

    let call = tokio::spawn(async move { runtime.send_message(&Request::check_formula("2*21")).await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    harness.session.host.close_tab(harness.game_tab).await.unwrap();

    let result = tokio::time::timeout(Duration::from_millis(400), call).await.unwrap().unwrap();
    assert!(matches!(result, Err(SyncError::Unreachable(_))), "{result:?}");
}

#[tokio::test]
async fn an_unresponsive_page_times_out() {
    let harness = Harness::start().await;
    harness.bind_source().await;
    harness.page.set_responsive(false);
    let runtime = harness.session.host.runtime_port(harness.watch_tab);

    let result = runtime.send_message(&Request::check_formula("2*21")).await;
    assert!(matches!(result, Err(SyncError::Timeout { .. })), "{result:?}");
}
