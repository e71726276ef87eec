//! Dispatcher behaviour under virtual time.

use launchpad_campaign::{
    CampaignError, CancellationToken, DeliveryStatus, DispatchOptions, Dispatcher, RetryPolicy,
    SendMode,
};
use launchpad_testing::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn dispatcher(transport: &ScriptedTransport) -> Dispatcher {
    Dispatcher::new(Arc::new(transport.clone()), RetryPolicy::default())
}

fn offsets_ms(transport: &ScriptedTransport, start: Instant) -> Vec<u128> {
    transport
        .calls()
        .iter()
        .map(|call| call.at.duration_since(start).as_millis())
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_all_success_counts_every_recipient() {
    let transport = ScriptedTransport::new();
    let recipients = fixtures::recipients(7);

    let result = dispatcher(&transport)
        .dispatch(&recipients, &fixtures::template(), &DispatchOptions::default())
        .await
        .unwrap();

    assert_eq!(result.total_recipients(), 7);
    assert_eq!(result.sent_count(), 7);
    assert_eq!(result.failed_count(), 0);
    assert!(!result.cancelled());
    assert!(result.outcomes().iter().all(|o| o.success() && o.attempts == 1));
    assert_eq!(transport.call_count(), 7);
}

#[tokio::test(start_paused = true)]
async fn test_empty_list_is_rejected_without_calls() {
    let transport = ScriptedTransport::new();

    let err = dispatcher(&transport)
        .dispatch(&[], &fixtures::template(), &DispatchOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, CampaignError::NoRecipients));
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_twice_then_sent() {
    let transport = ScriptedTransport::new().script(
        "user0@example.com",
        [
            Reply::Fail(launchpad_mail::ProviderError::rejected("rate limit exceeded")),
            Reply::Fail(launchpad_mail::ProviderError::rejected("rate limit exceeded")),
            Reply::AcceptWith("msg_final".into()),
        ],
    );

    let result = dispatcher(&transport)
        .dispatch(
            &fixtures::recipients(1),
            &fixtures::template(),
            &DispatchOptions::new().max_attempts(3),
        )
        .await
        .unwrap();

    let outcome = &result.outcomes()[0];
    assert_eq!(outcome.status, DeliveryStatus::Sent);
    assert_eq!(outcome.message_id.as_ref().unwrap().as_str(), "msg_final");
    assert_eq!(outcome.attempts, 3);
    assert_eq!(transport.call_count(), 3);

    let gaps = transport.gaps_for("user0@example.com");
    assert_eq!(gaps, vec![Duration::from_secs(2), Duration::from_secs(4)]);
    assert!(gaps[0] < gaps[1]);
}

#[tokio::test(start_paused = true)]
async fn test_permanent_failure_is_not_retried() {
    let transport = ScriptedTransport::new()
        .always("user0@example.com", Reply::Fail(errors::invalid_recipient()));
    let start = Instant::now();

    let result = dispatcher(&transport)
        .dispatch(&fixtures::recipients(1), &fixtures::template(), &DispatchOptions::default())
        .await
        .unwrap();

    assert_eq!(transport.call_count(), 1);
    assert_eq!(result.failed_count(), 1);
    assert_eq!(result.outcomes()[0].attempts, 1);
    assert!(result.outcomes()[0].error.as_deref().unwrap().contains("422"));
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_transient_failures_exhaust_attempts() {
    let transport =
        ScriptedTransport::new().always("user0@example.com", Reply::Fail(errors::unavailable()));

    let result = dispatcher(&transport)
        .dispatch(&fixtures::recipients(1), &fixtures::template(), &DispatchOptions::default())
        .await
        .unwrap();

    let outcome = &result.outcomes()[0];
    assert_eq!(outcome.status, DeliveryStatus::Failed);
    assert_eq!(outcome.attempts, 3);
    assert_eq!(
        outcome.error.as_deref(),
        Some("http error 503: Service Unavailable")
    );
    assert_eq!(
        transport.gaps_for("user0@example.com"),
        vec![Duration::from_secs(2), Duration::from_secs(4)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_calls_follow_consecutive_transient_failures() {
    for failures in 0..5usize {
        let transport = ScriptedTransport::new().script(
            "user0@example.com",
            std::iter::repeat_with(|| Reply::Fail(errors::timeout())).take(failures),
        );

        let result = dispatcher(&transport)
            .dispatch(&fixtures::recipients(1), &fixtures::template(), &DispatchOptions::default())
            .await
            .unwrap();

        assert_eq!(transport.call_count(), (failures + 1).min(3), "failures = {failures}");
        assert_eq!(result.sent_count() == 1, failures < 3, "failures = {failures}");
        assert_eq!(result.sent_count() + result.failed_count(), result.outcomes().len());
    }
}

#[tokio::test(start_paused = true)]
async fn test_retry_after_hint_extends_backoff() {
    let transport = ScriptedTransport::new().script(
        "user0@example.com",
        [Reply::Fail(errors::rate_limited_for(Duration::from_secs(10)))],
    );

    dispatcher(&transport)
        .dispatch(&fixtures::recipients(1), &fixtures::template(), &DispatchOptions::default())
        .await
        .unwrap();

    assert_eq!(
        transport.gaps_for("user0@example.com"),
        vec![Duration::from_secs(10)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_failure_does_not_abort_campaign() {
    let transport = ScriptedTransport::new()
        .always("user1@example.com", Reply::Fail(errors::unauthorized()));

    let result = dispatcher(&transport)
        .dispatch(
            &fixtures::recipients(3),
            &fixtures::template(),
            &DispatchOptions::new().inter_send_delay(Duration::ZERO),
        )
        .await
        .unwrap();

    let statuses: Vec<DeliveryStatus> = result.outcomes().iter().map(|o| o.status).collect();
    assert_eq!(
        statuses,
        vec![DeliveryStatus::Sent, DeliveryStatus::Failed, DeliveryStatus::Sent]
    );
}

#[tokio::test(start_paused = true)]
async fn test_sequential_batches_are_throttled() {
    let transport = ScriptedTransport::new();
    let start = Instant::now();

    let options = DispatchOptions::new()
        .batch_size(2)
        .inter_send_delay(Duration::from_millis(500))
        .inter_batch_delay(Duration::from_secs(1));

    let result = dispatcher(&transport)
        .dispatch(&fixtures::recipients(5), &fixtures::template(), &options)
        .await
        .unwrap();

    assert_eq!(offsets_ms(&transport, start), vec![0, 500, 1500, 2000, 3000]);

    let order: Vec<&str> = result.outcomes().iter().map(|o| o.recipient.email()).collect();
    assert_eq!(
        order,
        vec![
            "user0@example.com",
            "user1@example.com",
            "user2@example.com",
            "user3@example.com",
            "user4@example.com"
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_batches_keep_input_order() {
    // user0 needs a retry, so it finishes after the rest of its batch
    let transport = ScriptedTransport::new()
        .script("user0@example.com", [Reply::Fail(errors::unavailable())]);
    let start = Instant::now();

    let options = DispatchOptions::new()
        .batch_size(3)
        .mode(SendMode::Concurrent)
        .inter_batch_delay(Duration::from_secs(1));

    let result = dispatcher(&transport)
        .dispatch(&fixtures::recipients(5), &fixtures::template(), &options)
        .await
        .unwrap();

    // batch one at t=0, user0's retry at t=2s, batch two after the join plus 1s
    assert_eq!(offsets_ms(&transport, start), vec![0, 0, 0, 2000, 3000, 3000]);

    let order: Vec<&str> = result.outcomes().iter().map(|o| o.recipient.email()).collect();
    assert_eq!(order[0], "user0@example.com");
    assert_eq!(order[4], "user4@example.com");
    assert_eq!(result.outcomes()[0].attempts, 2);
    assert_eq!(result.sent_count(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_records_remaining_recipients() {
    let transport = ScriptedTransport::new();
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1200)).await;
        trigger.cancel();
    });

    let start = Instant::now();
    let result = dispatcher(&transport)
        .dispatch_with_cancellation(
            &fixtures::recipients(5),
            &fixtures::template(),
            &DispatchOptions::default(),
            &cancel,
        )
        .await
        .unwrap();

    // sends at 0, 0.5s and 1s; the wait before the fourth ends at 1.2s
    assert_eq!(transport.call_count(), 3);
    assert_eq!(start.elapsed(), Duration::from_millis(1200));

    assert!(result.cancelled());
    assert_eq!(result.sent_count(), 3);
    assert_eq!(result.failed_count(), 2);
    assert_eq!(result.not_attempted_count(), 2);
    assert_eq!(result.outcomes().len(), result.total_recipients());

    let skipped = &result.outcomes()[4];
    assert_eq!(skipped.status, DeliveryStatus::NotAttempted);
    assert_eq!(skipped.attempts, 0);
    assert_eq!(skipped.error.as_deref(), Some("not attempted: campaign cancelled"));
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_before_start() {
    let transport = ScriptedTransport::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = dispatcher(&transport)
        .dispatch_with_cancellation(
            &fixtures::recipients(3),
            &fixtures::template(),
            &DispatchOptions::default(),
            &cancel,
        )
        .await
        .unwrap();

    assert_eq!(transport.call_count(), 0);
    assert_eq!(result.not_attempted_count(), 3);
    assert_eq!(result.failed_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_finishes_despite_cancellation() {
    let transport = ScriptedTransport::new()
        .script("user0@example.com", [Reply::Fail(errors::rate_limited())]);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.cancel();
    });

    let result = dispatcher(&transport)
        .dispatch_with_cancellation(
            &fixtures::recipients(3),
            &fixtures::template(),
            &DispatchOptions::default(),
            &cancel,
        )
        .await
        .unwrap();

    assert_eq!(transport.call_count(), 2);
    assert_eq!(result.outcomes()[0].status, DeliveryStatus::Sent);
    assert_eq!(result.outcomes()[0].attempts, 2);
    assert_eq!(result.not_attempted_count(), 2);
}
