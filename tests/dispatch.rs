//! End-to-end dispatch behavior of the sync manager.

use std::sync::Arc;
use std::time::Duration;

use integration_gateway::config::{CircuitBreakerConfig, HealthCheckConfig, RateLimitConfig};
use integration_gateway::resilience::{CircuitState, ConsecutiveFailureBreaker, TokenBucket};
use integration_gateway::{CallContext, DispatchError, IntegrationKind, Message, SyncManager};

mod common;
use common::{ScriptedIntegration, Step};

fn rate(requests_per_second: f64, burst_size: u32) -> RateLimitConfig {
    RateLimitConfig {
        requests_per_second,
        burst_size,
    }
}

fn breaker(failure_threshold: u32) -> CircuitBreakerConfig {
    CircuitBreakerConfig {
        failure_threshold,
        open_timeout_secs: 3600,
        half_open_trial_limit: 1,
    }
}

fn no_health_checks() -> HealthCheckConfig {
    HealthCheckConfig {
        enabled: false,
        ..Default::default()
    }
}

async fn send(manager: &SyncManager, name: &str) -> Result<(), DispatchError> {
    manager
        .dispatch(&CallContext::new(), name, &Message::new("ping"))
        .await
        .map(|_| ())
}

#[tokio::test]
async fn test_rate_limit_burst_then_reject() {
    let slack = ScriptedIntegration::new("slack", IntegrationKind::Chat);
    let manager = SyncManager::builder()
        .register_with_policy(slack.clone(), &rate(1.0, 2), &breaker(5))
        .unwrap()
        .build();

    assert!(send(&manager, "slack").await.is_ok());
    assert!(send(&manager, "slack").await.is_ok());
    assert_eq!(
        send(&manager, "slack").await,
        Err(DispatchError::RateLimitExceeded("slack".into()))
    );
    assert_eq!(slack.sends(), 2, "rejected call must not reach the integration");

    let status = manager.status("slack").unwrap();
    assert_eq!(status.rate_limited_total, 1);
    assert_eq!(status.successes_total, 2);

    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert!(send(&manager, "slack").await.is_ok());
    assert_eq!(slack.sends(), 3);
}

#[tokio::test]
async fn test_breaker_opens_after_threshold() {
    let jira = ScriptedIntegration::failing("jira");
    let manager = SyncManager::builder()
        .register_with_policy(jira.clone(), &rate(100.0, 100), &breaker(3))
        .unwrap()
        .build();

    for _ in 0..3 {
        let err = send(&manager, "jira").await.unwrap_err();
        assert!(matches!(err, DispatchError::ConnectionFailed { .. }), "{err}");
    }

    assert_eq!(
        send(&manager, "jira").await,
        Err(DispatchError::CircuitOpen("jira".into()))
    );
    assert_eq!(jira.sends(), 3, "open circuit must not reach the integration");

    let status = manager.status("jira").unwrap();
    assert_eq!(status.circuit_state, CircuitState::Open);
    assert_eq!(status.consecutive_failures, 3);
    assert_eq!(status.failures_total, 3);
    assert_eq!(status.circuit_rejected_total, 1);
    assert!(!status.connected);
    assert!(!manager.all_connected());
}

#[tokio::test]
async fn test_rate_limiter_checked_before_breaker() {
    let jira = ScriptedIntegration::failing("jira");
    let manager = SyncManager::builder()
        .register_with_policy(jira.clone(), &rate(0.001, 1), &breaker(1))
        .unwrap()
        .build();

    assert!(send(&manager, "jira").await.is_err());
    assert_eq!(manager.status("jira").unwrap().circuit_state, CircuitState::Open);

    // Both gates would refuse; the limiter answers first.
    assert_eq!(
        send(&manager, "jira").await,
        Err(DispatchError::RateLimitExceeded("jira".into()))
    );
    assert_eq!(jira.sends(), 1);

    let status = manager.status("jira").unwrap();
    assert_eq!(status.rate_limited_total, 1);
    assert_eq!(status.circuit_rejected_total, 0);
    assert_eq!(status.consecutive_failures, 1);
}

#[tokio::test]
async fn test_rate_limited_call_leaves_breaker_untouched() {
    let jira = ScriptedIntegration::failing("jira");
    let manager = SyncManager::builder()
        .register_with_policy(jira.clone(), &rate(0.001, 1), &breaker(2))
        .unwrap()
        .build();

    assert!(send(&manager, "jira").await.is_err());
    let before = manager.status("jira").unwrap();
    assert_eq!(before.circuit_state, CircuitState::Closed);
    assert_eq!(before.consecutive_failures, 1);

    for _ in 0..3 {
        assert_eq!(
            send(&manager, "jira").await,
            Err(DispatchError::RateLimitExceeded("jira".into()))
        );
    }

    let after = manager.status("jira").unwrap();
    assert_eq!(after.circuit_state, CircuitState::Closed);
    assert_eq!(after.consecutive_failures, 1);
    assert_eq!(after.failures_total, 1);
    assert_eq!(after.rate_limited_total, 3);
    assert_eq!(jira.sends(), 1);
}

#[tokio::test]
async fn test_caller_deadline_bounds_dispatch() {
    let smtp = ScriptedIntegration::new("smtp", IntegrationKind::Email);
    smtp.always(Step::Hang);
    let manager = SyncManager::builder()
        .register_with_policy(smtp.clone(), &rate(10.0, 10), &breaker(5))
        .unwrap()
        .build();

    let started = std::time::Instant::now();
    let err = manager
        .dispatch(
            &CallContext::with_timeout(Duration::from_millis(50)),
            "smtp",
            &Message::new("hello"),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::Timeout { ref name, .. } if name == "smtp"));
    assert!(started.elapsed() < Duration::from_secs(2));

    let status = manager.status("smtp").unwrap();
    assert_eq!(status.consecutive_failures, 1, "timeout counts as a failure");
    assert!(!status.connected);
}

#[tokio::test]
async fn test_default_dispatch_timeout_applies() {
    let smtp = ScriptedIntegration::new("smtp", IntegrationKind::Email);
    smtp.always(Step::Hang);
    let manager = SyncManager::builder()
        .dispatch_timeout(Duration::from_millis(50))
        .register_with_policy(smtp, &rate(10.0, 10), &breaker(5))
        .unwrap()
        .build();

    let err = send(&manager, "smtp").await.unwrap_err();
    assert_eq!(err.kind(), "Timeout");
}

#[tokio::test]
async fn test_unknown_integration() {
    let manager = SyncManager::builder()
        .register_with_policy(ScriptedIntegration::succeeding("slack"), &rate(1.0, 1), &breaker(1))
        .unwrap()
        .build();

    assert_eq!(
        send(&manager, "fax").await,
        Err(DispatchError::IntegrationNotFound("fax".into()))
    );
    assert!(manager.status("fax").is_none());
}

#[tokio::test]
async fn test_invalid_payload_does_not_trip_breaker() {
    let jira = ScriptedIntegration::new("jira", IntegrationKind::Ticketing);
    jira.always(Step::Reject);
    let manager = SyncManager::builder()
        .register_with_policy(jira.clone(), &rate(100.0, 100), &breaker(2))
        .unwrap()
        .build();

    for _ in 0..5 {
        let err = send(&manager, "jira").await.unwrap_err();
        assert_eq!(err.kind(), "InvalidPayload");
    }

    let status = manager.status("jira").unwrap();
    assert_eq!(status.circuit_state, CircuitState::Closed);
    assert_eq!(status.consecutive_failures, 0);
    assert_eq!(status.invalid_payloads_total, 5);
    assert!(status.connected, "a downstream that answers is reachable");
    assert_eq!(jira.sends(), 5);
}

#[tokio::test]
async fn test_integrations_are_isolated() {
    let jira = ScriptedIntegration::failing("jira");
    let slack = ScriptedIntegration::succeeding("slack");
    let manager = SyncManager::builder()
        .register_with_policy(jira.clone(), &rate(100.0, 100), &breaker(1))
        .unwrap()
        .register_with_policy(slack.clone(), &rate(100.0, 100), &breaker(1))
        .unwrap()
        .build();

    assert!(send(&manager, "jira").await.is_err());
    assert_eq!(
        send(&manager, "jira").await,
        Err(DispatchError::CircuitOpen("jira".into()))
    );

    for _ in 0..5 {
        assert!(send(&manager, "slack").await.is_ok());
    }

    let snapshot = manager.status_snapshot();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot["jira"].circuit_state, CircuitState::Open);
    assert_eq!(snapshot["slack"].circuit_state, CircuitState::Closed);
    assert!(snapshot["slack"].connected);
    assert!(!manager.all_connected());
}

#[tokio::test]
async fn test_half_open_recovery() {
    let jira = ScriptedIntegration::new("jira", IntegrationKind::Ticketing);
    jira.then(&[Step::Fail]);
    let manager = SyncManager::builder()
        .register(
            jira.clone(),
            Box::new(TokenBucket::new(100.0, 100.0)),
            Box::new(ConsecutiveFailureBreaker::new(
                "jira",
                1,
                Duration::from_millis(100),
                1,
            )),
        )
        .unwrap()
        .build();

    assert!(send(&manager, "jira").await.is_err());
    assert_eq!(
        send(&manager, "jira").await,
        Err(DispatchError::CircuitOpen("jira".into()))
    );

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(send(&manager, "jira").await.is_ok(), "trial call admitted");

    let status = manager.status("jira").unwrap();
    assert_eq!(status.circuit_state, CircuitState::Closed);
    assert!(status.connected);
    assert_eq!(jira.sends(), 2);
}

#[tokio::test]
async fn test_failed_trial_reopens() {
    let jira = ScriptedIntegration::failing("jira");
    let manager = SyncManager::builder()
        .register(
            jira.clone(),
            Box::new(TokenBucket::new(100.0, 100.0)),
            Box::new(ConsecutiveFailureBreaker::new(
                "jira",
                1,
                Duration::from_millis(100),
                1,
            )),
        )
        .unwrap()
        .build();

    assert!(send(&manager, "jira").await.is_err());
    tokio::time::sleep(Duration::from_millis(150)).await;

    let err = send(&manager, "jira").await.unwrap_err();
    assert_eq!(err.kind(), "ConnectionFailed");
    assert_eq!(manager.status("jira").unwrap().circuit_state, CircuitState::Open);
    assert_eq!(
        send(&manager, "jira").await,
        Err(DispatchError::CircuitOpen("jira".into()))
    );
}

#[tokio::test]
async fn test_half_open_admits_one_concurrent_trial() {
    let jira = ScriptedIntegration::new("jira", IntegrationKind::Ticketing);
    jira.then(&[Step::Fail]);
    jira.always(Step::Hang);
    let manager = Arc::new(
        SyncManager::builder()
            .register(
                jira.clone(),
                Box::new(TokenBucket::new(100.0, 100.0)),
                Box::new(ConsecutiveFailureBreaker::new(
                    "jira",
                    1,
                    Duration::from_millis(100),
                    1,
                )),
            )
            .unwrap()
            .build(),
    );

    assert!(send(&manager, "jira").await.is_err());
    tokio::time::sleep(Duration::from_millis(150)).await;

    let trial = {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move {
            let ctx = CallContext::with_timeout(Duration::from_millis(300));
            manager.dispatch(&ctx, "jira", &Message::new("trial")).await
        })
    };
    while jira.sends() < 2 {
        tokio::task::yield_now().await;
    }

    // The only trial slot is in flight.
    assert_eq!(manager.status("jira").unwrap().circuit_state, CircuitState::HalfOpen);
    assert_eq!(
        send(&manager, "jira").await,
        Err(DispatchError::CircuitOpen("jira".into()))
    );
    assert_eq!(jira.sends(), 2);

    let err = trial.await.unwrap().unwrap_err();
    assert_eq!(err.kind(), "Timeout");
    assert_eq!(manager.status("jira").unwrap().circuit_state, CircuitState::Open);
    assert_eq!(jira.sends(), 2);
}

#[tokio::test]
async fn test_concurrent_dispatch_respects_burst() {
    let slack = ScriptedIntegration::succeeding("slack");
    let manager = Arc::new(
        SyncManager::builder()
            .register_with_policy(slack.clone(), &rate(0.001, 10), &breaker(5))
            .unwrap()
            .build(),
    );

    let mut tasks = Vec::new();
    for _ in 0..50 {
        let manager = manager.clone();
        tasks.push(tokio::spawn(async move { send(&manager, "slack").await }));
    }

    let mut delivered = 0;
    let mut limited = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(()) => delivered += 1,
            Err(DispatchError::RateLimitExceeded(_)) => limited += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(delivered, 10);
    assert_eq!(limited, 40);
    assert_eq!(slack.sends(), 10);
}

#[tokio::test]
async fn test_cancelled_dispatch_records_failure() {
    let smtp = ScriptedIntegration::new("smtp", IntegrationKind::Email);
    smtp.always(Step::Hang);
    let manager = SyncManager::builder()
        .register_with_policy(smtp, &rate(10.0, 10), &breaker(1))
        .unwrap()
        .build();

    let ctx = CallContext::new();
    let message = Message::new("x");
    let call = manager.dispatch(&ctx, "smtp", &message);
    assert!(tokio::time::timeout(Duration::from_millis(20), call).await.is_err());

    let status = manager.status("smtp").unwrap();
    assert_eq!(status.circuit_state, CircuitState::Open);
    assert_eq!(status.failures_total, 1);
    assert!(status.last_failure_at.is_some());
    assert!(status.last_error.unwrap().contains("cancelled"));
    assert!(!status.connected);
}

#[tokio::test]
async fn test_health_loop_updates_idle_integrations() {
    let slack = ScriptedIntegration::succeeding("slack");
    let jira = ScriptedIntegration::succeeding("jira");
    jira.set_reachable(false);

    let manager = SyncManager::builder()
        .health_check(HealthCheckConfig {
            enabled: true,
            interval_secs: 1,
            timeout_secs: 1,
        })
        .register_with_policy(slack.clone(), &rate(1.0, 1), &breaker(1))
        .unwrap()
        .register_with_policy(jira.clone(), &rate(1.0, 1), &breaker(1))
        .unwrap()
        .start();

    assert!(!manager.all_connected(), "nothing observed yet");

    tokio::time::timeout(Duration::from_secs(5), async {
        while slack.probes() == 0 || jira.probes() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("first probe round runs immediately");
    tokio::time::sleep(Duration::from_millis(50)).await;

    let snapshot = manager.status_snapshot();
    assert!(snapshot["slack"].connected);
    assert_eq!(snapshot["slack"].last_probe_ok, Some(true));
    assert!(!snapshot["jira"].connected);
    assert_eq!(snapshot["jira"].last_probe_ok, Some(false));
    assert_eq!(slack.sends() + jira.sends(), 0, "probes never dispatch");

    jira.set_reachable(true);
    tokio::time::timeout(Duration::from_secs(5), async {
        while !manager.all_connected() {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .expect("second probe round marks jira connected");

    manager.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_stops_health_loop() {
    let slack = ScriptedIntegration::succeeding("slack");
    let manager = SyncManager::builder()
        .health_check(HealthCheckConfig {
            enabled: true,
            interval_secs: 1,
            timeout_secs: 1,
        })
        .register_with_policy(slack.clone(), &rate(1.0, 1), &breaker(1))
        .unwrap()
        .start();

    assert!(manager.is_monitoring());
    manager.shutdown().await;
    assert!(!manager.is_monitoring());

    let probes = slack.probes();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(slack.probes(), probes, "no probes after shutdown");

    // Second shutdown is a no-op.
    manager.shutdown().await;
}

#[tokio::test]
async fn test_disabled_health_loop_never_probes() {
    let slack = ScriptedIntegration::succeeding("slack");
    let manager = SyncManager::builder()
        .health_check(no_health_checks())
        .register_with_policy(slack.clone(), &rate(1.0, 1), &breaker(1))
        .unwrap()
        .start();

    assert!(!manager.is_monitoring());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(slack.probes(), 0);
}

#[tokio::test]
async fn test_empty_registry_is_connected() {
    let manager = SyncManager::builder().health_check(no_health_checks()).start();
    assert!(manager.all_connected());
    assert!(manager.status_snapshot().is_empty());
}
