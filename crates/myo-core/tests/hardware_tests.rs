//! Hardware integration tests for myo-core
//!
//! These tests require a Myo armband and a Bluetooth adapter and should be
//! run with:
//! ```
//! cargo test --package myo-core --test hardware_tests -- --ignored --nocapture
//! ```
//!
//! Configure the armband via environment variable:
//! - `MYO_DEVICE`: armband hardware address (or peripheral UUID on macOS)
//!
//! Example:
//! ```
//! MYO_DEVICE="f0:1c:cd:a7:2c:85" cargo test --package myo-core --test hardware_tests -- --ignored --nocapture
//! ```

use std::env;
use std::time::Duration;

use myo_core::{AgentConfig, AgentEvent, DiscoveryAgent, get_adapter};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

/// Default timeout for BLE operations
const BLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Get armband identifier from environment
fn get_device() -> Option<String> {
    env::var("MYO_DEVICE").ok().filter(|s| !s.is_empty())
}

fn config_for(address: String) -> AgentConfig {
    AgentConfig {
        n: 1,
        addresses: vec![address],
        ..Default::default()
    }
}

#[tokio::test]
#[ignore = "requires BLE hardware"]
async fn test_adapter_available() {
    match timeout(BLE_TIMEOUT, get_adapter()).await {
        Ok(Ok(_)) => println!("Bluetooth adapter found"),
        Ok(Err(e)) => panic!("No adapter: {}", e),
        Err(_) => panic!("Adapter lookup timed out"),
    }
}

#[tokio::test]
#[ignore = "requires BLE hardware"]
async fn test_armband_becomes_ready() {
    let Some(address) = get_device() else {
        println!("Skipping: MYO_DEVICE not set");
        return;
    };

    let agent = DiscoveryAgent::new(config_for(address)).expect("valid config");
    let mut events = agent.subscribe();
    let cancel = CancellationToken::new();
    let run = tokio::spawn(agent.run(cancel.clone()));

    let ready = timeout(BLE_TIMEOUT, async {
        loop {
            match events.recv().await {
                Ok(AgentEvent::Ready { armband, services }) => break Ok((armband, services)),
                Ok(AgentEvent::Disconnected { reason, .. }) => break Err(format!("{reason:?}")),
                Ok(event) => println!("{event:?}"),
                Err(e) => break Err(e.to_string()),
            }
        }
    })
    .await;

    match ready {
        Ok(Ok((armband, services))) => {
            println!("{} ready with {:?}", armband, services);
            assert!(!services.is_empty());
        }
        Ok(Err(e)) => panic!("Armband failed: {}", e),
        Err(_) => panic!("Armband did not become ready within {:?}", BLE_TIMEOUT),
    }

    cancel.cancel();
    let result = run.await.expect("agent task");
    assert!(result.is_ok(), "agent stopped with {:?}", result);
}

#[tokio::test]
#[ignore = "requires BLE hardware"]
async fn test_emg_stream_rate() {
    let Some(address) = get_device() else {
        println!("Skipping: MYO_DEVICE not set");
        return;
    };

    let agent = DiscoveryAgent::new(config_for(address)).expect("valid config");
    let mut events = agent.subscribe();
    let cancel = CancellationToken::new();
    let run = tokio::spawn(agent.run(cancel.clone()));

    let counted = timeout(BLE_TIMEOUT, async {
        let mut emg = 0usize;
        let mut imu = 0usize;
        while emg < 100 || imu < 10 {
            match events.recv().await {
                Ok(AgentEvent::Emg { raw, .. }) => {
                    assert_eq!(raw.len(), 16);
                    emg += 1;
                }
                Ok(AgentEvent::Imu { raw, .. }) => {
                    assert_eq!(raw.len(), 20);
                    imu += 1;
                }
                Ok(_) => {}
                Err(e) => return Err(e.to_string()),
            }
        }
        Ok((emg, imu))
    })
    .await;

    cancel.cancel();
    let _ = run.await;

    match counted {
        Ok(Ok((emg, imu))) => println!("Received {} EMG and {} IMU notifications", emg, imu),
        Ok(Err(e)) => panic!("Event stream failed: {}", e),
        Err(_) => panic!("Not enough samples within {:?}", BLE_TIMEOUT),
    }
}

#[tokio::test]
#[ignore = "requires BLE hardware"]
async fn test_session_without_relay_disconnects_on_cancel() {
    let Some(address) = get_device() else {
        println!("Skipping: MYO_DEVICE not set");
        return;
    };

    let mut config = config_for(address);
    config.relay.enabled = false;
    let agent = DiscoveryAgent::new(config).expect("valid config");
    let mut events = agent.subscribe();
    let cancel = CancellationToken::new();
    let run = tokio::spawn(agent.run(cancel.clone()));

    let ready = timeout(BLE_TIMEOUT, async {
        loop {
            match events.recv().await {
                Ok(AgentEvent::Ready { .. }) => break true,
                Ok(AgentEvent::Disconnected { .. }) | Err(_) => break false,
                Ok(_) => {}
            }
        }
    })
    .await;
    assert_eq!(ready, Ok(true), "armband did not become ready");

    // The session is parked waiting for link loss; cancelling must end it
    cancel.cancel();
    let disconnected = timeout(BLE_TIMEOUT, async {
        loop {
            match events.recv().await {
                Ok(AgentEvent::Disconnected { reason, .. }) => break Some(reason),
                Ok(_) => {}
                Err(_) => break None,
            }
        }
    })
    .await;
    println!("Disconnected: {:?}", disconnected);
    assert!(matches!(disconnected, Ok(Some(_))));

    let result = run.await.expect("agent task");
    assert!(result.is_ok(), "agent stopped with {:?}", result);
}
