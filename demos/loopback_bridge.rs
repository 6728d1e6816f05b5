//! Loopback bridge demo
//!
//! Publishes two simulated participants on the in-process loopback engine,
//! feeds them a few seconds of synthetic video and audio, and prints what a
//! receiver subscribed to one of the sources sees.
//!
//! Run with: cargo run --example loopback_bridge
//!
//! Set RUST_LOG=ndi_bridge=debug for endpoint lifecycle logs.

use std::time::Duration;

use tokio::sync::broadcast;

use ndi_bridge::engine::{LoopbackEngine, OutboundFrame};
use ndi_bridge::{Bridge, BridgeConfig, ControlRequest, ControlResponse};

const WIDTH: u32 = 320;
const HEIGHT: u32 = 180;
const SAMPLE_RATE: u32 = 48_000;
const SAMPLES_PER_FRAME: usize = 1920;

/// A solid frame whose red channel follows the frame index
fn test_pattern(index: u32) -> Vec<u8> {
    let shade = (index * 8 % 256) as u8;
    let mut pixels = Vec::with_capacity((WIDTH * HEIGHT * 4) as usize);
    for _ in 0..WIDTH * HEIGHT {
        pixels.extend_from_slice(&[shade, 64, 128, 255]);
    }
    pixels
}

/// A 440Hz tone block starting at `offset` samples
fn tone(offset: usize) -> Vec<f32> {
    (0..SAMPLES_PER_FRAME)
        .map(|i| {
            let t = (offset + i) as f32 / SAMPLE_RATE as f32;
            (t * 440.0 * std::f32::consts::TAU).sin() * 0.2
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ndi_bridge=info".parse()?)
                .add_directive("loopback_bridge=info".parse()?),
        )
        .init();

    let engine = LoopbackEngine::new();
    let config = BridgeConfig::default()
        .name_prefix("DEMO")
        .stats_log_every(50)
        .stats_interval(Some(Duration::from_secs(2)));
    let bridge = Bridge::with_config(engine.clone(), config);

    if let ControlResponse::Initialized(false) = bridge.handle(ControlRequest::Initialize).await {
        eprintln!("Engine unavailable, nothing to publish");
        return Ok(());
    }

    let alice = bridge
        .handle(ControlRequest::CreateEndpoint {
            participant_id: "7f3a9c21-alice".to_string(),
            display_label: Some("Alice".to_string()),
        })
        .await;
    let bob = bridge
        .handle(ControlRequest::CreateEndpoint {
            participant_id: "b0b5e1d4-bob".to_string(),
            display_label: None,
        })
        .await;

    let (Some(alice_name), Some(bob_name)) = (alice.publish_name(), bob.publish_name()) else {
        eprintln!("Endpoint creation failed");
        return Ok(());
    };
    println!("Publishing {} and {}", alice_name, bob_name);
    println!("Sources on the network: {:?}", engine.sources());

    let mut receiver = engine
        .subscribe(alice_name)
        .ok_or("source disappeared before subscribing")?;

    let watcher = tokio::spawn(async move {
        let mut video = 0u64;
        let mut audio = 0u64;
        loop {
            let frame = match receiver.recv().await {
                Ok(frame) => frame,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    println!("receiver lagged, skipped {} frames", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            match frame {
                OutboundFrame::Video(frame) => {
                    video += 1;
                    if video % 25 == 1 {
                        println!(
                            "video {}x{} fourcc={:?} tc={}",
                            frame.width, frame.height, frame.fourcc, frame.timecode
                        );
                    }
                }
                OutboundFrame::Audio(frame) => {
                    audio += 1;
                    if audio % 25 == 1 {
                        println!(
                            "audio {}Hz {} samples tc={}",
                            frame.sample_rate, frame.samples_per_channel, frame.timecode
                        );
                    }
                }
            }
        }
        (video, audio)
    });

    let ingest = bridge.ingest();
    let mut ticker = tokio::time::interval(Duration::from_millis(40));
    for index in 0..100u32 {
        ticker.tick().await;
        for participant in ["7f3a9c21-alice", "b0b5e1d4-bob"] {
            ingest.submit_video(participant, WIDTH, HEIGHT, test_pattern(index));
            let samples = tone(index as usize * SAMPLES_PER_FRAME);
            ingest.submit_audio(participant, samples.clone(), samples, SAMPLE_RATE);
        }
    }

    // Let the worker drain the queue
    tokio::time::sleep(Duration::from_millis(200)).await;
    println!();
    println!("{}", bridge.status().await);
    println!("Dropped at ingest: {}", ingest.dropped());

    bridge.shutdown().await;

    let (video, audio) = watcher.await?;
    println!("Receiver saw {} video and {} audio frames", video, audio);

    Ok(())
}
