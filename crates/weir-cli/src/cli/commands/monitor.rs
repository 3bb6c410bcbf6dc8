use crate::cli::args::MonitorArgs;
use crate::exit_codes;
use tokio::io::AsyncBufReadExt;
use tokio_stream::StreamExt;
use weir_engine::Engine;

/// Stream classification events until the user presses Enter or Ctrl-C.
///
/// Events arrive on an engine-owned thread and are bridged into an async
/// stream; all engine calls (like resolving the applied filter) happen on
/// this task, never on the subscription thread.
pub async fn run(engine: &dyn Engine, _args: MonitorArgs) -> anyhow::Result<i32> {
    let (subscription, mut events) = engine.subscribe()?;
    println!("Monitoring network events - press enter or Ctrl+C to stop.");

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = lines.next_line() => break,
            event = events.next() => match event {
                Some(Ok(event)) => {
                    println!("{event}");
                    match engine.filter_by_id(event.filter_id) {
                        Ok(Some(filter)) => println!("    - (Filter applied: {filter})"),
                        Ok(None) => {}
                        Err(err) => eprintln!(
                            "Warning: could not resolve filter {}: {err}",
                            event.filter_id
                        ),
                    }
                }
                Some(Err(err)) => eprintln!("Warning: event stream error: {err}"),
                None => {
                    eprintln!("Event stream closed.");
                    break;
                }
            }
        }
    }

    // The subscription must go before the engine handle it came from.
    drop(subscription);
    Ok(exit_codes::OK)
}

#[cfg(test)]
mod tests {
    use tokio_stream::StreamExt;
    use weir_engine::mock::MockEngine;
    use weir_engine::{ClassifyEvent, Engine, EventKind};

    fn sample_event(filter_id: u64) -> ClassifyEvent {
        ClassifyEvent {
            kind: EventKind::Allow,
            filter_id,
            ip_protocol: 6,
            local: "10.0.0.2".parse().unwrap(),
            local_port: 40000,
            remote: "1.1.1.1".parse().unwrap(),
            remote_port: 443,
            app_id: b"/usr/bin/curl".to_vec(),
        }
    }

    #[tokio::test]
    async fn events_flow_through_the_subscription_stream() {
        let engine = MockEngine::new();
        let (subscription, mut events) = engine.subscribe().unwrap();

        engine.push_event(sample_event(7));
        let event = events.next().await.unwrap().unwrap();
        assert_eq!(event.filter_id, 7);
        assert_eq!(
            event.to_string(),
            "[protocol: tcp] [FilterId: 7] allow curl 10.0.0.2:40000 -> 1.1.1.1:443"
        );

        drop(subscription);
    }

    #[tokio::test]
    async fn dropping_the_subscription_ends_the_stream() {
        let engine = MockEngine::new();
        let (subscription, mut events) = engine.subscribe().unwrap();
        drop(subscription);

        assert!(events.next().await.is_none());
    }
}
