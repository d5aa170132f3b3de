//! The async wrapper runs the same transactions on the blocking pool.
#![cfg(feature = "tokio")]

use std::sync::Arc;
use std::time::Duration;

use plc_link::nonblocking::AsyncRunner;
use plc_link::spec::{FrameSpec, KukaVarProxy, ModbusTcp};
use plc_link::{CancelToken, LinkError, RunnerConfig, ScriptedTransport, TransactionRunner};

fn runner(transport: &ScriptedTransport) -> AsyncRunner<ScriptedTransport> {
    let config = RunnerConfig::new()
        .with_receive_timeout(Duration::from_secs(5))
        .with_poll_interval(Duration::from_millis(5));
    AsyncRunner::new(TransactionRunner::new(transport.clone(), config))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_async_transactions() {
    const TASKS: usize = 16;

    let transport = ScriptedTransport::new();
    for _ in 0..TASKS {
        transport.queue_reply([0x00, 0x2A, 0x00, 0x02, 0xBE, 0xEF]);
    }
    let runner = runner(&transport);
    let spec: Arc<dyn FrameSpec> = Arc::new(KukaVarProxy);

    let tasks: Vec<_> = (0..TASKS)
        .map(|_| {
            let runner = runner.clone();
            let spec = Arc::clone(&spec);
            tokio::spawn(async move {
                runner
                    .send_and_receive(vec![0x00, 0x2A, 0x00, 0x01, 0x07], spec)
                    .await
            })
        })
        .collect();

    for task in tasks {
        let reply = task.await.unwrap().unwrap();
        assert_eq!(reply, vec![0x00, 0x2A, 0x00, 0x02, 0xBE, 0xEF]);
    }
    assert_eq!(transport.writes().len(), TASKS);
    assert_eq!(transport.pending(), 0);
}

#[tokio::test]
async fn test_async_cancel() {
    let transport = ScriptedTransport::new();
    transport.queue_silence();
    let runner = runner(&transport);
    let token = CancelToken::new();

    let pending = {
        let runner = runner.clone();
        let token = token.clone();
        tokio::spawn(async move {
            runner
                .execute_with_cancel(
                    vec![0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x00, 0x00, 0x01],
                    Arc::new(ModbusTcp),
                    true,
                    token,
                )
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    token.cancel();
    let result = pending.await.unwrap();
    assert!(matches!(result, Err(LinkError::Cancelled)));
}
