use skein_core::{Chunk, Job, JobParams, MessageId, PeerId, SignalPayload};
use skein_relay::RelayCommand;

use crate::utils::{Outbound, next_outbound, wait_for_roster};
use crate::{create_test_relay, init_tracing};

async fn join(cmd_tx: &tokio::sync::mpsc::Sender<RelayCommand>, peer: &PeerId, room: &str) {
    cmd_tx
        .send(RelayCommand::Join {
            peer_id: peer.clone(),
            room: room.to_string(),
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn signal_is_forwarded_with_sender_id() {
    init_tracing();
    let (cmd_tx, mut rx, _output) = create_test_relay();

    let a = PeerId::new();
    let b = PeerId::new();
    join(&cmd_tx, &a, "global").await;
    join(&cmd_tx, &b, "global").await;
    wait_for_roster(&mut rx, &b).await;

    cmd_tx
        .send(RelayCommand::Signal {
            from: a.clone(),
            to: b.clone(),
            payload: SignalPayload::Offer {
                sdp: "v=0".to_string(),
            },
        })
        .await
        .unwrap();

    loop {
        if let Outbound::Signal {
            peer_id,
            from,
            payload,
        } = next_outbound(&mut rx).await
        {
            assert_eq!(peer_id, b);
            assert_eq!(from, a);
            assert!(matches!(payload, SignalPayload::Offer { .. }));
            break;
        }
    }
}

#[tokio::test]
async fn job_fans_out_to_room_excluding_sender() {
    init_tracing();
    let (cmd_tx, mut rx, output) = create_test_relay();

    let a = PeerId::new();
    let b = PeerId::new();
    let c = PeerId::new();
    let outsider = PeerId::new();

    for peer in [&a, &b, &c] {
        join(&cmd_tx, peer, "global").await;
    }
    join(&cmd_tx, &outsider, "other").await;
    wait_for_roster(&mut rx, &outsider).await;

    let job = Job::new("hi", JobParams::default(), a.clone());
    cmd_tx
        .send(RelayCommand::Job {
            from: a.clone(),
            job: job.clone(),
        })
        .await
        .unwrap();

    // Two copies leave the relay, one per other member.
    let mut recipients = Vec::new();
    for _ in 0..2 {
        loop {
            if let Outbound::Job { peer_id, from, job: j } = next_outbound(&mut rx).await {
                assert_eq!(from, a);
                assert_eq!(j.id, job.id);
                recipients.push(peer_id);
                break;
            }
        }
    }
    recipients.sort();
    let mut expected = vec![b, c];
    expected.sort();
    assert_eq!(recipients, expected);

    assert!(output.jobs_for(&a).await.is_empty());
    assert!(output.jobs_for(&outsider).await.is_empty());
}

#[tokio::test]
async fn job_from_roomless_peer_is_dropped() {
    init_tracing();
    let (cmd_tx, mut rx, output) = create_test_relay();

    let stranger = PeerId::new();
    let member = PeerId::new();
    join(&cmd_tx, &member, "global").await;
    wait_for_roster(&mut rx, &member).await;

    let job = Job::new("hi", JobParams::default(), stranger.clone());
    cmd_tx
        .send(RelayCommand::Job {
            from: stranger,
            job,
        })
        .await
        .unwrap();

    // Push another command through to prove the relay is still alive.
    join(&cmd_tx, &PeerId::new(), "elsewhere").await;
    next_outbound(&mut rx).await;

    assert!(output.jobs_for(&member).await.is_empty());
}

#[tokio::test]
async fn chunk_is_point_to_point() {
    init_tracing();
    let (cmd_tx, mut rx, output) = create_test_relay();

    let a = PeerId::new();
    let b = PeerId::new();
    let c = PeerId::new();
    for peer in [&a, &b, &c] {
        join(&cmd_tx, peer, "global").await;
    }
    wait_for_roster(&mut rx, &c).await;

    let message_id = MessageId::new();
    let chunk = Chunk::text(a.clone(), message_id.clone(), 0, "tok");
    cmd_tx
        .send(RelayCommand::Chunk {
            from: a.clone(),
            to: b.clone(),
            chunk,
        })
        .await
        .unwrap();

    loop {
        if let Outbound::Chunk { peer_id, from, chunk } = next_outbound(&mut rx).await {
            assert_eq!(peer_id, b);
            assert_eq!(from, a);
            assert_eq!(chunk.message_id, message_id);
            break;
        }
    }

    assert!(output.chunks_for(&c).await.is_empty());
}

#[tokio::test]
async fn chunk_stream_order_is_preserved_per_target() {
    init_tracing();
    let (cmd_tx, mut rx, output) = create_test_relay();

    let a = PeerId::new();
    let b = PeerId::new();
    join(&cmd_tx, &a, "global").await;
    join(&cmd_tx, &b, "global").await;
    wait_for_roster(&mut rx, &b).await;

    let message_id = MessageId::new();
    for (id, done) in [(0u64, false), (1, false), (2, true)] {
        let chunk = if done {
            Chunk::terminal(a.clone(), message_id.clone(), id)
        } else {
            Chunk::text(a.clone(), message_id.clone(), id, format!("t{id}"))
        };
        cmd_tx
            .send(RelayCommand::Chunk {
                from: a.clone(),
                to: b.clone(),
                chunk,
            })
            .await
            .unwrap();
    }

    let mut seen = 0;
    while seen < 3 {
        if matches!(next_outbound(&mut rx).await, Outbound::Chunk { .. }) {
            seen += 1;
        }
    }

    let delivered = output.chunks_for(&b).await;
    assert_eq!(delivered.iter().map(|c| c.id).collect::<Vec<_>>(), vec![0, 1, 2]);
    assert!(delivered[2].done, "terminal marker must be observed");
}
