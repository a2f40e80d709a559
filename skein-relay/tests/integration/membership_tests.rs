use skein_core::PeerId;
use skein_relay::RelayCommand;

use crate::utils::wait_for_roster;
use crate::{create_test_relay, init_tracing};

#[tokio::test]
async fn join_pushes_roster_excluding_recipient() {
    init_tracing();
    let (cmd_tx, mut rx, _output) = create_test_relay();

    let a = PeerId::new();
    let b = PeerId::new();

    cmd_tx
        .send(RelayCommand::Join {
            peer_id: a.clone(),
            room: "global".to_string(),
        })
        .await
        .unwrap();

    assert!(wait_for_roster(&mut rx, &a).await.is_empty());

    cmd_tx
        .send(RelayCommand::Join {
            peer_id: b.clone(),
            room: "global".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(wait_for_roster(&mut rx, &a).await, vec![b.clone()]);
    assert_eq!(wait_for_roster(&mut rx, &b).await, vec![a]);
}

#[tokio::test]
async fn switching_rooms_updates_both_rooms() {
    init_tracing();
    let (cmd_tx, mut rx, _output) = create_test_relay();

    let stayer = PeerId::new();
    let mover = PeerId::new();

    for (peer, room) in [(&stayer, "a"), (&mover, "a")] {
        cmd_tx
            .send(RelayCommand::Join {
                peer_id: peer.clone(),
                room: room.to_string(),
            })
            .await
            .unwrap();
    }
    assert_eq!(wait_for_roster(&mut rx, &stayer).await, Vec::<PeerId>::new());
    assert_eq!(wait_for_roster(&mut rx, &stayer).await, vec![mover.clone()]);

    cmd_tx
        .send(RelayCommand::Join {
            peer_id: mover.clone(),
            room: "b".to_string(),
        })
        .await
        .unwrap();

    // The stayer sees the mover leave, the mover lands alone in "b".
    assert!(wait_for_roster(&mut rx, &stayer).await.is_empty());
    assert!(wait_for_roster(&mut rx, &mover).await.is_empty());
}

#[tokio::test]
async fn disconnect_rebroadcasts_roster_to_remaining_members() {
    init_tracing();
    let (cmd_tx, mut rx, _output) = create_test_relay();

    let a = PeerId::new();
    let b = PeerId::new();

    for peer in [&a, &b] {
        cmd_tx
            .send(RelayCommand::Join {
                peer_id: peer.clone(),
                room: "global".to_string(),
            })
            .await
            .unwrap();
    }
    assert_eq!(wait_for_roster(&mut rx, &b).await, vec![a.clone()]);

    cmd_tx
        .send(RelayCommand::Disconnect { peer_id: a })
        .await
        .unwrap();

    assert!(wait_for_roster(&mut rx, &b).await.is_empty());
}

#[tokio::test]
async fn at_most_one_roster_push_per_membership_change() {
    init_tracing();
    let (cmd_tx, mut rx, output) = create_test_relay();

    let a = PeerId::new();
    let b = PeerId::new();

    for peer in [&a, &b] {
        cmd_tx
            .send(RelayCommand::Join {
                peer_id: peer.clone(),
                room: "global".to_string(),
            })
            .await
            .unwrap();
    }
    assert!(wait_for_roster(&mut rx, &a).await.is_empty());
    assert_eq!(wait_for_roster(&mut rx, &a).await, vec![b.clone()]);

    // Re-joining the same room is not a membership change.
    cmd_tx
        .send(RelayCommand::Join {
            peer_id: b.clone(),
            room: "global".to_string(),
        })
        .await
        .unwrap();

    // Force a round trip through the actor so the re-join is processed.
    let probe = PeerId::new();
    cmd_tx
        .send(RelayCommand::Join {
            peer_id: probe.clone(),
            room: "elsewhere".to_string(),
        })
        .await
        .unwrap();
    wait_for_roster(&mut rx, &probe).await;

    // a saw exactly two rosters: its own join and b's join.
    assert_eq!(output.rosters_for(&a).await.len(), 2);
}
