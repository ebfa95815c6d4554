//! Collective operations over in-process channel ranks.

use std::thread;

use proptest::prelude::*;
use tether_comm::{ChannelCommunicator, CommError, Communicator};

/// Run `body` on every rank of a fresh group and collect results by rank.
fn run_ranks<T, F>(size: usize, body: F) -> Vec<T>
where
    T: Send + 'static,
    F: Fn(ChannelCommunicator) -> T + Send + Sync + Clone + 'static,
{
    let handles: Vec<_> = ChannelCommunicator::group(size)
        .into_iter()
        .map(|comm| {
            let body = body.clone();
            thread::spawn(move || body(comm))
        })
        .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

fn sum_u64(a: Vec<u8>, b: Vec<u8>) -> Vec<u8> {
    let a = u64::from_le_bytes(a.try_into().unwrap());
    let b = u64::from_le_bytes(b.try_into().unwrap());
    (a + b).to_le_bytes().to_vec()
}

#[test]
fn broadcast_reaches_every_rank() {
    for size in 1..=9 {
        let got = run_ranks(size, |comm| {
            let value = (comm.rank() == 0).then(|| vec![1, 2, 3]);
            comm.broadcast(value).unwrap()
        });
        assert!(got.iter().all(|v| v == &[1, 2, 3]), "size {size}: {got:?}");
    }
}

#[test]
fn reduce_only_root_gets_result() {
    let got = run_ranks(6, |comm| {
        let mine = (comm.rank() as u64).to_le_bytes().to_vec();
        comm.reduce(sum_u64, mine).unwrap()
    });
    assert_eq!(got[0], Some(15u64.to_le_bytes().to_vec()));
    assert!(got[1..].iter().all(Option::is_none));
}

#[test]
fn all_reduce_sums_ranks() {
    for size in 1..=8 {
        let got = run_ranks(size, |comm| {
            let mine = (comm.rank() as u64 + 1).to_le_bytes().to_vec();
            u64::from_le_bytes(comm.all_reduce(sum_u64, mine).unwrap().try_into().unwrap())
        });
        let expected = (size * (size + 1) / 2) as u64;
        assert!(got.iter().all(|&v| v == expected), "size {size}: {got:?}");
    }
}

#[test]
fn all_to_all_delivers_personalised_buffers() {
    let size = 5;
    let got = run_ranks(size, move |comm| {
        let r = comm.rank() as u8;
        let outgoing = (0..size as u8).map(|d| vec![r, d]).collect();
        comm.all_to_all(outgoing).unwrap()
    });
    for (dest, incoming) in got.iter().enumerate() {
        for (source, buf) in incoming.iter().enumerate() {
            assert_eq!(buf, &vec![source as u8, dest as u8]);
        }
    }
}

#[test]
fn all_to_all_rejects_wrong_buffer_count() {
    let comm = ChannelCommunicator::group(1).pop().unwrap();
    let err = comm.all_to_all(vec![vec![], vec![]]).unwrap_err();
    assert_eq!(
        err,
        CommError::SizeMismatch {
            expected: 1,
            found: 2
        }
    );
}

#[test]
fn send_to_unknown_rank_is_error() {
    let comm = ChannelCommunicator::group(2).remove(0);
    assert_eq!(
        comm.send(2, vec![]).unwrap_err(),
        CommError::InvalidRank { rank: 2, size: 2 }
    );
}

#[test]
fn recv_from_dropped_peer_is_disconnected() {
    let mut group = ChannelCommunicator::group(2);
    let survivor = group.remove(0);
    drop(group);
    assert_eq!(
        survivor.recv(1).unwrap_err(),
        CommError::Disconnected { peer: 1 }
    );
}

#[test]
fn consecutive_collectives_do_not_cross_talk() {
    let got = run_ranks(4, |comm| {
        let first = comm.broadcast((comm.rank() == 0).then(|| vec![9])).unwrap();
        let mine = (comm.rank() as u64).to_le_bytes().to_vec();
        let total = comm.all_reduce(sum_u64, mine).unwrap();
        let second = comm.broadcast((comm.rank() == 0).then(|| vec![7])).unwrap();
        (first, total, second)
    });
    for (first, total, second) in got {
        assert_eq!(first, vec![9]);
        assert_eq!(total, 6u64.to_le_bytes().to_vec());
        assert_eq!(second, vec![7]);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn broadcast_arbitrary_payload(size in 1usize..7, payload in prop::collection::vec(any::<u8>(), 0..64)) {
        let expected = payload.clone();
        let got = run_ranks(size, move |comm| {
            let value = (comm.rank() == 0).then(|| payload.clone());
            comm.broadcast(value).unwrap()
        });
        for v in got {
            prop_assert_eq!(&v, &expected);
        }
    }
}
