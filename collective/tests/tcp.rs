use std::num::NonZeroUsize;

use collective::{Collective, WorkerContext, group, tcp};
use futures::future;
use tokio::net::TcpListener;

const WORLD: usize = 3;
const LEN: usize = 64;

fn world() -> NonZeroUsize {
    NonZeroUsize::new(WORLD).unwrap()
}

fn initial(rank: usize) -> Vec<f32> {
    (0..LEN).map(|i| (i * (rank + 1)) as f32 * 0.125).collect()
}

async fn round<C: Collective>(member: &mut C) -> Vec<f32> {
    let mut buf = initial(member.context().rank());

    member.reduce_sum(&mut buf).await.unwrap();
    for x in buf.iter_mut() {
        *x *= 0.5;
    }
    member.broadcast(&mut buf).await.unwrap();
    member.barrier().await.unwrap();
    buf
}

#[tokio::test(flavor = "multi_thread")]
async fn tcp_star_matches_in_process_group() {
    let local = future::join_all(group(world()).into_iter().map(|mut member| {
        tokio::spawn(async move { round(&mut member).await })
    }))
    .await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut tasks = Vec::new();
    for rank in 1..WORLD {
        tasks.push(tokio::spawn(async move {
            let ctx = WorkerContext::new(rank, world()).unwrap();
            let mut member = tcp::connect_root(addr, ctx).await.unwrap();
            let buf = round(&mut member).await;
            member.finish().await.unwrap();
            buf
        }));
    }

    let ctx = WorkerContext::new(0, world()).unwrap();
    let mut root = tcp::accept_peers(&listener, ctx).await.unwrap();
    let root_buf = round(&mut root).await;
    root.finish().await.unwrap();

    let leaves = future::join_all(tasks).await;
    let expected = local[0].as_ref().unwrap();

    assert_eq!(&root_buf, expected);
    for (buf, other) in leaves.into_iter().zip(local.iter().skip(1)) {
        assert_eq!(&buf.unwrap(), other.as_ref().unwrap());
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn root_rejects_mismatched_world() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let leaf = tokio::spawn(async move {
        let ctx = WorkerContext::new(1, NonZeroUsize::new(4).unwrap()).unwrap();
        tcp::connect_root(addr, ctx).await
    });

    let ctx = WorkerContext::new(0, world()).unwrap();
    assert!(tcp::accept_peers(&listener, ctx).await.is_err());
    let _ = leaf.await;
}
