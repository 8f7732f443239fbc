use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

use ekn_domain::{gather_ordered, Cancelled, GatherPolicy};

#[derive(Debug, PartialEq, Eq)]
enum TestError {
    Failed(usize),
    Cancelled,
}

impl From<Cancelled> for TestError {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}

#[tokio::test]
async fn results_keep_dispatch_order() {
    let mut rng = rand::thread_rng();
    for _ in 0..5 {
        let delays: Vec<u64> = (0..24).map(|_| rng.gen_range(0..15)).collect();
        let futures = delays.iter().enumerate().map(|(i, delay)| async move {
            sleep(Duration::from_millis(*delay)).await;
            Ok::<_, TestError>(i)
        });
        let results = gather_ordered(futures, &CancellationToken::new(), GatherPolicy::Settle)
            .await
            .expect("gather");
        assert_eq!(results, (0..24).collect::<Vec<_>>(), "delays {delays:?}");
    }
}

#[tokio::test]
async fn empty_batch_resolves() {
    let futures = std::iter::empty::<std::future::Ready<Result<u8, TestError>>>();
    let results = gather_ordered(futures, &CancellationToken::new(), GatherPolicy::Settle).await;
    assert_eq!(results, Ok(Vec::new()));
}

#[tokio::test]
async fn settle_lets_every_fetch_finish() {
    let finished = AtomicUsize::new(0);
    let futures = (0..8).map(|i| {
        let finished = &finished;
        async move {
            if i == 2 {
                return Err(TestError::Failed(i));
            }
            sleep(Duration::from_millis(20)).await;
            finished.fetch_add(1, Ordering::SeqCst);
            Ok(i)
        }
    });
    let err = gather_ordered(futures, &CancellationToken::new(), GatherPolicy::Settle)
        .await
        .expect_err("one fetch fails");
    assert_eq!(err, TestError::Failed(2));
    assert_eq!(finished.load(Ordering::SeqCst), 7);
}

#[tokio::test]
async fn first_error_by_completion_wins() {
    let futures = [30u64, 5, 60].into_iter().enumerate().map(|(i, delay)| async move {
        sleep(Duration::from_millis(delay)).await;
        Err::<(), _>(TestError::Failed(i))
    });
    let err = gather_ordered(futures, &CancellationToken::new(), GatherPolicy::Settle)
        .await
        .expect_err("all fail");
    assert_eq!(err, TestError::Failed(1));
}

#[tokio::test]
async fn abort_on_error_cancels_stragglers() {
    let finished = AtomicUsize::new(0);
    let futures = (0..4).map(|i| {
        let finished = &finished;
        async move {
            if i == 0 {
                return Err(TestError::Failed(i));
            }
            sleep(Duration::from_secs(60)).await;
            finished.fetch_add(1, Ordering::SeqCst);
            Ok(i)
        }
    });
    let result = timeout(
        Duration::from_secs(5),
        gather_ordered(futures, &CancellationToken::new(), GatherPolicy::AbortOnError),
    )
    .await
    .expect("stragglers were not cancelled");
    assert_eq!(result, Err(TestError::Failed(0)));
    assert_eq!(finished.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn caller_cancellation_reaches_every_fetch() {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        sleep(Duration::from_millis(10)).await;
        trigger.cancel();
    });
    let futures = (0..3).map(|i| async move {
        sleep(Duration::from_secs(60)).await;
        Ok::<_, TestError>(i)
    });
    let result = timeout(Duration::from_secs(5), gather_ordered(futures, &cancel, GatherPolicy::Settle))
        .await
        .expect("fetches were not cancelled");
    assert_eq!(result, Err(TestError::Cancelled));
}
