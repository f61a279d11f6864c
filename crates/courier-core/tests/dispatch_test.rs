use async_trait::async_trait;
use rstest::rstest;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use courier_core::catalog::Reactable;
use courier_core::domain::{AuditCompletion, EventRecordId, StoreError};
use courier_core::impls::InMemoryAuditStore;
use courier_core::{
    AuditRecord, AuditStore, DispatcherBuilder, DispatcherConfig, Event, HandlerError,
    PublishError, Signer, catalog, handler_fn,
};

type Log = Arc<Mutex<Vec<String>>>;

fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

/// Handler appending `tag:<event name>` to the shared log.
fn recorder(log: &Log, tag: &'static str) -> impl courier_core::Handler + 'static {
    let log = log.clone();
    handler_fn(move |event: Event| {
        let log = log.clone();
        async move {
            log.lock().unwrap().push(format!("{tag}:{}", event.name()));
            Ok(())
        }
    })
}

async fn wait_finished(store: &InMemoryAuditStore, n: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while store.finished_count() < n {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("audit records were not finalized in time");
}

#[tokio::test]
async fn event_without_handlers_is_audited_with_zero_count() {
    let store = InMemoryAuditStore::new();
    let (dispatcher, _loop) = DispatcherBuilder::new().spawn(store.clone()).unwrap();

    dispatcher.publish(Event::new("nobody.listens")).await;
    wait_finished(&store, 1).await;

    let records = store.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "nobody.listens");
    assert_eq!(records[0].handler_count, Some(0));
    assert!(records[0].elapsed.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn handlers_run_in_registration_order_every_time() {
    let store = InMemoryAuditStore::new();
    let log = new_log();
    let (dispatcher, _loop) = DispatcherBuilder::new().spawn(store.clone()).unwrap();

    dispatcher.register("vote", recorder(&log, "h1")).await;
    dispatcher.register("vote", recorder(&log, "h2")).await;
    dispatcher.register("vote", recorder(&log, "h3")).await;

    for _ in 0..20 {
        log.lock().unwrap().clear();
        let before = store.finished_count();
        dispatcher.publish(Event::new("vote")).await;
        wait_finished(&store, before + 1).await;

        assert_eq!(*log.lock().unwrap(), vec!["h1:vote", "h2:vote", "h3:vote"]);
    }
}

#[tokio::test]
async fn failing_handler_aborts_the_rest_of_its_chain() {
    let store = InMemoryAuditStore::new();
    let log = new_log();
    let (dispatcher, _loop) = DispatcherBuilder::new()
        .on("flag.new", recorder(&log, "h1"))
        .on(
            "flag.new",
            handler_fn(|_event| async {
                Err(HandlerError::failed("moderation queue down"))
            }),
        )
        .on("flag.new", recorder(&log, "h3"))
        .spawn(store.clone())
        .unwrap();

    dispatcher.publish(catalog::flag_raised("f-1")).await;
    wait_finished(&store, 1).await;

    assert_eq!(*log.lock().unwrap(), vec!["h1:flag.new"]);
    let record = &store.records()[0];
    assert!(record.is_finished());
    assert_eq!(record.handler_count, Some(3));
}

#[tokio::test]
async fn panicking_handler_does_not_stop_the_loop() {
    let store = InMemoryAuditStore::new();
    let log = new_log();
    let (dispatcher, _loop) = DispatcherBuilder::new()
        .on(
            "order.status",
            handler_fn(|event: Event| async move {
                if event.param("to") == Some(&json!("refunded")) {
                    panic!("refunds are not wired yet");
                }
                Ok(())
            }),
        )
        .on("vote", recorder(&log, "votes"))
        .spawn(store.clone())
        .unwrap();

    dispatcher
        .publish(catalog::order_status_changed("o-1", "confirmed", "refunded"))
        .await;
    wait_finished(&store, 1).await;
    dispatcher
        .publish(Event::new("vote").with_param("type", "up"))
        .await;
    wait_finished(&store, 2).await;

    assert_eq!(*log.lock().unwrap(), vec!["votes:vote"]);
    assert!(store.records().iter().all(AuditRecord::is_finished));
}

#[tokio::test]
async fn registration_after_dequeue_does_not_reach_the_in_flight_event() {
    let store = InMemoryAuditStore::new();
    let log = new_log();
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());

    let gate = {
        let log = log.clone();
        let entered = entered.clone();
        let release = release.clone();
        handler_fn(move |event: Event| {
            let log = log.clone();
            let entered = entered.clone();
            let release = release.clone();
            async move {
                log.lock()
                    .unwrap()
                    .push(format!("gate:{}", event.param("n").unwrap()));
                entered.notify_one();
                release.notified().await;
                Ok(())
            }
        })
    };
    let (dispatcher, _loop) = DispatcherBuilder::new()
        .on("comment.new", gate)
        .spawn(store.clone())
        .unwrap();

    dispatcher
        .publish(Event::new("comment.new").with_param("n", 1))
        .await;
    // The gate is running, so the loop has already taken its snapshot.
    entered.notified().await;
    dispatcher
        .register("comment.new", recorder(&log, "h4"))
        .await;
    release.notify_one();
    wait_finished(&store, 1).await;

    assert_eq!(*log.lock().unwrap(), vec!["gate:1"]);
    assert_eq!(store.records()[0].handler_count, Some(1));

    dispatcher
        .publish(Event::new("comment.new").with_param("n", 2))
        .await;
    entered.notified().await;
    release.notify_one();
    wait_finished(&store, 2).await;

    assert_eq!(
        *log.lock().unwrap(),
        vec!["gate:1", "gate:2", "h4:comment.new"]
    );
}

#[tokio::test]
async fn registration_is_visible_to_events_published_after_it() {
    let store = InMemoryAuditStore::new();
    let log = new_log();
    let (dispatcher, _loop) = DispatcherBuilder::new().spawn(store.clone()).unwrap();

    dispatcher.register("vote", recorder(&log, "late")).await;
    dispatcher.publish(Event::new("vote")).await;
    wait_finished(&store, 1).await;

    assert_eq!(*log.lock().unwrap(), vec!["late:vote"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn slow_event_does_not_hold_back_a_later_one() {
    let store = InMemoryAuditStore::new();
    let (dispatcher, _loop) = DispatcherBuilder::new()
        .on(
            "order.status",
            handler_fn(|_event| async {
                tokio::time::sleep(Duration::from_millis(300)).await;
                Ok(())
            }),
        )
        .on("vote", handler_fn(|_event| async { Ok(()) }))
        .spawn(store.clone())
        .unwrap();

    dispatcher
        .publish(catalog::order_status_changed("o-1", "awaiting", "confirmed"))
        .await;
    dispatcher.publish(Event::new("vote")).await;
    wait_finished(&store, 2).await;

    let slow = &store.find_by_name("order.status")[0];
    let fast = &store.find_by_name("vote")[0];
    assert!(fast.finished_at < slow.finished_at);
    assert!(slow.elapsed.unwrap() >= Duration::from_millis(300));
}

fn checkout_event() -> Event {
    let items = json!([{ "sku": "A", "qty": 2 }, { "sku": "B", "qty": null }]);
    Event::new("order.status")
        .signed_by(Signer::new("checkout", "u-2"))
        .with_param("items", items)
        .with_param("total", 42.5)
}

#[rstest]
#[case::signed_vote(catalog::vote_cast("u-1", "v-1", Reactable::Comment, "c-9", "up", false))]
#[case::unsigned_flag(catalog::flag_raised("f-3"))]
#[case::nested_params(checkout_event())]
#[case::empty(Event::new("ping"))]
#[tokio::test]
async fn audit_record_matches_the_published_event(#[case] event: Event) {
    let store = InMemoryAuditStore::new();
    let (dispatcher, _loop) = DispatcherBuilder::new().spawn(store.clone()).unwrap();

    dispatcher.publish(event.clone()).await;
    wait_finished(&store, 1).await;

    let record = &store.records()[0];
    assert_eq!(record.name, event.name());
    assert_eq!(record.signer.as_ref(), event.signer());
    assert_eq!(&record.params, event.params());
}

#[tokio::test]
async fn every_event_gets_its_own_record() {
    let store = InMemoryAuditStore::new();
    let (dispatcher, _loop) = DispatcherBuilder::new()
        .on("vote", handler_fn(|_event| async { Ok(()) }))
        .spawn(store.clone())
        .unwrap();

    for n in 0..50 {
        dispatcher
            .publish(Event::new("vote").with_param("n", n))
            .await;
    }
    wait_finished(&store, 50).await;

    let mut ids: Vec<EventRecordId> = store.records().iter().map(|r| r.id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 50);
}

#[tokio::test]
async fn try_publish_returns_full_while_loop_is_busy() {
    let store = InMemoryAuditStore::new();
    let (dispatcher, _loop) = DispatcherBuilder::new()
        .config(DispatcherConfig {
            publish_capacity: 1,
            register_capacity: 1,
        })
        .spawn(store.clone())
        .unwrap();

    // Current-thread runtime: the loop cannot run until this task yields,
    // so the second event finds the queue full.
    dispatcher.try_publish(Event::new("a")).unwrap();
    let err = dispatcher.try_publish(Event::new("b")).unwrap_err();
    assert!(matches!(err, PublishError::Full(ref event) if event.name() == "b"));

    wait_finished(&store, 1).await;
    dispatcher.try_publish(err.into_event()).unwrap();
    wait_finished(&store, 2).await;
}

#[tokio::test]
async fn publish_waits_for_room_instead_of_dropping() {
    let store = InMemoryAuditStore::new();
    let (dispatcher, _loop) = DispatcherBuilder::new()
        .config(DispatcherConfig {
            publish_capacity: 1,
            register_capacity: 1,
        })
        .spawn(store.clone())
        .unwrap();

    // The loop has not been polled yet, so the queue stays full until we yield.
    dispatcher.try_publish(Event::new("first")).unwrap();
    let mut second = Box::pin(dispatcher.publish(Event::new("second")));
    assert!(futures::poll!(second.as_mut()).is_pending());

    second.await;
    wait_finished(&store, 2).await;

    let mut names: Vec<String> = store.records().into_iter().map(|r| r.name).collect();
    names.sort();
    assert_eq!(names, vec!["first", "second"]);
}

struct FlakyStore {
    inner: InMemoryAuditStore,
    refuse_insert_for: &'static str,
    refuse_update_for: &'static str,
}

#[async_trait]
impl AuditStore for FlakyStore {
    async fn insert(&self, record: &AuditRecord) -> Result<(), StoreError> {
        if record.name == self.refuse_insert_for {
            return Err(StoreError::Backend("insert refused".into()));
        }
        self.inner.insert(record).await
    }

    async fn update_by_id(
        &self,
        id: EventRecordId,
        completion: &AuditCompletion,
    ) -> Result<(), StoreError> {
        let name = self.inner.get(id).map(|r| r.name).unwrap_or_default();
        if name == self.refuse_update_for {
            return Err(StoreError::Backend("update refused".into()));
        }
        self.inner.update_by_id(id, completion).await
    }
}

#[tokio::test]
async fn audit_store_failures_stay_inside_their_event() {
    let inner = InMemoryAuditStore::new();
    let log = new_log();
    let (dispatcher, _loop) = DispatcherBuilder::new()
        .on("untraceable", recorder(&log, "never"))
        .on("unfinished", recorder(&log, "ran"))
        .on("vote", recorder(&log, "ok"))
        .spawn(FlakyStore {
            inner: inner.clone(),
            refuse_insert_for: "untraceable",
            refuse_update_for: "unfinished",
        })
        .unwrap();

    dispatcher.publish(Event::new("untraceable")).await;
    dispatcher.publish(Event::new("unfinished")).await;
    dispatcher.publish(Event::new("vote")).await;
    wait_finished(&inner, 1).await;
    tokio::time::timeout(Duration::from_secs(5), async {
        while log.lock().unwrap().len() < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    let mut ran = log.lock().unwrap().clone();
    ran.sort();
    assert_eq!(ran, vec!["ok:vote", "ran:unfinished"]);

    assert!(inner.find_by_name("untraceable").is_empty());
    let unfinished = &inner.find_by_name("unfinished")[0];
    assert!(!unfinished.is_finished());
    assert!(inner.find_by_name("vote")[0].is_finished());
}
