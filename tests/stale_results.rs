mod common;

use std::sync::Arc;

use common::{animals, mounted, store, RecordingView};
use review_core::{
    CollectionKind, Commit, DequeueOutcome, EnqueueOutcome, FavoriteOutcome, RemoteStore,
};

#[tokio::test]
async fn superseded_switch_does_not_touch_the_new_collection() {
    let store = store();
    store.inner().add_not_remembered("cat", "").await.unwrap();
    store.inner().add_favorite("dog", "").await.unwrap();
    let (session, view, _) = mounted(&store);
    let gate = store.hold("not_remembered");

    let (stale, (fresh, state_before, frames_before)) = tokio::join!(
        session.switch_collection(CollectionKind::NotRemembered),
        async {
            gate.entered().await;
            let fresh = session.switch_collection(CollectionKind::Favorites).await;
            let snapshot = (session.state(), view.frame_count());
            gate.open();
            (fresh, snapshot.0, snapshot.1)
        }
    );

    assert_eq!(stale, Commit::Discarded);
    assert_eq!(fresh, Commit::Applied);
    assert_eq!(session.state(), state_before);
    assert_eq!(view.frame_count(), frames_before);
    assert_eq!(session.state().active_collection, CollectionKind::Favorites);
    assert_eq!(session.snapshot().text, "dog");
    assert!(session
        .collection()
        .items
        .iter()
        .all(|card| card.term != "cat"));
}

#[tokio::test]
async fn fetch_resolving_after_unmount_is_silent() {
    let store = store();
    store.inner().add_favorite("dog", "").await.unwrap();
    let (session, view, id) = mounted(&store);
    let gate = store.hold("favorites");

    let (commit, frames_before) = tokio::join!(
        session.switch_collection(CollectionKind::Favorites),
        async {
            gate.entered().await;
            assert!(session.unmount(&id));
            let frames = view.frame_count();
            gate.open();
            frames
        }
    );

    assert_eq!(commit, Commit::Discarded);
    assert_eq!(view.frame_count(), frames_before);
    assert!(session.collection().items.is_empty());
    assert!(session.state().loading);
}

#[tokio::test]
async fn remount_with_a_new_view_ignores_the_old_fetch() {
    let store = store();
    let (session, _, first) = mounted(&store);
    let second_view = Arc::new(RecordingView::default());
    let gate = store.hold("sample_deck");

    let (commit, second) = tokio::join!(
        session.switch_collection(CollectionKind::Sample(animals())),
        async {
            gate.entered().await;
            session.unmount(&first);
            let second = session.mount(second_view.clone());
            gate.open();
            second
        }
    );

    assert_eq!(commit, Commit::Discarded);
    assert_ne!(first, second);
    assert_eq!(second_view.frame_count(), 0);

    // the new view works normally once it asks for data
    assert_eq!(session.reload().await, Commit::Applied);
    assert_eq!(second_view.last_frame().unwrap().position, "1 / 3");
}

#[tokio::test]
async fn hidden_view_receives_nothing_until_it_resumes() {
    let store = store();
    let (session, view, _) = mounted(&store);
    let gate = store.hold("sample_deck");

    let (commit, frames_before) = tokio::join!(
        session.switch_collection(CollectionKind::Sample(animals())),
        async {
            gate.entered().await;
            view.hide();
            let frames = view.frame_count();
            gate.open();
            frames
        }
    );

    assert_eq!(commit, Commit::Discarded);
    assert_eq!(view.frame_count(), frames_before);
    assert!(!session.next());

    // back in front, the dropped load is started again
    view.reveal();
    assert_eq!(session.resume().await, Commit::Applied);
    assert!(view.frame_count() > frames_before);
    assert_eq!(view.last_frame().unwrap().position, "1 / 3");
    assert!(session.next());
}

#[tokio::test]
async fn view_returning_to_the_foreground_is_live_again() {
    let store = store();
    let (session, view, id) = mounted(&store);
    session
        .switch_collection(CollectionKind::Sample(animals()))
        .await;

    view.hide();
    let frames_hidden = view.frame_count();
    assert!(session.next());
    assert_eq!(view.frame_count(), frames_hidden);
    assert_eq!(session.toggle_favorite().await.unwrap(), FavoriteOutcome::Discarded);

    view.reveal();
    assert_eq!(session.resume().await, Commit::Applied);
    assert_eq!(view.last_frame().unwrap().position, "2 / 3");
    assert_eq!(view.counters().last().map(String::as_str), Some("2 / 3"));

    assert!(session.next());
    assert_eq!(view.last_frame().unwrap().position, "3 / 3");
    assert_eq!(session.toggle_favorite().await.unwrap(), FavoriteOutcome::Added);
    assert_eq!(
        session.switch_collection(CollectionKind::Favorites).await,
        Commit::Applied
    );
    assert_eq!(view.last_frame().unwrap().text, "emu");
    assert!(view.frame_count() > frames_hidden);
    assert!(session.unmount(&id));
}

#[tokio::test]
async fn stale_history_fetch_issues_no_lookups() {
    let store = store();
    store.inner().record_search("cat");
    store.inner().record_search("dog");
    let (session, _, _) = mounted(&store);
    let gate = store.hold("history_terms");

    let (stale, fresh) = tokio::join!(
        session.switch_collection(CollectionKind::History),
        async {
            gate.entered().await;
            let fresh = session.switch_collection(CollectionKind::Favorites).await;
            gate.open();
            fresh
        }
    );

    assert_eq!(stale, Commit::Discarded);
    assert_eq!(fresh, Commit::Applied);
    assert_eq!(store.calls("definition"), 0);

    // nothing was cached, so the next visit resolves every term
    session.switch_collection(CollectionKind::History).await;
    assert_eq!(store.calls("definition"), 2);
}

#[tokio::test]
async fn toggle_resolving_after_a_switch_changes_nothing_locally() {
    let store = store();
    let (session, view, _) = mounted(&store);
    session
        .switch_collection(CollectionKind::Sample(animals()))
        .await;
    let gate = store.hold("add_favorite");

    let (outcome, (state_before, frames_before)) = tokio::join!(
        session.toggle_favorite(),
        async {
            gate.entered().await;
            session.switch_collection(CollectionKind::Favorites).await;
            let snapshot = (session.state(), view.frame_count());
            gate.open();
            snapshot
        }
    );

    assert_eq!(outcome.unwrap(), FavoriteOutcome::Discarded);
    assert_eq!(session.state(), state_before);
    assert_eq!(view.frame_count(), frames_before);
    // the remote write itself went through
    assert!(store.inner().favorite_status("cat").await.unwrap());
}

#[tokio::test]
async fn status_check_resolving_after_a_switch_writes_nothing() {
    let store = store();
    let (session, view, _) = mounted(&store);
    session
        .switch_collection(CollectionKind::Sample(animals()))
        .await;
    let gate = store.hold("favorite_status");

    let (outcome, frames_before) = tokio::join!(session.toggle_favorite(), async {
        gate.entered().await;
        session.switch_collection(CollectionKind::Favorites).await;
        let frames = view.frame_count();
        gate.open();
        frames
    });

    assert_eq!(outcome.unwrap(), FavoriteOutcome::Discarded);
    assert_eq!(store.calls("add_favorite"), 0);
    assert_eq!(store.calls("remove_favorite"), 0);
    assert_eq!(view.frame_count(), frames_before);
    assert!(!store.inner().favorite_status("cat").await.unwrap());
}

#[tokio::test]
async fn enqueue_resolving_after_a_switch_does_not_advance() {
    let store = store();
    let (session, view, _) = mounted(&store);
    session
        .switch_collection(CollectionKind::Sample(animals()))
        .await;
    let gate = store.hold("add_not_remembered");

    let (outcome, (state_before, frames_before, queue_loads)) =
        tokio::join!(session.mark_not_remembered(), async {
            gate.entered().await;
            session.switch_collection(CollectionKind::Favorites).await;
            let snapshot = (
                session.state(),
                view.frame_count(),
                store.calls("not_remembered"),
            );
            gate.open();
            snapshot
        });

    assert_eq!(outcome.unwrap(), EnqueueOutcome::Discarded);
    assert_eq!(session.state(), state_before);
    assert_eq!(session.state().index, 0);
    assert_eq!(view.frame_count(), frames_before);
    assert!(view.notices().is_empty());
    assert_eq!(store.calls("not_remembered"), queue_loads);
    // the remote write itself went through
    assert_eq!(store.inner().pending_terms().await.unwrap(), ["cat"]);
}

#[tokio::test]
async fn dequeue_resolving_after_a_switch_does_not_refetch() {
    let store = store();
    store
        .inner()
        .add_not_remembered("cat", "a small feline")
        .await
        .unwrap();
    let (session, view, _) = mounted(&store);
    session
        .switch_collection(CollectionKind::NotRemembered)
        .await;
    let gate = store.hold("remove_not_remembered");

    let (outcome, (state_before, frames_before)) =
        tokio::join!(session.mark_remembered(), async {
            gate.entered().await;
            session
                .switch_collection(CollectionKind::Sample(animals()))
                .await;
            let snapshot = (session.state(), view.frame_count());
            gate.open();
            snapshot
        });

    assert_eq!(outcome.unwrap(), DequeueOutcome::Discarded);
    assert_eq!(session.state(), state_before);
    assert_eq!(view.frame_count(), frames_before);
    assert_eq!(store.calls("not_remembered"), 1);
    assert!(store.inner().pending_terms().await.unwrap().is_empty());
}
