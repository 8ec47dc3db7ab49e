use std::time::Duration;

use wisp::{kill, link, monitor, start_process, with_process, Died, WispError};

#[tokio::test]
async fn monitor_receives_died_after_normal_exit() {
    let _ = env_logger::builder().is_test(true).try_init();
    let watched = start_process(|_me| async { Ok(()) });
    let watcher = start_process(move |me| async move {
        monitor(&me, &watched);
        let died: Died = me.receive().await?;
        assert_eq!(died.who, watched);
        assert!(died.error.is_none());
        Ok(())
    });
    watcher.wait_for_termination().await;
}

#[tokio::test]
async fn monitor_receives_died_with_error_after_failing_exit() {
    let watched = start_process(|_me| async { Err(WispError::Stopped) });
    let watcher = start_process(move |me| async move {
        monitor(&me, &watched);
        let died: Died = me.receive().await?;
        assert!(matches!(died.error, Some(WispError::Stopped)));
        Ok(())
    });
    watcher.wait_for_termination().await;
}

#[tokio::test]
async fn monitoring_an_already_dead_process_delivers_immediately() {
    let watched = start_process(|_me| async { Ok(()) });
    watched.wait_for_termination().await;

    let watcher = start_process(move |me| async move {
        monitor(&me, &watched);
        let died: Died = me.receive().await?;
        assert_eq!(died.who, watched);
        Ok(())
    });
    watcher.wait_for_termination().await;
}

#[tokio::test]
async fn link_propagates_death_as_an_exception() {
    let victim = start_process(|me| async move {
        // Wait long enough for the link to be registered before dying;
        // the kill() below raises an exception at this suspension point.
        me.receive::<()>().await.map(|_: ()| ())
    });
    let linked = start_process({
        let victim = victim.clone();
        move |me| async move {
            link(&me, &victim);
            kill(WispError::Stopped, &victim);
            // The exception should surface from the next suspension point.
            let outcome = me.receive::<()>().await;
            assert!(matches!(outcome, Err(WispError::LinkedProcessDied { .. })));
            Ok(())
        }
    });
    linked.wait_for_termination().await;
}

#[tokio::test]
async fn with_process_stops_child_when_scope_ends() {
    let outcome = with_process(
        |me| async move {
            let _ = me.receive::<()>().await;
            Ok(())
        },
        |child| async move {
            // Return without ever sending anything; the child should still
            // be stopped once the scope's body resolves.
            child
        },
    )
    .await;
    outcome.wait_for_termination().await;
    assert!(!outcome.is_running());
    assert!(matches!(
        outcome.exception(),
        Some(Some(WispError::DependentActionEnded))
    ));
}

#[tokio::test]
async fn send_to_a_dead_process_is_silently_discarded() {
    let target = start_process(|_me| async { Ok(()) });
    target.wait_for_termination().await;
    target.send(42i32);
    // No observable effect beyond not panicking; give the runtime a moment
    // to settle and confirm the registry really did drop the entry.
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!target.is_running());
}
