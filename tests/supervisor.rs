use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use wisp::{
    add_child, child_action, kill, remove_child, start_process, start_supervisor,
    stop_supervisor, Process, Strategy, WispError,
};

#[tokio::test]
async fn kill_all_strategy_tears_down_every_child_on_one_failure() {
    let supervisor = start_supervisor(Strategy::KillAll);
    let requester = start_process(|_me| async { Ok(()) });

    let victim = add_child(
        &requester,
        &supervisor,
        child_action(|me| async move { me.receive::<()>().await.map(|_: ()| ()) }),
    )
    .await
    .unwrap();
    let bystander = add_child(
        &requester,
        &supervisor,
        child_action(|me| async move { me.receive::<()>().await.map(|_: ()| ()) }),
    )
    .await
    .unwrap();

    kill(WispError::Stopped, &victim);

    supervisor.wait_for_termination().await;
    bystander.wait_for_termination().await;
    assert!(!bystander.is_running());
}

#[tokio::test]
async fn ignore_graceful_strategy_drops_normal_exit_and_propagates_on_error() {
    let supervisor = start_supervisor(Strategy::IgnoreGraceful);
    let requester = start_process(|_me| async { Ok(()) });

    let graceful = add_child(
        &requester,
        &supervisor,
        child_action(|_me| async move { Ok(()) }),
    )
    .await
    .unwrap();
    graceful.wait_for_termination().await;
    // Give the supervisor's mailbox scan a chance to silently drop it.
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert!(supervisor.is_running());

    let bystander = add_child(
        &requester,
        &supervisor,
        child_action(|me| async move { me.receive::<()>().await.map(|_: ()| ()) }),
    )
    .await
    .unwrap();
    let victim = add_child(
        &requester,
        &supervisor,
        child_action(|_me| async move { Err(WispError::Stopped) }),
    )
    .await
    .unwrap();

    victim.wait_for_termination().await;
    supervisor.wait_for_termination().await;
    bystander.wait_for_termination().await;
    assert!(!bystander.is_running());
    assert!(matches!(
        supervisor.exception(),
        Some(Some(WispError::Stopped))
    ));
}

#[tokio::test]
async fn ignore_all_strategy_keeps_running_after_a_child_dies() {
    let supervisor = start_supervisor(Strategy::IgnoreAll);
    let requester = start_process(|_me| async { Ok(()) });

    let first = add_child(
        &requester,
        &supervisor,
        child_action(|_me| async move { Ok(()) }),
    )
    .await
    .unwrap();
    first.wait_for_termination().await;

    // The supervisor should still be alive and able to take a new child.
    let second = add_child(
        &requester,
        &supervisor,
        child_action(|me| async move { me.receive::<()>().await.map(|_: ()| ()) }),
    )
    .await
    .unwrap();
    assert!(supervisor.is_running());

    stop_supervisor(&supervisor);
    supervisor.wait_for_termination().await;
    second.wait_for_termination().await;
}

#[tokio::test]
async fn notify_strategy_runs_the_callback_and_can_veto_continuation() {
    let called = Arc::new(AtomicBool::new(false));
    let last_child: Arc<Mutex<Option<Process>>> = Arc::new(Mutex::new(None));

    let supervisor = start_supervisor(Strategy::Notify(Box::new({
        let called = called.clone();
        let last_child = last_child.clone();
        move |child, _outcome| {
            called.store(true, Ordering::SeqCst);
            *last_child.lock().unwrap() = Some(child);
            Ok(())
        }
    })));
    let requester = start_process(|_me| async { Ok(()) });

    let child = add_child(
        &requester,
        &supervisor,
        child_action(|_me| async move { Ok(()) }),
    )
    .await
    .unwrap();
    child.wait_for_termination().await;

    // Give the supervisor's mailbox scan a chance to observe the Died event.
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert!(called.load(Ordering::SeqCst));
    assert_eq!(last_child.lock().unwrap().as_ref(), Some(&child));

    stop_supervisor(&supervisor);
    supervisor.wait_for_termination().await;
}

#[tokio::test]
async fn remove_child_stops_tracking_and_kills_it() {
    let supervisor = start_supervisor(Strategy::IgnoreAll);
    let requester = start_process(|_me| async { Ok(()) });

    let child = add_child(
        &requester,
        &supervisor,
        child_action(|me| async move { me.receive::<()>().await.map(|_: ()| ()) }),
    )
    .await
    .unwrap();

    remove_child(&supervisor, child.clone());
    child.wait_for_termination().await;
    assert!(!child.is_running());

    stop_supervisor(&supervisor);
    supervisor.wait_for_termination().await;
}
