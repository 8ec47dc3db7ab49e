use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use wisp::{case, default, matching, query, query_handler, respond, start_process};

#[tokio::test]
async fn query_respond_round_trip() {
    let server = start_process(|me| async move {
        loop {
            if respond::<i32, i32, _>(&me, |n| n * 2).await.is_err() {
                return Ok(());
            }
        }
    });

    let client = start_process({
        let server = server.clone();
        move |me| async move {
            let reply: i32 = query(&me, 21, &server).await?;
            assert_eq!(reply, 42);
            Ok(())
        }
    });
    client.wait_for_termination().await;
}

#[tokio::test]
async fn concurrent_clients_each_get_their_own_reply() {
    let server = start_process(|me| async move {
        for _ in 0..3 {
            respond::<i32, i32, _>(&me, |n| n + 1).await?;
        }
        Ok(())
    });

    let mut clients = Vec::new();
    for n in 0..3 {
        let server = server.clone();
        clients.push(start_process(move |me| async move {
            let reply: i32 = query(&me, n, &server).await?;
            assert_eq!(reply, n + 1);
            Ok(())
        }));
    }
    for client in clients {
        client.wait_for_termination().await;
    }
}

#[tokio::test]
async fn dispatch_tries_handlers_in_order_and_default_catches_the_rest() {
    let seen_strings = Arc::new(AtomicI32::new(0));
    let seen_big_ints = Arc::new(AtomicI32::new(0));
    let seen_default = Arc::new(AtomicI32::new(0));

    let worker = start_process({
        let seen_strings = seen_strings.clone();
        let seen_big_ints = seen_big_ints.clone();
        let seen_default = seen_default.clone();
        move |me| async move {
            for _ in 0..3 {
                me.dispatch(&[
                    matching::<i32, _, _>(
                        |n| *n > 10,
                        {
                            let seen_big_ints = seen_big_ints.clone();
                            move |_n| {
                                seen_big_ints.fetch_add(1, Ordering::SeqCst);
                            }
                        },
                    ),
                    case::<String, _>({
                        let seen_strings = seen_strings.clone();
                        move |_s| {
                            seen_strings.fetch_add(1, Ordering::SeqCst);
                        }
                    }),
                    default({
                        let seen_default = seen_default.clone();
                        move |_env| {
                            seen_default.fetch_add(1, Ordering::SeqCst);
                        }
                    }),
                ])
                .await?;
            }
            Ok(())
        }
    });

    worker.send(1i32); // too small for the Match handler, falls to default
    worker.send("hello".to_string());
    worker.send(20i32); // matches the Match handler

    worker.wait_for_termination().await;
    assert_eq!(seen_big_ints.load(Ordering::SeqCst), 1);
    assert_eq!(seen_strings.load(Ordering::SeqCst), 1);
    assert_eq!(seen_default.load(Ordering::SeqCst), 1);
}
