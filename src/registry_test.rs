use super::*;

fn client(tag: &str) -> (Client, mpsc::Receiver<Outbound>) {
    let (writer, outbound) = mpsc::channel(4);
    (Client::new(tag.to_string(), writer), outbound)
}

#[test]
fn insert_then_exact_lookup() {
    let mut registry = Registry::new();
    let (a, _rx) = client("mux:10.0.0.1-100");
    registry.insert(a).unwrap();

    assert!(registry.get("mux:10.0.0.1-100").is_some());
    // exact match only — a prefix of a live tag resolves to nothing
    assert!(registry.get("mux:10.0.0.1-10").is_none());
    assert!(registry.get("mux:10.0.0.1-1000").is_none());
}

#[test]
fn duplicate_insert_rejected_and_original_kept() {
    let mut registry = Registry::new();
    let (first, mut first_rx) = client("mux:10.0.0.1-100");
    let (second, _second_rx) = client("mux:10.0.0.1-100");

    registry.insert(first).unwrap();
    let err = registry.insert(second).unwrap_err();
    assert_eq!(err.rejected.tag(), "mux:10.0.0.1-100");
    assert_eq!(registry.len(), 1);

    // the registered client is still the first one
    registry
        .get("mux:10.0.0.1-100")
        .unwrap()
        .deliver("still here".to_string())
        .unwrap();
    assert_eq!(first_rx.try_recv().unwrap(), Outbound::Deliver("still here".to_string()));
}

#[test]
fn remove_is_idempotent() {
    let mut registry = Registry::new();
    let (a, _rx) = client("a");
    registry.insert(a).unwrap();

    assert!(registry.remove("a").is_some());
    assert!(registry.remove("a").is_none());
    assert!(registry.remove("never-existed").is_none());
}

#[test]
fn tag_reusable_after_removal() {
    let mut registry = Registry::new();
    for _ in 0..3 {
        let (a, _rx) = client("mux:1.1.1.1-9");
        registry.insert(a).unwrap();
        assert_eq!(registry.len(), 1);
        registry.remove("mux:1.1.1.1-9").unwrap();
    }
    assert!(registry.is_empty());
}

#[test]
fn deliver_fails_when_socket_task_is_gone() {
    let (a, rx) = client("a");
    drop(rx);
    assert!(a.deliver("lost".to_string()).is_err());
}

#[test]
fn deliver_fails_when_queue_is_full() {
    let (writer, _rx) = mpsc::channel(1);
    let a = Client::new("a".to_string(), writer);
    a.deliver("one".to_string()).unwrap();
    assert!(a.deliver("two".to_string()).is_err());
}

#[test]
fn close_is_best_effort() {
    let (a, mut rx) = client("a");
    a.close("server_close");
    assert_eq!(rx.try_recv().unwrap(), Outbound::Close("server_close"));

    // a gone task never panics the caller
    let (b, rx_b) = client("b");
    drop(rx_b);
    b.close("server_close");
}
