use super::*;

#[test]
fn first_tick_pings() {
    let mut hb = Heartbeat::new(Duration::from_millis(8000));
    assert!(hb.alive);
    assert_eq!(hb.tick(), Beat::Ping);
    assert!(!hb.alive);
}

#[test]
fn unanswered_ping_stalls_on_next_tick() {
    let mut hb = Heartbeat::new(Duration::from_millis(10));
    assert_eq!(hb.tick(), Beat::Ping);
    assert_eq!(hb.tick(), Beat::Stalled);
    // Stays stalled until something answers.
    assert_eq!(hb.tick(), Beat::Stalled);
}

#[test]
fn acknowledgment_between_ticks_keeps_probing() {
    let mut hb = Heartbeat::new(Duration::from_millis(10));
    for _ in 0..5 {
        assert_eq!(hb.tick(), Beat::Ping);
        hb.acknowledge();
    }
    assert!(hb.alive);
}

#[tokio::test(start_paused = true)]
async fn interval_waits_one_period_before_first_tick() {
    let hb = Heartbeat::new(Duration::from_millis(500));
    let start = Instant::now();
    let mut interval = hb.interval();
    interval.tick().await;
    assert!(start.elapsed() >= Duration::from_millis(500));
}
