//! Behavioral properties of the handshake logic under randomized traffic.
//!
//! These tests drive components directly and through the kernel, checking
//! tick-exact timing of a single transfer, overrun behavior, the echo
//! buffer's occupancy invariant, and that the two directions of a bridge do
//! not interfere with each other.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uartlink_common::Divisor;
use uartlink_sim::{
    Bridge, ByteHandshakeFsm, Clocked, ControlState, CopyEvent, CopyInput, DoubleBufferedEcho,
    EchoInput, EchoLoopback, LowHighSpeedLoopback, SimConfig, SimKernel, Tick,
};

fn divisor(n: u32) -> Divisor {
    Divisor::new(n).unwrap()
}

// ---------------------------------------------------------------------------
// ByteHandshakeFsm
// ---------------------------------------------------------------------------

#[test]
fn single_byte_round_trip_timing() {
    let mut fsm = Clocked::new(ByteHandshakeFsm);
    let mut trace = Vec::new();

    // tick 0: one-tick ready pulse with 0x41, consumer idle (ack high).
    // ticks 1..=4: consumer busy (ack low). tick 5: consumer done (ack high).
    let tx_ack = |t: usize| t == 0 || t >= 5;
    for t in 0..8 {
        let out = fsm.step(CopyInput {
            rx_ready: t == 0,
            rx_data: if t == 0 { 0x41 } else { 0 },
            tx_ack: tx_ack(t),
        });
        trace.push((out, fsm.state().control));
    }

    assert!(!trace[0].0.rx_ack);
    assert_eq!(trace[0].1, ControlState::DoTx);

    assert!(trace[1].0.rx_ack, "rx_ack rises one tick after the edge");
    for (out, _) in &trace[1..5] {
        assert!(out.tx_ready);
        assert_eq!(out.tx_data, 0x41);
    }

    let (done, state) = trace[5];
    assert!(!done.tx_ready);
    assert_eq!(done.event, Some(CopyEvent::Delivered(0x41)));
    assert_eq!(state, ControlState::WaitToRx);

    for (out, state) in &trace[6..] {
        assert!(!out.tx_ready);
        assert!(!out.rx_ack);
        assert_eq!(*state, ControlState::WaitToRx);
    }
}

#[test]
fn sustained_ready_is_one_transfer() {
    let mut fsm = Clocked::new(ByteHandshakeFsm);
    fsm.step(CopyInput::default());
    for t in 0..6 {
        fsm.step(CopyInput {
            rx_ready: true,
            rx_data: 0x20,
            tx_ack: t == 3,
        });
    }
    assert_eq!(fsm.state().stats.latched, 1);
    assert_eq!(fsm.state().stats.delivered, 1);
}

#[test]
fn every_receive_edge_is_latched_or_dropped() {
    let mut rng = StdRng::seed_from_u64(0x5EED);
    for _ in 0..50 {
        let mut fsm = Clocked::new(ByteHandshakeFsm);
        let mut prev_ready = false;
        let mut edges = 0u64;
        let mut busy_edges = 0u64;
        for _ in 0..500 {
            let rx_ready = rng.gen_bool(0.3);
            let busy = fsm.state().is_busy();
            if rx_ready && !prev_ready {
                edges += 1;
                if busy {
                    busy_edges += 1;
                }
            }
            prev_ready = rx_ready;
            fsm.step(CopyInput {
                rx_ready,
                rx_data: rng.gen(),
                tx_ack: rng.gen_bool(0.2),
            });
        }
        let stats = fsm.state().stats;
        assert_eq!(stats.latched + stats.dropped, edges);
        assert_eq!(stats.dropped, busy_edges);
        assert!(stats.latched - stats.delivered <= 1);
    }
}

#[test]
fn delivered_bytes_match_latched_bytes() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut fsm = Clocked::new(ByteHandshakeFsm);
    let mut latched = Vec::new();
    let mut delivered = Vec::new();
    for _ in 0..5_000 {
        let out = fsm.step(CopyInput {
            rx_ready: rng.gen_bool(0.5),
            rx_data: rng.gen(),
            tx_ack: rng.gen_bool(0.5),
        });
        match out.event {
            Some(CopyEvent::Latched(b)) => latched.push(b),
            Some(CopyEvent::Delivered(b)) => delivered.push(b),
            _ => {}
        }
    }
    assert!(!delivered.is_empty());
    assert_eq!(&latched[..delivered.len()], &delivered[..]);
}

// ---------------------------------------------------------------------------
// DoubleBufferedEcho
// ---------------------------------------------------------------------------

#[test]
fn echo_latches_only_into_empty_buffer() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut echo = Clocked::new(DoubleBufferedEcho);
    let mut pending: Option<u8> = None;
    for _ in 0..10_000 {
        let input = EchoInput {
            rx_ready: rng.gen_bool(0.4),
            rx_data: rng.gen(),
            tx_ack: rng.gen_bool(0.4),
        };
        let before = *echo.state();
        echo.step(input);
        let after = *echo.state();

        if after.stats.received > before.stats.received {
            assert!(before.empty);
            assert_eq!(after.data, input.rx_data);
            pending = Some(input.rx_data);
        }
        if after.stats.sent > before.stats.sent {
            assert!(!before.empty);
            assert_eq!(after.tx_data, pending.take().unwrap());
        }
        assert_eq!(after.pending(), pending);
    }
}

#[test]
fn echo_through_channel_preserves_order() {
    let mut rng = StdRng::seed_from_u64(99);
    let bytes: Vec<u8> = (0..32).map(|_| rng.gen()).collect();
    let mut kernel = SimKernel::new(EchoLoopback::new(divisor(3)), SimConfig::default());
    kernel.send("uart", &bytes, 2, Tick::ZERO).unwrap();
    let result = kernel.run_to_completion().unwrap();
    assert_eq!(result.received("uart").unwrap(), bytes);
    assert_eq!(result.stats.channels["uart"].overruns, 0);
}

// ---------------------------------------------------------------------------
// Bridge
// ---------------------------------------------------------------------------

const LOW_DIV: u32 = 8;
const HIGH_DIV: u32 = 2;
/// Idle bits after each fast-side frame so the slow side keeps up.
const HIGH_GAP_BITS: u32 = 35;

fn run_bridge(low_to_high: &[u8], high_to_low: &[u8]) -> uartlink_sim::SimResult {
    let bridge = Bridge::new(divisor(LOW_DIV), divisor(HIGH_DIV));
    let mut kernel = SimKernel::new(bridge, SimConfig::default());
    kernel.send("low", low_to_high, 1, Tick::ZERO).unwrap();
    kernel
        .send("high", high_to_low, HIGH_GAP_BITS, Tick(7))
        .unwrap();
    kernel.run_to_completion().unwrap()
}

#[test]
fn bridge_carries_both_directions() {
    let result = run_bridge(b"slow to fast", b"fast to slow");
    assert_eq!(result.received("high").unwrap(), b"slow to fast");
    assert_eq!(result.received("low").unwrap(), b"fast to slow");
    assert_eq!(result.stats.total_dropped(), 0);
}

#[test]
fn bridge_directions_are_independent() {
    let mut rng = StdRng::seed_from_u64(2024);
    for _ in 0..10 {
        let forward: Vec<u8> = (0..rng.gen_range(1..40)).map(|_| rng.gen()).collect();
        let reverse: Vec<u8> = (0..rng.gen_range(1..40)).map(|_| rng.gen()).collect();

        let alone = run_bridge(&forward, &[]);
        let busy = run_bridge(&forward, &reverse);

        let high_alone = &alone.ports[1];
        let high_busy = &busy.ports[1];
        assert_eq!(high_alone.bytes(), forward);
        assert_eq!(
            high_alone.frames, high_busy.frames,
            "reverse traffic changed forward timing"
        );
        assert_eq!(busy.received("low").unwrap(), reverse);
    }
}

#[test]
fn bridge_fsms_share_no_state() {
    let mut bridge = Bridge::new(divisor(LOW_DIV), divisor(HIGH_DIV));
    bridge.step_lines(Some(0x01), None);
    bridge.step_lines(None, None);
    assert!(bridge.low_to_high().state().is_busy());
    assert!(!bridge.high_to_low().state().is_busy());
    assert_eq!(bridge.low_to_high().state().holding, 0x01);
    assert_eq!(bridge.high_to_low().state().stats.latched, 0);
}

#[test]
fn fast_side_burst_overruns_slow_side() {
    // Without pacing the fast side outruns the slow transmitter and bytes are
    // dropped by the high-to-low FSM, never reordered.
    let bridge = Bridge::new(divisor(LOW_DIV), divisor(HIGH_DIV));
    let mut kernel = SimKernel::new(bridge, SimConfig::default());
    let burst: Vec<u8> = (1..=10).collect();
    kernel.send("high", &burst, 0, Tick::ZERO).unwrap();
    let result = kernel.run_to_completion().unwrap();

    let got = result.received("low").unwrap();
    assert!(got.len() < burst.len());
    assert!(got.windows(2).all(|w| w[0] < w[1]), "order preserved: {got:?}");
    assert!(result.stats.copies["high_to_low"].dropped > 0);
}

// ---------------------------------------------------------------------------
// LowHighSpeedLoopback
// ---------------------------------------------------------------------------

#[test]
fn loopback_returns_text_through_fast_link() {
    let topology = LowHighSpeedLoopback::new(divisor(32), divisor(5));
    let mut kernel = SimKernel::new(topology, SimConfig::default());
    kernel.send("low", b"Hello, bridge!", 30, Tick::ZERO).unwrap();
    let result = kernel.run_to_completion().unwrap();
    assert_eq!(result.received("low").unwrap(), b"Hello, bridge!");
    assert_eq!(result.stats.copies["far"].delivered, 14);
    assert_eq!(result.stats.channels["high"].frames_sent, 14);
}

#[test]
fn result_serializes_to_json() {
    let topology = LowHighSpeedLoopback::new(divisor(4), divisor(1));
    let mut kernel = SimKernel::new(topology, SimConfig::default());
    kernel.send("low", b"A", 30, Tick::ZERO).unwrap();
    let result = kernel.run_to_completion().unwrap();
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["topology"], "loopback");
    assert_eq!(json["completed"], true);
    assert_eq!(json["ports"][0]["port"], "low");
    assert_eq!(json["ports"][0]["frames"][0]["byte"], 0x41);
}
