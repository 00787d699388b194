//! Stall detection for components waiting on an unresponsive partner.
//!
//! The handshake FSMs have no timeout of their own: a consumer that never
//! raises `tx_ack` parks them in `DoTx` forever. [`StallWatchdog`] observes
//! [`StallProbe`]s from outside and reports a [`SimError::Timeout`] once a
//! component has waited longer than the configured limit. It never touches
//! component state, so a harness can inspect the stalled system afterwards.

use std::collections::BTreeMap;

use log::error;

use crate::error::SimError;
use crate::time::Tick;
use crate::topology::StallProbe;

/// Tracks how long each probed component has been waiting.
#[derive(Debug, Clone, Default)]
pub struct StallWatchdog {
    limit: Option<u64>,
    waiting_since: BTreeMap<&'static str, Tick>,
}

impl StallWatchdog {
    /// A watchdog that fires after `limit` consecutive waiting ticks, or
    /// never if `limit` is `None`.
    pub fn new(limit: Option<u64>) -> Self {
        Self {
            limit,
            waiting_since: BTreeMap::new(),
        }
    }

    /// Consecutive waiting ticks of `component` up to and including `now`.
    pub fn waited(&self, component: &str, now: Tick) -> u64 {
        self.waiting_since
            .get(component)
            .map_or(0, |since| now.since(*since) + 1)
    }

    /// Records the probes sampled at `now` and checks them against the limit.
    pub fn check(&mut self, now: Tick, probes: &[StallProbe]) -> Result<(), SimError> {
        for probe in probes {
            if probe.waiting {
                self.waiting_since.entry(probe.component).or_insert(now);
            } else {
                self.waiting_since.remove(probe.component);
            }
        }

        let Some(limit) = self.limit else {
            return Ok(());
        };
        for (component, since) in &self.waiting_since {
            let ticks = now.since(*since) + 1;
            if ticks > limit {
                error!("{component}: no acknowledge after {ticks} ticks");
                return Err(SimError::Timeout {
                    component: component.to_string(),
                    ticks,
                    at: now,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::copy::{ByteHandshakeFsm, ControlState, CopyInput};
    use crate::sync::Clocked;

    fn probe(waiting: bool) -> [StallProbe; 1] {
        [StallProbe {
            component: "fsm",
            waiting,
        }]
    }

    #[test]
    fn disabled_never_fires() {
        let mut wd = StallWatchdog::new(None);
        for t in 0..10_000 {
            assert!(wd.check(Tick(t), &probe(true)).is_ok());
        }
        assert_eq!(wd.waited("fsm", Tick(9_999)), 10_000);
    }

    #[test]
    fn fires_after_limit() {
        let mut wd = StallWatchdog::new(Some(3));
        assert!(wd.check(Tick(10), &probe(true)).is_ok());
        assert!(wd.check(Tick(11), &probe(true)).is_ok());
        assert!(wd.check(Tick(12), &probe(true)).is_ok());
        let err = wd.check(Tick(13), &probe(true)).unwrap_err();
        assert_eq!(
            err,
            SimError::Timeout {
                component: "fsm".into(),
                ticks: 4,
                at: Tick(13),
            }
        );
    }

    #[test]
    fn progress_resets_counter() {
        let mut wd = StallWatchdog::new(Some(2));
        wd.check(Tick(0), &probe(true)).unwrap();
        wd.check(Tick(1), &probe(true)).unwrap();
        wd.check(Tick(2), &probe(false)).unwrap();
        wd.check(Tick(3), &probe(true)).unwrap();
        wd.check(Tick(4), &probe(true)).unwrap();
        assert_eq!(wd.waited("fsm", Tick(4)), 2);
    }

    #[test]
    fn stalled_partner_times_out_without_touching_state() {
        let mut fsm = Clocked::new(ByteHandshakeFsm);
        let mut wd = StallWatchdog::new(Some(50));
        fsm.step(CopyInput {
            rx_ready: true,
            rx_data: 0x41,
            tx_ack: false,
        });

        let mut result = Ok(());
        let mut tick = Tick(1);
        while result.is_ok() {
            let out = fsm.step(CopyInput::default());
            assert!(out.tx_ready);
            let probes = [StallProbe {
                component: "copy",
                waiting: fsm.state().is_busy(),
            }];
            result = wd.check(tick, &probes);
            tick = tick.next();
        }

        assert!(matches!(result, Err(SimError::Timeout { ticks: 51, .. })));
        assert_eq!(fsm.state().control, ControlState::DoTx);
        assert_eq!(fsm.state().holding, 0x41);
        assert_eq!(fsm.state().stats.delivered, 0);
    }
}
