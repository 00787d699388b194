//! Serial line stimulus and capture.
//!
//! A [`LineStimulus`] plays the part of the device on the far end of a
//! serial port: it schedules frames to finish arriving at given ticks.
//! [`LineCapture`] records every frame a port completes on its transmit line.

use std::collections::VecDeque;

use serde::Serialize;
use uartlink_common::Divisor;

use crate::time::Tick;

/// Frames queued for one port's receive line, in completion order.
#[derive(Debug, Clone, Default)]
pub struct LineStimulus {
    frames: VecDeque<(Tick, u8)>,
}

impl LineStimulus {
    /// An empty stimulus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `bytes` as back-to-back frames at `divisor`, the first one
    /// starting at `start`, each followed by `gap_bits` idle bit periods.
    ///
    /// Returns `None` if the last frame would complete past the last
    /// representable tick.
    pub fn paced(bytes: &[u8], divisor: Divisor, gap_bits: u32, start: Tick) -> Option<Self> {
        let mut stimulus = Self::new();
        stimulus.extend_paced(bytes, divisor, gap_bits, start)?;
        Some(stimulus)
    }

    /// Appends paced frames as in [`paced`](Self::paced) and returns the tick
    /// the last one completes. On overflow nothing is queued.
    pub fn extend_paced(
        &mut self,
        bytes: &[u8],
        divisor: Divisor,
        gap_bits: u32,
        start: Tick,
    ) -> Option<Tick> {
        let end = divisor.stream_end(start.0, bytes.len() as u64, gap_bits)?;
        let frame = divisor.frame_ticks();
        let gap = u64::from(gap_bits) * u64::from(divisor.ticks_per_bit());
        // Every partial sum is bounded by `end`.
        let mut done = start.0;
        for (i, &byte) in bytes.iter().enumerate() {
            if i > 0 {
                done += gap;
            }
            done += frame;
            self.push(Tick(done), byte);
        }
        Some(Tick(end))
    }

    /// Schedules one frame to complete at `at`, keeping completion order.
    pub fn push(&mut self, at: Tick, byte: u8) {
        let index = self.frames.partition_point(|(t, _)| *t <= at);
        self.frames.insert(index, (at, byte));
    }

    /// The frame completing at `now`, if one is due.
    ///
    /// At most one frame completes per tick; a frame that shares a tick with
    /// an earlier one is delivered on the next tick instead.
    pub fn poll(&mut self, now: Tick) -> Option<u8> {
        match self.frames.front() {
            Some((at, _)) if *at <= now => self.frames.pop_front().map(|(_, b)| b),
            _ => None,
        }
    }

    /// Whether every queued frame has been delivered.
    pub fn is_exhausted(&self) -> bool {
        self.frames.is_empty()
    }

    /// Number of frames still queued.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// One frame seen on a transmit line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CapturedFrame {
    /// The tick the frame completed.
    pub tick: Tick,
    /// The frame's data byte.
    pub byte: u8,
}

/// Frames completed on one port's transmit line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LineCapture {
    frames: Vec<CapturedFrame>,
}

impl LineCapture {
    /// An empty capture.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the line's state at `now`.
    pub fn record(&mut self, now: Tick, line: Option<u8>) {
        if let Some(byte) = line {
            self.frames.push(CapturedFrame { tick: now, byte });
        }
    }

    /// Every captured frame in order.
    pub fn frames(&self) -> &[CapturedFrame] {
        &self.frames
    }

    /// The captured data bytes in order.
    pub fn bytes(&self) -> Vec<u8> {
        self.frames.iter().map(|f| f.byte).collect()
    }

    /// The captured bytes as text, with invalid UTF-8 replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes()).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn divisor(n: u32) -> Divisor {
        Divisor::new(n).unwrap()
    }

    #[test]
    fn paced_frames_complete_one_frame_after_start() {
        let mut s = LineStimulus::paced(b"AB", divisor(2), 3, Tick(5)).unwrap();
        // frame = 20 ticks, gap = 6 ticks
        assert_eq!(s.poll(Tick(24)), None);
        assert_eq!(s.poll(Tick(25)), Some(b'A'));
        assert_eq!(s.poll(Tick(50)), None);
        assert_eq!(s.poll(Tick(51)), Some(b'B'));
        assert!(s.is_exhausted());
    }

    #[test]
    fn extend_reports_last_completion() {
        let mut s = LineStimulus::new();
        assert_eq!(s.extend_paced(b"AB", divisor(2), 3, Tick(5)), Some(Tick(51)));
        assert_eq!(s.extend_paced(b"", divisor(2), 3, Tick(80)), Some(Tick(80)));
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn overflowing_schedule_queues_nothing() {
        let huge = divisor(u32::MAX);
        assert!(LineStimulus::paced(b"ab", huge, u32::MAX, Tick::ZERO).is_none());

        let mut s = LineStimulus::new();
        assert_eq!(s.extend_paced(b"x", divisor(1), 0, Tick(u64::MAX - 9)), None);
        assert!(s.is_empty());
        assert_eq!(
            s.extend_paced(b"x", divisor(1), 0, Tick(u64::MAX - 10)),
            Some(Tick(u64::MAX))
        );
        assert_eq!(s.poll(Tick(u64::MAX)), Some(b'x'));
    }

    #[test]
    fn push_keeps_order() {
        let mut s = LineStimulus::new();
        s.push(Tick(30), 3);
        s.push(Tick(10), 1);
        s.push(Tick(20), 2);
        assert_eq!(s.len(), 3);
        assert_eq!(s.poll(Tick(100)), Some(1));
        assert_eq!(s.poll(Tick(100)), Some(2));
        assert_eq!(s.poll(Tick(100)), Some(3));
        assert!(s.is_empty());
    }

    #[test]
    fn one_frame_per_tick() {
        let mut s = LineStimulus::new();
        s.push(Tick(4), 0xA);
        s.push(Tick(4), 0xB);
        assert_eq!(s.poll(Tick(4)), Some(0xA));
        assert_eq!(s.poll(Tick(5)), Some(0xB));
    }

    #[test]
    fn capture_records_only_frames() {
        let mut c = LineCapture::new();
        c.record(Tick(1), None);
        c.record(Tick(2), Some(b'h'));
        c.record(Tick(3), None);
        c.record(Tick(9), Some(b'i'));
        assert_eq!(c.bytes(), b"hi");
        assert_eq!(c.text(), "hi");
        assert_eq!(c.frames()[1].tick, Tick(9));
    }
}
