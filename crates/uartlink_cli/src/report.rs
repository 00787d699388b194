//! Rendering of simulation results for the terminal.

use std::fmt::Write as _;

use uartlink_common::Frequency;
use uartlink_sim::time::format_fs;
use uartlink_sim::{PortCapture, SimResult};

/// Renders a result as human-readable text: captured frames per port
/// followed by every instance's counters.
pub fn render_text(result: &SimResult, clock: Frequency) -> String {
    let mut out = String::new();
    for port in &result.ports {
        render_port(&mut out, port, clock);
    }

    let stats = &result.stats;
    if !stats.channels.is_empty() || !stats.copies.is_empty() || !stats.echoes.is_empty() {
        let _ = writeln!(out, "stats:");
    }
    for (name, s) in &stats.channels {
        let _ = writeln!(
            out,
            "  channel {name}: sent {}, received {}, overruns {}",
            s.frames_sent, s.frames_received, s.overruns
        );
    }
    for (name, s) in &stats.copies {
        let _ = writeln!(
            out,
            "  copy {name}: latched {}, delivered {}, dropped {}",
            s.latched, s.delivered, s.dropped
        );
    }
    for (name, s) in &stats.echoes {
        let _ = writeln!(
            out,
            "  echo {name}: received {}, sent {}, held off {} tick(s)",
            s.received, s.sent, s.held_off
        );
    }
    out
}

fn render_port(out: &mut String, port: &PortCapture, clock: Frequency) {
    let _ = writeln!(
        out,
        "{}: {} frame(s) at divisor {}",
        port.port,
        port.frames.len(),
        port.divisor.ticks_per_bit()
    );
    for frame in &port.frames {
        let _ = writeln!(
            out,
            "  {:>10}  {:>10}  0x{:02X}  {}",
            frame.tick.0,
            format_fs(frame.tick.to_fs(clock)),
            frame.byte,
            printable(frame.byte)
        );
    }
    if !port.frames.is_empty() {
        let text = String::from_utf8_lossy(&port.bytes()).into_owned();
        let _ = writeln!(out, "  text: {text:?}");
    }
}

fn printable(byte: u8) -> String {
    if byte.is_ascii_graphic() || byte == b' ' {
        format!("'{}'", byte as char)
    } else {
        String::new()
    }
}
