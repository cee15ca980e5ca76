//! Desktop simulator of the front-end against a simulated Grbl controller.
//!
//! Runs the real supervisor and modes on the host. The Grbl side answers
//! the `$I` version query after a short delay; the display is printed
//! whenever it changes.
//!
//! # Usage
//!
//! ```bash
//! # Compatible controller, run for 5 seconds
//! cargo run --bin mrkt_sim
//!
//! # Incompatible controller, run for 3 seconds
//! cargo run --bin mrkt_sim -- 0.9j 3000
//! ```

use std::collections::VecDeque;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context};
use mrkt::hal::{MockDisplay, MockLed, MockPanel, SystemClock};
use mrkt::traits::{Board, Clock, Peripherals, SerialPort};
use mrkt::{Config, ModeController, ModeKind};

/// Main loop interval in milliseconds.
const LOOP_INTERVAL_MS: u64 = 1;

/// Version reported when none is given.
const DEFAULT_GRBL_VERSION: &str = "1.1h";

/// Run time when none is given.
const DEFAULT_RUN_MS: u64 = 5000;

/// Time the simulated controller takes to answer.
const REPLY_DELAY_MS: u64 = 20;

/// Simulated Grbl on the other end of the serial link.
struct SimGrbl {
    clock: SystemClock,
    version: String,
    line: Vec<u8>,
    pending: VecDeque<(u64, u8)>,
}

impl SimGrbl {
    fn new(clock: SystemClock, version: String) -> Self {
        Self {
            clock,
            version,
            line: Vec::new(),
            pending: VecDeque::new(),
        }
    }

    fn answer(&mut self, command: &[u8]) {
        let reply = match command {
            b"$I" => format!(
                "[VER:{}.20190825:]\r\n[OPT:V,15,128]\r\nok\r\n",
                self.version
            ),
            b"" => return,
            _ => "error:1\r\n".to_string(),
        };
        let due = self.clock.now_ms() + REPLY_DELAY_MS;
        self.pending.extend(reply.bytes().map(|b| (due, b)));
    }
}

impl SerialPort for SimGrbl {
    fn read_byte(&mut self) -> Option<u8> {
        let now = self.clock.now_ms();
        match self.pending.front() {
            Some((due, _)) if *due <= now => self.pending.pop_front().map(|(_, b)| b),
            _ => None,
        }
    }

    fn write(&mut self, bytes: &[u8]) {
        for byte in bytes {
            if *byte == b'\r' || *byte == b'\n' {
                let line = std::mem::take(&mut self.line);
                println!("[SIM] >> {}", String::from_utf8_lossy(&line));
                self.answer(&line);
            } else {
                self.line.push(*byte);
            }
        }
    }

    fn discard_input(&mut self) {
        // Only bytes that have already arrived are dropped
        let now = self.clock.now_ms();
        while matches!(self.pending.front(), Some((due, _)) if *due <= now) {
            self.pending.pop_front();
        }
    }
}

struct SimBoard;

impl Board for SimBoard {
    type Serial = SimGrbl;
    type Panel = MockPanel;
    type Display = MockDisplay;
    type Led = MockLed;
    type Clock = SystemClock;
}

fn parse_args() -> anyhow::Result<(String, u64)> {
    let mut args = std::env::args().skip(1);
    let version = args
        .next()
        .unwrap_or_else(|| DEFAULT_GRBL_VERSION.to_string());
    let run_ms = match args.next() {
        Some(text) => text
            .parse()
            .with_context(|| format!("invalid run time '{}'", text))?,
        None => DEFAULT_RUN_MS,
    };
    if args.next().is_some() {
        bail!("usage: mrkt_sim [grbl-version] [run-ms]");
    }
    Ok((version, run_ms))
}

fn print_display(display: &MockDisplay, now_ms: u64) {
    println!("{:>6} ms +----------------+", now_ms);
    println!("          |{}|", display.line(0));
    println!("          |{}|", display.line(1));
    println!("          +----------------+");
}

fn main() -> anyhow::Result<()> {
    let (version, run_ms) = parse_args()?;

    println!();
    println!("================================");
    println!("  mrkt simulator");
    println!("================================");
    println!();

    let clock = SystemClock::new();
    let peripherals: Peripherals<SimBoard> = Peripherals {
        serial: SimGrbl::new(clock, version.clone()),
        panel: MockPanel::new(),
        display: MockDisplay::new(),
        led: MockLed::new(),
        clock,
    };
    println!("[OK] Simulated Grbl {} attached", version);

    let config = Config::default();
    let mut controller: ModeController<SimBoard> = ModeController::new(config, peripherals);
    println!("[OK] Supervisor started in {} mode", controller.current_mode().name());
    println!();

    let mut shown = (controller.display().line(0), controller.display().line(1));
    let mut mode = controller.current_mode();

    while controller.clock().now_ms() < run_ms {
        controller.tick();
        let now = controller.last_tick_ms();

        let lines = (controller.display().line(0), controller.display().line(1));
        if lines != shown {
            print_display(controller.display(), now);
            shown = lines;
        }

        if controller.current_mode() != mode {
            mode = controller.current_mode();
            println!("[MODE] {} at {} ms", mode.name(), now);
        }

        thread::sleep(Duration::from_millis(LOOP_INTERVAL_MS));
    }

    println!();
    match controller.current_mode() {
        ModeKind::Initialization => {
            let init = &controller.modes().initialization;
            println!(
                "[WARN] Still initializing: state {:?}, Grbl {}",
                init.state(),
                init.version().unwrap_or("not found")
            );
        }
        other => println!("[OK] Running in {} mode", other.name()),
    }

    Ok(())
}
