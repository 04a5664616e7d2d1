//! Live countdown on the terminal.

use std::io::Write;

use clap::Subcommand;
use taskroom_core::{Config, Coordinator, Event, Ticker, TimerMode};

use super::sink::TerminalSink;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Run the countdown in the foreground until it completes or Ctrl-C
    Run {
        /// Mode to start in (work, short-break, long-break)
        #[arg(long)]
        mode: Option<TimerMode>,
        /// Number of completions to run through before exiting
        #[arg(long, default_value = "1")]
        cycles: u32,
    },
    /// Print the starting timer state as JSON
    Status,
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let mut coord = Coordinator::with_config(&config)
        .with_sink(Box::new(TerminalSink::new(config.notifications.bell)));

    match action {
        TimerAction::Run { mode, cycles } => {
            if let Some(mode) = mode {
                coord.set_timer_mode(mode);
            }
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(countdown(&mut coord, cycles.max(1)))?;
        }
        TimerAction::Status => {
            println!("{}", serde_json::to_string_pretty(&coord.timer().snapshot())?);
        }
    }
    Ok(())
}

/// Drive the engine from a one-second ticker. The ticker only exists while
/// the engine runs: it is dropped on completion and on Ctrl-C.
async fn countdown(coord: &mut Coordinator, cycles: u32) -> Result<(), Box<dyn std::error::Error>> {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut finished = 0;
    while finished < cycles {
        if let Some(event) = coord.start_timer() {
            if event.completion().is_some() {
                finished += 1;
                continue;
            }
        }

        let (mut ticker, mut ticks) = Ticker::every_second();
        draw(coord)?;
        loop {
            tokio::select! {
                tick = ticks.recv() => {
                    if tick.is_none() {
                        break;
                    }
                    let event = coord.tick();
                    draw(coord)?;
                    if let Some(Event::TimerCompleted { finished: ended, next, .. }) = event {
                        println!();
                        println!("{} finished. Up next: {}", ended.label(), next.label());
                        finished += 1;
                        break;
                    }
                }
                _ = &mut ctrl_c => {
                    coord.pause_timer();
                    ticker.stop();
                    println!();
                    println!("paused at {}", coord.timer().formatted_remaining());
                    return Ok(());
                }
            }
        }
        ticker.stop();
    }
    Ok(())
}

fn draw(coord: &Coordinator) -> std::io::Result<()> {
    let timer = coord.timer();
    let mut out = std::io::stdout().lock();
    write!(
        out,
        "\r{:<12} {}  ({:>3.0}%)",
        timer.mode().label(),
        timer.formatted_remaining(),
        timer.progress() * 100.0
    )?;
    out.flush()
}
