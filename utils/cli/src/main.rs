use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use ledgrid_app::{
    blink_sequence,
    core::{
        shared, time_units, Configuration, OutputSink, SharedSink, CHANNELS_PER_SINK,
        DEFAULT_COLS, DEFAULT_ROWS, MAX_SINKS,
    },
    Direction, Matrix, PatternKind, PatternOptions, PatternSequence, Schedule, TaskRegistry,
};

/// LED matrix scheduling utility
///
/// Plays named patterns and scheduled brightness tasks on an LED matrix whose output sinks
/// report every duty write to the log.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = false)]
struct Cli {
    /// Number of matrix rows
    #[arg(long, default_value_t = DEFAULT_ROWS)]
    rows: usize,
    /// Number of matrix columns
    #[arg(long, default_value_t = DEFAULT_COLS)]
    cols: usize,
    /// Duration of a single time unit
    #[arg(short, long = "time-unit", default_value = "100", value_name = "ms")]
    time_unit_ms: u64,
    /// Number of output sinks
    #[arg(long, default_value_t = MAX_SINKS)]
    sinks: usize,
    /// Actual command
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Play a named pattern
    Pattern {
        /// Pattern name: chase, wave, pulse, spiral or sparkle
        kind: PatternKind,
        /// Peak brightness
        #[arg(short, long, default_value = "100")]
        brightness: u8,
        /// Lowest brightness of the pulse
        #[arg(long, default_value = "0")]
        min_brightness: u8,
        /// Movement direction: left, right, up or down
        #[arg(short, long, default_value = "right")]
        direction: Direction,
        /// Band width of the wave
        #[arg(short, long, default_value = "2")]
        width: usize,
        /// Fade steps of the pulse or frames of the sparkle [default: depends on the pattern]
        #[arg(long)]
        steps: Option<usize>,
        /// Spiral counter-clockwise
        #[arg(long)]
        counter_clockwise: bool,
        /// Cells lit at once by the sparkle
        #[arg(long, default_value = "3")]
        max_active: usize,
        /// Duration of every frame in time units [default: depends on the pattern]
        #[arg(long = "step-duration")]
        duration_per_step: Option<u32>,
        /// How many times to play the pattern
        #[arg(short, long, default_value = "1")]
        repeat: u32,
    },
    /// Schedule a single brightness task
    Schedule {
        /// Row to light up
        #[arg(long, conflicts_with_all = ["column", "leds"])]
        row: Option<usize>,
        /// Column to light up
        #[arg(long, conflicts_with = "leds")]
        column: Option<usize>,
        /// Comma separated LED identifiers, the whole matrix if nothing is selected
        #[arg(long, value_delimiter = ',')]
        leds: Vec<usize>,
        /// Delay before the task fires in time units
        #[arg(short, long, default_value = "0")]
        start: u32,
        /// How long the LEDs stay on in time units
        #[arg(short, long, default_value = "10")]
        duration: u32,
        /// Target brightness
        #[arg(short, long, default_value = "100")]
        brightness: u8,
        /// Turn the LEDs off instead of restoring their brightness
        #[arg(long)]
        no_restore: bool,
    },
    /// Light every LED in turn
    Blink {
        /// Time each LED stays on in time units
        #[arg(short, long, default_value = "1")]
        delay: u32,
    },
    /// Generate shell completions
    Completions {
        /// The shell to generate the completions for
        #[arg(value_enum)]
        shell: clap_complete_command::Shell,
    },
}

/// Output sink that reports duty writes instead of driving hardware.
struct LogSink {
    index: usize,
}

impl OutputSink for LogSink {
    fn set_channel_duty(&mut self, channel: u8, duty: u16) -> ledgrid_app::Result<()> {
        log::trace!("Sink {} channel {channel} duty set to {duty:#06x}", self.index);
        Ok(())
    }
}

fn log_grid(matrix: &Matrix) {
    for row in matrix.brightness_grid() {
        let line: Vec<String> = row.iter().map(|value| format!("{value:3}")).collect();
        log::info!("{}", line.join(" "));
    }
}

fn create_matrix(config: &Configuration, sink_count: usize) -> anyhow::Result<Arc<Matrix>> {
    let mut sinks: Vec<SharedSink> = (0..sink_count)
        .map(|index| shared(LogSink { index }))
        .collect();
    let matrix = Matrix::from_config(config, &mut sinks)?;
    log::info!("Using {matrix} with {sink_count} sinks");
    Ok(Arc::new(matrix))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = Configuration {
        rows: cli.rows,
        cols: cli.cols,
        time_unit_ms: cli.time_unit_ms,
        channels_per_sink: CHANNELS_PER_SINK,
    };
    let time_unit = config.time_unit();

    match cli.command {
        Command::Pattern {
            kind,
            brightness,
            min_brightness,
            direction,
            width,
            steps,
            counter_clockwise,
            max_active,
            duration_per_step,
            repeat,
        } => {
            let defaults = kind.default_options();
            let options = PatternOptions {
                brightness,
                min_brightness,
                direction,
                width,
                steps: steps.unwrap_or(defaults.steps),
                clockwise: !counter_clockwise,
                max_active,
                duration_per_step: duration_per_step.unwrap_or(defaults.duration_per_step),
            };

            let matrix = create_matrix(&config, cli.sinks)?;
            let registry = TaskRegistry::new(matrix.clone(), time_unit);
            let mut sequence = PatternSequence::new(&registry, kind.to_string());
            kind.extend(&mut sequence, &options, &mut rand::thread_rng())?;

            let task_ids = sequence.run_loop(repeat, 0);
            log::info!(
                "Playing pattern '{kind}' with {} frames, {} tasks scheduled",
                sequence.len(),
                task_ids.len()
            );
            let units = sequence
                .total_duration()
                .saturating_mul(repeat)
                .saturating_add(1);
            tokio::time::sleep(time_units(time_unit, units)).await;
            log::info!("Pattern '{kind}' finished");
            log_grid(&matrix);
        }
        Command::Schedule {
            row,
            column,
            leds,
            start,
            duration,
            brightness,
            no_restore,
        } => {
            let matrix = create_matrix(&config, cli.sinks)?;
            let registry = TaskRegistry::new(matrix.clone(), time_unit);
            let schedule = Schedule::new(start, duration)
                .with_brightness(brightness)
                .with_restore(!no_restore);

            let id = match (row, column) {
                (Some(row), _) => registry.schedule_row(row, schedule)?,
                (None, Some(column)) => registry.schedule_column(column, schedule)?,
                (None, None) if leds.is_empty() => registry.schedule_all(schedule)?,
                (None, None) => registry.schedule_devices(leds, schedule)?,
            };
            log::info!("Scheduled task {id}");

            tokio::time::sleep(time_units(time_unit, start.saturating_add(duration / 2))).await;
            log::info!("Task {id} is {:?}", registry.task_status(id));
            log_grid(&matrix);

            tokio::time::sleep(time_units(time_unit, duration - duration / 2 + 1)).await;
            log::info!("Task {id} is {:?}", registry.task_status(id));
            log_grid(&matrix);
        }
        Command::Blink { delay } => {
            let matrix = create_matrix(&config, cli.sinks)?;
            log::info!("Blinking {} LEDs", matrix.len());
            blink_sequence(&matrix, time_unit, delay).await;
            log_grid(&matrix);
        }
        Command::Completions { shell } => {
            shell.generate(&mut Cli::command(), &mut std::io::stdout());
        }
    }

    Ok(())
}
