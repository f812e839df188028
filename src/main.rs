//! Xenpaper command line — compiles notation text to a timed score.
//!
//! Reads notation from a file or stdin and prints the resolved score,
//! either human-readable or as JSON.

use clap::Parser;
use std::error::Error;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use xenpaper::notation::Compiler;
use xenpaper::score::{ParamValue, RealTimeEvent, ScoreEvent};

#[derive(Parser)]
#[command(name = "xenpaper", version, about = "Compile xenpaper microtonal notation")]
struct Args {
    /// Notation file to compile; reads stdin when omitted.
    file: Option<PathBuf>,

    /// Emit the score as JSON.
    #[arg(long)]
    json: bool,

    /// Keep times in beats instead of resolving to milliseconds.
    #[arg(long)]
    beats: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let source = match read_source(&args) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    match run(&args, &source) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn read_source(args: &Args) -> Result<String, Box<dyn Error>> {
    match &args.file {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => {
            let mut source = String::new();
            std::io::stdin().read_to_string(&mut source)?;
            Ok(source)
        }
    }
}

fn run(args: &Args, source: &str) -> Result<(), Box<dyn Error>> {
    if args.beats {
        let compiled = match Compiler::compile(source)? {
            Some(compiled) => compiled,
            None => return print_no_score(args),
        };
        if args.json {
            println!("{}", serde_json::to_string_pretty(&compiled.score)?);
        } else {
            print_beat_score(&compiled.score);
        }
        return Ok(());
    }

    let (score, _ruler) = match Compiler::render(source)? {
        Some(rendered) => rendered,
        None => return print_no_score(args),
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&score)?);
    } else {
        for event in &score.events {
            match event {
                RealTimeEvent::Note {
                    ms,
                    ms_end,
                    hz,
                    label,
                } => println!("note   {ms:>10.3} .. {ms_end:>10.3} ms  {hz:>10.3} hz  {label}"),
                RealTimeEvent::Param { ms, value } => {
                    println!("param  {ms:>10.3} ms  {}", format_param(value))
                }
                RealTimeEvent::End { ms } => println!("end    {ms:>10.3} ms"),
            }
        }
        println!("length {:.3} ms", score.length_ms);
    }
    Ok(())
}

fn print_no_score(args: &Args) -> Result<(), Box<dyn Error>> {
    if args.json {
        println!("null");
    } else {
        println!("no score");
    }
    Ok(())
}

fn print_beat_score(score: &xenpaper::score::Score) {
    for event in &score.events {
        match event {
            ScoreEvent::Tempo { time, bpm, lerp } => println!(
                "tempo  {time:>8.3}  {bpm} bpm{}",
                if *lerp { " (lerp)" } else { "" }
            ),
            ScoreEvent::Note {
                time,
                time_end,
                hz,
                label,
            } => println!("note   {time:>8.3} .. {time_end:>8.3}  {hz:>10.3} hz  {label}"),
            ScoreEvent::Param { time, value } => {
                println!("param  {time:>8.3}  {}", format_param(value))
            }
            ScoreEvent::End { time } => println!("end    {time:>8.3}"),
        }
    }
    println!("length {:.3} beats", score.length);
}

fn format_param(value: &ParamValue) -> String {
    match value {
        ParamValue::Osc { osc } => format!("osc={osc}"),
        ParamValue::Env { a, d, s, r } => format!("env a={a} d={d} s={s} r={r}"),
    }
}
