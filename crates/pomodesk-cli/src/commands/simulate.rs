use clap::Args;
use pomodesk_core::sim::{Scenario, SimRig};
use pomodesk_core::{
    AppMode, Config, Effect, Event, IdleTab, MenuCursor, PomodoroTimer, StaticMenu, TickReport,
};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args)]
pub struct SimulateArgs {
    /// Scenario script (TOML)
    script: PathBuf,
    /// Config file; built-in defaults when omitted
    #[arg(long)]
    config: Option<PathBuf>,
    /// Menu JSON served to the controller
    #[arg(long)]
    menu: Option<PathBuf>,
    /// Seed for gambling outcomes
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Serialize)]
struct EffectLine<'a> {
    at_ms: u64,
    effect: &'a Effect,
}

#[derive(Serialize)]
struct EventLine<'a> {
    at_ms: u64,
    event: &'a Event,
}

#[derive(Serialize)]
struct Summary<'a> {
    at_ms: u64,
    mode: AppMode,
    selected_tab: IdleTab,
    user_lost: bool,
    cursor: MenuCursor,
    timer: &'a PomodoroTimer,
}

#[derive(Serialize)]
struct SummaryLine<'a> {
    summary: Summary<'a>,
}

fn print_report(report: &TickReport) -> Result<(), serde_json::Error> {
    for event in &report.events {
        let line = EventLine {
            at_ms: report.at_ms,
            event,
        };
        println!("{}", serde_json::to_string(&line)?);
    }
    for effect in &report.effects {
        let line = EffectLine {
            at_ms: report.at_ms,
            effect,
        };
        println!("{}", serde_json::to_string(&line)?);
    }
    Ok(())
}

pub fn run(args: SimulateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let scenario = Scenario::from_toml(&std::fs::read_to_string(&args.script)?)?;
    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::default(),
    };
    let menu = match &args.menu {
        Some(path) => StaticMenu::from_json(&std::fs::read_to_string(path)?)?,
        None => StaticMenu::default(),
    };
    tracing::info!(
        steps = scenario.steps.len(),
        until_ms = scenario.end_ms(),
        "running scenario"
    );

    let mut rig = SimRig::with_menu(config, menu, args.seed)?;
    print_report(&rig.boot())?;
    for report in rig.run(&scenario) {
        print_report(&report)?;
    }

    let controller = &rig.controller;
    let summary = SummaryLine {
        summary: Summary {
            at_ms: rig.now_ms(),
            mode: controller.mode(),
            selected_tab: controller.selected_tab(),
            user_lost: controller.is_user_lost(),
            cursor: controller.cursor(),
            timer: controller.timer(),
        },
    };
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}
