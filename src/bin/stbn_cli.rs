use clap::{arg, Command};
use rand::Rng;
use std::{fs::File, process::exit};

use stbn::kernel::CpuDispatch;
use stbn::optimizer::{OptimizeConfig, Optimizer};

fn main() {
    env_logger::init();
    let mut cmd = Command::new("stbn-cli")
        .about("Optimizes a spatio-temporal blue noise value grid")
        .arg(arg!(-c --config <CONFIG> "Optimization config file (json)").required(false))
        .arg(arg!(-o --stats <STATS> "Write run statistics to this file (json)").required(false))
        .arg(arg!(--"random-key" "Use a randomly generated permutation key").required(false))
        .arg(arg!(-q --quiet "Disable the progress bar").required(false));
    let help = cmd.render_help();
    let matches = cmd.get_matches();
    let config = matches.get_one::<String>("config");
    if config.is_none() {
        println!("{}", help);
        exit(1);
    }
    let mut config: OptimizeConfig = {
        let file = match File::open(config.unwrap()) {
            Ok(file) => file,
            Err(e) => {
                eprintln!("cannot open config: {}", e);
                exit(1);
            }
        };
        match serde_json::from_reader(file) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("cannot parse config: {}", e);
                exit(1);
            }
        }
    };
    if matches.get_flag("random-key") {
        config.key = rand::thread_rng().gen();
    }
    if matches.get_flag("quiet") {
        stbn::util::enable_progress_bar(false);
    }
    let mut optimizer = match Optimizer::new(config, CpuDispatch::default()) {
        Ok(optimizer) => optimizer,
        Err(e) => {
            eprintln!("{}", e);
            exit(1);
        }
    };
    let stats = match optimizer.run() {
        Ok(stats) => stats.clone(),
        Err(e) => {
            eprintln!("{}", e);
            exit(1);
        }
    };
    if let Some(path) = matches.get_one::<String>("stats") {
        let file = File::create(path).unwrap();
        serde_json::to_writer_pretty(file, &stats).unwrap();
    } else {
        println!("{}", serde_json::to_string_pretty(&stats).unwrap());
    }
}
