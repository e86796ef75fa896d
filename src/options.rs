//! Parsing Options.
//! `pn-cover <NET> [-w FILE | --random-weights] [--exact] [--dot FILE] [-o FILE]`

use clap::{Arg, ArgAction, Command};
use std::error::Error;

fn make_options_parser() -> clap::Command {
    Command::new("pn-cover")
        .no_binary_name(true)
        .version("v0.1.0")
        .arg(
            Arg::new("net")
                .required(true)
                .value_name("FILE")
                .help("Path to the net spec (JSON, or RON by extension)"),
        )
        .arg(
            Arg::new("weights")
                .short('w')
                .long("weights")
                .value_name("FILE")
                .help("Objective weights as a JSON map from place name to integer"),
        )
        .arg(
            Arg::new("random-weights")
                .long("random-weights")
                .action(ArgAction::SetTrue)
                .help("Assign a random weight to every place"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .default_value("pncover.toml"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Path to file where the analysis report will be stored"),
        )
        .arg(
            Arg::new("dot")
                .long("dot")
                .value_name("FILE")
                .help("Write the coverability tree in Graphviz format"),
        )
        .arg(
            Arg::new("exact")
                .long("exact")
                .action(ArgAction::SetTrue)
                .help("Cross-check against the explicit reachability graph"),
        )
}

#[derive(Debug)]
pub struct Options {
    pub net: String,
    pub weights: Option<String>,
    pub random_weights: bool,
    pub config: String,
    pub output: Option<String>,
    pub dot: Option<String>,
    pub exact: bool,
}

impl Options {
    pub fn parse_from_args(flags: &[String]) -> Result<Self, Box<dyn Error>> {
        let app = make_options_parser();
        let matches = app.try_get_matches_from(flags.iter())?;

        Ok(Options {
            net: matches.get_one::<String>("net").unwrap().to_string(),
            weights: matches.get_one::<String>("weights").cloned(),
            random_weights: matches.get_flag("random-weights"),
            config: matches.get_one::<String>("config").unwrap().to_string(),
            output: matches.get_one::<String>("output").cloned(),
            dot: matches.get_one::<String>("dot").cloned(),
            exact: matches.get_flag("exact"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(flags: &[&str]) -> Vec<String> {
        flags.iter().map(|flag| flag.to_string()).collect()
    }

    #[test]
    fn missing_net_path_is_an_error() {
        let options = Options::parse_from_args(&args(&["--exact"]));
        assert!(options.is_err());
    }

    #[test]
    fn full_flag_set_parses() {
        let options = Options::parse_from_args(&args(&[
            "net.json",
            "-w",
            "weights.json",
            "--exact",
            "--dot",
            "tree.dot",
            "-o",
            "report.json",
        ]))
        .unwrap();

        assert_eq!(options.net, "net.json");
        assert_eq!(options.weights.as_deref(), Some("weights.json"));
        assert!(options.exact);
        assert!(!options.random_weights);
        assert_eq!(options.config, "pncover.toml");
        assert_eq!(options.dot.as_deref(), Some("tree.dot"));
        assert_eq!(options.output.as_deref(), Some("report.json"));
    }
}
